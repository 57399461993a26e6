//! Series colorizer: palette slots for accounts and flow depths

use std::collections::HashMap;

use ledgerlens_config::{ChartConfig, ColorStrategy};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Fixed list of color slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    slots: Vec<String>,
}

impl Palette {
    /// Palette over `slots`; an empty list falls back to the default five
    pub fn new(slots: Vec<String>) -> Self {
        if slots.is_empty() {
            return Self::default();
        }
        Self { slots }
    }

    pub fn from_config(config: &ChartConfig) -> Self {
        Self::new(config.palette.clone())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Color of slot `index mod len`
    pub fn slot(&self, index: usize) -> &str {
        &self.slots[index % self.slots.len()]
    }

    /// Color of a flow node at `depth`
    pub fn depth_color(&self, depth: usize) -> &str {
        self.slot(depth)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            slots: ChartConfig::default().palette,
        }
    }
}

/// Lower-cased account name to palette slot, in series order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorAssignment {
    entries: Vec<(String, usize)>,
    palette: Vec<String>,
}

impl ColorAssignment {
    fn insert(&mut self, key: String, slot: usize) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = slot,
            None => self.entries.push((key, slot)),
        }
    }

    pub fn slot_for(&self, account: &str) -> Option<usize> {
        let key = account.to_lowercase();
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, s)| *s)
    }

    pub fn color_for(&self, account: &str) -> Option<&str> {
        let slot = self.slot_for(account)?;
        self.palette.get(slot % self.palette.len().max(1)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl Serialize for ColorAssignment {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, slot) in &self.entries {
            let color = self
                .palette
                .get(slot % self.palette.len().max(1))
                .map(String::as_str)
                .unwrap_or_default();
            map.serialize_entry(key, color)?;
        }
        map.end()
    }
}

/// Positional assignment: the i-th account gets slot `i mod len`.
///
/// Names are lower-cased; a later duplicate takes the later position.
pub fn positional<'a>(palette: &Palette, accounts: impl IntoIterator<Item = &'a str>) -> ColorAssignment {
    let mut assignment = ColorAssignment {
        entries: Vec::new(),
        palette: palette.slots.clone(),
    };
    for (i, account) in accounts.into_iter().enumerate() {
        assignment.insert(account.to_lowercase(), i % palette.len());
    }
    assignment
}

/// Colorizer owned by one view.
///
/// With the sticky strategy it remembers every account it has colored,
/// so drilling in and back out keeps colors.
#[derive(Debug, Clone)]
pub struct SeriesColorizer {
    palette: Palette,
    strategy: ColorStrategy,
    sticky: HashMap<String, usize>,
    next_slot: usize,
}

impl SeriesColorizer {
    pub fn new(palette: Palette, strategy: ColorStrategy) -> Self {
        Self {
            palette,
            strategy,
            sticky: HashMap::new(),
            next_slot: 0,
        }
    }

    pub fn from_config(config: &ChartConfig) -> Self {
        Self::new(Palette::from_config(config), config.color_strategy)
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn strategy(&self) -> ColorStrategy {
        self.strategy
    }

    pub fn colorize<'a>(&mut self, accounts: impl IntoIterator<Item = &'a str>) -> ColorAssignment {
        match self.strategy {
            ColorStrategy::Positional => positional(&self.palette, accounts),
            ColorStrategy::Sticky => {
                let mut assignment = ColorAssignment {
                    entries: Vec::new(),
                    palette: self.palette.slots.clone(),
                };
                for account in accounts {
                    let key = account.to_lowercase();
                    let slot = match self.sticky.get(&key) {
                        Some(slot) => *slot,
                        None => {
                            let slot = self.next_slot % self.palette.len();
                            self.next_slot += 1;
                            self.sticky.insert(key.clone(), slot);
                            slot
                        }
                    };
                    assignment.insert(key, slot);
                }
                assignment
            }
        }
    }
}
