//! View state of a single chart

use serde::Serialize;

/// Result of shaping a response: chart data, or the explicit no-data state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum Normalized<T> {
    NoData,
    Data(T),
}

impl<T> Normalized<T> {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Normalized::NoData)
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Normalized::Data(data) => Some(data),
            Normalized::NoData => None,
        }
    }

    pub fn as_data(&self) -> Option<&T> {
        match self {
            Normalized::Data(data) => Some(data),
            Normalized::NoData => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Normalized<U> {
        match self {
            Normalized::Data(data) => Normalized::Data(f(data)),
            Normalized::NoData => Normalized::NoData,
        }
    }
}

/// What the chart should render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    /// Nothing requested yet
    Idle,
    Loading,
    /// "No data for selected range" placeholder
    NoData,
    Ready,
    /// The only request so far failed
    Failed,
}

impl std::fmt::Display for Presentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Presentation::Idle => write!(f, "idle"),
            Presentation::Loading => write!(f, "loading"),
            Presentation::NoData => write!(f, "no data for selected range"),
            Presentation::Ready => write!(f, "ready"),
            Presentation::Failed => write!(f, "failed"),
        }
    }
}

/// Chart state: last good content plus loading and error flags.
///
/// A failure never clears content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState<T> {
    content: Option<Normalized<T>>,
    loading: bool,
    last_error: Option<String>,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            content: None,
            loading: false,
            last_error: None,
        }
    }
}

impl<T> ViewState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_loading(&mut self) {
        self.loading = true;
    }

    /// Swap in a fresh result
    pub fn apply(&mut self, result: Normalized<T>) {
        self.content = Some(result);
        self.loading = false;
        self.last_error = None;
    }

    /// Record a failure, keeping the last good content
    pub fn fail(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.last_error = Some(message.into());
    }

    pub fn presentation(&self) -> Presentation {
        if self.loading {
            return Presentation::Loading;
        }
        match (&self.content, &self.last_error) {
            (Some(Normalized::Data(_)), _) => Presentation::Ready,
            (Some(Normalized::NoData), _) => Presentation::NoData,
            (None, Some(_)) => Presentation::Failed,
            (None, None) => Presentation::Idle,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn data(&self) -> Option<&T> {
        self.content.as_ref().and_then(Normalized::as_data)
    }

    pub fn content(&self) -> Option<&Normalized<T>> {
        self.content.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
