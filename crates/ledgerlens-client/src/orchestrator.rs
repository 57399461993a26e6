//! Fetch orchestration: last issued request wins

use std::sync::atomic::{AtomicU64, Ordering};

use ledgerlens_core::{Normalized, Presentation, ViewState};
use log::debug;
use tokio::sync::RwLock;

use crate::error::ClientResult;
use crate::notify::Notifier;

/// Monotonic generation counter.
///
/// Every fetch takes a new generation; a response may be applied only
/// while its generation is still the newest.
#[derive(Debug, Default)]
pub struct FetchGeneration {
    current: AtomicU64,
}

impl FetchGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new fetch, superseding all earlier ones
    pub fn next(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }
}

/// One chart's view state guarded by a generation counter
#[derive(Debug, Default)]
pub struct ChartSlot<T> {
    generation: FetchGeneration,
    view: RwLock<ViewState<T>>,
}

impl<T: Clone> ChartSlot<T> {
    pub fn new() -> Self {
        Self {
            generation: FetchGeneration::new(),
            view: RwLock::new(ViewState::new()),
        }
    }

    /// Mark loading and take a generation token
    pub async fn begin(&self) -> u64 {
        let mut view = self.view.write().await;
        let generation = self.generation.next();
        view.begin_loading();
        generation
    }

    /// Apply `result` if `generation` is still current.
    ///
    /// Failures go to `notifier` once and keep the last good content.
    /// Returns `None` for a discarded response.
    pub async fn finish(
        &self,
        generation: u64,
        result: ClientResult<Normalized<T>>,
        notifier: &dyn Notifier,
    ) -> Option<Presentation> {
        let mut view = self.view.write().await;
        if !self.generation.is_current(generation) {
            debug!(
                target: "ledgerlens::fetch",
                "discarding response of generation {} (current {})",
                generation,
                self.generation.current()
            );
            return None;
        }
        match result {
            Ok(normalized) => view.apply(normalized),
            Err(error) => {
                let notification = error.notification();
                notifier.notify(&notification);
                view.fail(notification.message);
            }
        }
        Some(view.presentation())
    }

    pub async fn snapshot(&self) -> ViewState<T> {
        self.view.read().await.clone()
    }

    pub async fn presentation(&self) -> Presentation {
        self.view.read().await.presentation()
    }
}
