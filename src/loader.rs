//! Fetches a payload for an id and hands the outcome to the frame loop.
//!
//! The fetch runs on the host executor. Its result lands in a shared [`LoadSlot`] that the
//! frame loop drains once per frame. Only the newest load counts: every call takes a ticket, and
//! results or cleanups carrying an older ticket are dropped.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::PreviewError;
use crate::payload::PreviewPayload;
use crate::source::PayloadSource;

/// A finished load, ready for the presenter.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub id: String,
    pub ticket: u64,
    pub result: Result<PreviewPayload, PreviewError>,
}

#[derive(Debug, Default)]
struct SlotState {
    current: u64,
    loading: bool,
    outcome: Option<LoadOutcome>,
}

/// State shared between the frame loop and in-flight fetches.
#[derive(Debug, Clone, Default)]
pub struct LoadSlot(Arc<Mutex<SlotState>>);

impl LoadSlot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new load, superseding any in flight.
    fn begin(&self) -> u64 {
        let mut state = self.lock();
        state.current += 1;
        state.loading = true;
        state.outcome = None;
        state.current
    }

    fn finish(&self, outcome: LoadOutcome) {
        let mut state = self.lock();
        if outcome.ticket == state.current {
            state.outcome = Some(outcome);
        } else {
            log::warn!(
                "discarding result for {} (load {} superseded by {})",
                outcome.id,
                outcome.ticket,
                state.current
            );
        }
    }

    fn end(&self, ticket: u64) {
        let mut state = self.lock();
        if ticket == state.current {
            state.loading = false;
        }
    }

    /// Whether the loading indicator should be visible.
    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Take the finished outcome, if any.
    pub fn take(&self) -> Option<LoadOutcome> {
        self.lock().outcome.take()
    }
}

/// Hides the loading indicator when dropped, whichever way the load ends.
struct LoadingGuard {
    slot: LoadSlot,
    ticket: u64,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.slot.end(self.ticket);
    }
}

pub struct Loader {
    source: Arc<dyn PayloadSource>,
    slot: LoadSlot,
}

impl Loader {
    pub fn new(source: Arc<dyn PayloadSource>) -> Self {
        Self { source, slot: LoadSlot::default() }
    }

    pub fn slot(&self) -> &LoadSlot {
        &self.slot
    }

    pub fn is_loading(&self) -> bool {
        self.slot.is_loading()
    }

    /// Build the load task for `id` without spawning it.
    ///
    /// The loading indicator turns on immediately and turns off when the task completes or is
    /// dropped.
    pub fn task(&self, id: &str) -> impl Future<Output = ()> + use<> {
        let ticket = self.slot.begin();
        let guard = LoadingGuard { slot: self.slot.clone(), ticket };
        let fetch = self.source.fetch(id);
        let id = id.to_owned();
        log::debug!("loading model {id} (load {ticket})");
        async move {
            let guard = guard;
            let result = fetch.await;
            match &result {
                Ok(payload) => log::info!("model data received for {id}: {:?}", payload.kind()),
                Err(e) => log::error!("error loading model {id}: {e}"),
            }
            guard.slot.finish(LoadOutcome { id, ticket, result });
        }
    }

    /// Fetch `id` in the background.
    pub fn load(&self, id: &str) {
        execute(self.task(id));
    }
}

/// Last non-empty path segment of a page URL, e.g. the order id of `/visualization/42`.
pub fn model_id_from_location(href: &str) -> Option<String> {
    let href = href.split(['#', '?']).next().unwrap_or_default();
    let path = match href.find("://") {
        Some(i) => {
            let rest = &href[i + 3..];
            rest.find('/').map_or("", |j| &rest[j..])
        }
        None => href,
    };
    path.split('/')
        .rev()
        .find(|segment| !segment.trim().is_empty())
        .map(str::to_owned)
}

// Executes an async future without blocking the egui thread
#[cfg(not(target_arch = "wasm32"))]
fn execute<F: Future<Output = ()> + Send + 'static>(f: F) {
    std::thread::spawn(move || futures::executor::block_on(f));
}
#[cfg(target_arch = "wasm32")]
fn execute<F: Future<Output = ()> + 'static>(f: F) {
    wasm_bindgen_futures::spawn_local(f);
}
