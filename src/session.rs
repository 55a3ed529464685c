use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::fetch::{FetchError, ListingSource};
use crate::store::{Effect, StoreEvent, StoreState};

/// Runs the store against a listing source.
///
/// Events are applied one at a time on the caller's task. Fetches run as
/// tokio tasks and report back through a channel as `FetchCompleted` events,
/// which the caller feeds in with [`Session::pump`] or
/// [`Session::recv`] + [`Session::dispatch`]. Dropping the session aborts
/// any fetch still running.
pub struct Session {
    state: StoreState,
    source: Arc<dyn ListingSource>,
    tx: UnboundedSender<StoreEvent>,
    rx: UnboundedReceiver<StoreEvent>,
    tasks: HashMap<u64, JoinHandle<()>>,
}

impl Session {
    pub fn new(source: Arc<dyn ListingSource>, state: StoreState) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            state,
            source,
            tx,
            rx,
            tasks: HashMap::new(),
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn dispatch(&mut self, event: StoreEvent) {
        if let StoreEvent::FetchCompleted { request_id, .. } = &event {
            self.tasks.remove(request_id);
        }

        let state = std::mem::take(&mut self.state);
        let (next, effects) = state.handle(event);
        self.state = next;

        for effect in effects {
            self.run(effect);
        }
    }

    fn run(&mut self, effect: Effect) {
        match effect {
            Effect::Fetch { request_id, page, request } => {
                let source = Arc::clone(&self.source);
                let tx = self.tx.clone();
                let handle = tokio::spawn(async move {
                    let result = source.fetch_page(request).await;
                    // receiver only goes away with the session
                    let _ = tx.send(StoreEvent::FetchCompleted { request_id, page, result });
                });
                self.tasks.insert(request_id, handle);
            }
            Effect::CancelFetches => self.abort_all(),
        }
    }

    fn abort_all(&mut self) {
        for (request_id, handle) in self.tasks.drain() {
            debug!(request_id, "aborting listing fetch");
            handle.abort();
        }
    }

    /// Waits for the next fetch completion.
    pub async fn recv(&mut self) -> Option<StoreEvent> {
        self.rx.recv().await
    }

    /// Waits for one fetch completion and applies it.
    pub async fn pump(&mut self) {
        if let Some(event) = self.recv().await {
            self.dispatch(event);
        }
    }

    /// Loads up to `pages` more pages, stopping early when the listings run
    /// out or the session is torn down. A failed fetch is returned to the
    /// caller.
    pub async fn load_pages(&mut self, pages: u32) -> Result<u32, FetchError> {
        let target = self.state.pagination().pages_loaded().saturating_add(pages);
        while self.state.pagination().pages_loaded() < target && !self.state.pagination().exhausted {
            if self.state.is_closed() {
                break;
            }
            if !self.state.is_loading() {
                self.dispatch(StoreEvent::AdvancePage);
            }
            // nothing was started, so there is no completion to wait for
            if !self.state.is_loading() {
                break;
            }
            self.pump().await;
            if let Some(err) = self.state.last_error() {
                return Err(err.clone());
            }
        }
        Ok(self.state.pagination().pages_loaded())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.abort_all();
    }
}
