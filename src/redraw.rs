//! The mesh redraw loop as an explicit, cancellable repeating task.
//!
//! Each tick asks the host for one more frame and then returns, so the event loop keeps
//! control between frames. Cancelling (or dropping the loop) stops further requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared stop flag. Cloning it does not keep the loop alive.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Default)]
pub struct RedrawLoop {
    token: CancelToken,
}

impl RedrawLoop {
    pub fn start() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Request the next frame unless cancelled. Returns whether a frame was requested.
    pub fn tick(&self, ctx: &egui::Context) -> bool {
        if !self.is_running() {
            return false;
        }
        ctx.request_repaint();
        true
    }
}

impl Drop for RedrawLoop {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
