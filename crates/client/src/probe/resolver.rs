//! First-wins single resolution.
//!
//! Several event sources (connect, error, timer) may race to report an
//! outcome. The first call to [`Resolver::resolve`] delivers its value; every
//! later call is discarded.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

/// Cloneable handle that resolves a paired receiver at most once.
#[derive(Debug)]
pub struct Resolver<T> {
    sender: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self { sender: Arc::clone(&self.sender) }
    }
}

impl<T> Resolver<T> {
    /// Create a resolver and the receiver it resolves.
    pub fn new() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (Self { sender: Arc::new(Mutex::new(Some(tx))) }, rx)
    }

    /// Deliver `value` if nothing has been delivered yet.
    ///
    /// Returns true only for the call that won.
    pub fn resolve(&self, value: T) -> bool {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner).take();
        match sender {
            // A dropped receiver still consumes the single resolution.
            Some(tx) => {
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }
}
