// src/channel.rs
// Push-to-pull async sequence with one-level flattening of nested channels
//
// Two phases: the emitter fills an append-only buffer through a Sender, then
// the consumer stream replays it once the emitter has completed. Emitters run
// as tokio tasks, so a channel produces independently of how fast (or
// whether) anyone pulls from it.

use async_stream::stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::trace;

use crate::error::{InertionError, Result};

/// A buffered entry: a plain value or a nested channel to drain in place
pub enum Item<T> {
    Value(T),
    Nested(Channel<T>),
}

struct Shared<T> {
    items: Vec<Item<T>>,
    sealed: bool,
}

fn lock<T>(shared: &Mutex<Shared<T>>) -> MutexGuard<'_, Shared<T>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Push side of a channel, handed to the emitter
pub struct Sender<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Sender<T> {
    /// Buffer a value; fails with `LateValue` once the emitter has completed
    pub fn push(&self, value: T) -> Result<()> {
        self.accept(Item::Value(value))
    }

    /// Buffer a nested channel, flattened into this one on consumption
    pub fn push_nested(&self, channel: Channel<T>) -> Result<()> {
        self.accept(Item::Nested(channel))
    }

    pub fn is_sealed(&self) -> bool {
        lock(&self.shared).sealed
    }

    fn accept(&self, item: Item<T>) -> Result<()> {
        let mut shared = lock(&self.shared);
        if shared.sealed {
            return Err(InertionError::LateValue);
        }
        shared.items.push(item);
        Ok(())
    }
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

// Seals the buffer when the emitter task ends, including by panic
struct SealOnDrop<T>(Arc<Mutex<Shared<T>>>);

impl<T> Drop for SealOnDrop<T> {
    fn drop(&mut self) {
        lock(&self.0).sealed = true;
        trace!("channel sealed");
    }
}

/// Lazily consumed, self-flattening sequence fed by an emitter
///
/// Must be created inside a tokio runtime.
pub struct Channel<T> {
    shared: Arc<Mutex<Shared<T>>>,
    done: JoinHandle<()>,
}

impl<T: Send + 'static> Channel<T> {
    /// Invoke `emitter` once with a Sender and start its future right away
    ///
    /// The channel seals as soon as that future completes; later pushes fail.
    pub fn new<F, Fut>(emitter: F) -> Self
    where
        F: FnOnce(Sender<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let shared = Arc::new(Mutex::new(Shared {
            items: Vec::new(),
            sealed: false,
        }));

        let emission = emitter(Sender {
            shared: shared.clone(),
        });
        let seal = SealOnDrop(shared.clone());

        let done = tokio::spawn(async move {
            let _seal = seal;
            emission.await;
        });

        Self { shared, done }
    }

    /// Consume the channel as a stream
    ///
    /// The first pull waits for the emitter to complete, then buffered items
    /// are replayed in push order, draining each nested channel before moving
    /// on. A panic in the emitter is resumed here.
    pub fn into_stream(self) -> BoxStream<'static, T> {
        let Channel { shared, done } = self;

        Box::pin(stream! {
            if let Err(err) = done.await {
                if err.is_panic() {
                    std::panic::resume_unwind(err.into_panic());
                }
            }

            let items = std::mem::take(&mut lock(&shared).items);
            for item in items {
                match item {
                    Item::Value(value) => yield value,
                    Item::Nested(nested) => {
                        let mut inner = nested.into_stream();
                        while let Some(value) = inner.next().await {
                            yield value;
                        }
                    }
                }
            }
        })
    }

    /// Drain the whole channel
    pub async fn collect(self) -> Vec<T> {
        self.into_stream().collect().await
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = lock(&self.shared);
        f.debug_struct("Channel")
            .field("buffered", &shared.items.len())
            .field("sealed", &shared.sealed)
            .finish()
    }
}
