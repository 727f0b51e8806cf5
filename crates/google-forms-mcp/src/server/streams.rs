//! Open SSE streams of the legacy HTTP+SSE transport.
//!
//! Each `GET /sse` connection subscribes to a broadcast channel keyed by its
//! session id; `POST /messages` publishes JSON-RPC responses onto it. There is
//! no replay: a message published while no client listens is dropped.
//!
//! A channel lives exactly as long as its listeners. Dropping the last
//! [`StreamSubscription`] of a session removes its entry.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::session::SessionId;

/// Buffered messages per stream before slow receivers start lagging.
const STREAM_CAPACITY: usize = 64;

type Streams = HashMap<SessionId, broadcast::Sender<String>>;

/// Registry of SSE streams keyed by session.
///
/// Every operation completes under a single lock acquisition, so a publish
/// that finds no listener can never forget a stream reopened concurrently.
#[derive(Clone, Default)]
pub struct StreamRegistry {
    streams: Arc<Mutex<Streams>>,
}

impl StreamRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Streams> {
        self.streams.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("SSE stream registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Subscribe to the stream of `session`, creating it if needed.
    #[must_use]
    pub fn open(&self, session: &SessionId) -> StreamSubscription {
        let receiver = {
            let mut streams = self.lock();
            match streams.get(session) {
                Some(tx) => tx.subscribe(),
                None => {
                    let (tx, rx) = broadcast::channel(STREAM_CAPACITY);
                    streams.insert(session.clone(), tx);
                    tracing::info!(session_id = %session, "Opened SSE stream");
                    rx
                }
            }
        };

        StreamSubscription {
            inner: Some(BroadcastStream::new(receiver)),
            session: session.clone(),
            registry: self.clone(),
        }
    }

    /// Check whether a client is listening on `session`.
    #[must_use]
    pub fn contains(&self, session: &SessionId) -> bool {
        self.lock().get(session).is_some_and(|tx| tx.receiver_count() > 0)
    }

    /// Deliver a message to every listener of `session`.
    ///
    /// Returns false and forgets the stream when nobody is listening anymore.
    pub fn publish(&self, session: &SessionId, message: String) -> bool {
        let mut streams = self.lock();
        let Some(tx) = streams.get(session) else {
            return false;
        };

        if tx.send(message).is_ok() {
            return true;
        }

        streams.remove(session);
        tracing::debug!(session_id = %session, "Dropped closed SSE stream");
        false
    }

    /// Number of streams with at least one listener.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.lock().values().filter(|tx| tx.receiver_count() > 0).count()
    }

    /// Number of registered streams, listened to or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget the stream of `session` once its last listener is gone.
    fn release(&self, session: &SessionId) {
        let mut streams = self.lock();
        if streams.get(session).is_some_and(|tx| tx.receiver_count() == 0) {
            streams.remove(session);
            tracing::info!(session_id = %session, "Closed SSE stream");
        }
    }
}

impl std::fmt::Debug for StreamRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRegistry").finish_non_exhaustive()
    }
}

/// One listener on a session's stream.
///
/// Yields published messages; a lagging listener sees
/// [`BroadcastStreamRecvError::Lagged`] and keeps going.
pub struct StreamSubscription {
    inner: Option<BroadcastStream<String>>,
    session: SessionId,
    registry: StreamRegistry,
}

impl Stream for StreamSubscription {
    type Item = Result<String, BroadcastStreamRecvError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.get_mut().inner.as_mut() {
            Some(inner) => Pin::new(inner).poll_next(cx),
            None => Poll::Ready(None),
        }
    }
}

impl Drop for StreamSubscription {
    fn drop(&mut self) {
        // The receiver must be gone before the registry counts listeners.
        drop(self.inner.take());
        self.registry.release(&self.session);
    }
}

impl std::fmt::Debug for StreamSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSubscription").field("session", &self.session).finish()
    }
}
