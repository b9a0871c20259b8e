//! Live session bookkeeping.
//!
//! The game loop never writes to a socket. It pushes pre-encoded frames into a
//! bounded per-session queue with `try_send`; the transport drains the queue.
//! A slow or dead peer therefore loses frames instead of stalling the tick.

use arena_shared::protocol::PlayerId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

/// What the transport should do next for a session
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(Arc<str>),
    /// All queued frames have been delivered; close the connection.
    Close,
}

#[derive(Debug, Default)]
struct CloseSignal {
    requested: AtomicBool,
    notify: Notify,
}

/// Sending half of a session, held by the registry.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    frames: mpsc::Sender<Arc<str>>,
    close: Arc<CloseSignal>,
}

/// Receiving half of a session, held by the transport.
#[derive(Debug)]
pub struct SessionOutbox {
    frames: mpsc::Receiver<Arc<str>>,
    close: Arc<CloseSignal>,
    finished: bool,
}

impl SessionHandle {
    pub fn channel(capacity: usize) -> (SessionHandle, SessionOutbox) {
        let (tx, rx) = mpsc::channel(capacity);
        let close = Arc::new(CloseSignal::default());
        (
            SessionHandle {
                frames: tx,
                close: close.clone(),
            },
            SessionOutbox {
                frames: rx,
                close,
                finished: false,
            },
        )
    }

    /// Queue a frame without waiting. Returns false if it was dropped.
    pub fn send_text(&self, text: Arc<str>) -> bool {
        match self.frames.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("session queue full, dropping frame");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Ask the transport to close after the frames already queued.
    pub fn close(&self) {
        self.close.requested.store(true, Ordering::Release);
        self.close.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.frames.is_closed()
    }
}

impl SessionOutbox {
    /// Next queued item without waiting.
    pub fn try_next(&mut self) -> Option<Outbound> {
        if self.finished {
            return None;
        }
        if let Ok(text) = self.frames.try_recv() {
            return Some(Outbound::Text(text));
        }
        if self.close.requested.load(Ordering::Acquire) {
            self.finished = true;
            return Some(Outbound::Close);
        }
        None
    }

    /// Wait for the next frame or close request. Frames queued before a close
    /// are always delivered first. `None` once the session is done.
    pub async fn next(&mut self) -> Option<Outbound> {
        loop {
            if let Some(item) = self.try_next() {
                return Some(item);
            }
            if self.finished {
                return None;
            }
            tokio::select! {
                biased;
                frame = self.frames.recv() => match frame {
                    Some(text) => return Some(Outbound::Text(text)),
                    None => {
                        self.finished = true;
                        return None;
                    }
                },
                _ = self.close.notify.notified() => {}
            }
        }
    }
}

/// Thread-safe registry of live sessions by player id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<PlayerId, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, id: PlayerId, handle: SessionHandle) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, handle);
    }

    pub fn remove(&self, id: PlayerId) -> Option<SessionHandle> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    pub fn get(&self, id: PlayerId) -> Option<SessionHandle> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn all(&self) -> Vec<(PlayerId, SessionHandle)> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, handle)| (*id, handle.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type PendingMap = Arc<Mutex<HashMap<PlayerId, JoinHandle<()>>>>;

/// Session closes scheduled after an elimination, keyed by player id.
#[derive(Default)]
pub struct DeferredCloses {
    pending: PendingMap,
}

impl DeferredCloses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close `handle` after `delay`. Closes immediately when the delay is zero
    /// or no runtime is available to wait on.
    pub fn schedule(&self, id: PlayerId, handle: SessionHandle, delay: Duration) {
        if delay.is_zero() {
            handle.close();
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            handle.close();
            return;
        };

        let pending = self.pending.clone();
        let mut map = lock(&self.pending);
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            handle.close();
            lock(&pending).remove(&id);
        });
        if let Some(previous) = map.insert(id, task) {
            previous.abort();
        }
    }

    /// Cancel a pending close. Returns true if one was pending.
    pub fn cancel(&self, id: PlayerId) -> bool {
        match lock(&self.pending).remove(&id) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, id: PlayerId) -> bool {
        lock(&self.pending).contains_key(&id)
    }
}

fn lock(pending: &PendingMap) -> std::sync::MutexGuard<'_, HashMap<PlayerId, JoinHandle<()>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Arc<str> {
        Arc::from(s)
    }

    #[test]
    fn frames_arrive_in_order_then_close() {
        let (handle, mut outbox) = SessionHandle::channel(8);
        assert!(handle.send_text(text("a")));
        assert!(handle.send_text(text("b")));
        handle.close();

        assert_eq!(outbox.try_next(), Some(Outbound::Text(text("a"))));
        assert_eq!(outbox.try_next(), Some(Outbound::Text(text("b"))));
        assert_eq!(outbox.try_next(), Some(Outbound::Close));
        assert_eq!(outbox.try_next(), None);
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let (handle, mut outbox) = SessionHandle::channel(1);
        assert!(handle.send_text(text("a")));
        assert!(!handle.send_text(text("b")));
        assert_eq!(outbox.try_next(), Some(Outbound::Text(text("a"))));
        assert_eq!(outbox.try_next(), None);
    }

    #[test]
    fn send_to_dropped_outbox_fails_quietly() {
        let (handle, outbox) = SessionHandle::channel(4);
        drop(outbox);
        assert!(handle.is_closed());
        assert!(!handle.send_text(text("a")));
    }

    #[tokio::test]
    async fn next_waits_for_close() {
        let (handle, mut outbox) = SessionHandle::channel(4);
        let closer = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            closer.send_text(Arc::from("bye"));
            closer.close();
        });
        assert_eq!(outbox.next().await, Some(Outbound::Text(text("bye"))));
        assert_eq!(outbox.next().await, Some(Outbound::Close));
        assert_eq!(outbox.next().await, None);
    }

    #[test]
    fn registry_add_get_remove() {
        let registry = SessionRegistry::new();
        let (handle, _outbox) = SessionHandle::channel(4);
        registry.add(1, handle);
        assert!(registry.get(1).is_some());
        assert_eq!(registry.all().len(), 1);
        assert!(registry.remove(1).is_some());
        assert!(registry.get(1).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn zero_delay_closes_immediately() {
        let closes = DeferredCloses::new();
        let (handle, mut outbox) = SessionHandle::channel(4);
        closes.schedule(3, handle, Duration::ZERO);
        assert!(!closes.is_pending(3));
        assert_eq!(outbox.try_next(), Some(Outbound::Close));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_close_fires_after_delay() {
        let closes = DeferredCloses::new();
        let (handle, mut outbox) = SessionHandle::channel(4);
        closes.schedule(3, handle, Duration::from_secs(3));
        assert!(closes.is_pending(3));
        assert_eq!(outbox.try_next(), None);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(outbox.try_next(), Some(Outbound::Close));
        assert!(!closes.is_pending(3));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_close_never_fires() {
        let closes = DeferredCloses::new();
        let (handle, mut outbox) = SessionHandle::channel(4);
        closes.schedule(3, handle, Duration::from_secs(3));
        assert!(closes.cancel(3));
        assert!(!closes.cancel(3));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(outbox.try_next(), None);
    }
}
