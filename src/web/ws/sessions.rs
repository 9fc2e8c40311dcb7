//! Tracking of live WebSocket sessions.
//!
//! Every upgraded socket holds a [`SessionPermit`] until its pumps finish.
//! Shutdown waits on [`SessionDrain`] so outbound pumps get to flush the
//! final notice and close frame before the runtime goes away.

use std::time::Duration;

use tokio::sync::mpsc;

/// Hands out permits for new sessions.
///
/// Holds only a weak handle, so a tracker kept alive by a running router
/// never delays the drain.
#[derive(Clone)]
pub struct SessionTracker {
    sender: mpsc::WeakSender<()>,
}

/// Held by a session for as long as it runs.
pub struct SessionPermit {
    _sender: Option<mpsc::Sender<()>>,
}

/// Resolves once every permit is gone.
pub struct SessionDrain {
    sender: mpsc::Sender<()>,
    receiver: mpsc::Receiver<()>,
}

impl SessionTracker {
    /// Create a tracker and the drain that waits on it.
    pub fn new() -> (Self, SessionDrain) {
        let (sender, receiver) = mpsc::channel(1);
        let tracker = Self {
            sender: sender.downgrade(),
        };
        (tracker, SessionDrain { sender, receiver })
    }

    /// Register a new session.
    ///
    /// Sessions that start after the drain completed are not tracked.
    pub fn permit(&self) -> SessionPermit {
        SessionPermit {
            _sender: self.sender.upgrade(),
        }
    }
}

impl SessionDrain {
    /// Wait until every session has ended, at most `limit`.
    ///
    /// Returns false if sessions were still running when the limit passed.
    /// Nothing is ever sent on the channel; it only closes.
    pub async fn wait(self, limit: Duration) -> bool {
        let Self {
            sender,
            mut receiver,
        } = self;
        drop(sender);

        tokio::time::timeout(limit, receiver.recv()).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_with_no_sessions() {
        let (_tracker, drain) = SessionTracker::new();
        assert!(drain.wait(Duration::from_millis(100)).await);
    }

    #[tokio::test]
    async fn test_drain_waits_for_permits() {
        let (tracker, drain) = SessionTracker::new();
        let permit = tracker.permit();

        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(permit);
        });

        assert!(drain.wait(Duration::from_secs(2)).await);
        release.await.unwrap();
    }

    #[tokio::test]
    async fn test_drain_times_out_while_session_runs() {
        let (tracker, drain) = SessionTracker::new();
        let _permit = tracker.permit();

        assert!(!drain.wait(Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn test_permit_after_drain_is_untracked() {
        let (tracker, drain) = SessionTracker::new();
        assert!(drain.wait(Duration::from_millis(50)).await);

        let permit = tracker.permit();
        assert!(permit._sender.is_none());
    }
}
