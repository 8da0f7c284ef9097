//! Rendering-session abstraction
//!
//! The Navigator, the package crawl and the heavy detail fetch all talk to a
//! [`ListSession`]. Sessions are produced by a [`SessionFactory`] and held in a
//! [`SessionSlot`], which owns the acquire/recreate/release lifecycle so no
//! caller keeps a handle across a recreation.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Faults raised by a rendering session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Network fault: {0}")]
    Network(String),

    #[error("Browser driver fault: {0}")]
    Driver(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Browser session is closed")]
    Closed,
}

impl SessionError {
    /// Whether tearing the session down and launching a new one may help
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SessionError::Network(_) | SessionError::Driver(_) | SessionError::Closed
        )
    }
}

/// One live browsing session
///
/// Readiness waits inside `open` and `trigger_search` are bounded and their
/// timeouts are not errors; every other method fails only on a real fault.
#[async_trait]
pub trait ListSession: Send {
    /// Navigates to `url` and waits (bounded) for the document body
    async fn open(&mut self, url: &str) -> Result<(), SessionError>;

    /// Clicks the search control and waits (bounded) for a results marker
    ///
    /// Returns `false` when no search control was found.
    async fn trigger_search(&mut self) -> Result<bool, SessionError>;

    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError>;

    /// Current `document.body.scrollHeight`
    async fn document_height(&mut self) -> Result<u64, SessionError>;

    /// Number of elements matching a CSS selector
    async fn count_matches(&mut self, selector: &str) -> Result<usize, SessionError>;

    /// Serialized markup of the current document
    async fn snapshot(&mut self) -> Result<String, SessionError>;

    /// Clicks the first visible, enabled element matching `selector`
    async fn click(&mut self, selector: &str) -> Result<bool, SessionError>;

    /// Page number shown on the active pagination item
    async fn active_page_number(&mut self) -> Result<Option<u32>, SessionError>;

    /// Clicks the pagination link labelled `number`
    async fn click_page_number(&mut self, number: u32) -> Result<bool, SessionError>;

    /// Active page number once a pagination click has landed
    ///
    /// Returns as soon as the number differs from `from`, or whatever is
    /// showing when the wait gives up.
    async fn wait_for_page_change(&mut self, _from: u32) -> Result<Option<u32>, SessionError> {
        self.active_page_number().await
    }

    async fn refresh(&mut self) -> Result<(), SessionError>;

    /// Tears the session down; errors are swallowed
    async fn close(&mut self);
}

/// Launches fresh sessions
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: ListSession;

    async fn launch(&self) -> Result<Self::Session, SessionError>;
}

/// Owner of at most one live session
pub struct SessionSlot<F: SessionFactory> {
    factory: F,
    session: Option<F::Session>,
    launches: u32,
}

impl<F: SessionFactory> SessionSlot<F> {
    /// Creates an empty slot; nothing is launched until `acquire`
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            session: None,
            launches: 0,
        }
    }

    pub fn is_live(&self) -> bool {
        self.session.is_some()
    }

    /// Sessions launched over the slot's lifetime
    pub fn launches(&self) -> u32 {
        self.launches
    }

    /// The live session, launching one if the slot is empty
    pub async fn acquire(&mut self) -> Result<&mut F::Session, SessionError> {
        if self.session.is_none() {
            let session = self.factory.launch().await?;
            self.launches += 1;
            debug!("Launched rendering session #{}", self.launches);
            self.session = Some(session);
        }
        self.session.as_mut().ok_or(SessionError::Closed)
    }

    /// Closes the current session (if any) and launches a new one
    pub async fn recreate(&mut self) -> Result<&mut F::Session, SessionError> {
        info!("Recreating rendering session");
        self.release().await;
        self.acquire().await
    }

    /// Closes the current session, leaving the slot empty
    pub async fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
            debug!("Released rendering session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct NullSession {
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ListSession for NullSession {
        async fn open(&mut self, _url: &str) -> Result<(), SessionError> {
            Ok(())
        }
        async fn trigger_search(&mut self) -> Result<bool, SessionError> {
            Ok(true)
        }
        async fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
            Ok(())
        }
        async fn document_height(&mut self) -> Result<u64, SessionError> {
            Ok(0)
        }
        async fn count_matches(&mut self, _selector: &str) -> Result<usize, SessionError> {
            Ok(0)
        }
        async fn snapshot(&mut self) -> Result<String, SessionError> {
            Ok(String::new())
        }
        async fn click(&mut self, _selector: &str) -> Result<bool, SessionError> {
            Ok(false)
        }
        async fn active_page_number(&mut self) -> Result<Option<u32>, SessionError> {
            Ok(None)
        }
        async fn click_page_number(&mut self, _number: u32) -> Result<bool, SessionError> {
            Ok(false)
        }
        async fn refresh(&mut self) -> Result<(), SessionError> {
            Ok(())
        }
        async fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct NullFactory {
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SessionFactory for NullFactory {
        type Session = NullSession;

        async fn launch(&self) -> Result<NullSession, SessionError> {
            Ok(NullSession {
                closed: Arc::clone(&self.closed),
            })
        }
    }

    #[test]
    fn test_recoverable_faults() {
        assert!(SessionError::Network("reset".into()).is_recoverable());
        assert!(SessionError::Driver("crash".into()).is_recoverable());
        assert!(SessionError::Closed.is_recoverable());
        assert!(!SessionError::Launch("no chrome".into()).is_recoverable());
        assert!(!SessionError::Timeout(Duration::from_secs(1)).is_recoverable());
    }

    #[tokio::test]
    async fn test_slot_lifecycle() {
        let closed = Arc::new(AtomicUsize::new(0));
        let mut slot = SessionSlot::new(NullFactory {
            closed: Arc::clone(&closed),
        });

        assert!(!slot.is_live());
        slot.acquire().await.unwrap();
        slot.acquire().await.unwrap();
        assert_eq!(slot.launches(), 1);

        slot.recreate().await.unwrap();
        assert_eq!(slot.launches(), 2);
        assert_eq!(closed.load(Ordering::SeqCst), 1);

        slot.release().await;
        assert!(!slot.is_live());
        assert_eq!(closed.load(Ordering::SeqCst), 2);

        slot.release().await;
        assert_eq!(closed.load(Ordering::SeqCst), 2);
    }
}
