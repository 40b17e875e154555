//! Browser sessions and the per-crawl session pool
//!
//! A session is an isolated browsing context (its own cookies and
//! connections). Sessions are supplied by a [`SessionFactory`]; the crawl
//! core only needs to create them, navigate, read the loaded page, and close
//! them again.

use crate::config::SessionConfig;
use async_trait::async_trait;
use std::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised by a browser session
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Navigation to {url} timed out")]
    Timeout { url: String },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("No page has been loaded in this session")]
    NoPage,

    #[error("Failed to create session: {0}")]
    Launch(String),
}

impl SessionError {
    /// Timeouts are worth another attempt, everything else is not
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Declarative options applied to every session before use
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub user_agent: String,
    /// Abort every request except the top-level document
    pub block_subresources: bool,
    pub javascript_enabled: bool,
    pub page_load_timeout: Duration,
}

impl SessionOptions {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            block_subresources: config.block_subresources,
            javascript_enabled: config.javascript_enabled,
            page_load_timeout: config.page_load_timeout(),
        }
    }
}

/// An isolated browsing context
///
/// Navigation methods return the HTTP status of the top-level document.
#[async_trait]
pub trait Session: Send + Sync {
    /// Navigates to `url`
    async fn goto(&self, url: &Url) -> Result<u16, SessionError>;

    /// Loads the current URL again
    async fn reload(&self) -> Result<u16, SessionError>;

    /// HTML of the currently loaded document
    async fn content(&self) -> Result<String, SessionError>;

    /// Releases the underlying browser resources
    async fn close(&self) {}
}

/// Creates isolated sessions
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn new_session(&self, options: &SessionOptions)
        -> Result<Box<dyn Session>, SessionError>;
}

/// Fixed-size stack of sessions lent to concurrent branch fetches
///
/// A lent session is returned to the pool when its [`PooledSession`] guard
/// is dropped, whatever the outcome of the fetch.
pub struct SessionPool {
    idle: Mutex<Vec<Box<dyn Session>>>,
    size: usize,
}

impl SessionPool {
    /// Creates `size` sessions up front
    ///
    /// Sessions that fail to launch are logged and left out, so the pool may
    /// be smaller than requested. Fails only when no session could be created.
    pub async fn launch(
        factory: &dyn SessionFactory,
        options: &SessionOptions,
        size: usize,
    ) -> Result<Self, SessionError> {
        let mut idle = Vec::with_capacity(size);
        let mut last_error = None;

        for _ in 0..size {
            match factory.new_session(options).await {
                Ok(session) => idle.push(session),
                Err(e) => {
                    tracing::warn!("Failed to create browser session: {}", e);
                    last_error = Some(e);
                }
            }
        }

        if idle.is_empty() {
            return Err(last_error
                .unwrap_or_else(|| SessionError::Launch("session pool size is zero".to_string())));
        }

        tracing::debug!("Session pool ready with {}/{} sessions", idle.len(), size);
        let size = idle.len();

        Ok(Self {
            idle: Mutex::new(idle),
            size,
        })
    }

    /// Builds a pool from existing sessions
    pub fn from_sessions(sessions: Vec<Box<dyn Session>>) -> Self {
        Self {
            size: sessions.len(),
            idle: Mutex::new(sessions),
        }
    }

    /// Takes a session off the stack, or `None` when every session is lent out
    pub fn try_acquire(self: &Arc<Self>) -> Option<PooledSession> {
        let session = self.lock_idle().pop()?;
        Some(PooledSession {
            session,
            pool: Arc::clone(self),
        })
    }

    /// Number of sessions owned by the pool
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of sessions currently not lent out
    pub fn available(&self) -> usize {
        self.lock_idle().len()
    }

    /// Closes every idle session
    pub async fn close(&self) {
        let sessions = std::mem::take(&mut *self.lock_idle());
        for session in sessions {
            session.close().await;
        }
    }

    fn release(&self, session: Box<dyn Session>) {
        self.lock_idle().push(session);
    }

    fn lock_idle(&self) -> std::sync::MutexGuard<'_, Vec<Box<dyn Session>>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A session on loan from a [`SessionPool`]
pub struct PooledSession {
    session: Box<dyn Session>,
    pool: Arc<SessionPool>,
}

impl Deref for PooledSession {
    type Target = dyn Session;

    fn deref(&self) -> &Self::Target {
        &*self.session
    }
}

impl Drop for PooledSession {
    fn drop(&mut self) {
        let session = std::mem::replace(&mut self.session, Box::new(Released));
        self.pool.release(session);
    }
}

/// Stands in for a session that went back to its pool
struct Released;

#[async_trait]
impl Session for Released {
    async fn goto(&self, _url: &Url) -> Result<u16, SessionError> {
        Err(SessionError::NoPage)
    }

    async fn reload(&self) -> Result<u16, SessionError> {
        Err(SessionError::NoPage)
    }

    async fn content(&self) -> Result<String, SessionError> {
        Err(SessionError::NoPage)
    }
}
