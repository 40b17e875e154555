//! Plain HTTP implementation of a browser session
//!
//! Each session owns its own [`reqwest::Client`], so connections are never
//! shared between sessions. Only the top-level document is ever requested,
//! which matches sessions configured to block sub-resources.

use crate::crawler::session::{Session, SessionError, SessionFactory, SessionOptions};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Client;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// Builds an HTTP client for one session
///
/// # Arguments
///
/// * `options` - The session options
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(options: &SessionOptions) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(options.user_agent.clone())
        .timeout(options.page_load_timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if options.block_subresources {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/html"));
        builder = builder.default_headers(headers);
    }

    builder.build()
}

/// Creates [`HttpSession`]s
#[derive(Debug, Default, Clone)]
pub struct HttpSessionFactory;

#[async_trait]
impl SessionFactory for HttpSessionFactory {
    async fn new_session(
        &self,
        options: &SessionOptions,
    ) -> Result<Box<dyn Session>, SessionError> {
        if options.javascript_enabled {
            tracing::debug!("HTTP sessions do not execute JavaScript; option ignored");
        }
        let client =
            build_http_client(options).map_err(|e| SessionError::Launch(e.to_string()))?;
        Ok(Box::new(HttpSession::new(client)))
    }
}

/// The document currently loaded in a session
#[derive(Debug, Clone)]
struct LoadedPage {
    url: Url,
    body: String,
}

/// A session backed by a dedicated HTTP client
pub struct HttpSession {
    client: Client,
    current: Mutex<Option<LoadedPage>>,
}

impl HttpSession {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            current: Mutex::new(None),
        }
    }

    async fn load(&self, url: &Url) -> Result<u16, SessionError> {
        tracing::debug!("Requesting {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| classify_error(url, e))?;

        *self.current.lock().await = Some(LoadedPage {
            url: url.clone(),
            body,
        });

        Ok(status)
    }
}

#[async_trait]
impl Session for HttpSession {
    async fn goto(&self, url: &Url) -> Result<u16, SessionError> {
        self.load(url).await
    }

    async fn reload(&self) -> Result<u16, SessionError> {
        let url = self
            .current
            .lock()
            .await
            .as_ref()
            .map(|page| page.url.clone())
            .ok_or(SessionError::NoPage)?;
        self.load(&url).await
    }

    async fn content(&self) -> Result<String, SessionError> {
        self.current
            .lock()
            .await
            .as_ref()
            .map(|page| page.body.clone())
            .ok_or(SessionError::NoPage)
    }

    async fn close(&self) {
        *self.current.lock().await = None;
    }
}

/// Maps a reqwest error onto the session error taxonomy
fn classify_error(url: &Url, error: reqwest::Error) -> SessionError {
    if error.is_timeout() {
        SessionError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        SessionError::Navigation {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        SessionError::Navigation {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
