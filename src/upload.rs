use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::configuration::{CompositorConfiguration, UploadConfiguration};
use crate::error::{ContextError, ErrorKind};

/// How persistence calls are retried on transient transport failures: at most `max_attempts`
/// calls, sleeping `base_delay * 2^attempt` after the failed attempt number `attempt` (from zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&UploadConfiguration::default())
    }
}

impl From<&UploadConfiguration> for RetryPolicy {
    fn from(configuration: &UploadConfiguration) -> Self {
        Self {
            max_attempts: configuration.max_attempts.max(1),
            base_delay: Duration::from_millis(configuration.base_delay_milliseconds),
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Runs the operation until it succeeds, fails with an error which is not a transient
    /// transport failure, or runs out of attempts. The last error is returned as it is.
    pub fn run<T, F>(&self, description: &str, mut operation: F) -> Result<T, ContextError>
    where
        F: FnMut() -> Result<T, ContextError>,
    {
        let mut attempt = 0;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient_transport() && attempt + 1 < self.max_attempts => {
                    let delay = self.delay_after(attempt);
                    log::warn!(
                        "Attempt {} of {} to {} failed, retrying in {:?}: {}",
                        attempt + 1,
                        self.max_attempts,
                        description,
                        delay,
                        error
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Where the rendered artifacts are persisted.
pub trait ArtifactStore: Sync {
    /// Stores the bytes under the given key and returns the URL they can be retrieved from.
    fn put(&self, key: &str, content_type: &str, bytes: &[u8]) -> Result<String, ContextError>;
}

/// Stores artifacts with HTTP `PUT` requests below a base URL.
pub struct HttpArtifactStore {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpArtifactStore {
    pub fn new<S: Into<String>>(base_url: S, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.into(),
        }
    }

    /// The store at `storeBaseUrl`, if the configuration names one.
    pub fn from_configuration(configuration: &CompositorConfiguration) -> Option<Self> {
        configuration
            .store_base_url
            .as_ref()
            .map(|base_url| Self::new(base_url.as_str(), configuration.upload_timeout()))
    }
}

impl ArtifactStore for HttpArtifactStore {
    fn put(&self, key: &str, content_type: &str, bytes: &[u8]) -> Result<String, ContextError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), key);
        self.agent
            .put(&url)
            .set("Content-Type", content_type)
            .send_bytes(bytes)
            .map_err(|error| transport_error(&format!("Failed to upload {:?}", key), error))?;

        Ok(url)
    }
}

/// Turns an HTTP client error into a `ContextError`, keeping the code of the underlying socket
/// error so that transient failures can be recognized.
fn transport_error(context: &str, error: ureq::Error) -> ContextError {
    let code = match &error {
        ureq::Error::Transport(transport) => std::error::Error::source(transport)
            .and_then(|source| source.downcast_ref::<io::Error>())
            .and_then(|io_error| io_error_code(io_error.kind())),
        ureq::Error::Status(..) => None,
    };

    let context_error = ContextError::with_error(context, &error).kind(ErrorKind::Transport);
    match code {
        Some(code) => context_error.with_code(code),
        None => context_error,
    }
}

fn io_error_code(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::ConnectionReset => Some("ECONNRESET"),
        io::ErrorKind::BrokenPipe => Some("EPIPE"),
        io::ErrorKind::ConnectionAborted => Some("ECONNABORTED"),
        _ => None,
    }
}

/// Where the artifacts of a book ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredArtifacts {
    pub cover_url: String,
    pub interior_url: String,
}

/// Uploads the cover and the interior concurrently, each with its own retries. Both uploads always
/// run to completion; the book is stored only if both succeeded, a partial upload is a failure which
/// calls for a new render.
pub fn upload_both(
    store: &dyn ArtifactStore,
    policy: &RetryPolicy,
    book_key: &str,
    cover: &[u8],
    interior: &[u8],
) -> Result<StoredArtifacts, ContextError> {
    let cover_key = format!("{book_key}/cover.pdf");
    let interior_key = format!("{book_key}/interior.pdf");
    let upload = |key: &str, bytes: &[u8]| {
        policy.run(&format!("upload {key}"), || store.put(key, "application/pdf", bytes))
    };

    let (cover_url, interior_url) = rayon::join(
        || upload(&cover_key, cover),
        || upload(&interior_key, interior),
    );

    match (cover_url, interior_url) {
        (Ok(cover_url), Ok(interior_url)) => Ok(StoredArtifacts {
            cover_url,
            interior_url,
        }),
        (Err(error), Ok(_)) | (Ok(_), Err(error)) => {
            log::warn!("Only one of the two artifacts of {} was stored", book_key);
            Err(error)
        }
        (Err(cover_error), Err(interior_error)) => {
            log::warn!("Failed to store the interior of {}: {}", book_key, interior_error);
            Err(cover_error)
        }
    }
}
