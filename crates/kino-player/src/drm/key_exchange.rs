//! Key exchange adapter
//!
//! Wraps whatever the client uses to talk to a license service behind one
//! synchronous contract. Transport failures, including panics, come back as
//! [`DrmRequestError`]; nothing raw crosses this boundary.

use crate::error::panic_message;
use crate::types::KeySetId;
use bytes::Bytes;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// License request produced by the engine's DRM subsystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModularDrmKeyRequest {
    /// License server hinted by the content, if any
    pub url: Option<Url>,
    /// Opaque challenge bytes
    pub data: Bytes,
}

impl ModularDrmKeyRequest {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            url: None,
            data: data.into(),
        }
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }
}

/// Key exchange failure
#[derive(Debug, Error)]
#[error("DRM key request failed: {message}")]
pub struct DrmRequestError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl DrmRequestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a transport error, keeping it as the source
    pub fn from_transport(error: anyhow::Error) -> Self {
        Self {
            message: format!("{error:#}"),
            source: Some(error.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Client-supplied license transport.
///
/// May block until the license service answers; the timeout belongs to the
/// transport itself.
pub trait KeyRequestTransport: Send + Sync {
    fn exchange(&self, request: &ModularDrmKeyRequest) -> anyhow::Result<Bytes>;
}

impl<F> KeyRequestTransport for F
where
    F: Fn(&ModularDrmKeyRequest) -> anyhow::Result<Bytes> + Send + Sync,
{
    fn exchange(&self, request: &ModularDrmKeyRequest) -> anyhow::Result<Bytes> {
        self(request)
    }
}

/// Adapter variant, chosen by DRM type
#[derive(Clone)]
pub enum KeyExchange {
    /// No license round trip (no DRM, or DRM handled inside the engine)
    NotRequired,
    /// Every request goes through the client transport
    Live(Arc<dyn KeyRequestTransport>),
    /// Hands back the persisted key set id, never touches a transport
    Persisted(KeySetId),
}

impl KeyExchange {
    pub fn live(transport: Arc<dyn KeyRequestTransport>) -> Self {
        KeyExchange::Live(transport)
    }

    /// Run one key exchange
    pub fn exchange(&self, request: &ModularDrmKeyRequest) -> Result<Bytes, DrmRequestError> {
        match self {
            KeyExchange::NotRequired => Err(DrmRequestError::new(
                "no key exchange is configured for this DRM type",
            )),
            KeyExchange::Persisted(key_set_id) => {
                debug!(bytes = key_set_id.as_bytes().len(), "Restoring persisted key set");
                Ok(key_set_id.as_bytes())
            }
            KeyExchange::Live(transport) => {
                debug!(challenge_bytes = request.data.len(), "Dispatching key request");
                match panic::catch_unwind(AssertUnwindSafe(|| transport.exchange(request))) {
                    Ok(Ok(response)) => {
                        debug!(response_bytes = response.len(), "Key request completed");
                        Ok(response)
                    }
                    Ok(Err(error)) => {
                        warn!(error = %error, "Key request transport failed");
                        Err(DrmRequestError::from_transport(error))
                    }
                    Err(payload) => {
                        let message = panic_message(&*payload);
                        warn!(panic = %message, "Key request transport panicked");
                        Err(DrmRequestError::new(format!("transport panicked: {message}")))
                    }
                }
            }
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, KeyExchange::Live(_))
    }
}

impl std::fmt::Debug for KeyExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyExchange::NotRequired => write!(f, "NotRequired"),
            KeyExchange::Live(_) => write!(f, "Live(..)"),
            KeyExchange::Persisted(id) => f.debug_tuple("Persisted").field(id).finish(),
        }
    }
}
