pub(crate) mod vertex;

use std::fmt;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use crate::protocol::ProviderPayload;

/// Why a single upstream attempt failed below the semantic level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection, DNS or TLS failure
    Network,
    /// The call exceeded its deadline
    Timeout,
    /// Non-2xx HTTP status
    Status(u16),
    /// 2xx response whose body is not the expected JSON shape
    Malformed,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => f.write_str("network error"),
            Self::Timeout => f.write_str("timed out"),
            Self::Status(status) => write!(f, "HTTP {status}"),
            Self::Malformed => f.write_str("malformed response"),
        }
    }
}

/// Transport-level failure of one upstream attempt
///
/// Never leaves the dispatcher: exhausted retries are folded into a failed
/// slot result.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Malformed, message)
    }

    pub const fn timed_out(&self) -> bool {
        matches!(self.kind, TransportErrorKind::Timeout)
    }

    /// Whether another attempt may succeed
    ///
    /// Every transport failure is treated as transient. Semantic refusals are
    /// not transport errors and never reach this predicate.
    pub const fn is_retryable(&self) -> bool {
        match self.kind {
            TransportErrorKind::Network
            | TransportErrorKind::Timeout
            | TransportErrorKind::Status(_)
            | TransportErrorKind::Malformed => true,
        }
    }
}

/// One attempt at one model endpoint
#[derive(Debug, Clone, Copy)]
pub struct UpstreamCall<'a> {
    /// Canonical mode tag, for logging
    pub mode: &'a str,
    pub model: &'a str,
    /// RPC method (`predict` or `generateContent`)
    pub method: &'a str,
    /// Location override for region-pinned models
    pub location: Option<&'a str>,
    pub payload: &'a ProviderPayload,
    /// Fan-out slot index
    pub slot: usize,
    /// 1-based attempt number within the slot
    pub attempt: u32,
}

/// Transport to the AI provider
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Send one call and return the parsed JSON body of a 2xx response
    async fn send(&self, call: &UpstreamCall<'_>, token: &SecretString) -> Result<serde_json::Value, TransportError>;
}
