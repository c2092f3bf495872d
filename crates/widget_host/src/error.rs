//! Typed errors crossing the adapter boundary.

/// Error produced by adapter operations and the connection handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The operation has no equivalent on the active platform. Never retried.
    Unsupported {
        /// Stable capability identifier used in diagnostics.
        capability: &'static str,
    },
    /// No host connection exists yet (detached adapter before a handshake).
    NotConnected,
    /// The underlying host method rejected or threw.
    HostCall(String),
    /// The second host's connection handshake failed.
    Handshake(String),
    /// A host payload could not be converted at the boundary.
    Serialization(String),
}

impl HostError {
    /// Creates a capability-unsupported error with a stable label.
    pub const fn unsupported(capability: &'static str) -> Self {
        Self::Unsupported { capability }
    }

    /// Creates a host-call failure from the host's error text.
    pub fn host_call(message: impl Into<String>) -> Self {
        Self::HostCall(message.into())
    }

    /// Creates a handshake failure from the rejected value's text.
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake(message.into())
    }

    /// Returns the capability label for unsupported operations.
    pub const fn capability(&self) -> Option<&'static str> {
        match self {
            Self::Unsupported { capability } => Some(capability),
            _ => None,
        }
    }
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported { capability } => {
                write!(f, "{capability} is not supported on this platform")
            }
            Self::NotConnected => write!(f, "no host connection is established"),
            Self::HostCall(message) => write!(f, "host call failed: {message}"),
            Self::Handshake(message) => write!(f, "host handshake failed: {message}"),
            Self::Serialization(message) => write!(f, "host payload conversion failed: {message}"),
        }
    }
}

impl std::error::Error for HostError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_message_is_fixed_and_labeled() {
        let err = HostError::unsupported("file-upload");
        assert_eq!(err.capability(), Some("file-upload"));
        assert_eq!(
            err.to_string(),
            "file-upload is not supported on this platform"
        );
    }

    #[test]
    fn host_call_carries_the_host_text() {
        assert_eq!(
            HostError::host_call("boom").to_string(),
            "host call failed: boom"
        );
        assert_eq!(HostError::host_call("boom").capability(), None);
    }
}
