//! Platform classification shared by detection, adapters, and the binding.

use serde::{Deserialize, Serialize};

/// Host platform the widget is running against.
///
/// Detection may only produce [`Platform::OpenAi`] or a provisional
/// [`Platform::Unknown`]; [`Platform::Mcp`] is confirmed exclusively by a
/// successful connection handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Chat-platform host exposing the synchronous global client object.
    OpenAi,
    /// Apps-protocol host reached through an asynchronous handshake.
    Mcp,
    /// Not yet classified: either pending a handshake or not embedded at all.
    Unknown,
}

impl Platform {
    /// Returns a stable string token for diagnostics and consumer branching.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Mcp => "mcp",
            Self::Unknown => "unknown",
        }
    }
}

/// Derives the platform exposed to consumers from the raw detection result
/// and the handshake outcome.
///
/// The first host stays authoritative; otherwise the platform is `Mcp` if and
/// only if the handshake succeeded. Callers must treat `Unknown` as
/// pending-or-failed, not as a third stable platform.
pub fn effective_platform(detected: Platform, mcp_connected: bool) -> Platform {
    match detected {
        Platform::OpenAi => Platform::OpenAi,
        Platform::Mcp | Platform::Unknown if mcp_connected => Platform::Mcp,
        Platform::Mcp | Platform::Unknown => Platform::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_tokens_are_stable() {
        assert_eq!(Platform::OpenAi.as_str(), "openai");
        assert_eq!(Platform::Mcp.as_str(), "mcp");
        assert_eq!(Platform::Unknown.as_str(), "unknown");
    }

    #[test]
    fn openai_detection_is_authoritative() {
        assert_eq!(
            effective_platform(Platform::OpenAi, false),
            Platform::OpenAi
        );
        assert_eq!(effective_platform(Platform::OpenAi, true), Platform::OpenAi);
    }

    #[test]
    fn mcp_requires_a_confirmed_handshake() {
        assert_eq!(effective_platform(Platform::Unknown, true), Platform::Mcp);
        assert_eq!(
            effective_platform(Platform::Unknown, false),
            Platform::Unknown
        );
    }
}
