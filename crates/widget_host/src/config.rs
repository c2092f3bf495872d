//! Consumer-facing configuration accepted by the factory and binding.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::HostContextUpdate;
use crate::tool_result::ToolResult;

/// Widget identity reported to the second host during the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentity {
    /// Application name.
    pub name: String,
    /// Application version string.
    pub version: String,
}

impl AppIdentity {
    /// Builds an identity record.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Capability set declared to the second host during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDeclaration {
    /// Whether the widget consumes tool-result pushes.
    pub tool_results: bool,
    /// Whether the widget reacts to host-context changes.
    pub host_context: bool,
    /// Host-specific extension block forwarded verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// Severity attached to `send_log` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose diagnostics.
    Debug,
    /// Informational message.
    Info,
    /// Recoverable problem.
    Warn,
    /// Failure report.
    Error,
}

impl LogLevel {
    /// Returns the stable wire token for the level.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Optional consumer callbacks invoked on host pushes and lifecycle edges.
///
/// Each callback is best-effort: exceptions inside one are not caught by the
/// adapter layer. The error callback is additionally always logged through
/// the binding's diagnostic channel whether or not it is supplied.
#[derive(Clone, Default)]
pub struct AppCallbacks {
    /// Invoked when the host pushes new tool input.
    pub on_tool_input: Option<Rc<dyn Fn(Value)>>,
    /// Invoked when the host pushes a tool result.
    pub on_tool_result: Option<Rc<dyn Fn(ToolResult)>>,
    /// Invoked when the host context changes.
    pub on_host_context: Option<Rc<dyn Fn(HostContextUpdate)>>,
    /// Invoked once when the binding reaches its connected phase.
    pub on_connect: Option<Rc<dyn Fn()>>,
    /// Invoked when the host tears the connection down.
    pub on_teardown: Option<Rc<dyn Fn()>>,
    /// Invoked with the text of every reported host error.
    pub on_error: Option<Rc<dyn Fn(String)>>,
}

/// Full configuration accepted by the factory and the binding hook.
#[derive(Clone)]
pub struct AppConfig {
    /// Widget identity.
    pub identity: AppIdentity,
    /// Declared capability set.
    pub capabilities: CapabilityDeclaration,
    /// Consumer callbacks.
    pub callbacks: AppCallbacks,
}

impl AppConfig {
    /// Builds a configuration with default capabilities and no callbacks.
    pub fn new(identity: AppIdentity) -> Self {
        Self {
            identity,
            capabilities: CapabilityDeclaration::default(),
            callbacks: AppCallbacks::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_tokens_are_lowercase() {
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        assert_eq!(
            serde_json::to_value(LogLevel::Error).expect("serialize"),
            serde_json::json!("error")
        );
    }

    #[test]
    fn capability_declaration_serializes_without_empty_extensions() {
        let value = serde_json::to_value(CapabilityDeclaration::default()).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({"tool_results": false, "host_context": false})
        );
    }
}
