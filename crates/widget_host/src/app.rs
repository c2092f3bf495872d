//! The unified capability interface implemented by every host adapter.

use std::{future::Future, pin::Pin, rc::Rc};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::LogLevel,
    context::{DisplayMode, HostContext},
    error::HostError,
    platform::Platform,
    tool_result::ToolResult,
};

/// Object-safe boxed future used by [`UnifiedApp`] async operations.
pub type AppFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Outcome record of the swallowed-failure operations
/// (`send_message`/`open_link`): the failure is reported through the error
/// callback but surfaced to the caller as a flag instead of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOutcome {
    /// Whether the underlying host call failed.
    pub is_error: bool,
}

impl SendOutcome {
    /// Successful delivery.
    pub const fn ok() -> Self {
        Self { is_error: false }
    }

    /// Failed delivery, already reported.
    pub const fn error() -> Self {
        Self { is_error: true }
    }
}

/// Result of a completed file upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUploadResult {
    /// Host-assigned file identifier.
    pub file_id: String,
}

/// Payload for the host share sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharePayload {
    /// Share title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Share body text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Shared URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Request for an AI completion through the first host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Prompt or message payload, host-defined.
    pub input: Value,
    /// Host-specific options forwarded verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

/// Unified capability interface over both host client surfaces.
///
/// Synchronous getters are environment snapshots; async operations forward
/// one-to-one to the active host. Operations without an equivalent on the
/// active platform fail with [`HostError::Unsupported`] or no-op as the
/// platform dictates.
pub trait UnifiedApp {
    /// Platform this adapter translates to.
    fn platform(&self) -> Platform;

    /// Current host context snapshot, if the host reported one.
    fn host_context(&self) -> Option<HostContext>;

    /// Input of the tool invocation that rendered this widget.
    fn tool_input(&self) -> Option<Value>;

    /// Output of the tool invocation that rendered this widget.
    fn tool_output(&self) -> Option<Value>;

    /// Host metadata attached to the tool response.
    fn response_metadata(&self) -> Option<Value>;

    /// Persisted widget state held by the host.
    fn widget_state(&self) -> Option<Value>;

    /// Render-time props supplied by the host.
    fn widget_props(&self) -> Option<Value>;

    /// Calls a named remote tool and normalizes the result.
    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        args: Value,
    ) -> AppFuture<'a, Result<ToolResult, HostError>>;

    /// Sends a conversational follow-up message.
    ///
    /// The optional abort token is passed through uninterpreted to whichever
    /// host API consumes it; the first host ignores it. Failures are reported
    /// and flagged, never returned as `Err`.
    fn send_message<'a>(
        &'a self,
        text: &'a str,
        abort: Option<Value>,
    ) -> AppFuture<'a, Result<SendOutcome, HostError>>;

    /// Sends a log line to the host's diagnostic sink.
    fn send_log<'a>(
        &'a self,
        level: LogLevel,
        message: &'a str,
        data: Option<Value>,
    ) -> AppFuture<'a, Result<(), HostError>>;

    /// Opens an external link. Same swallowed-failure contract as
    /// [`UnifiedApp::send_message`].
    fn open_link<'a>(&'a self, url: &'a str) -> AppFuture<'a, Result<SendOutcome, HostError>>;

    /// Replaces the host-persisted widget state.
    fn set_widget_state<'a>(&'a self, state: Value) -> AppFuture<'a, Result<(), HostError>>;

    /// Shallow-merges a patch into the host-persisted widget state.
    fn update_widget_state<'a>(&'a self, patch: Value) -> AppFuture<'a, Result<(), HostError>>;

    /// Requests a presentation-surface change.
    fn request_display_mode<'a>(
        &'a self,
        mode: DisplayMode,
    ) -> AppFuture<'a, Result<(), HostError>>;

    /// Requests that the host close the widget surface.
    fn request_close<'a>(&'a self) -> AppFuture<'a, Result<(), HostError>>;

    /// Reports the widget's intrinsic content height in CSS pixels.
    fn notify_intrinsic_height<'a>(&'a self, height_px: u32)
        -> AppFuture<'a, Result<(), HostError>>;

    /// Uploads a file to the host.
    fn upload_file<'a>(
        &'a self,
        name: &'a str,
        mime: &'a str,
        bytes: Vec<u8>,
    ) -> AppFuture<'a, Result<FileUploadResult, HostError>>;

    /// Resolves a download URL for a previously uploaded file.
    fn file_download_url<'a>(
        &'a self,
        file_id: &'a str,
    ) -> AppFuture<'a, Result<String, HostError>>;

    /// Sets the "open in app" link shown by the host chrome.
    fn set_open_in_app_url<'a>(&'a self, url: &'a str) -> AppFuture<'a, Result<(), HostError>>;

    /// Opens the host share sheet.
    fn share<'a>(&'a self, payload: SharePayload) -> AppFuture<'a, Result<(), HostError>>;

    /// Invokes an AI completion and returns the host's response verbatim.
    fn call_completion<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> AppFuture<'a, Result<Value, HostError>>;

    /// Streams an AI completion, invoking `on_chunk` per streamed chunk.
    fn stream_completion<'a>(
        &'a self,
        request: CompletionRequest,
        on_chunk: Rc<dyn Fn(Value)>,
    ) -> AppFuture<'a, Result<(), HostError>>;
}

/// Null adapter returned before any host connection exists.
///
/// Getters report nothing and every host call fails with
/// [`HostError::NotConnected`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedApp;

fn not_connected<'a, T: 'a>() -> AppFuture<'a, Result<T, HostError>> {
    Box::pin(async { Err(HostError::NotConnected) })
}

impl UnifiedApp for DetachedApp {
    fn platform(&self) -> Platform {
        Platform::Unknown
    }

    fn host_context(&self) -> Option<HostContext> {
        None
    }

    fn tool_input(&self) -> Option<Value> {
        None
    }

    fn tool_output(&self) -> Option<Value> {
        None
    }

    fn response_metadata(&self) -> Option<Value> {
        None
    }

    fn widget_state(&self) -> Option<Value> {
        None
    }

    fn widget_props(&self) -> Option<Value> {
        None
    }

    fn call_tool<'a>(
        &'a self,
        _name: &'a str,
        _args: Value,
    ) -> AppFuture<'a, Result<ToolResult, HostError>> {
        not_connected()
    }

    fn send_message<'a>(
        &'a self,
        _text: &'a str,
        _abort: Option<Value>,
    ) -> AppFuture<'a, Result<SendOutcome, HostError>> {
        not_connected()
    }

    fn send_log<'a>(
        &'a self,
        _level: LogLevel,
        _message: &'a str,
        _data: Option<Value>,
    ) -> AppFuture<'a, Result<(), HostError>> {
        not_connected()
    }

    fn open_link<'a>(&'a self, _url: &'a str) -> AppFuture<'a, Result<SendOutcome, HostError>> {
        not_connected()
    }

    fn set_widget_state<'a>(&'a self, _state: Value) -> AppFuture<'a, Result<(), HostError>> {
        not_connected()
    }

    fn update_widget_state<'a>(&'a self, _patch: Value) -> AppFuture<'a, Result<(), HostError>> {
        not_connected()
    }

    fn request_display_mode<'a>(
        &'a self,
        _mode: DisplayMode,
    ) -> AppFuture<'a, Result<(), HostError>> {
        not_connected()
    }

    fn request_close<'a>(&'a self) -> AppFuture<'a, Result<(), HostError>> {
        not_connected()
    }

    fn notify_intrinsic_height<'a>(
        &'a self,
        _height_px: u32,
    ) -> AppFuture<'a, Result<(), HostError>> {
        not_connected()
    }

    fn upload_file<'a>(
        &'a self,
        _name: &'a str,
        _mime: &'a str,
        _bytes: Vec<u8>,
    ) -> AppFuture<'a, Result<FileUploadResult, HostError>> {
        not_connected()
    }

    fn file_download_url<'a>(
        &'a self,
        _file_id: &'a str,
    ) -> AppFuture<'a, Result<String, HostError>> {
        not_connected()
    }

    fn set_open_in_app_url<'a>(&'a self, _url: &'a str) -> AppFuture<'a, Result<(), HostError>> {
        not_connected()
    }

    fn share<'a>(&'a self, _payload: SharePayload) -> AppFuture<'a, Result<(), HostError>> {
        not_connected()
    }

    fn call_completion<'a>(
        &'a self,
        _request: CompletionRequest,
    ) -> AppFuture<'a, Result<Value, HostError>> {
        not_connected()
    }

    fn stream_completion<'a>(
        &'a self,
        _request: CompletionRequest,
        _on_chunk: Rc<dyn Fn(Value)>,
    ) -> AppFuture<'a, Result<(), HostError>> {
        not_connected()
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use serde_json::json;

    use super::*;

    #[test]
    fn detached_app_reports_nothing_and_rejects_calls() {
        let app = DetachedApp;
        let app_obj: &dyn UnifiedApp = &app;

        assert_eq!(app_obj.platform(), Platform::Unknown);
        assert_eq!(app_obj.widget_state(), None);
        assert_eq!(app_obj.tool_output(), None);

        let err = block_on(app_obj.call_tool("counter", json!({}))).expect_err("detached");
        assert_eq!(err, HostError::NotConnected);
        let err = block_on(app_obj.send_message("hi", None)).expect_err("detached");
        assert_eq!(err, HostError::NotConnected);
    }
}
