//! Platform-erased adapter enum and the synchronous adapter factory.

use std::rc::Rc;

use serde_json::Value;

use widget_host::{
    AppFuture, CompletionRequest, DetachedApp, DisplayMode, FileUploadResult, HostContext,
    HostError, LogLevel, McpClient, OpenAiGlobals, Platform, SendOutcome, SharePayload,
    ToolResult, UnifiedApp,
};

use crate::{
    detect::detect_platform,
    mcp_app::McpApp,
    openai_app::{ErrorReporter, OpenAiApp},
    openai_web::WebOpenAiGlobals,
};

/// Adapter enum that erases the concrete host backend behind [`UnifiedApp`].
pub enum UnifiedAppAdapter {
    /// First-host adapter over the injected global object.
    OpenAi(OpenAiApp),
    /// Second-host adapter over a connected client.
    Mcp(McpApp),
    /// Null adapter used before any host connection exists.
    Detached(DetachedApp),
}

impl UnifiedAppAdapter {
    /// Wraps a first-host globals surface.
    pub fn openai(globals: Rc<dyn OpenAiGlobals>, report_error: ErrorReporter) -> Self {
        Self::OpenAi(OpenAiApp::new(globals, report_error))
    }

    /// Wraps a connected second-host client.
    pub fn mcp(client: Rc<dyn McpClient>, report_error: ErrorReporter) -> Self {
        Self::Mcp(McpApp::new(client, report_error))
    }

    /// Null adapter.
    pub fn detached() -> Self {
        Self::Detached(DetachedApp)
    }
}

impl UnifiedApp for UnifiedAppAdapter {
    fn platform(&self) -> Platform {
        match self {
            Self::OpenAi(app) => app.platform(),
            Self::Mcp(app) => app.platform(),
            Self::Detached(app) => app.platform(),
        }
    }

    fn host_context(&self) -> Option<HostContext> {
        match self {
            Self::OpenAi(app) => app.host_context(),
            Self::Mcp(app) => app.host_context(),
            Self::Detached(app) => app.host_context(),
        }
    }

    fn tool_input(&self) -> Option<Value> {
        match self {
            Self::OpenAi(app) => app.tool_input(),
            Self::Mcp(app) => app.tool_input(),
            Self::Detached(app) => app.tool_input(),
        }
    }

    fn tool_output(&self) -> Option<Value> {
        match self {
            Self::OpenAi(app) => app.tool_output(),
            Self::Mcp(app) => app.tool_output(),
            Self::Detached(app) => app.tool_output(),
        }
    }

    fn response_metadata(&self) -> Option<Value> {
        match self {
            Self::OpenAi(app) => app.response_metadata(),
            Self::Mcp(app) => app.response_metadata(),
            Self::Detached(app) => app.response_metadata(),
        }
    }

    fn widget_state(&self) -> Option<Value> {
        match self {
            Self::OpenAi(app) => app.widget_state(),
            Self::Mcp(app) => app.widget_state(),
            Self::Detached(app) => app.widget_state(),
        }
    }

    fn widget_props(&self) -> Option<Value> {
        match self {
            Self::OpenAi(app) => app.widget_props(),
            Self::Mcp(app) => app.widget_props(),
            Self::Detached(app) => app.widget_props(),
        }
    }

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        args: Value,
    ) -> AppFuture<'a, Result<ToolResult, HostError>> {
        match self {
            Self::OpenAi(app) => app.call_tool(name, args),
            Self::Mcp(app) => app.call_tool(name, args),
            Self::Detached(app) => app.call_tool(name, args),
        }
    }

    fn send_message<'a>(
        &'a self,
        text: &'a str,
        abort: Option<Value>,
    ) -> AppFuture<'a, Result<SendOutcome, HostError>> {
        match self {
            Self::OpenAi(app) => app.send_message(text, abort),
            Self::Mcp(app) => app.send_message(text, abort),
            Self::Detached(app) => app.send_message(text, abort),
        }
    }

    fn send_log<'a>(
        &'a self,
        level: LogLevel,
        message: &'a str,
        data: Option<Value>,
    ) -> AppFuture<'a, Result<(), HostError>> {
        match self {
            Self::OpenAi(app) => app.send_log(level, message, data),
            Self::Mcp(app) => app.send_log(level, message, data),
            Self::Detached(app) => app.send_log(level, message, data),
        }
    }

    fn open_link<'a>(&'a self, url: &'a str) -> AppFuture<'a, Result<SendOutcome, HostError>> {
        match self {
            Self::OpenAi(app) => app.open_link(url),
            Self::Mcp(app) => app.open_link(url),
            Self::Detached(app) => app.open_link(url),
        }
    }

    fn set_widget_state<'a>(&'a self, state: Value) -> AppFuture<'a, Result<(), HostError>> {
        match self {
            Self::OpenAi(app) => app.set_widget_state(state),
            Self::Mcp(app) => app.set_widget_state(state),
            Self::Detached(app) => app.set_widget_state(state),
        }
    }

    fn update_widget_state<'a>(&'a self, patch: Value) -> AppFuture<'a, Result<(), HostError>> {
        match self {
            Self::OpenAi(app) => app.update_widget_state(patch),
            Self::Mcp(app) => app.update_widget_state(patch),
            Self::Detached(app) => app.update_widget_state(patch),
        }
    }

    fn request_display_mode<'a>(
        &'a self,
        mode: DisplayMode,
    ) -> AppFuture<'a, Result<(), HostError>> {
        match self {
            Self::OpenAi(app) => app.request_display_mode(mode),
            Self::Mcp(app) => app.request_display_mode(mode),
            Self::Detached(app) => app.request_display_mode(mode),
        }
    }

    fn request_close<'a>(&'a self) -> AppFuture<'a, Result<(), HostError>> {
        match self {
            Self::OpenAi(app) => app.request_close(),
            Self::Mcp(app) => app.request_close(),
            Self::Detached(app) => app.request_close(),
        }
    }

    fn notify_intrinsic_height<'a>(
        &'a self,
        height_px: u32,
    ) -> AppFuture<'a, Result<(), HostError>> {
        match self {
            Self::OpenAi(app) => app.notify_intrinsic_height(height_px),
            Self::Mcp(app) => app.notify_intrinsic_height(height_px),
            Self::Detached(app) => app.notify_intrinsic_height(height_px),
        }
    }

    fn upload_file<'a>(
        &'a self,
        name: &'a str,
        mime: &'a str,
        bytes: Vec<u8>,
    ) -> AppFuture<'a, Result<FileUploadResult, HostError>> {
        match self {
            Self::OpenAi(app) => app.upload_file(name, mime, bytes),
            Self::Mcp(app) => app.upload_file(name, mime, bytes),
            Self::Detached(app) => app.upload_file(name, mime, bytes),
        }
    }

    fn file_download_url<'a>(
        &'a self,
        file_id: &'a str,
    ) -> AppFuture<'a, Result<String, HostError>> {
        match self {
            Self::OpenAi(app) => app.file_download_url(file_id),
            Self::Mcp(app) => app.file_download_url(file_id),
            Self::Detached(app) => app.file_download_url(file_id),
        }
    }

    fn set_open_in_app_url<'a>(&'a self, url: &'a str) -> AppFuture<'a, Result<(), HostError>> {
        match self {
            Self::OpenAi(app) => app.set_open_in_app_url(url),
            Self::Mcp(app) => app.set_open_in_app_url(url),
            Self::Detached(app) => app.set_open_in_app_url(url),
        }
    }

    fn share<'a>(&'a self, payload: SharePayload) -> AppFuture<'a, Result<(), HostError>> {
        match self {
            Self::OpenAi(app) => app.share(payload),
            Self::Mcp(app) => app.share(payload),
            Self::Detached(app) => app.share(payload),
        }
    }

    fn call_completion<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> AppFuture<'a, Result<Value, HostError>> {
        match self {
            Self::OpenAi(app) => app.call_completion(request),
            Self::Mcp(app) => app.call_completion(request),
            Self::Detached(app) => app.call_completion(request),
        }
    }

    fn stream_completion<'a>(
        &'a self,
        request: CompletionRequest,
        on_chunk: Rc<dyn Fn(Value)>,
    ) -> AppFuture<'a, Result<(), HostError>> {
        match self {
            Self::OpenAi(app) => app.stream_completion(request, on_chunk),
            Self::Mcp(app) => app.stream_completion(request, on_chunk),
            Self::Detached(app) => app.stream_completion(request, on_chunk),
        }
    }
}

/// Result of the synchronous factory.
pub struct CreatedApp {
    /// Provisional platform seen at creation time.
    pub platform: Platform,
    /// Whether the adapter is immediately usable. False for the detached
    /// adapter handed out while a handshake is still the caller's job.
    pub is_connected: bool,
    /// Construction failure text, if the adapter could not be set up.
    pub error: Option<String>,
    /// The adapter selected for the detected platform.
    pub app: Rc<UnifiedAppAdapter>,
}

/// Builds an adapter for the ambient environment.
///
/// When the first-host global is present the returned adapter is immediately
/// usable. Otherwise the detached adapter is returned and the caller is
/// expected to attempt the second-host handshake, swapping the adapter in on
/// success with [`UnifiedAppAdapter::mcp`].
pub fn create_unified_app(report_error: ErrorReporter) -> CreatedApp {
    create_unified_app_with(detect_platform(), Rc::new(WebOpenAiGlobals), report_error)
}

/// Factory seam taking an explicit detection outcome and globals surface.
pub fn create_unified_app_with(
    detected: Platform,
    globals: Rc<dyn OpenAiGlobals>,
    report_error: ErrorReporter,
) -> CreatedApp {
    let (app, is_connected) = match detected {
        Platform::OpenAi => (UnifiedAppAdapter::openai(globals, report_error), true),
        Platform::Mcp | Platform::Unknown => (UnifiedAppAdapter::detached(), false),
    };
    CreatedApp {
        platform: detected,
        is_connected,
        error: None,
        app: Rc::new(app),
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use widget_host::{MemoryMcpClient, MemoryOpenAiGlobals};

    use super::*;

    fn silent_reporter() -> ErrorReporter {
        Rc::new(|_| {})
    }

    #[test]
    fn factory_selects_openai_when_the_global_is_present() {
        let created = create_unified_app_with(
            Platform::OpenAi,
            Rc::new(MemoryOpenAiGlobals::default()),
            silent_reporter(),
        );
        assert_eq!(created.platform, Platform::OpenAi);
        assert!(created.is_connected);
        assert_eq!(created.error, None);
        assert_eq!(created.app.platform(), Platform::OpenAi);
    }

    #[test]
    fn factory_stays_detached_until_a_handshake_completes() {
        let created = create_unified_app_with(
            Platform::Unknown,
            Rc::new(MemoryOpenAiGlobals::default()),
            silent_reporter(),
        );
        assert_eq!(created.app.platform(), Platform::Unknown);
        assert!(!created.is_connected);

        let err = block_on(created.app.call_tool("counter", json!({}))).expect_err("detached");
        assert_eq!(err, HostError::NotConnected);
    }

    #[test]
    fn mcp_adapter_is_built_from_a_connected_client() {
        let client = MemoryMcpClient::default();
        let adapter = UnifiedAppAdapter::mcp(Rc::new(client.clone()), silent_reporter());
        assert_eq!(adapter.platform(), Platform::Mcp);

        block_on(adapter.send_message("hello", None)).expect("send");
        assert_eq!(client.calls()[0].0, "message/send");
    }

    #[test]
    fn swallowed_and_rethrown_failures_stay_asymmetric_through_the_enum() {
        let globals = MemoryOpenAiGlobals::default();
        globals.fail_method("sendFollowUpMessage", "offline");
        globals.fail_method("setWidgetState", "offline");
        let adapter = UnifiedAppAdapter::openai(Rc::new(globals), silent_reporter());

        let outcome = block_on(adapter.send_message("hi", None)).expect("swallowed");
        assert_eq!(outcome, SendOutcome::error());
        let err = block_on(adapter.set_widget_state(json!({}))).expect_err("rethrown");
        assert_eq!(err, HostError::host_call("offline"));
    }
}
