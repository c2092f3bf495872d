//! [`UnifiedApp`] adapter over a connected second-host client.
//!
//! Conversational and tool operations forward verbatim. Widget state and the
//! presentation requests have no equivalents on this host and no-op; file,
//! share, and completion operations fail with stable capability labels.

use std::rc::Rc;

use serde_json::Value;

use widget_host::{
    AppFuture, CompletionRequest, DisplayMode, FileUploadResult, HostContext, HostError, LogLevel,
    McpClient, Platform, SendOutcome, SharePayload, ToolResult, UnifiedApp,
};

use crate::openai_app::ErrorReporter;

/// Adapter translating the unified interface into second-host client calls.
pub struct McpApp {
    client: Rc<dyn McpClient>,
    report_error: ErrorReporter,
}

impl McpApp {
    /// Builds the adapter over a connected client and an error reporter.
    pub fn new(client: Rc<dyn McpClient>, report_error: ErrorReporter) -> Self {
        Self {
            client,
            report_error,
        }
    }

    /// The underlying connected client.
    pub fn client(&self) -> Rc<dyn McpClient> {
        Rc::clone(&self.client)
    }

    fn report(&self, err: HostError) -> HostError {
        (self.report_error)(&err);
        err
    }

    fn unsupported<'a, T: 'a>(&'a self, capability: &'static str) -> AppFuture<'a, Result<T, HostError>> {
        Box::pin(async move { Err(self.report(HostError::unsupported(capability))) })
    }

    fn accepted<'a>() -> AppFuture<'a, Result<(), HostError>> {
        Box::pin(async { Ok(()) })
    }
}

impl UnifiedApp for McpApp {
    fn platform(&self) -> Platform {
        Platform::Mcp
    }

    fn host_context(&self) -> Option<HostContext> {
        self.client.host_context()
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
        name: &'a str,
        args: Value,
    ) -> AppFuture<'a, Result<ToolResult, HostError>> {
        Box::pin(async move {
            self.client
                .call_server_tool(name, args)
                .await
                .map_err(|e| self.report(HostError::host_call(e)))
        })
    }

    fn send_message<'a>(
        &'a self,
        text: &'a str,
        abort: Option<Value>,
    ) -> AppFuture<'a, Result<SendOutcome, HostError>> {
        Box::pin(async move {
            match self.client.send_message(text, abort).await {
                Ok(()) => Ok(SendOutcome::ok()),
                Err(e) => {
                    self.report(HostError::host_call(e));
                    Ok(SendOutcome::error())
                }
            }
        })
    }

    fn send_log<'a>(
        &'a self,
        level: LogLevel,
        message: &'a str,
        data: Option<Value>,
    ) -> AppFuture<'a, Result<(), HostError>> {
        Box::pin(async move {
            self.client
                .send_log(level, message, data)
                .await
                .map_err(|e| self.report(HostError::host_call(e)))
        })
    }

    fn open_link<'a>(&'a self, url: &'a str) -> AppFuture<'a, Result<SendOutcome, HostError>> {
        Box::pin(async move {
            match self.client.open_link(url).await {
                Ok(()) => Ok(SendOutcome::ok()),
                Err(e) => {
                    self.report(HostError::host_call(e));
                    Ok(SendOutcome::error())
                }
            }
        })
    }

    fn set_widget_state<'a>(&'a self, _state: Value) -> AppFuture<'a, Result<(), HostError>> {
        // Widget state is not persisted by this host; accepted and dropped.
        Self::accepted()
    }

    fn update_widget_state<'a>(&'a self, _patch: Value) -> AppFuture<'a, Result<(), HostError>> {
        Self::accepted()
    }

    fn request_display_mode<'a>(
        &'a self,
        _mode: DisplayMode,
    ) -> AppFuture<'a, Result<(), HostError>> {
        Self::accepted()
    }

    fn request_close<'a>(&'a self) -> AppFuture<'a, Result<(), HostError>> {
        Self::accepted()
    }

    fn notify_intrinsic_height<'a>(
        &'a self,
        _height_px: u32,
    ) -> AppFuture<'a, Result<(), HostError>> {
        Self::accepted()
    }

    fn upload_file<'a>(
        &'a self,
        _name: &'a str,
        _mime: &'a str,
        _bytes: Vec<u8>,
    ) -> AppFuture<'a, Result<FileUploadResult, HostError>> {
        self.unsupported("file-upload")
    }

    fn file_download_url<'a>(
        &'a self,
        _file_id: &'a str,
    ) -> AppFuture<'a, Result<String, HostError>> {
        self.unsupported("file-download")
    }

    fn set_open_in_app_url<'a>(&'a self, _url: &'a str) -> AppFuture<'a, Result<(), HostError>> {
        Self::accepted()
    }

    fn share<'a>(&'a self, _payload: SharePayload) -> AppFuture<'a, Result<(), HostError>> {
        self.unsupported("share")
    }

    fn call_completion<'a>(
        &'a self,
        _request: CompletionRequest,
    ) -> AppFuture<'a, Result<Value, HostError>> {
        self.unsupported("completion")
    }

    fn stream_completion<'a>(
        &'a self,
        _request: CompletionRequest,
        _on_chunk: Rc<dyn Fn(Value)>,
    ) -> AppFuture<'a, Result<(), HostError>> {
        self.unsupported("completion")
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use widget_host::MemoryMcpClient;

    use super::*;

    fn adapter(client: &MemoryMcpClient) -> (McpApp, Rc<RefCell<Vec<String>>>) {
        let reported = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&reported);
        let reporter: ErrorReporter = Rc::new(move |err: &HostError| {
            sink.borrow_mut().push(err.to_string());
        });
        (McpApp::new(Rc::new(client.clone()), reporter), reported)
    }

    #[test]
    fn conversational_operations_forward_to_the_client() {
        let client = MemoryMcpClient::default();
        let (app, _) = adapter(&client);

        block_on(app.send_message("hi", Some(json!({"token": 1})))).expect("send");
        block_on(app.send_log(LogLevel::Warn, "careful", None)).expect("log");
        block_on(app.open_link("https://example.com")).expect("open");

        let calls = client.calls();
        assert_eq!(calls[0].0, "message/send");
        assert_eq!(calls[0].1["abort"], json!({"token": 1}));
        assert_eq!(calls[1].0, "logging/log");
        assert_eq!(calls[2].0, "links/open");
    }

    #[test]
    fn unsupported_capabilities_fail_with_stable_labels() {
        let client = MemoryMcpClient::default();
        let (app, reported) = adapter(&client);

        let err = block_on(app.upload_file("a.txt", "text/plain", vec![1])).expect_err("no");
        assert_eq!(err.capability(), Some("file-upload"));
        let err = block_on(app.file_download_url("f1")).expect_err("no");
        assert_eq!(err.capability(), Some("file-download"));
        let err = block_on(app.share(SharePayload::default())).expect_err("no");
        assert_eq!(err.capability(), Some("share"));
        let err = block_on(app.call_completion(CompletionRequest {
            input: json!("hello"),
            options: None,
        }))
        .expect_err("no");
        assert_eq!(err.capability(), Some("completion"));

        // Reported once each and no host calls were made.
        assert_eq!(reported.borrow().len(), 4);
        assert!(client.calls().is_empty());
    }

    #[test]
    fn state_and_presentation_requests_are_accepted_noops() {
        let client = MemoryMcpClient::default();
        let (app, reported) = adapter(&client);

        block_on(app.set_widget_state(json!({"a": 1}))).expect("noop");
        block_on(app.update_widget_state(json!({"b": 2}))).expect("noop");
        block_on(app.request_display_mode(DisplayMode::Fullscreen)).expect("noop");
        block_on(app.request_close()).expect("noop");
        block_on(app.notify_intrinsic_height(240)).expect("noop");

        assert!(client.calls().is_empty());
        assert!(reported.borrow().is_empty());
        assert_eq!(app.widget_state(), None);
    }
}
