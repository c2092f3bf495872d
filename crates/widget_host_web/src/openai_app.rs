//! [`UnifiedApp`] adapter over the first host's global client object.
//!
//! Every host failure is reported through the shared error reporter before it
//! is surfaced. Most operations then rethrow; `send_message` and `open_link`
//! instead resolve with a flagged [`SendOutcome`] so conversational actions
//! never break the widget's render path.

use std::rc::Rc;

use serde_json::Value;

use widget_host::{
    compose_openai_context, normalize_tool_result, AppFuture, CompletionRequest, DisplayMode,
    FileUploadResult, HostContext, HostError, LogLevel, OpenAiGlobals, Platform, SendOutcome,
    SharePayload, ToolResult, UnifiedApp,
};

/// Shared error reporter invoked for every failed host call.
pub type ErrorReporter = Rc<dyn Fn(&HostError)>;

/// Adapter translating the unified interface into first-host global calls.
pub struct OpenAiApp {
    globals: Rc<dyn OpenAiGlobals>,
    report_error: ErrorReporter,
}

impl OpenAiApp {
    /// Builds the adapter over a globals surface and an error reporter.
    pub fn new(globals: Rc<dyn OpenAiGlobals>, report_error: ErrorReporter) -> Self {
        Self {
            globals,
            report_error,
        }
    }

    fn report(&self, err: HostError) -> HostError {
        (self.report_error)(&err);
        err
    }

    async fn forward(
        &self,
        call: impl std::future::Future<Output = Result<(), String>>,
    ) -> Result<(), HostError> {
        call.await.map_err(|e| self.report(HostError::host_call(e)))
    }

    async fn forward_swallowed(
        &self,
        call: impl std::future::Future<Output = Result<(), String>>,
    ) -> Result<SendOutcome, HostError> {
        match call.await {
            Ok(()) => Ok(SendOutcome::ok()),
            Err(e) => {
                self.report(HostError::host_call(e));
                Ok(SendOutcome::error())
            }
        }
    }
}

impl UnifiedApp for OpenAiApp {
    fn platform(&self) -> Platform {
        Platform::OpenAi
    }

    fn host_context(&self) -> Option<HostContext> {
        Some(compose_openai_context(self.globals.as_ref()))
    }

    fn tool_input(&self) -> Option<Value> {
        self.globals.tool_input()
    }

    fn tool_output(&self) -> Option<Value> {
        self.globals.tool_output()
    }

    fn response_metadata(&self) -> Option<Value> {
        self.globals.response_metadata()
    }

    fn widget_state(&self) -> Option<Value> {
        self.globals.widget_state()
    }

    fn widget_props(&self) -> Option<Value> {
        self.globals.widget_props()
    }

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        args: Value,
    ) -> AppFuture<'a, Result<ToolResult, HostError>> {
        Box::pin(async move {
            let raw = self
                .globals
                .call_tool(name, args)
                .await
                .map_err(|e| self.report(HostError::host_call(e)))?;
            Ok(normalize_tool_result(&raw))
        })
    }

    fn send_message<'a>(
        &'a self,
        text: &'a str,
        _abort: Option<Value>,
    ) -> AppFuture<'a, Result<SendOutcome, HostError>> {
        // The first host's message API takes no abort token.
        Box::pin(self.forward_swallowed(self.globals.send_followup_message(text)))
    }

    fn send_log<'a>(
        &'a self,
        _level: LogLevel,
        _message: &'a str,
        _data: Option<Value>,
    ) -> AppFuture<'a, Result<(), HostError>> {
        // The first host exposes no log sink; accepted and dropped.
        Box::pin(async { Ok(()) })
    }

    fn open_link<'a>(&'a self, url: &'a str) -> AppFuture<'a, Result<SendOutcome, HostError>> {
        Box::pin(self.forward_swallowed(self.globals.open_external(url)))
    }

    fn set_widget_state<'a>(&'a self, state: Value) -> AppFuture<'a, Result<(), HostError>> {
        Box::pin(self.forward(self.globals.set_widget_state(state)))
    }

    fn update_widget_state<'a>(&'a self, patch: Value) -> AppFuture<'a, Result<(), HostError>> {
        Box::pin(self.forward(self.globals.update_widget_state(patch)))
    }

    fn request_display_mode<'a>(
        &'a self,
        mode: DisplayMode,
    ) -> AppFuture<'a, Result<(), HostError>> {
        Box::pin(self.forward(self.globals.request_display_mode(mode)))
    }

    fn request_close<'a>(&'a self) -> AppFuture<'a, Result<(), HostError>> {
        Box::pin(self.forward(self.globals.request_close()))
    }

    fn notify_intrinsic_height<'a>(
        &'a self,
        height_px: u32,
    ) -> AppFuture<'a, Result<(), HostError>> {
        Box::pin(self.forward(self.globals.notify_intrinsic_height(height_px)))
    }

    fn upload_file<'a>(
        &'a self,
        name: &'a str,
        mime: &'a str,
        bytes: Vec<u8>,
    ) -> AppFuture<'a, Result<FileUploadResult, HostError>> {
        Box::pin(async move {
            let file_id = self
                .globals
                .upload_file(name, mime, bytes)
                .await
                .map_err(|e| self.report(HostError::host_call(e)))?;
            Ok(FileUploadResult { file_id })
        })
    }

    fn file_download_url<'a>(
        &'a self,
        file_id: &'a str,
    ) -> AppFuture<'a, Result<String, HostError>> {
        Box::pin(async move {
            self.globals
                .get_file_download_url(file_id)
                .await
                .map_err(|e| self.report(HostError::host_call(e)))
        })
    }

    fn set_open_in_app_url<'a>(&'a self, url: &'a str) -> AppFuture<'a, Result<(), HostError>> {
        Box::pin(self.forward(self.globals.set_open_in_app_url(url)))
    }

    fn share<'a>(&'a self, payload: SharePayload) -> AppFuture<'a, Result<(), HostError>> {
        Box::pin(async move { self.forward(self.globals.share(payload)).await })
    }

    fn call_completion<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> AppFuture<'a, Result<Value, HostError>> {
        Box::pin(async move {
            self.globals
                .call_completion(request)
                .await
                .map_err(|e| self.report(HostError::host_call(e)))
        })
    }

    fn stream_completion<'a>(
        &'a self,
        request: CompletionRequest,
        on_chunk: Rc<dyn Fn(Value)>,
    ) -> AppFuture<'a, Result<(), HostError>> {
        Box::pin(async move {
            self.globals
                .stream_completion(request, on_chunk)
                .await
                .map_err(|e| self.report(HostError::host_call(e)))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use widget_host::MemoryOpenAiGlobals;

    use super::*;

    fn reporter() -> (ErrorReporter, Rc<RefCell<Vec<String>>>) {
        let reported = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&reported);
        let reporter: ErrorReporter = Rc::new(move |err| {
            sink.borrow_mut().push(err.to_string());
        });
        (reporter, reported)
    }

    fn adapter(globals: &MemoryOpenAiGlobals) -> (OpenAiApp, Rc<RefCell<Vec<String>>>) {
        let (reporter, reported) = reporter();
        (OpenAiApp::new(Rc::new(globals.clone()), reporter), reported)
    }

    #[test]
    fn call_tool_normalizes_the_raw_result() {
        let globals = MemoryOpenAiGlobals::default();
        globals.set_tool_call_result(json!({"text": "done", "structuredContent": {"n": 3}}));
        let (app, reported) = adapter(&globals);

        let result = block_on(app.call_tool("counter", json!({"op": "inc"}))).expect("call");
        assert_eq!(result.first_text(), Some("done"));
        assert_eq!(result.structured, Some(json!({"n": 3})));
        assert!(reported.borrow().is_empty());
    }

    #[test]
    fn call_tool_failure_is_reported_and_rethrown() {
        let globals = MemoryOpenAiGlobals::default();
        globals.fail_method("callTool", "refused");
        let (app, reported) = adapter(&globals);

        let err = block_on(app.call_tool("counter", json!({}))).expect_err("fails");
        assert_eq!(err, HostError::host_call("refused"));
        assert_eq!(reported.borrow().as_slice(), ["host call failed: refused"]);
    }

    #[test]
    fn send_message_failure_is_reported_but_swallowed() {
        let globals = MemoryOpenAiGlobals::default();
        globals.fail_method("sendFollowUpMessage", "offline");
        let (app, reported) = adapter(&globals);

        let outcome = block_on(app.send_message("hi", None)).expect("never errs");
        assert_eq!(outcome, SendOutcome::error());
        assert_eq!(reported.borrow().len(), 1);
    }

    #[test]
    fn open_link_failure_is_reported_but_swallowed() {
        let globals = MemoryOpenAiGlobals::default();
        globals.fail_method("openExternal", "blocked");
        let (app, _) = adapter(&globals);

        let outcome = block_on(app.open_link("https://example.com")).expect("never errs");
        assert_eq!(outcome, SendOutcome::error());
    }

    #[test]
    fn send_log_is_a_supported_noop() {
        let globals = MemoryOpenAiGlobals::default();
        let (app, reported) = adapter(&globals);

        block_on(app.send_log(LogLevel::Info, "hello", None)).expect("noop");
        assert!(globals.calls().is_empty());
        assert!(reported.borrow().is_empty());
    }

    #[test]
    fn host_context_is_composed_from_globals() {
        let globals = MemoryOpenAiGlobals::default();
        globals.set_theme(widget_host::Theme::Dark);
        let (app, _) = adapter(&globals);

        let context = app.host_context().expect("always present");
        assert_eq!(context.theme, widget_host::Theme::Dark);
        assert_eq!(context.locale, "en");
    }

    #[test]
    fn abort_token_is_ignored_on_this_host() {
        let globals = MemoryOpenAiGlobals::default();
        let (app, _) = adapter(&globals);

        let outcome = block_on(app.send_message("hi", Some(json!({"signal": 1})))).expect("ok");
        assert_eq!(outcome, SendOutcome::ok());
        assert_eq!(globals.calls()[0].0, "sendFollowUpMessage");
    }
}
