//! Collaborator contract for the first host's injected global client object.
//!
//! The ambient `window.openai` global and its environment-level change event
//! are abstracted behind [`OpenAiGlobals`] with an explicit
//! subscribe/unsubscribe pair so adapters and the binding can be exercised
//! against [`MemoryOpenAiGlobals`] without touching process-wide globals.

use std::{
    cell::RefCell,
    collections::HashMap,
    future::Future,
    pin::Pin,
    rc::Rc,
};

use serde_json::{json, Value};

use crate::{
    app::{CompletionRequest, SharePayload},
    context::{DisplayMode, HostContext, SafeAreaInsets, Theme},
};

/// Object-safe boxed future used by [`OpenAiGlobals`] async methods.
pub type OpenAiFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Handle for a registered globals-changed listener.
///
/// Dropping the subscription (or calling [`GlobalsSubscription::unsubscribe`])
/// removes the listener from the host event target.
pub struct GlobalsSubscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl GlobalsSubscription {
    /// Wraps the release action for a registered listener.
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Subscription that owns no listener (non-embedded fallbacks).
    pub fn inert() -> Self {
        Self { release: None }
    }

    /// Removes the listener now instead of at drop time.
    pub fn unsubscribe(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for GlobalsSubscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Contract of the first host's synchronous global client object.
///
/// Getters are environment snapshots; async methods mirror the host global's
/// methods one-to-one and surface the host's raw failure text.
pub trait OpenAiGlobals {
    /// Current color scheme.
    fn theme(&self) -> Option<Theme>;
    /// Current presentation surface.
    fn display_mode(&self) -> Option<DisplayMode>;
    /// Current locale tag.
    fn locale(&self) -> Option<String>;
    /// Current safe-area insets.
    fn safe_area(&self) -> Option<SafeAreaInsets>;
    /// Maximum granted width.
    fn max_width(&self) -> Option<f64>;
    /// Maximum granted height.
    fn max_height(&self) -> Option<f64>;
    /// Tool input that produced this widget.
    fn tool_input(&self) -> Option<Value>;
    /// Tool output that produced this widget.
    fn tool_output(&self) -> Option<Value>;
    /// Host metadata attached to the tool response.
    fn response_metadata(&self) -> Option<Value>;
    /// Host-persisted widget state.
    fn widget_state(&self) -> Option<Value>;
    /// Render-time widget props.
    fn widget_props(&self) -> Option<Value>;

    /// Calls a remote tool; the raw result shape is host-defined.
    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        args: Value,
    ) -> OpenAiFuture<'a, Result<Value, String>>;
    /// Sends a conversational follow-up message.
    fn send_followup_message<'a>(&'a self, text: &'a str)
        -> OpenAiFuture<'a, Result<(), String>>;
    /// Opens an external link through the host.
    fn open_external<'a>(&'a self, url: &'a str) -> OpenAiFuture<'a, Result<(), String>>;
    /// Sets the "open in app" link.
    fn set_open_in_app_url<'a>(&'a self, url: &'a str) -> OpenAiFuture<'a, Result<(), String>>;
    /// Requests a presentation-surface change.
    fn request_display_mode<'a>(
        &'a self,
        mode: DisplayMode,
    ) -> OpenAiFuture<'a, Result<(), String>>;
    /// Requests widget close.
    fn request_close<'a>(&'a self) -> OpenAiFuture<'a, Result<(), String>>;
    /// Reports intrinsic content height.
    fn notify_intrinsic_height<'a>(&'a self, height_px: u32)
        -> OpenAiFuture<'a, Result<(), String>>;
    /// Uploads a file; returns the host-assigned file id.
    fn upload_file<'a>(
        &'a self,
        name: &'a str,
        mime: &'a str,
        bytes: Vec<u8>,
    ) -> OpenAiFuture<'a, Result<String, String>>;
    /// Resolves a download URL for an uploaded file.
    fn get_file_download_url<'a>(
        &'a self,
        file_id: &'a str,
    ) -> OpenAiFuture<'a, Result<String, String>>;
    /// Replaces the host-persisted widget state.
    fn set_widget_state<'a>(&'a self, state: Value) -> OpenAiFuture<'a, Result<(), String>>;
    /// Shallow-merges a patch into the host-persisted widget state.
    fn update_widget_state<'a>(&'a self, patch: Value) -> OpenAiFuture<'a, Result<(), String>>;
    /// Opens the host share sheet.
    fn share<'a>(&'a self, payload: SharePayload) -> OpenAiFuture<'a, Result<(), String>>;
    /// Invokes an AI completion.
    fn call_completion<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> OpenAiFuture<'a, Result<Value, String>>;
    /// Streams an AI completion through `on_chunk`.
    fn stream_completion<'a>(
        &'a self,
        request: CompletionRequest,
        on_chunk: Rc<dyn Fn(Value)>,
    ) -> OpenAiFuture<'a, Result<(), String>>;

    /// Registers a listener for the host's globals-changed event.
    fn subscribe_globals(&self, listener: Rc<dyn Fn()>) -> GlobalsSubscription;
}

/// Re-derives the full host-context record from the five independently
/// tracked first-host globals, defaulting fields the host has not reported.
pub fn compose_openai_context(globals: &dyn OpenAiGlobals) -> HostContext {
    HostContext {
        theme: globals.theme().unwrap_or(Theme::Light),
        display_mode: globals.display_mode().unwrap_or(DisplayMode::Inline),
        locale: globals.locale().unwrap_or_else(|| "en".to_string()),
        safe_area: globals.safe_area().unwrap_or_default(),
        max_width: globals.max_width(),
        max_height: globals.max_height(),
    }
}

#[derive(Default)]
struct MemoryGlobalsInner {
    theme: Option<Theme>,
    display_mode: Option<DisplayMode>,
    locale: Option<String>,
    safe_area: Option<SafeAreaInsets>,
    max_width: Option<f64>,
    max_height: Option<f64>,
    tool_input: Option<Value>,
    tool_output: Option<Value>,
    response_metadata: Option<Value>,
    widget_state: Option<Value>,
    widget_props: Option<Value>,
    tool_call_result: Option<Value>,
    completion_result: Option<Value>,
    upload_file_id: Option<String>,
    failures: HashMap<String, String>,
    calls: Vec<(String, Value)>,
    listeners: HashMap<u64, Rc<dyn Fn()>>,
    next_listener: u64,
}

/// In-memory first-host fake that records calls and can push synthetic
/// globals-changed events.
#[derive(Clone, Default)]
pub struct MemoryOpenAiGlobals {
    inner: Rc<RefCell<MemoryGlobalsInner>>,
}

impl MemoryOpenAiGlobals {
    /// Fails every subsequent invocation of `method` with `message`.
    pub fn fail_method(&self, method: &str, message: &str) {
        self.inner
            .borrow_mut()
            .failures
            .insert(method.to_string(), message.to_string());
    }

    /// Sets the raw value returned by `call_tool`.
    pub fn set_tool_call_result(&self, value: Value) {
        self.inner.borrow_mut().tool_call_result = Some(value);
    }

    /// Sets the value returned by `call_completion`.
    pub fn set_completion_result(&self, value: Value) {
        self.inner.borrow_mut().completion_result = Some(value);
    }

    /// Sets the color scheme global.
    pub fn set_theme(&self, theme: Theme) {
        self.inner.borrow_mut().theme = Some(theme);
    }

    /// Sets the display-mode global.
    pub fn set_display_mode(&self, mode: DisplayMode) {
        self.inner.borrow_mut().display_mode = Some(mode);
    }

    /// Sets the locale global.
    pub fn set_locale(&self, locale: &str) {
        self.inner.borrow_mut().locale = Some(locale.to_string());
    }

    /// Sets the safe-area global.
    pub fn set_safe_area(&self, insets: SafeAreaInsets) {
        self.inner.borrow_mut().safe_area = Some(insets);
    }

    /// Sets the maximum-dimension globals.
    pub fn set_max_dimensions(&self, width: Option<f64>, height: Option<f64>) {
        let mut inner = self.inner.borrow_mut();
        inner.max_width = width;
        inner.max_height = height;
    }

    /// Sets the tool-input global.
    pub fn set_tool_input(&self, value: Option<Value>) {
        self.inner.borrow_mut().tool_input = value;
    }

    /// Sets the tool-output global.
    pub fn set_tool_output(&self, value: Option<Value>) {
        self.inner.borrow_mut().tool_output = value;
    }

    /// Sets the response-metadata global.
    pub fn set_response_metadata(&self, value: Option<Value>) {
        self.inner.borrow_mut().response_metadata = value;
    }

    /// Sets the widget-state global without recording a call.
    pub fn set_widget_state_value(&self, value: Option<Value>) {
        self.inner.borrow_mut().widget_state = value;
    }

    /// Sets the widget-props global.
    pub fn set_widget_props(&self, value: Option<Value>) {
        self.inner.borrow_mut().widget_props = value;
    }

    /// Invokes every registered globals-changed listener.
    pub fn emit_globals_changed(&self) {
        let listeners: Vec<Rc<dyn Fn()>> =
            self.inner.borrow().listeners.values().cloned().collect();
        for listener in listeners {
            listener();
        }
    }

    /// Returns the recorded `(method, payload)` call log.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.inner.borrow().calls.clone()
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    fn invoke(&self, method: &str, payload: Value) -> Result<(), String> {
        let mut inner = self.inner.borrow_mut();
        if let Some(message) = inner.failures.get(method) {
            return Err(message.clone());
        }
        inner.calls.push((method.to_string(), payload));
        Ok(())
    }
}

impl OpenAiGlobals for MemoryOpenAiGlobals {
    fn theme(&self) -> Option<Theme> {
        self.inner.borrow().theme
    }

    fn display_mode(&self) -> Option<DisplayMode> {
        self.inner.borrow().display_mode
    }

    fn locale(&self) -> Option<String> {
        self.inner.borrow().locale.clone()
    }

    fn safe_area(&self) -> Option<SafeAreaInsets> {
        self.inner.borrow().safe_area
    }

    fn max_width(&self) -> Option<f64> {
        self.inner.borrow().max_width
    }

    fn max_height(&self) -> Option<f64> {
        self.inner.borrow().max_height
    }

    fn tool_input(&self) -> Option<Value> {
        self.inner.borrow().tool_input.clone()
    }

    fn tool_output(&self) -> Option<Value> {
        self.inner.borrow().tool_output.clone()
    }

    fn response_metadata(&self) -> Option<Value> {
        self.inner.borrow().response_metadata.clone()
    }

    fn widget_state(&self) -> Option<Value> {
        self.inner.borrow().widget_state.clone()
    }

    fn widget_props(&self) -> Option<Value> {
        self.inner.borrow().widget_props.clone()
    }

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        args: Value,
    ) -> OpenAiFuture<'a, Result<Value, String>> {
        Box::pin(async move {
            self.invoke("callTool", json!({"name": name, "args": args}))?;
            Ok(self
                .inner
                .borrow()
                .tool_call_result
                .clone()
                .unwrap_or_else(|| json!({"text": "ok"})))
        })
    }

    fn send_followup_message<'a>(
        &'a self,
        text: &'a str,
    ) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move { self.invoke("sendFollowUpMessage", json!({"text": text})) })
    }

    fn open_external<'a>(&'a self, url: &'a str) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move { self.invoke("openExternal", json!({"url": url})) })
    }

    fn set_open_in_app_url<'a>(&'a self, url: &'a str) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move { self.invoke("setOpenInAppUrl", json!({"url": url})) })
    }

    fn request_display_mode<'a>(
        &'a self,
        mode: DisplayMode,
    ) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.invoke("requestDisplayMode", json!({"mode": mode}))?;
            self.inner.borrow_mut().display_mode = Some(mode);
            Ok(())
        })
    }

    fn request_close<'a>(&'a self) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move { self.invoke("requestClose", Value::Null) })
    }

    fn notify_intrinsic_height<'a>(
        &'a self,
        height_px: u32,
    ) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move { self.invoke("notifyIntrinsicHeight", json!({"height": height_px})) })
    }

    fn upload_file<'a>(
        &'a self,
        name: &'a str,
        mime: &'a str,
        bytes: Vec<u8>,
    ) -> OpenAiFuture<'a, Result<String, String>> {
        Box::pin(async move {
            self.invoke(
                "uploadFile",
                json!({"name": name, "mime": mime, "len": bytes.len()}),
            )?;
            Ok(self
                .inner
                .borrow()
                .upload_file_id
                .clone()
                .unwrap_or_else(|| "file-1".to_string()))
        })
    }

    fn get_file_download_url<'a>(
        &'a self,
        file_id: &'a str,
    ) -> OpenAiFuture<'a, Result<String, String>> {
        Box::pin(async move {
            self.invoke("getFileDownloadUrl", json!({"fileId": file_id}))?;
            Ok(format!("https://files.example/{file_id}"))
        })
    }

    fn set_widget_state<'a>(&'a self, state: Value) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.invoke("setWidgetState", state.clone())?;
            self.inner.borrow_mut().widget_state = Some(state);
            Ok(())
        })
    }

    fn update_widget_state<'a>(&'a self, patch: Value) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.invoke("updateWidgetState", patch.clone())?;
            let mut inner = self.inner.borrow_mut();
            let merged = crate::tool_result::merge_widget_state(inner.widget_state.as_ref(), &patch);
            inner.widget_state = Some(merged);
            Ok(())
        })
    }

    fn share<'a>(&'a self, payload: SharePayload) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let payload = serde_json::to_value(&payload).map_err(|e| e.to_string())?;
            self.invoke("share", payload)
        })
    }

    fn call_completion<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> OpenAiFuture<'a, Result<Value, String>> {
        Box::pin(async move {
            let payload = serde_json::to_value(&request).map_err(|e| e.to_string())?;
            self.invoke("callCompletion", payload)?;
            Ok(self
                .inner
                .borrow()
                .completion_result
                .clone()
                .unwrap_or_else(|| json!({})))
        })
    }

    fn stream_completion<'a>(
        &'a self,
        request: CompletionRequest,
        on_chunk: Rc<dyn Fn(Value)>,
    ) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let payload = serde_json::to_value(&request).map_err(|e| e.to_string())?;
            self.invoke("streamCompletion", payload)?;
            if let Some(result) = self.inner.borrow().completion_result.clone() {
                on_chunk(result);
            }
            Ok(())
        })
    }

    fn subscribe_globals(&self, listener: Rc<dyn Fn()>) -> GlobalsSubscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_listener;
            inner.next_listener += 1;
            inner.listeners.insert(id, listener);
            id
        };
        let inner = Rc::clone(&self.inner);
        GlobalsSubscription::new(move || {
            inner.borrow_mut().listeners.remove(&id);
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use serde_json::json;

    use super::*;

    #[test]
    fn memory_globals_record_calls_in_order() {
        let globals = MemoryOpenAiGlobals::default();
        block_on(globals.send_followup_message("hi")).expect("send");
        block_on(globals.open_external("https://example.com")).expect("open");

        let calls = globals.calls();
        assert_eq!(calls[0].0, "sendFollowUpMessage");
        assert_eq!(calls[1].1, json!({"url": "https://example.com"}));
    }

    #[test]
    fn failed_calls_are_not_recorded() {
        let globals = MemoryOpenAiGlobals::default();
        globals.fail_method("callTool", "boom");
        let err = block_on(globals.call_tool("counter", json!({}))).expect_err("fails");
        assert_eq!(err, "boom");
        assert!(globals.calls().is_empty());
    }

    #[test]
    fn subscription_drop_removes_the_listener() {
        let globals = MemoryOpenAiGlobals::default();
        let subscription = globals.subscribe_globals(Rc::new(|| {}));
        assert_eq!(globals.listener_count(), 1);
        drop(subscription);
        assert_eq!(globals.listener_count(), 0);
    }

    #[test]
    fn emit_reaches_every_listener() {
        let globals = MemoryOpenAiGlobals::default();
        let hits = Rc::new(RefCell::new(0));
        let hits_in = Rc::clone(&hits);
        let _subscription = globals.subscribe_globals(Rc::new(move || {
            *hits_in.borrow_mut() += 1;
        }));
        globals.emit_globals_changed();
        globals.emit_globals_changed();
        assert_eq!(*hits.borrow(), 2);
    }

    #[test]
    fn compose_context_defaults_missing_fields() {
        let globals = MemoryOpenAiGlobals::default();
        globals.set_theme(Theme::Dark);
        globals.set_max_dimensions(Some(640.0), None);

        let context = compose_openai_context(&globals);
        assert_eq!(context.theme, Theme::Dark);
        assert_eq!(context.display_mode, DisplayMode::Inline);
        assert_eq!(context.locale, "en");
        assert_eq!(context.max_width, Some(640.0));
    }

    #[test]
    fn update_widget_state_merges_in_the_fake() {
        let globals = MemoryOpenAiGlobals::default();
        globals.set_widget_state_value(Some(json!({"a": 1})));
        block_on(globals.update_widget_state(json!({"b": 2}))).expect("update");
        assert_eq!(globals.widget_state(), Some(json!({"a": 1, "b": 2})));
    }
}
