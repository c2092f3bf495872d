//! Bridge to the first host's injected `window.openai` global object.
//!
//! The wasm implementation reads the global and its methods through a small
//! JS shim; the non-wasm fallback reports the global as absent so detection
//! and tests behave deterministically off-target.

use std::rc::Rc;

use serde_json::Value;

use widget_host::{
    CompletionRequest, DisplayMode, GlobalsSubscription, OpenAiFuture, OpenAiGlobals,
    SafeAreaInsets, SharePayload, Theme,
};

#[cfg(target_arch = "wasm32")]
mod imp {
    use super::*;
    use js_sys::{Array, Object, Promise, Reflect, Uint8Array};
    use serde::Serialize;
    use serde_wasm_bindgen::{from_value, Serializer};
    use wasm_bindgen::{prelude::*, JsCast};
    use wasm_bindgen_futures::JsFuture;

    #[wasm_bindgen(inline_js = r#"
function host() {
  return typeof window !== 'undefined' && window.openai ? window.openai : null;
}

const HANDLERS = new Map();
let NEXT_HANDLER = 1;

export function jsOaGet(key) {
  const h = host();
  if (!h) return null;
  const value = h[key];
  return value === undefined ? null : value;
}

export async function jsOaCall(method, args) {
  const h = host();
  if (!h) throw new Error('openai host global is unavailable');
  const fn = h[method];
  if (typeof fn !== 'function') throw new Error('openai host method missing: ' + method);
  return await fn.apply(h, args);
}

export async function jsOaStream(request, onChunk) {
  const h = host();
  if (!h) throw new Error('openai host global is unavailable');
  if (typeof h.streamCompletion !== 'function') {
    throw new Error('openai host method missing: streamCompletion');
  }
  const iterable = await h.streamCompletion(request);
  for await (const chunk of iterable) {
    onChunk(chunk);
  }
}

export function jsOaSubscribe(onChange) {
  const handler = () => onChange();
  window.addEventListener('openai:set_globals', handler);
  const id = NEXT_HANDLER++;
  HANDLERS.set(id, handler);
  return id;
}

export function jsOaUnsubscribe(id) {
  const handler = HANDLERS.get(id);
  if (handler) {
    window.removeEventListener('openai:set_globals', handler);
    HANDLERS.delete(id);
  }
}
"#)]
    extern "C" {
        #[wasm_bindgen(js_name = jsOaGet)]
        fn js_oa_get(key: &str) -> JsValue;
        #[wasm_bindgen(js_name = jsOaCall)]
        fn js_oa_call(method: &str, args: Array) -> Promise;
        #[wasm_bindgen(js_name = jsOaStream)]
        fn js_oa_stream(request: JsValue, on_chunk: &js_sys::Function) -> Promise;
        #[wasm_bindgen(js_name = jsOaSubscribe)]
        fn js_oa_subscribe(on_change: &js_sys::Function) -> u32;
        #[wasm_bindgen(js_name = jsOaUnsubscribe)]
        fn js_oa_unsubscribe(id: u32);
    }

    fn js_error_to_string(err: JsValue) -> String {
        if let Some(text) = err.as_string() {
            return text;
        }
        if let Ok(message) = Reflect::get(&err, &JsValue::from_str("message")) {
            if let Some(text) = message.as_string() {
                return text;
            }
        }
        format!("{err:?}")
    }

    fn to_js(value: &Value) -> Result<JsValue, String> {
        value
            .serialize(&Serializer::json_compatible())
            .map_err(|e| e.to_string())
    }

    async fn await_promise(promise: Promise) -> Result<JsValue, String> {
        JsFuture::from(promise).await.map_err(js_error_to_string)
    }

    pub fn global_present() -> bool {
        web_sys::window()
            .map(|window| {
                let global = Reflect::get(&window, &JsValue::from_str("openai"))
                    .unwrap_or(JsValue::UNDEFINED);
                !global.is_null() && !global.is_undefined()
            })
            .unwrap_or(false)
    }

    pub fn get_global(key: &str) -> Option<Value> {
        let raw = js_oa_get(key);
        if raw.is_null() || raw.is_undefined() {
            return None;
        }
        from_value(raw).ok()
    }

    pub async fn call(method: &str, args: Vec<Value>) -> Result<Value, String> {
        let array = Array::new();
        for arg in &args {
            array.push(&to_js(arg)?);
        }
        let raw = await_promise(js_oa_call(method, array)).await?;
        if raw.is_null() || raw.is_undefined() {
            return Ok(Value::Null);
        }
        from_value(raw).map_err(|e| e.to_string())
    }

    pub async fn upload_file(name: &str, mime: &str, bytes: &[u8]) -> Result<Value, String> {
        let descriptor = Object::new();
        Reflect::set(&descriptor, &"name".into(), &JsValue::from_str(name))
            .map_err(js_error_to_string)?;
        Reflect::set(&descriptor, &"mime".into(), &JsValue::from_str(mime))
            .map_err(js_error_to_string)?;
        Reflect::set(&descriptor, &"data".into(), &Uint8Array::from(bytes))
            .map_err(js_error_to_string)?;

        let args = Array::new();
        args.push(&descriptor);
        let raw = await_promise(js_oa_call("uploadFile", args)).await?;
        from_value(raw).map_err(|e| e.to_string())
    }

    pub async fn stream(request: Value, on_chunk: Rc<dyn Fn(Value)>) -> Result<(), String> {
        let chunk_cb = Closure::<dyn Fn(JsValue)>::new(move |raw: JsValue| {
            if let Ok(chunk) = from_value(raw) {
                on_chunk(chunk);
            }
        });
        let result =
            await_promise(js_oa_stream(to_js(&request)?, chunk_cb.as_ref().unchecked_ref())).await;
        drop(chunk_cb);
        result.map(|_| ())
    }

    pub fn subscribe(listener: Rc<dyn Fn()>) -> GlobalsSubscription {
        let closure = Closure::<dyn Fn()>::new(move || listener());
        let id = js_oa_subscribe(closure.as_ref().unchecked_ref());
        GlobalsSubscription::new(move || {
            js_oa_unsubscribe(id);
            drop(closure);
        })
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use super::*;

    fn unsupported() -> String {
        "openai host global is only available when compiled for wasm32".to_string()
    }

    pub fn global_present() -> bool {
        false
    }

    pub fn get_global(_key: &str) -> Option<Value> {
        None
    }

    pub async fn call(_method: &str, _args: Vec<Value>) -> Result<Value, String> {
        Err(unsupported())
    }

    pub async fn upload_file(_name: &str, _mime: &str, _bytes: &[u8]) -> Result<Value, String> {
        Err(unsupported())
    }

    pub async fn stream(_request: Value, _on_chunk: Rc<dyn Fn(Value)>) -> Result<(), String> {
        Err(unsupported())
    }

    pub fn subscribe(_listener: Rc<dyn Fn()>) -> GlobalsSubscription {
        GlobalsSubscription::inert()
    }
}

/// Returns whether the first-host global object is present.
pub fn openai_global_present() -> bool {
    imp::global_present()
}

fn typed_global<T: serde::de::DeserializeOwned>(key: &str) -> Option<T> {
    imp::get_global(key).and_then(|value| serde_json::from_value(value).ok())
}

fn safe_area_global() -> Option<SafeAreaInsets> {
    let raw = imp::get_global("safeArea")?;
    // Hosts report either the bare inset record or an `{insets: …}` wrapper.
    if let Ok(insets) = serde_json::from_value::<SafeAreaInsets>(raw.clone()) {
        return Some(insets);
    }
    raw.get("insets")
        .cloned()
        .and_then(|inner| serde_json::from_value(inner).ok())
}

/// First-host global object reached through the browser bridge.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebOpenAiGlobals;

impl OpenAiGlobals for WebOpenAiGlobals {
    fn theme(&self) -> Option<Theme> {
        typed_global("theme")
    }

    fn display_mode(&self) -> Option<DisplayMode> {
        typed_global("displayMode")
    }

    fn locale(&self) -> Option<String> {
        typed_global("locale")
    }

    fn safe_area(&self) -> Option<SafeAreaInsets> {
        safe_area_global()
    }

    fn max_width(&self) -> Option<f64> {
        typed_global("maxWidth")
    }

    fn max_height(&self) -> Option<f64> {
        typed_global("maxHeight")
    }

    fn tool_input(&self) -> Option<Value> {
        imp::get_global("toolInput")
    }

    fn tool_output(&self) -> Option<Value> {
        imp::get_global("toolOutput")
    }

    fn response_metadata(&self) -> Option<Value> {
        imp::get_global("toolResponseMetadata")
    }

    fn widget_state(&self) -> Option<Value> {
        imp::get_global("widgetState")
    }

    fn widget_props(&self) -> Option<Value> {
        imp::get_global("widgetProps")
    }

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        args: Value,
    ) -> OpenAiFuture<'a, Result<Value, String>> {
        Box::pin(async move { imp::call("callTool", vec![Value::from(name), args]).await })
    }

    fn send_followup_message<'a>(
        &'a self,
        text: &'a str,
    ) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move {
            imp::call(
                "sendFollowUpMessage",
                vec![serde_json::json!({"prompt": text})],
            )
            .await
            .map(|_| ())
        })
    }

    fn open_external<'a>(&'a self, url: &'a str) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move {
            imp::call("openExternal", vec![serde_json::json!({"href": url})])
                .await
                .map(|_| ())
        })
    }

    fn set_open_in_app_url<'a>(&'a self, url: &'a str) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move {
            imp::call("setOpenInAppUrl", vec![Value::from(url)])
                .await
                .map(|_| ())
        })
    }

    fn request_display_mode<'a>(
        &'a self,
        mode: DisplayMode,
    ) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move {
            imp::call("requestDisplayMode", vec![serde_json::json!({"mode": mode})])
                .await
                .map(|_| ())
        })
    }

    fn request_close<'a>(&'a self) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move { imp::call("requestClose", Vec::new()).await.map(|_| ()) })
    }

    fn notify_intrinsic_height<'a>(
        &'a self,
        height_px: u32,
    ) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move {
            imp::call(
                "notifyIntrinsicHeight",
                vec![serde_json::json!({"height": height_px})],
            )
            .await
            .map(|_| ())
        })
    }

    fn upload_file<'a>(
        &'a self,
        name: &'a str,
        mime: &'a str,
        bytes: Vec<u8>,
    ) -> OpenAiFuture<'a, Result<String, String>> {
        Box::pin(async move {
            let raw = imp::upload_file(name, mime, &bytes).await?;
            raw.as_str()
                .map(str::to_string)
                .or_else(|| raw.get("id").and_then(Value::as_str).map(str::to_string))
                .ok_or_else(|| "uploadFile returned no file id".to_string())
        })
    }

    fn get_file_download_url<'a>(
        &'a self,
        file_id: &'a str,
    ) -> OpenAiFuture<'a, Result<String, String>> {
        Box::pin(async move {
            let raw = imp::call(
                "getFileDownloadUrl",
                vec![serde_json::json!({"fileId": file_id})],
            )
            .await?;
            raw.as_str()
                .map(str::to_string)
                .or_else(|| raw.get("url").and_then(Value::as_str).map(str::to_string))
                .ok_or_else(|| "getFileDownloadUrl returned no url".to_string())
        })
    }

    fn set_widget_state<'a>(&'a self, state: Value) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move { imp::call("setWidgetState", vec![state]).await.map(|_| ()) })
    }

    fn update_widget_state<'a>(&'a self, patch: Value) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move {
            imp::call("updateWidgetState", vec![patch])
                .await
                .map(|_| ())
        })
    }

    fn share<'a>(&'a self, payload: SharePayload) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let payload = serde_json::to_value(&payload).map_err(|e| e.to_string())?;
            imp::call("share", vec![payload]).await.map(|_| ())
        })
    }

    fn call_completion<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> OpenAiFuture<'a, Result<Value, String>> {
        Box::pin(async move {
            let request = serde_json::to_value(&request).map_err(|e| e.to_string())?;
            imp::call("callCompletion", vec![request]).await
        })
    }

    fn stream_completion<'a>(
        &'a self,
        request: CompletionRequest,
        on_chunk: Rc<dyn Fn(Value)>,
    ) -> OpenAiFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let request = serde_json::to_value(&request).map_err(|e| e.to_string())?;
            imp::stream(request, on_chunk).await
        })
    }

    fn subscribe_globals(&self, listener: Rc<dyn Fn()>) -> GlobalsSubscription {
        imp::subscribe(listener)
    }
}
