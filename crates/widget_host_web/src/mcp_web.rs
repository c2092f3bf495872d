//! Parent-frame message transport for the second host.
//!
//! The host embeds the widget in an iframe and speaks JSON-RPC 2.0 over
//! `postMessage`. The JS shim owns the per-connection pending-request map
//! and the window message listener; Rust sees a numeric connection handle,
//! awaited promises for requests, and a single notification callback for
//! host-initiated pushes.

use std::rc::Rc;

use widget_host::{McpClient, McpConnectRequest, McpConnector, McpFuture};

#[cfg(target_arch = "wasm32")]
mod imp {
    use super::*;
    use std::cell::RefCell;

    use js_sys::{Promise, Reflect};
    use serde::Serialize;
    use serde_json::Value;
    use serde_wasm_bindgen::{from_value, Serializer};
    use wasm_bindgen::{prelude::*, JsCast};
    use wasm_bindgen_futures::JsFuture;

    use widget_host::{
        normalize_tool_result, HostContext, HostContextUpdate, LogLevel, McpCallbacks, ToolResult,
    };

    #[wasm_bindgen(inline_js = r#"
const CONNECTIONS = new Map();
let NEXT_CONNECTION = 1;
let NEXT_REQUEST = 1;

export function jsMcpConnect(params, onNotify) {
  return new Promise((resolve, reject) => {
    if (typeof window === 'undefined' || !window.parent || window.parent === window) {
      reject(new Error('no parent frame to connect to'));
      return;
    }
    const conn = { pending: new Map(), closed: false };
    conn.listener = (event) => {
      const msg = event.data;
      if (!msg || msg.jsonrpc !== '2.0') return;
      if (msg.id !== undefined && conn.pending.has(msg.id)) {
        const entry = conn.pending.get(msg.id);
        conn.pending.delete(msg.id);
        if (msg.error) {
          entry.reject(new Error(msg.error.message || 'host request failed'));
        } else {
          entry.resolve(msg.result === undefined ? null : msg.result);
        }
      } else if (msg.method) {
        onNotify(msg.method, JSON.stringify(msg.params === undefined ? null : msg.params));
      }
    };
    window.addEventListener('message', conn.listener);
    const handle = NEXT_CONNECTION++;
    CONNECTIONS.set(handle, conn);
    const requestId = 'init-' + handle;
    conn.pending.set(requestId, {
      resolve: (result) => resolve({ handle, result }),
      reject: (err) => {
        jsMcpClose(handle);
        reject(err);
      },
    });
    window.parent.postMessage(
      { jsonrpc: '2.0', id: requestId, method: 'initialize', params },
      '*'
    );
  });
}

export function jsMcpRequest(handle, method, params) {
  return new Promise((resolve, reject) => {
    const conn = CONNECTIONS.get(handle);
    if (!conn || conn.closed) {
      reject(new Error('connection is closed'));
      return;
    }
    const id = 'req-' + NEXT_REQUEST++;
    conn.pending.set(id, { resolve, reject });
    window.parent.postMessage({ jsonrpc: '2.0', id, method, params }, '*');
  });
}

export function jsMcpClose(handle) {
  const conn = CONNECTIONS.get(handle);
  if (!conn) return;
  conn.closed = true;
  window.removeEventListener('message', conn.listener);
  for (const entry of conn.pending.values()) {
    entry.reject(new Error('connection is closed'));
  }
  conn.pending.clear();
  CONNECTIONS.delete(handle);
}
"#)]
    extern "C" {
        #[wasm_bindgen(js_name = jsMcpConnect)]
        fn js_mcp_connect(params: JsValue, on_notify: &js_sys::Function) -> Promise;
        #[wasm_bindgen(js_name = jsMcpRequest)]
        fn js_mcp_request(handle: u32, method: &str, params: JsValue) -> Promise;
        #[wasm_bindgen(js_name = jsMcpClose)]
        fn js_mcp_close(handle: u32);
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

    fn dispatch_notification(callbacks: &McpCallbacks, closed: &Rc<RefCell<bool>>, method: &str, params: Value) {
        match method {
            "apps/toolInput" => {
                if let Some(on_tool_input) = &callbacks.on_tool_input {
                    let input = params.get("toolInput").cloned().unwrap_or(params);
                    on_tool_input(input);
                }
            }
            "apps/toolResult" => {
                if let Some(on_tool_result) = &callbacks.on_tool_result {
                    on_tool_result(normalize_tool_result(&params));
                }
            }
            "apps/hostContextChanged" => {
                if let Some(on_changed) = &callbacks.on_host_context_changed {
                    let raw = params.get("hostContext").cloned().unwrap_or(params);
                    match serde_json::from_value::<HostContextUpdate>(raw) {
                        Ok(update) => on_changed(update),
                        Err(err) => {
                            if let Some(on_error) = &callbacks.on_error {
                                on_error(format!("malformed host context update: {err}"));
                            }
                        }
                    }
                }
            }
            "apps/teardown" => {
                *closed.borrow_mut() = true;
                if let Some(on_teardown) = &callbacks.on_teardown {
                    on_teardown();
                }
            }
            "apps/error" => {
                if let Some(on_error) = &callbacks.on_error {
                    let message = params
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("host reported an error")
                        .to_string();
                    on_error(message);
                }
            }
            _ => {}
        }
    }

    /// Connected client over one parent-frame JSON-RPC channel.
    pub struct WebMcpClient {
        handle: u32,
        host_context: Option<HostContext>,
        closed: Rc<RefCell<bool>>,
        // Keeps the notification callback alive for the connection lifetime.
        _notify: Closure<dyn Fn(String, String)>,
    }

    impl WebMcpClient {
        async fn request(&self, method: &str, params: Value) -> Result<Value, String> {
            if *self.closed.borrow() {
                return Err("connection is closed".to_string());
            }
            let raw = await_promise(js_mcp_request(self.handle, method, to_js(&params)?)).await?;
            if raw.is_null() || raw.is_undefined() {
                return Ok(Value::Null);
            }
            from_value(raw).map_err(|e| e.to_string())
        }
    }

    impl McpClient for WebMcpClient {
        fn host_context(&self) -> Option<HostContext> {
            self.host_context.clone()
        }

        fn call_server_tool<'a>(
            &'a self,
            name: &'a str,
            args: Value,
        ) -> McpFuture<'a, Result<ToolResult, String>> {
            Box::pin(async move {
                let raw = self
                    .request("tools/call", serde_json::json!({"name": name, "arguments": args}))
                    .await?;
                Ok(normalize_tool_result(&raw))
            })
        }

        fn send_message<'a>(
            &'a self,
            text: &'a str,
            abort: Option<Value>,
        ) -> McpFuture<'a, Result<(), String>> {
            Box::pin(async move {
                self.request(
                    "message/send",
                    serde_json::json!({"text": text, "abort": abort}),
                )
                .await
                .map(|_| ())
            })
        }

        fn send_log<'a>(
            &'a self,
            level: LogLevel,
            message: &'a str,
            data: Option<Value>,
        ) -> McpFuture<'a, Result<(), String>> {
            Box::pin(async move {
                self.request(
                    "logging/log",
                    serde_json::json!({
                        "level": level.as_str(),
                        "message": message,
                        "data": data,
                    }),
                )
                .await
                .map(|_| ())
            })
        }

        fn open_link<'a>(&'a self, url: &'a str) -> McpFuture<'a, Result<(), String>> {
            Box::pin(async move {
                self.request("links/open", serde_json::json!({"url": url}))
                    .await
                    .map(|_| ())
            })
        }

        fn close(&self) {
            let mut closed = self.closed.borrow_mut();
            if *closed {
                return;
            }
            *closed = true;
            js_mcp_close(self.handle);
        }
    }

    impl Drop for WebMcpClient {
        fn drop(&mut self) {
            self.close();
        }
    }

    pub async fn connect(request: McpConnectRequest) -> Result<Rc<dyn McpClient>, String> {
        let params = serde_json::json!({
            "app": request.identity,
            "capabilities": request.capabilities,
        });

        let callbacks = request.callbacks;
        let closed = Rc::new(RefCell::new(false));
        let closed_in = Rc::clone(&closed);
        let notify = Closure::<dyn Fn(String, String)>::new(move |method: String, params: String| {
            let params: Value = serde_json::from_str(&params).unwrap_or(Value::Null);
            dispatch_notification(&callbacks, &closed_in, &method, params);
        });

        let raw = await_promise(js_mcp_connect(
            to_js(&params)?,
            notify.as_ref().unchecked_ref(),
        ))
        .await?;

        let handle = Reflect::get(&raw, &JsValue::from_str("handle"))
            .ok()
            .and_then(|v| v.as_f64())
            .ok_or_else(|| "handshake returned no connection handle".to_string())?
            as u32;
        let result: Value = Reflect::get(&raw, &JsValue::from_str("result"))
            .ok()
            .and_then(|v| from_value(v).ok())
            .unwrap_or(Value::Null);
        let host_context = result
            .get("hostContext")
            .cloned()
            .and_then(|raw| serde_json::from_value(raw).ok());

        Ok(Rc::new(WebMcpClient {
            handle,
            host_context,
            closed,
            _notify: notify,
        }) as Rc<dyn McpClient>)
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use super::*;

    pub async fn connect(_request: McpConnectRequest) -> Result<Rc<dyn McpClient>, String> {
        Err("mcp transport is only available when compiled for wasm32".to_string())
    }
}

/// Connector that performs the parent-frame handshake in the browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMcpConnector;

impl McpConnector for WebMcpConnector {
    fn connect<'a>(
        &'a self,
        request: McpConnectRequest,
    ) -> McpFuture<'a, Result<Rc<dyn McpClient>, String>> {
        Box::pin(imp::connect(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use widget_host::{AppIdentity, CapabilityDeclaration, McpCallbacks};

    #[test]
    fn non_wasm_connect_rejects_with_target_message() {
        let connector = WebMcpConnector;
        let request = McpConnectRequest {
            identity: AppIdentity::new("counter", "1.0.0"),
            capabilities: CapabilityDeclaration::default(),
            callbacks: McpCallbacks::default(),
        };
        let err = futures::executor::block_on(connector.connect(request)).expect_err("off-target");
        assert!(err.contains("wasm32"));
    }
}
