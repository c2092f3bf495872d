//! Collaborator contracts for the second host's handshake-based client.

use std::{
    cell::RefCell,
    future::Future,
    pin::Pin,
    rc::Rc,
};

use serde_json::{json, Value};

use crate::{
    config::{AppIdentity, CapabilityDeclaration, LogLevel},
    context::{HostContext, HostContextUpdate},
    tool_result::ToolResult,
};

/// Object-safe boxed future used by the MCP contracts.
pub type McpFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Connected second-host client surface.
///
/// Results arrive already normalized from this host; failures surface the
/// transport's raw error text.
pub trait McpClient {
    /// Host context reported at connect time.
    fn host_context(&self) -> Option<HostContext>;

    /// Calls a server tool.
    fn call_server_tool<'a>(
        &'a self,
        name: &'a str,
        args: Value,
    ) -> McpFuture<'a, Result<ToolResult, String>>;

    /// Sends a conversational message; the abort token is forwarded
    /// uninterpreted.
    fn send_message<'a>(
        &'a self,
        text: &'a str,
        abort: Option<Value>,
    ) -> McpFuture<'a, Result<(), String>>;

    /// Sends a log line to the host.
    fn send_log<'a>(
        &'a self,
        level: LogLevel,
        message: &'a str,
        data: Option<Value>,
    ) -> McpFuture<'a, Result<(), String>>;

    /// Opens a link through the host.
    fn open_link<'a>(&'a self, url: &'a str) -> McpFuture<'a, Result<(), String>>;

    /// Closes the underlying transport. Idempotent.
    fn close(&self);
}

impl std::fmt::Debug for dyn McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn McpClient")
    }
}

/// Callback slots the binding registers before initiating the connect.
#[derive(Clone, Default)]
pub struct McpCallbacks {
    /// Host tore the connection down.
    pub on_teardown: Option<Rc<dyn Fn()>>,
    /// Host pushed new tool input.
    pub on_tool_input: Option<Rc<dyn Fn(Value)>>,
    /// Host pushed a tool result.
    pub on_tool_result: Option<Rc<dyn Fn(ToolResult)>>,
    /// Host reported an error outside any pending call.
    pub on_error: Option<Rc<dyn Fn(String)>>,
    /// Host pushed a partial context update.
    pub on_host_context_changed: Option<Rc<dyn Fn(HostContextUpdate)>>,
}

/// Connect request carrying app metadata, declared capabilities, and the
/// callback slots.
#[derive(Clone)]
pub struct McpConnectRequest {
    /// Widget identity reported in the handshake.
    pub identity: AppIdentity,
    /// Declared capability set.
    pub capabilities: CapabilityDeclaration,
    /// Callback slots, registered before connect is initiated.
    pub callbacks: McpCallbacks,
}

/// Builds the parent-frame transport and performs the connection handshake.
pub trait McpConnector {
    /// Registers the request's callbacks, then awaits the handshake.
    fn connect<'a>(
        &'a self,
        request: McpConnectRequest,
    ) -> McpFuture<'a, Result<Rc<dyn McpClient>, String>>;
}

#[derive(Default)]
struct MemoryMcpClientInner {
    host_context: Option<HostContext>,
    tool_result: Option<ToolResult>,
    calls: Vec<(String, Value)>,
    closed: bool,
}

/// In-memory second-host client that records calls.
#[derive(Clone, Default)]
pub struct MemoryMcpClient {
    inner: Rc<RefCell<MemoryMcpClientInner>>,
}

impl MemoryMcpClient {
    /// Builds a client reporting the given connect-time context.
    pub fn with_host_context(context: HostContext) -> Self {
        let client = Self::default();
        client.inner.borrow_mut().host_context = Some(context);
        client
    }

    /// Sets the result returned by `call_server_tool`.
    pub fn set_tool_result(&self, result: ToolResult) {
        self.inner.borrow_mut().tool_result = Some(result);
    }

    /// Returns the recorded `(method, payload)` call log.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.inner.borrow().calls.clone()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.borrow().closed
    }

    fn record(&self, method: &str, payload: Value) {
        self.inner
            .borrow_mut()
            .calls
            .push((method.to_string(), payload));
    }
}

impl McpClient for MemoryMcpClient {
    fn host_context(&self) -> Option<HostContext> {
        self.inner.borrow().host_context.clone()
    }

    fn call_server_tool<'a>(
        &'a self,
        name: &'a str,
        args: Value,
    ) -> McpFuture<'a, Result<ToolResult, String>> {
        Box::pin(async move {
            self.record("tools/call", json!({"name": name, "arguments": args}));
            Ok(self
                .inner
                .borrow()
                .tool_result
                .clone()
                .unwrap_or_else(|| ToolResult::text("ok")))
        })
    }

    fn send_message<'a>(
        &'a self,
        text: &'a str,
        abort: Option<Value>,
    ) -> McpFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.record("message/send", json!({"text": text, "abort": abort}));
            Ok(())
        })
    }

    fn send_log<'a>(
        &'a self,
        level: LogLevel,
        message: &'a str,
        data: Option<Value>,
    ) -> McpFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.record(
                "logging/log",
                json!({"level": level.as_str(), "message": message, "data": data}),
            );
            Ok(())
        })
    }

    fn open_link<'a>(&'a self, url: &'a str) -> McpFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.record("links/open", json!({"url": url}));
            Ok(())
        })
    }

    fn close(&self) {
        self.inner.borrow_mut().closed = true;
    }
}

#[derive(Default)]
struct MemoryMcpConnectorInner {
    client: Option<MemoryMcpClient>,
    error: Option<String>,
    callbacks: Option<McpCallbacks>,
    connect_requests: Vec<(AppIdentity, CapabilityDeclaration)>,
}

/// In-memory connector that resolves or rejects deterministically and keeps
/// the registered callbacks so tests can trigger host pushes.
#[derive(Clone, Default)]
pub struct MemoryMcpConnector {
    inner: Rc<RefCell<MemoryMcpConnectorInner>>,
}

impl MemoryMcpConnector {
    /// Connector whose handshake resolves with `client`.
    pub fn resolving(client: MemoryMcpClient) -> Self {
        let connector = Self::default();
        connector.inner.borrow_mut().client = Some(client);
        connector
    }

    /// Connector whose handshake rejects with `message`.
    pub fn rejecting(message: &str) -> Self {
        let connector = Self::default();
        connector.inner.borrow_mut().error = Some(message.to_string());
        connector
    }

    /// Callbacks registered by the most recent connect, if any.
    pub fn callbacks(&self) -> Option<McpCallbacks> {
        self.inner.borrow().callbacks.clone()
    }

    /// Identity/capability pairs seen by the connector.
    pub fn connect_requests(&self) -> Vec<(AppIdentity, CapabilityDeclaration)> {
        self.inner.borrow().connect_requests.clone()
    }
}

impl McpConnector for MemoryMcpConnector {
    fn connect<'a>(
        &'a self,
        request: McpConnectRequest,
    ) -> McpFuture<'a, Result<Rc<dyn McpClient>, String>> {
        Box::pin(async move {
            let mut inner = self.inner.borrow_mut();
            inner.callbacks = Some(request.callbacks.clone());
            inner
                .connect_requests
                .push((request.identity.clone(), request.capabilities.clone()));
            if let Some(message) = inner.error.clone() {
                return Err(message);
            }
            let client = inner.client.clone().unwrap_or_default();
            Ok(Rc::new(client) as Rc<dyn McpClient>)
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use serde_json::json;

    use super::*;

    fn request() -> McpConnectRequest {
        McpConnectRequest {
            identity: AppIdentity::new("counter", "1.0.0"),
            capabilities: CapabilityDeclaration::default(),
            callbacks: McpCallbacks::default(),
        }
    }

    #[test]
    fn resolving_connector_registers_callbacks_before_success() {
        let connector = MemoryMcpConnector::resolving(MemoryMcpClient::default());
        let client = block_on(connector.connect(request())).expect("connect");
        assert!(connector.callbacks().is_some());
        assert_eq!(
            connector.connect_requests()[0].0,
            AppIdentity::new("counter", "1.0.0")
        );
        assert_eq!(client.host_context(), None);
    }

    #[test]
    fn rejecting_connector_still_registers_callbacks() {
        let connector = MemoryMcpConnector::rejecting("no parent frame");
        let err = block_on(connector.connect(request())).expect_err("rejects");
        assert_eq!(err, "no parent frame");
        assert!(connector.callbacks().is_some());
    }

    #[test]
    fn memory_client_records_calls_and_close() {
        let client = MemoryMcpClient::default();
        block_on(client.call_server_tool("counter", json!({"op": "inc"}))).expect("call");
        block_on(client.open_link("https://example.com")).expect("open");
        client.close();

        let calls = client.calls();
        assert_eq!(calls[0].0, "tools/call");
        assert_eq!(calls[1].0, "links/open");
        assert!(client.is_closed());
    }
}
