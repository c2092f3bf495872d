//! Browser (`wasm32`) implementations of the [`widget_host`] contracts.
//!
//! This crate is the concrete browser-side wiring layer: platform detection
//! against the injected first-host global, the wasm bridges for both host
//! client surfaces, and the adapter/factory layer translating the unified
//! capability interface into host-native calls.
//!
//! Bridge bindings are split by host under dedicated modules with a shared
//! wasm/non-wasm `imp` split:
//! - [`openai_web`]: the `window.openai` global and its change event
//! - [`mcp_web`]: the parent-frame message transport and handshake

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

/// Runtime platform detection against the ambient environment.
pub mod detect;
/// Second-host parent-frame transport bridge.
pub mod mcp_web;
/// Adapter over a connected MCP client.
pub mod mcp_app;
/// Adapter over the first-host global object.
pub mod openai_app;
/// First-host global-object bridge.
pub mod openai_web;
/// Platform-erased adapter enum and the synchronous factory.
pub mod adapters;

pub use adapters::{create_unified_app, create_unified_app_with, CreatedApp, UnifiedAppAdapter};
pub use detect::{classify, detect_platform};
pub use mcp_app::McpApp;
pub use mcp_web::WebMcpConnector;
pub use openai_app::{ErrorReporter, OpenAiApp};
pub use openai_web::WebOpenAiGlobals;
