//! Typed host-domain contracts and shared models for the unified widget bridge.
//!
//! This crate is the API-first boundary between widget code and the two host
//! client surfaces it can run against: the chat platform's injected global
//! object ("openai") and the apps-protocol client reached over a parent-frame
//! transport ("mcp"). Concrete browser wiring lives in `widget_host_web`;
//! reactive signal wiring lives in `widget_binding`.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod mcp;
pub mod openai;
pub mod platform;
pub mod tool_result;

pub use app::{
    AppFuture, CompletionRequest, DetachedApp, FileUploadResult, SendOutcome, SharePayload,
    UnifiedApp,
};
pub use config::{AppCallbacks, AppConfig, AppIdentity, CapabilityDeclaration, LogLevel};
pub use context::{DisplayMode, HostContext, HostContextUpdate, SafeAreaInsets, Theme};
pub use error::HostError;
pub use mcp::{
    McpCallbacks, McpClient, McpConnectRequest, McpConnector, McpFuture, MemoryMcpClient,
    MemoryMcpConnector,
};
pub use openai::{
    compose_openai_context, GlobalsSubscription, MemoryOpenAiGlobals, OpenAiFuture, OpenAiGlobals,
};
pub use platform::{effective_platform, Platform};
pub use tool_result::{merge_widget_state, normalize_tool_result, ContentPart, ToolResult};
