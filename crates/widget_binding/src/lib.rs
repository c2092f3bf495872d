//! Leptos binding over the unified widget-host interface.
//!
//! [`use_unified_app`] detects the ambient platform, attaches the matching
//! adapter from `widget_host_web`, and mirrors every host push into signals.
//! The push, merge, and lifecycle rules live in the pure [`state`] machine so
//! they stay testable off-target.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod binding;
pub mod state;

pub use binding::{use_unified_app, use_unified_app_with, UnifiedAppHandle};
pub use state::{BindingEvent, BindingState, ConnectionPhase, GlobalsSnapshot};
