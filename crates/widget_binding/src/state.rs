//! Pure connection and snapshot state machine behind the reactive hook.
//!
//! The hook feeds every host push and local mutation through
//! [`BindingState::apply`] so the merge, null-push, and one-shot-connection
//! rules are testable without a signal runtime.

use serde_json::Value;

use widget_host::{
    effective_platform, merge_widget_state, DisplayMode, HostContext, HostContextUpdate, Platform,
    SafeAreaInsets, Theme, ToolResult,
};

/// Connection lifecycle phase. The handshake is one-shot: once the machine
/// reaches `Connected`, `Failed`, or `TornDown` no later connection event
/// moves it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// No connection attempt has started.
    Idle,
    /// The second-host handshake is in flight.
    Connecting,
    /// A host surface is attached and usable.
    Connected,
    /// The handshake failed; carries the reported failure text.
    Failed(String),
    /// The host tore the connection down.
    TornDown,
}

/// Snapshot of every first-host global the binding mirrors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalsSnapshot {
    /// Composed host context.
    pub context: Option<HostContext>,
    /// Tool input global.
    pub tool_input: Option<Value>,
    /// Tool output global.
    pub tool_output: Option<Value>,
    /// Response metadata global.
    pub response_metadata: Option<Value>,
    /// Persisted widget state global.
    pub widget_state: Option<Value>,
    /// Render-time props global.
    pub widget_props: Option<Value>,
}

/// One host push or local mutation applied to the binding state.
#[derive(Debug, Clone)]
pub enum BindingEvent {
    /// The first-host global was found and its snapshot read.
    OpenAiAttached(GlobalsSnapshot),
    /// The first host fired its globals-changed event.
    GlobalsChanged(GlobalsSnapshot),
    /// The second-host handshake was initiated.
    McpConnecting,
    /// The second-host handshake resolved.
    McpConnected {
        /// Context reported in the handshake result.
        host_context: Option<HostContext>,
    },
    /// The second-host handshake rejected.
    McpFailed {
        /// Reported failure text.
        message: String,
    },
    /// The second host pushed new tool input.
    ToolInputPushed(Value),
    /// The second host pushed a tool result.
    ToolResultPushed(ToolResult),
    /// The second host pushed a partial context update.
    HostContextChanged(HostContextUpdate),
    /// The widget replaced its own persisted state.
    WidgetStateReplaced(Value),
    /// The widget merged a patch into its persisted state.
    WidgetStatePatched(Value),
    /// The connection was torn down.
    TornDown,
}

/// Mirrored host state driving the binding's signals.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingState {
    /// Raw detection result, fixed at hook setup.
    pub detected: Platform,
    /// Connection lifecycle phase.
    pub phase: ConnectionPhase,
    mcp_connected: bool,
    /// Latest host context.
    pub host_context: Option<HostContext>,
    /// Latest tool input.
    pub tool_input: Option<Value>,
    /// Latest tool output.
    pub tool_output: Option<Value>,
    /// Latest response metadata.
    pub response_metadata: Option<Value>,
    /// Latest persisted widget state.
    pub widget_state: Option<Value>,
    /// Latest render-time props.
    pub widget_props: Option<Value>,
    /// Props captured once at connect time.
    pub initial_props: Option<Value>,
    /// Most recent pushed tool result.
    pub tool_result: Option<ToolResult>,
}

fn baseline_context() -> HostContext {
    HostContext {
        theme: Theme::Light,
        display_mode: DisplayMode::Inline,
        locale: "en".to_string(),
        safe_area: SafeAreaInsets::default(),
        max_width: None,
        max_height: None,
    }
}

impl BindingState {
    /// Fresh state for a detection result.
    pub fn new(detected: Platform) -> Self {
        Self {
            detected,
            phase: ConnectionPhase::Idle,
            mcp_connected: false,
            host_context: None,
            tool_input: None,
            tool_output: None,
            response_metadata: None,
            widget_state: None,
            widget_props: None,
            initial_props: None,
            tool_result: None,
        }
    }

    /// Platform exposed to consumers.
    pub fn platform(&self) -> Platform {
        effective_platform(self.detected, self.mcp_connected)
    }

    /// Whether a host surface is attached and usable.
    pub fn is_connected(&self) -> bool {
        self.phase == ConnectionPhase::Connected
    }

    /// Handshake failure text, if the connection attempt failed.
    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            ConnectionPhase::Failed(message) => Some(message),
            _ => None,
        }
    }

    fn absorb_snapshot(&mut self, snapshot: GlobalsSnapshot) {
        self.host_context = snapshot.context;
        self.tool_input = snapshot.tool_input;
        self.tool_output = snapshot.tool_output;
        self.response_metadata = snapshot.response_metadata;
        self.widget_props = snapshot.widget_props;
        // A null widget-state push never clears locally held state.
        if snapshot.widget_state.is_some() {
            self.widget_state = snapshot.widget_state;
        }
    }

    /// Applies one event. Events that are invalid in the current phase are
    /// dropped rather than treated as errors.
    pub fn apply(&mut self, event: BindingEvent) {
        if self.phase == ConnectionPhase::TornDown {
            return;
        }
        match event {
            BindingEvent::OpenAiAttached(snapshot) => {
                self.detected = Platform::OpenAi;
                self.phase = ConnectionPhase::Connected;
                self.absorb_snapshot(snapshot);
                self.initial_props = self.widget_props.clone();
                // A host with no persisted state seeds it from the tool
                // output that rendered the widget.
                if self.widget_state.is_none() {
                    self.widget_state = self.tool_output.clone();
                }
            }
            BindingEvent::GlobalsChanged(snapshot) => {
                if self.phase == ConnectionPhase::Connected {
                    self.absorb_snapshot(snapshot);
                }
            }
            BindingEvent::McpConnecting => {
                if self.phase == ConnectionPhase::Idle {
                    self.phase = ConnectionPhase::Connecting;
                }
            }
            BindingEvent::McpConnected { host_context } => {
                if self.phase == ConnectionPhase::Connecting {
                    self.phase = ConnectionPhase::Connected;
                    self.mcp_connected = true;
                    if host_context.is_some() {
                        self.host_context = host_context;
                    }
                }
            }
            BindingEvent::McpFailed { message } => {
                if self.phase == ConnectionPhase::Connecting {
                    self.phase = ConnectionPhase::Failed(message);
                }
            }
            BindingEvent::ToolInputPushed(value) => {
                self.tool_input = Some(value);
            }
            BindingEvent::ToolResultPushed(result) => {
                self.tool_result = Some(result);
            }
            BindingEvent::HostContextChanged(update) => {
                let base = self.host_context.clone().unwrap_or_else(baseline_context);
                self.host_context = Some(base.merged(&update));
            }
            BindingEvent::WidgetStateReplaced(state) => {
                self.widget_state = Some(state);
            }
            BindingEvent::WidgetStatePatched(patch) => {
                self.widget_state =
                    Some(merge_widget_state(self.widget_state.as_ref(), &patch));
            }
            BindingEvent::TornDown => {
                self.phase = ConnectionPhase::TornDown;
                self.mcp_connected = false;
            }
        }
    }
}

impl Default for BindingState {
    fn default() -> Self {
        Self::new(Platform::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn snapshot(widget_state: Option<Value>) -> GlobalsSnapshot {
        GlobalsSnapshot {
            context: Some(baseline_context()),
            tool_input: Some(json!({"q": "hi"})),
            widget_state,
            ..GlobalsSnapshot::default()
        }
    }

    #[test]
    fn openai_attach_connects_and_mirrors_the_snapshot() {
        let mut state = BindingState::new(Platform::OpenAi);
        state.apply(BindingEvent::OpenAiAttached(snapshot(Some(json!({"n": 1})))));

        assert_eq!(state.phase, ConnectionPhase::Connected);
        assert_eq!(state.platform(), Platform::OpenAi);
        assert_eq!(state.widget_state, Some(json!({"n": 1})));
        assert_eq!(state.tool_input, Some(json!({"q": "hi"})));
    }

    #[test]
    fn tool_output_seeds_widget_state_when_none_is_persisted() {
        let mut state = BindingState::new(Platform::OpenAi);
        state.apply(BindingEvent::OpenAiAttached(GlobalsSnapshot {
            tool_output: Some(json!({"status": true, "value": 42})),
            ..GlobalsSnapshot::default()
        }));

        assert!(state.is_connected());
        assert_eq!(state.platform(), Platform::OpenAi);
        assert_eq!(state.widget_state, Some(json!({"status": true, "value": 42})));
    }

    #[test]
    fn absent_tool_output_and_state_stay_none_after_connect() {
        let mut state = BindingState::new(Platform::OpenAi);
        state.apply(BindingEvent::OpenAiAttached(GlobalsSnapshot::default()));

        assert!(state.is_connected());
        assert_eq!(state.widget_state, None);
    }

    #[test]
    fn initial_props_are_captured_once_at_connect() {
        let mut state = BindingState::new(Platform::OpenAi);
        state.apply(BindingEvent::OpenAiAttached(GlobalsSnapshot {
            widget_props: Some(json!({"v": 1})),
            ..GlobalsSnapshot::default()
        }));
        state.apply(BindingEvent::GlobalsChanged(GlobalsSnapshot {
            context: Some(baseline_context()),
            widget_props: Some(json!({"v": 2})),
            ..GlobalsSnapshot::default()
        }));

        assert_eq!(state.initial_props, Some(json!({"v": 1})));
        assert_eq!(state.widget_props, Some(json!({"v": 2})));
    }

    #[test]
    fn null_widget_state_push_keeps_local_state() {
        let mut state = BindingState::new(Platform::OpenAi);
        state.apply(BindingEvent::OpenAiAttached(snapshot(None)));
        state.apply(BindingEvent::WidgetStateReplaced(json!({"n": 2})));
        state.apply(BindingEvent::GlobalsChanged(snapshot(None)));

        assert_eq!(state.widget_state, Some(json!({"n": 2})));
    }

    #[test]
    fn non_null_widget_state_push_wins_over_a_prior_local_write() {
        let mut state = BindingState::new(Platform::OpenAi);
        state.apply(BindingEvent::OpenAiAttached(snapshot(None)));
        state.apply(BindingEvent::WidgetStateReplaced(json!({"value": 1})));
        state.apply(BindingEvent::GlobalsChanged(snapshot(Some(json!({"value": 2})))));

        assert_eq!(state.widget_state, Some(json!({"value": 2})));
    }

    #[test]
    fn widget_state_patch_shallow_merges() {
        let mut state = BindingState::new(Platform::OpenAi);
        state.apply(BindingEvent::WidgetStateReplaced(json!({"a": 1, "b": 1})));
        state.apply(BindingEvent::WidgetStatePatched(json!({"b": 2, "c": 3})));

        assert_eq!(state.widget_state, Some(json!({"a": 1, "b": 2, "c": 3})));
    }

    #[test]
    fn mcp_platform_is_confirmed_only_by_the_handshake() {
        let mut state = BindingState::new(Platform::Unknown);
        assert_eq!(state.platform(), Platform::Unknown);

        state.apply(BindingEvent::McpConnecting);
        assert_eq!(state.platform(), Platform::Unknown);

        state.apply(BindingEvent::McpConnected { host_context: None });
        assert_eq!(state.phase, ConnectionPhase::Connected);
        assert_eq!(state.platform(), Platform::Mcp);
    }

    #[test]
    fn handshake_outcome_is_one_shot() {
        let mut state = BindingState::new(Platform::Unknown);
        state.apply(BindingEvent::McpConnecting);
        state.apply(BindingEvent::McpConnected { host_context: None });

        // A stale rejection after success changes nothing.
        state.apply(BindingEvent::McpFailed {
            message: "late".to_string(),
        });
        assert_eq!(state.phase, ConnectionPhase::Connected);

        let mut failed = BindingState::new(Platform::Unknown);
        failed.apply(BindingEvent::McpConnecting);
        failed.apply(BindingEvent::McpFailed {
            message: "no parent frame".to_string(),
        });
        failed.apply(BindingEvent::McpConnected { host_context: None });
        assert_eq!(
            failed.phase,
            ConnectionPhase::Failed("no parent frame".to_string())
        );
        assert_eq!(failed.platform(), Platform::Unknown);
    }

    #[test]
    fn partial_context_update_merges_over_the_current_record() {
        let mut state = BindingState::new(Platform::Unknown);
        state.apply(BindingEvent::McpConnecting);
        state.apply(BindingEvent::McpConnected {
            host_context: Some(HostContext {
                locale: "de".to_string(),
                ..baseline_context()
            }),
        });
        state.apply(BindingEvent::HostContextChanged(HostContextUpdate {
            theme: Some(Theme::Dark),
            ..HostContextUpdate::default()
        }));

        let context = state.host_context.expect("context");
        assert_eq!(context.theme, Theme::Dark);
        assert_eq!(context.locale, "de");
    }

    #[test]
    fn context_update_without_a_prior_record_starts_from_defaults() {
        let mut state = BindingState::new(Platform::Unknown);
        state.apply(BindingEvent::HostContextChanged(HostContextUpdate {
            theme: Some(Theme::Dark),
            ..HostContextUpdate::default()
        }));

        let context = state.host_context.expect("context");
        assert_eq!(context.theme, Theme::Dark);
        assert_eq!(context.display_mode, DisplayMode::Inline);
        assert_eq!(context.locale, "en");
    }

    #[test]
    fn teardown_is_terminal() {
        let mut state = BindingState::new(Platform::Unknown);
        state.apply(BindingEvent::McpConnecting);
        state.apply(BindingEvent::McpConnected { host_context: None });
        state.apply(BindingEvent::TornDown);

        assert_eq!(state.phase, ConnectionPhase::TornDown);
        assert_eq!(state.platform(), Platform::Unknown);

        state.apply(BindingEvent::ToolInputPushed(json!({"q": "late"})));
        assert_eq!(state.tool_input, None);
    }

    #[test]
    fn pushed_tool_results_are_mirrored() {
        let mut state = BindingState::new(Platform::Unknown);
        state.apply(BindingEvent::ToolResultPushed(ToolResult::text("done")));
        assert_eq!(
            state.tool_result.expect("result").first_text(),
            Some("done")
        );
    }
}
