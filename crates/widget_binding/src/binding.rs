//! The reactive hook wiring host pushes into Leptos signals.

use std::rc::Rc;

use leptos::*;
use serde_json::Value;

use widget_host::{
    compose_openai_context, normalize_tool_result, AppConfig, HostContext, HostContextUpdate,
    HostError, McpCallbacks, McpClient, McpConnectRequest, McpConnector, OpenAiGlobals, Platform,
    ToolResult, UnifiedApp,
};
use widget_host_web::{
    create_unified_app_with, detect_platform, ErrorReporter, UnifiedAppAdapter, WebMcpConnector,
    WebOpenAiGlobals,
};

use crate::state::{BindingEvent, BindingState, ConnectionPhase, GlobalsSnapshot};

/// Reactive handle returned by [`use_unified_app`].
///
/// All fields are signals derived from one mirrored state record, so any
/// consumer view tracking them re-renders on the corresponding host push.
#[derive(Clone, Copy)]
pub struct UnifiedAppHandle {
    /// The active adapter. Swapped once when the second-host handshake
    /// resolves; detached until then.
    pub app: RwSignal<Rc<UnifiedAppAdapter>>,
    /// Platform exposed to consumers.
    pub platform: Signal<Platform>,
    /// Connection lifecycle phase.
    pub phase: Signal<ConnectionPhase>,
    /// Whether a host surface is attached and usable.
    pub is_connected: Signal<bool>,
    /// Handshake failure text, if the connection attempt failed.
    pub error: Signal<Option<String>>,
    /// Latest host context.
    pub host_context: Signal<Option<HostContext>>,
    /// Latest tool input.
    pub tool_input: Signal<Option<Value>>,
    /// Latest tool output.
    pub tool_output: Signal<Option<Value>>,
    /// Latest response metadata.
    pub response_metadata: Signal<Option<Value>>,
    /// Latest persisted widget state.
    pub widget_state: Signal<Option<Value>>,
    /// Latest render-time props.
    pub widget_props: Signal<Option<Value>>,
    /// Props captured once at connect time.
    pub initial_props: Signal<Option<Value>>,
    /// Most recent pushed tool result.
    pub tool_result: Signal<Option<ToolResult>>,
    /// Replaces the persisted widget state locally and on the host.
    pub set_widget_state: Callback<Value>,
    /// Shallow-merges a patch locally and pushes the patch to the host.
    pub update_widget_state: Callback<Value>,
}

fn read_snapshot(globals: &dyn OpenAiGlobals) -> GlobalsSnapshot {
    GlobalsSnapshot {
        context: Some(compose_openai_context(globals)),
        tool_input: globals.tool_input(),
        tool_output: globals.tool_output(),
        response_metadata: globals.response_metadata(),
        widget_state: globals.widget_state(),
        widget_props: globals.widget_props(),
    }
}

fn full_context_update(context: &HostContext) -> HostContextUpdate {
    HostContextUpdate {
        theme: Some(context.theme),
        display_mode: Some(context.display_mode),
        locale: Some(context.locale.clone()),
        safe_area: Some(context.safe_area),
        max_width: context.max_width,
        max_height: context.max_height,
    }
}

/// Swaps the connected adapter in and only then flips the connection state,
/// so anything tracking the connected flag always observes the new adapter.
fn attach_connected_client(
    app: RwSignal<Rc<UnifiedAppAdapter>>,
    state: RwSignal<BindingState>,
    client: Rc<dyn McpClient>,
    report_error: ErrorReporter,
) {
    let host_context = client.host_context();
    app.set(Rc::new(UnifiedAppAdapter::mcp(client, report_error)));
    state.update(|s| s.apply(BindingEvent::McpConnected { host_context }));
}

/// Binds a widget to the ambient host environment.
///
/// Must be called inside a Leptos reactive owner; the binding releases its
/// host resources (event listener or transport) when that owner is disposed.
pub fn use_unified_app(config: AppConfig) -> UnifiedAppHandle {
    use_unified_app_with(
        config,
        detect_platform(),
        Rc::new(WebOpenAiGlobals),
        Rc::new(WebMcpConnector),
    )
}

/// Seam taking an explicit detection outcome and host collaborators.
pub fn use_unified_app_with(
    config: AppConfig,
    detected: Platform,
    globals: Rc<dyn OpenAiGlobals>,
    connector: Rc<dyn McpConnector>,
) -> UnifiedAppHandle {
    let state = create_rw_signal(BindingState::new(detected));
    let app = create_rw_signal(Rc::new(UnifiedAppAdapter::detached()));
    let callbacks = config.callbacks.clone();

    let report_error: ErrorReporter = {
        let callbacks = callbacks.clone();
        Rc::new(move |err: &HostError| {
            logging::warn!("widget host error: {err}");
            if let Some(on_error) = &callbacks.on_error {
                on_error(err.to_string());
            }
        })
    };

    match detected {
        Platform::OpenAi => {
            let created =
                create_unified_app_with(detected, Rc::clone(&globals), Rc::clone(&report_error));
            app.set(created.app);
            state.update(|s| {
                s.apply(BindingEvent::OpenAiAttached(read_snapshot(globals.as_ref())))
            });
            if let Some(on_connect) = &callbacks.on_connect {
                on_connect();
            }

            let globals_in = Rc::clone(&globals);
            let callbacks_in = callbacks.clone();
            let subscription = globals.subscribe_globals(Rc::new(move || {
                let previous = state.get_untracked();
                let snapshot = read_snapshot(globals_in.as_ref());

                if let Some(on_host_context) = &callbacks_in.on_host_context {
                    if snapshot.context != previous.host_context {
                        if let Some(context) = &snapshot.context {
                            on_host_context(full_context_update(context));
                        }
                    }
                }
                if let Some(on_tool_input) = &callbacks_in.on_tool_input {
                    if snapshot.tool_input != previous.tool_input {
                        if let Some(input) = &snapshot.tool_input {
                            on_tool_input(input.clone());
                        }
                    }
                }
                if let Some(on_tool_result) = &callbacks_in.on_tool_result {
                    if snapshot.tool_output != previous.tool_output {
                        if let Some(output) = &snapshot.tool_output {
                            on_tool_result(normalize_tool_result(output));
                        }
                    }
                }

                state.update(|s| s.apply(BindingEvent::GlobalsChanged(snapshot)));
            }));
            let subscription = store_value(Some(subscription));
            on_cleanup(move || {
                subscription.update_value(|held| {
                    held.take();
                });
            });
        }
        Platform::Mcp | Platform::Unknown => {
            state.update(|s| s.apply(BindingEvent::McpConnecting));
            let connected_client: StoredValue<Option<Rc<dyn McpClient>>> = store_value(None);

            let mcp_callbacks = McpCallbacks {
                on_teardown: Some(Rc::new({
                    let callbacks = callbacks.clone();
                    move || {
                        state.update(|s| s.apply(BindingEvent::TornDown));
                        app.set(Rc::new(UnifiedAppAdapter::detached()));
                        if let Some(on_teardown) = &callbacks.on_teardown {
                            on_teardown();
                        }
                    }
                })),
                on_tool_input: Some(Rc::new({
                    let callbacks = callbacks.clone();
                    move |value: Value| {
                        state.update(|s| s.apply(BindingEvent::ToolInputPushed(value.clone())));
                        if let Some(on_tool_input) = &callbacks.on_tool_input {
                            on_tool_input(value);
                        }
                    }
                })),
                on_tool_result: Some(Rc::new({
                    let callbacks = callbacks.clone();
                    move |result: ToolResult| {
                        state.update(|s| s.apply(BindingEvent::ToolResultPushed(result.clone())));
                        if let Some(on_tool_result) = &callbacks.on_tool_result {
                            on_tool_result(result);
                        }
                    }
                })),
                on_error: Some(Rc::new({
                    let report = Rc::clone(&report_error);
                    move |message: String| {
                        report(&HostError::host_call(message));
                    }
                })),
                on_host_context_changed: Some(Rc::new({
                    let callbacks = callbacks.clone();
                    move |update: HostContextUpdate| {
                        state.update(|s| {
                            s.apply(BindingEvent::HostContextChanged(update.clone()))
                        });
                        if let Some(on_host_context) = &callbacks.on_host_context {
                            on_host_context(update);
                        }
                    }
                })),
            };

            let request = McpConnectRequest {
                identity: config.identity.clone(),
                capabilities: config.capabilities.clone(),
                callbacks: mcp_callbacks,
            };
            let connector = Rc::clone(&connector);
            let report = Rc::clone(&report_error);
            let callbacks_done = callbacks.clone();
            spawn_local(async move {
                match connector.connect(request).await {
                    Ok(client) => {
                        connected_client.set_value(Some(Rc::clone(&client)));
                        attach_connected_client(app, state, client, report);
                        if let Some(on_connect) = &callbacks_done.on_connect {
                            on_connect();
                        }
                    }
                    Err(message) => {
                        let err = HostError::handshake(message);
                        report(&err);
                        state.update(|s| {
                            s.apply(BindingEvent::McpFailed {
                                message: err.to_string(),
                            })
                        });
                    }
                }
            });

            on_cleanup(move || {
                if let Some(client) = connected_client.get_value() {
                    client.close();
                }
            });
        }
    }

    let set_widget_state = Callback::new(move |value: Value| {
        state.update(|s| s.apply(BindingEvent::WidgetStateReplaced(value.clone())));
        let current = app.get_untracked();
        spawn_local(async move {
            // Failures are reported through the adapter's error reporter.
            let _ = current.set_widget_state(value).await;
        });
    });
    let update_widget_state = Callback::new(move |patch: Value| {
        state.update(|s| s.apply(BindingEvent::WidgetStatePatched(patch.clone())));
        let current = app.get_untracked();
        spawn_local(async move {
            let _ = current.update_widget_state(patch).await;
        });
    });

    UnifiedAppHandle {
        app,
        platform: Signal::derive(move || state.get().platform()),
        phase: Signal::derive(move || state.get().phase.clone()),
        is_connected: Signal::derive(move || state.get().is_connected()),
        error: Signal::derive(move || state.get().error().map(str::to_string)),
        host_context: Signal::derive(move || state.get().host_context),
        tool_input: Signal::derive(move || state.get().tool_input),
        tool_output: Signal::derive(move || state.get().tool_output),
        response_metadata: Signal::derive(move || state.get().response_metadata),
        widget_state: Signal::derive(move || state.get().widget_state),
        widget_props: Signal::derive(move || state.get().widget_props),
        initial_props: Signal::derive(move || state.get().initial_props),
        tool_result: Signal::derive(move || state.get().tool_result),
        set_widget_state,
        update_widget_state,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;

    use widget_host::{
        AppConfig, AppIdentity, MemoryMcpClient, MemoryMcpConnector, MemoryOpenAiGlobals,
    };

    use super::*;

    fn config() -> AppConfig {
        AppConfig::new(AppIdentity::new("counter", "1.0.0"))
    }

    fn bind(detected: Platform, connector: MemoryMcpConnector) -> UnifiedAppHandle {
        use_unified_app_with(
            config(),
            detected,
            Rc::new(MemoryOpenAiGlobals::default()),
            Rc::new(connector),
        )
    }

    #[test]
    fn handshake_failure_surfaces_the_error_signal() {
        let runtime = create_runtime();
        let handle = bind(
            Platform::Unknown,
            MemoryMcpConnector::rejecting("no parent frame"),
        );

        assert!(!handle.is_connected.get_untracked());
        assert_eq!(handle.platform.get_untracked(), Platform::Unknown);
        let error = handle.error.get_untracked().expect("surfaced");
        assert!(error.contains("no parent frame"));
        runtime.dispose();
    }

    #[test]
    fn handshake_success_confirms_the_platform() {
        let runtime = create_runtime();
        let client = MemoryMcpClient::default();
        let handle = bind(
            Platform::Unknown,
            MemoryMcpConnector::resolving(client.clone()),
        );

        assert!(handle.is_connected.get_untracked());
        assert_eq!(handle.platform.get_untracked(), Platform::Mcp);
        assert_eq!(handle.app.get_untracked().platform(), Platform::Mcp);
        runtime.dispose();
    }

    #[test]
    fn connected_effects_always_observe_the_attached_adapter() {
        let runtime = create_runtime();
        let state = create_rw_signal(BindingState::new(Platform::Unknown));
        let app = create_rw_signal(Rc::new(UnifiedAppAdapter::detached()));
        let seen: Rc<RefCell<Vec<Platform>>> = Rc::default();

        let seen_in = Rc::clone(&seen);
        create_effect(move |_| {
            if state.get().is_connected() {
                seen_in.borrow_mut().push(app.get_untracked().platform());
            }
        });

        state.update(|s| s.apply(BindingEvent::McpConnecting));
        attach_connected_client(
            app,
            state,
            Rc::new(MemoryMcpClient::default()),
            Rc::new(|_| {}),
        );

        assert_eq!(seen.borrow().as_slice(), [Platform::Mcp]);
        runtime.dispose();
    }

    #[test]
    fn disposing_the_owner_closes_the_mcp_client() {
        let runtime = create_runtime();
        let client = MemoryMcpClient::default();
        let connector = MemoryMcpConnector::resolving(client.clone());

        let client_in = client.clone();
        let effect = create_effect(move |done: Option<()>| {
            if done.is_none() {
                bind(Platform::Unknown, connector.clone());
                assert!(!client_in.is_closed());
            }
        });
        effect.dispose();

        assert!(client.is_closed());
        runtime.dispose();
    }
}
