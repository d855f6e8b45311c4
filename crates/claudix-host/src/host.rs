use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;

use claudix_protocol::{
    error_response_body, parse_wire_message, IncomingRequest, PermissionMode, ThinkingLevel,
    WireMessage,
};

use crate::async_stream::{stream_channel, StreamConsumer, StreamProducer};
use crate::config::ConfigStore;
use crate::correlator::{PendingRpc, RpcCorrelator};
use crate::dispatcher::{RequestDispatcher, SessionControl};
use crate::error::HostError;
use crate::permissions::PermissionBroker;
use crate::registry::{ChannelRegistry, LaunchParams};
use crate::router;
use crate::transport::Transport;
use crate::worker::{CapabilityArbiter, WorkerLauncher};
use crate::workspace::{effective_workspace_dir, WorkspaceSurface};

/// External collaborators the host is built from.
pub struct HostDeps {
    pub transport: Arc<dyn Transport>,
    pub launcher: Arc<dyn WorkerLauncher>,
    pub config: Arc<dyn ConfigStore>,
    pub workspace: Arc<dyn WorkspaceSurface>,
    pub dispatcher: Arc<dyn RequestDispatcher>,
}

/// Shared state behind the public host handle. The router loop and the
/// spawned per-message tasks all work against this.
pub(crate) struct HostInner {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) registry: Arc<ChannelRegistry>,
    pub(crate) correlator: Arc<RpcCorrelator>,
    pub(crate) broker: Arc<PermissionBroker>,
    pub(crate) dispatcher: Arc<dyn RequestDispatcher>,
    pub(crate) workspace: Arc<dyn WorkspaceSurface>,
    pub(crate) thinking_level: Mutex<ThinkingLevel>,
}

impl HostInner {
    /// Applies host-level defaults, reserves the channel synchronously
    /// (so the very next inbound message already finds it), and spawns the
    /// rest of the launch. A duplicate id is rejected here and leaves the
    /// existing channel untouched; a later worker-spawn failure notifies
    /// the peer from inside the registry.
    pub(crate) fn launch_channel(
        self: &Arc<Self>,
        channel_id: String,
        resume: Option<String>,
        cwd: Option<String>,
        model: Option<String>,
        permission_mode: Option<PermissionMode>,
        thinking_level: Option<ThinkingLevel>,
    ) {
        if let Some(level) = thinking_level {
            *self
                .thinking_level
                .lock()
                .expect("thinking level lock poisoned") = level;
        }
        let level = self
            .thinking_level
            .lock()
            .expect("thinking level lock poisoned")
            .clone();
        let cwd = cwd.unwrap_or_else(|| {
            effective_workspace_dir(self.workspace.as_ref())
                .to_string_lossy()
                .into_owned()
        });

        tracing::info!(
            channel_id = %channel_id,
            cwd = %cwd,
            model = model.as_deref().unwrap_or("default"),
            thinking_level = %level,
            "launching channel"
        );

        let input = match self.registry.begin_launch(&channel_id) {
            Ok(input) => input,
            Err(error) => {
                tracing::error!(channel_id = %channel_id, error = %error, "channel launch failed");
                return;
            }
        };
        let params = LaunchParams {
            channel_id: channel_id.clone(),
            resume,
            cwd,
            model,
            permission_mode: permission_mode.unwrap_or_default(),
            max_thinking_tokens: level.max_thinking_tokens(),
        };
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = inner.registry.finish_launch(params, input).await {
                tracing::error!(channel_id = %channel_id, error = %error, "channel launch failed");
            }
        });
    }

    /// Runs one inbound request through the handler table and sends the
    /// single response. Handler failures become error bodies; they never
    /// reach the router loop.
    pub(crate) async fn handle_request(
        &self,
        channel_id: Option<String>,
        request_id: String,
        request: Value,
    ) {
        let token = self.correlator.register_cancellation(&request_id);
        let body = match IncomingRequest::from_value(&request) {
            Ok(typed) => {
                tracing::debug!(request_id = %request_id, kind = typed.kind(), "handling request");
                match self.dispatcher.dispatch(typed, channel_id, token).await {
                    Ok(body) => body,
                    Err(error) => error_response_body(&error.to_string()),
                }
            }
            Err(error) => error_response_body(&error.to_string()),
        };
        self.correlator.clear_cancellation(&request_id);
        self.transport.send(WireMessage::Response {
            request_id,
            response: body,
        });
    }
}

/// The session manager: owns every channel, pending request, and pending
/// permission negotiation for one client connection. Explicitly
/// constructed and torn down; nothing here is process-global.
pub struct AgentSessionHost {
    inner: Arc<HostInner>,
    inbound: StreamProducer<WireMessage>,
    inbound_consumer: Mutex<Option<StreamConsumer<WireMessage>>>,
    router_task: Mutex<Option<JoinHandle<()>>>,
}

impl AgentSessionHost {
    pub fn new(deps: HostDeps) -> Arc<Self> {
        let correlator = Arc::new(RpcCorrelator::new(Arc::clone(&deps.transport)));
        let broker = Arc::new(PermissionBroker::new());
        let arbiter: Arc<dyn CapabilityArbiter> = Arc::new(NegotiatingArbiter {
            correlator: Arc::clone(&correlator),
            broker: Arc::clone(&broker),
        });
        let registry = ChannelRegistry::new(
            Arc::clone(&deps.transport),
            Arc::clone(&deps.launcher),
            Arc::clone(&deps.config),
            arbiter,
            Arc::clone(&broker),
        );
        let (inbound_producer, inbound_consumer) = stream_channel();

        Arc::new(Self {
            inner: Arc::new(HostInner {
                transport: deps.transport,
                registry,
                correlator,
                broker,
                dispatcher: deps.dispatcher,
                workspace: deps.workspace,
                thinking_level: Mutex::new(ThinkingLevel::default()),
            }),
            inbound: inbound_producer,
            inbound_consumer: Mutex::new(Some(inbound_consumer)),
            router_task: Mutex::new(None),
        })
    }

    /// Starts the message loop; a second call is a logged no-op.
    pub fn start(&self) {
        let consumer = self
            .inbound_consumer
            .lock()
            .expect("inbound consumer lock poisoned")
            .take();
        let Some(consumer) = consumer else {
            tracing::warn!("message loop already started");
            return;
        };
        let task = tokio::spawn(router::run(Arc::clone(&self.inner), consumer));
        *self
            .router_task
            .lock()
            .expect("router task lock poisoned") = Some(task);
        tracing::info!("message loop started");
    }

    /// Enqueues one already-decoded message from the client surface.
    pub fn from_client(&self, message: WireMessage) -> Result<(), HostError> {
        self.inbound.enqueue(message)
    }

    /// Decodes and enqueues a raw frame. An undecodable frame is a
    /// protocol error: logged, dropped, never fatal.
    pub fn from_client_json(&self, raw: &str) {
        match parse_wire_message(raw) {
            Ok(message) => {
                if let Err(error) = self.from_client(message) {
                    tracing::warn!(error = %error, "dropping inbound frame, host shut down");
                }
            }
            Err(error) => {
                tracing::error!(error = %error, "dropping undecodable inbound frame");
            }
        }
    }

    /// Issues a host-initiated RPC. Channel id is optional routing
    /// context; request ids live in their own id space.
    pub fn send_request(&self, channel_id: Option<String>, request: Value) -> PendingRpc {
        self.inner.correlator.send_request(channel_id, request)
    }

    /// Abandons a host-initiated RPC: local bookkeeping is dropped and the
    /// peer is told to stop working on it.
    pub fn cancel_request(&self, request_id: &str) {
        self.inner.correlator.cancel_request(request_id);
    }

    /// The observable pending permission negotiations, for a UI surface.
    pub fn permissions(&self) -> Arc<PermissionBroker> {
        Arc::clone(&self.inner.broker)
    }

    /// Channel operations for the embedding extension (close a tab's
    /// channel, interrupt from a toolbar button, …).
    pub fn channels(&self) -> Arc<ChannelRegistry> {
        Arc::clone(&self.inner.registry)
    }

    /// Credentials changed out from under every session: close all
    /// channels and tell the peers to discard their state.
    pub async fn credential_changed(&self) {
        tracing::info!("credentials changed, closing all channels");
        self.inner.registry.close_all(true).await;
    }

    /// Deterministic teardown: close every channel, complete the inbound
    /// stream so the router loop drains and exits, then join the loop and
    /// every forwarding task.
    pub async fn shutdown(&self) {
        self.inner.registry.close_all(false).await;
        self.inbound.finish();
        let task = self
            .router_task
            .lock()
            .expect("router task lock poisoned")
            .take();
        if let Some(task) = task {
            let _ = task.await;
        }
        self.inner.registry.join_forward_tasks().await;
        tracing::info!("session host shut down");
    }
}

#[async_trait]
impl SessionControl for AgentSessionHost {
    async fn set_permission_mode(
        &self,
        channel_id: &str,
        mode: PermissionMode,
    ) -> Result<(), HostError> {
        self.inner.registry.set_permission_mode(channel_id, mode).await
    }

    async fn set_model(&self, channel_id: &str, model: &str) -> Result<(), HostError> {
        self.inner.registry.set_model(channel_id, model).await
    }

    async fn set_thinking_level(
        &self,
        channel_id: &str,
        level: ThinkingLevel,
    ) -> Result<(), HostError> {
        // The level is host state first; the running channel picks up the
        // matching token budget.
        *self
            .inner
            .thinking_level
            .lock()
            .expect("thinking level lock poisoned") = level.clone();
        self.inner
            .registry
            .set_max_thinking_tokens(channel_id, level.max_thinking_tokens())
            .await
    }

    fn thinking_level(&self) -> ThinkingLevel {
        self.inner
            .thinking_level
            .lock()
            .expect("thinking level lock poisoned")
            .clone()
    }
}

/// Bridges worker capability callbacks onto the permission broker.
struct NegotiatingArbiter {
    correlator: Arc<RpcCorrelator>,
    broker: Arc<PermissionBroker>,
}

#[async_trait]
impl CapabilityArbiter for NegotiatingArbiter {
    async fn can_use_tool(
        &self,
        channel_id: &str,
        tool_name: &str,
        inputs: Value,
        suggestions: Vec<Value>,
    ) -> Result<claudix_protocol::PermissionResult, HostError> {
        self.broker
            .negotiate(&self.correlator, channel_id, tool_name, inputs, suggestions)
            .await
    }
}
