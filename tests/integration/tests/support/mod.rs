#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use claudix_handlers::{
    AgentConfigSource, AssetCatalog, EditorSurface, HandlerContext, HandlerTable, McpDirectory,
    NotificationSurface, SessionStore,
};
use claudix_host::{
    stream_channel, AgentSessionHost, ChannelCapabilityCallback, ConfigStore, HostDeps, HostError,
    RequestDispatcher, SpawnedWorker, StreamConsumer, StreamProducer, Transport, WorkerControl,
    WorkerLauncher, WorkerSpawnParams, WorkspaceSurface,
};
use claudix_protocol::{
    FileLocation, McpServerStatus, NotificationSeverity, SelectionRange, SessionSummary, TextEdit,
    WireMessage,
};

pub struct RecordingTransport {
    sent: Mutex<Vec<WireMessage>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<WireMessage> {
        self.sent.lock().expect("transport lock").clone()
    }

    pub fn io_messages(&self, channel_id: &str) -> Vec<(Value, bool)> {
        self.sent()
            .into_iter()
            .filter_map(|message| match message {
                WireMessage::IoMessage {
                    channel_id: id,
                    message,
                    done,
                } if id == channel_id => Some((message, done)),
                _ => None,
            })
            .collect()
    }

    pub fn close_notifications(&self, channel_id: &str) -> Vec<Option<String>> {
        self.sent()
            .into_iter()
            .filter_map(|message| match message {
                WireMessage::CloseChannel {
                    channel_id: id,
                    error,
                } if id == channel_id => Some(error),
                _ => None,
            })
            .collect()
    }

    pub fn responses(&self) -> Vec<(String, Value)> {
        self.sent()
            .into_iter()
            .filter_map(|message| match message {
                WireMessage::Response {
                    request_id,
                    response,
                } => Some((request_id, response)),
                _ => None,
            })
            .collect()
    }

    pub fn requests(&self) -> Vec<(Option<String>, String, Value)> {
        self.sent()
            .into_iter()
            .filter_map(|message| match message {
                WireMessage::Request {
                    channel_id,
                    request_id,
                    request,
                } => Some((channel_id, request_id, request)),
                _ => None,
            })
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, message: WireMessage) {
        self.sent.lock().expect("transport lock").push(message);
    }
}

#[derive(Default)]
pub struct MockControl {
    pub interrupts: AtomicUsize,
    pub disposes: AtomicUsize,
    /// The worker's own event producer. Disposing the worker ends its
    /// event stream, mirroring a real worker process whose stdout closes
    /// when it is killed; this is what lets the registry's forwarding task
    /// observe completion and exit.
    events: Mutex<Option<Arc<StreamProducer<Value>>>>,
}

#[async_trait]
impl WorkerControl for MockControl {
    async fn interrupt(&self) -> Result<(), HostError> {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn dispose(&self) -> Result<(), HostError> {
        self.disposes.fetch_add(1, Ordering::SeqCst);
        if let Some(events) = self.events.lock().expect("events lock").as_ref() {
            events.finish();
        }
        Ok(())
    }
}

/// Test-side handle on every worker the host spawned: event producers to
/// drive, input consumers to read, the capability callbacks workers would
/// use for tool permissions.
#[derive(Default)]
pub struct MockWorkerHub {
    pub spawn_count: AtomicUsize,
    events: Mutex<HashMap<String, Arc<StreamProducer<Value>>>>,
    inputs: Mutex<HashMap<String, StreamConsumer<Value>>>,
    controls: Mutex<HashMap<String, Arc<MockControl>>>,
    callbacks: Mutex<HashMap<String, ChannelCapabilityCallback>>,
    spawn_params: Mutex<HashMap<String, WorkerSpawnParams>>,
}

impl MockWorkerHub {
    pub fn spawned(&self, channel_id: &str) -> bool {
        self.events
            .lock()
            .expect("events lock")
            .contains_key(channel_id)
            || self
                .controls
                .lock()
                .expect("controls lock")
                .contains_key(channel_id)
    }

    pub fn events(&self, channel_id: &str) -> Arc<StreamProducer<Value>> {
        self.events
            .lock()
            .expect("events lock")
            .remove(channel_id)
            .expect("worker not spawned")
    }

    pub fn input(&self, channel_id: &str) -> StreamConsumer<Value> {
        self.inputs
            .lock()
            .expect("inputs lock")
            .remove(channel_id)
            .expect("worker not spawned")
    }

    pub fn control(&self, channel_id: &str) -> Arc<MockControl> {
        Arc::clone(
            self.controls
                .lock()
                .expect("controls lock")
                .get(channel_id)
                .expect("worker not spawned"),
        )
    }

    pub fn callback(&self, channel_id: &str) -> ChannelCapabilityCallback {
        self.callbacks
            .lock()
            .expect("callbacks lock")
            .get(channel_id)
            .expect("worker not spawned")
            .clone()
    }

    pub fn spawn_params(&self, channel_id: &str) -> WorkerSpawnParams {
        self.spawn_params
            .lock()
            .expect("spawn params lock")
            .get(channel_id)
            .expect("worker not spawned")
            .clone()
    }
}

pub struct MockLauncher {
    pub hub: Arc<MockWorkerHub>,
}

#[async_trait]
impl WorkerLauncher for MockLauncher {
    async fn spawn(
        &self,
        params: WorkerSpawnParams,
        input: StreamConsumer<Value>,
        permissions: ChannelCapabilityCallback,
    ) -> Result<SpawnedWorker, HostError> {
        self.hub.spawn_count.fetch_add(1, Ordering::SeqCst);
        let (events_producer, events_consumer) = stream_channel();
        let events_producer = Arc::new(events_producer);
        let control = Arc::new(MockControl::default());
        *control.events.lock().expect("events lock") = Some(Arc::clone(&events_producer));
        let channel_id = params.channel_id.clone();
        self.hub
            .events
            .lock()
            .expect("events lock")
            .insert(channel_id.clone(), events_producer);
        self.hub
            .inputs
            .lock()
            .expect("inputs lock")
            .insert(channel_id.clone(), input);
        self.hub
            .controls
            .lock()
            .expect("controls lock")
            .insert(channel_id.clone(), Arc::clone(&control));
        self.hub
            .callbacks
            .lock()
            .expect("callbacks lock")
            .insert(channel_id.clone(), permissions);
        self.hub
            .spawn_params
            .lock()
            .expect("spawn params lock")
            .insert(channel_id, params);
        Ok(SpawnedWorker {
            events: events_consumer,
            control,
        })
    }
}

pub struct FixedWorkspace(pub PathBuf);

impl WorkspaceSurface for FixedWorkspace {
    fn default_workspace_dir(&self) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

#[derive(Default)]
pub struct MemoryConfig {
    model: Mutex<Option<String>>,
}

impl ConfigStore for MemoryConfig {
    fn selected_model(&self) -> Option<String> {
        self.model.lock().expect("config lock").clone()
    }

    fn set_selected_model(&self, model: &str) -> Result<()> {
        *self.model.lock().expect("config lock") = Some(model.to_string());
        Ok(())
    }
}

pub struct NullEditor;

#[async_trait]
impl EditorSurface for NullEditor {
    async fn open_file(&self, _path: PathBuf, _location: Option<FileLocation>) -> Result<()> {
        Ok(())
    }

    async fn open_diff(
        &self,
        _original_path: PathBuf,
        _new_path: Option<PathBuf>,
        edits: Vec<TextEdit>,
        _cancel: tokio_util::sync::CancellationToken,
    ) -> Result<Vec<TextEdit>> {
        Ok(edits)
    }

    async fn open_content(
        &self,
        _content: String,
        _file_name: String,
        _editable: bool,
        _cancel: tokio_util::sync::CancellationToken,
    ) -> Result<Option<String>> {
        Ok(None)
    }

    async fn current_selection(&self) -> Option<SelectionRange> {
        None
    }

    async fn open_url(&self, _url: String) -> Result<()> {
        Ok(())
    }

    async fn open_config_file(&self, _config_type: String) -> Result<()> {
        Ok(())
    }

    async fn focus_conversation_view(&self) -> Result<()> {
        Ok(())
    }
}

pub struct NullNotifications;

#[async_trait]
impl NotificationSurface for NullNotifications {
    async fn show(
        &self,
        _message: String,
        _severity: NotificationSeverity,
        _buttons: Vec<String>,
        _only_if_not_visible: bool,
    ) -> Result<Option<String>> {
        Ok(None)
    }
}

pub struct EmptySessions;

#[async_trait]
impl SessionStore for EmptySessions {
    async fn list_sessions(&self, _cwd: PathBuf) -> Result<Vec<SessionSummary>> {
        Ok(Vec::new())
    }

    async fn session_messages(&self, _session_id: String, _cwd: PathBuf) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }
}

pub struct NoMcp;

#[async_trait]
impl McpDirectory for NoMcp {
    async fn servers(&self, _channel_id: Option<String>) -> Result<Vec<McpServerStatus>> {
        Ok(Vec::new())
    }
}

pub struct NoAssets;

impl AssetCatalog for NoAssets {
    fn asset_uris(&self) -> Value {
        json!({})
    }
}

pub struct FixedAgentConfig;

#[async_trait]
impl AgentConfigSource for FixedAgentConfig {
    async fn claude_config(&self) -> Result<Value> {
        Ok(json!({"version": "test"}))
    }
}

pub struct Harness {
    pub transport: Arc<RecordingTransport>,
    pub hub: Arc<MockWorkerHub>,
    pub config: Arc<MemoryConfig>,
    pub host: Arc<AgentSessionHost>,
}

/// Full wiring: mock transport and worker runtime, real handler table,
/// started message loop.
pub fn harness(workspace_dir: PathBuf) -> Harness {
    let transport = Arc::new(RecordingTransport::new());
    let hub = Arc::new(MockWorkerHub::default());
    let config = Arc::new(MemoryConfig::default());
    let workspace = Arc::new(FixedWorkspace(workspace_dir));

    let table = HandlerTable::new(HandlerContext {
        workspace: workspace.clone(),
        editor: Arc::new(NullEditor),
        notifications: Arc::new(NullNotifications),
        sessions: Arc::new(EmptySessions),
        mcp: Arc::new(NoMcp),
        assets: Arc::new(NoAssets),
        agent_config: Arc::new(FixedAgentConfig),
        config: config.clone(),
    });

    let host = AgentSessionHost::new(HostDeps {
        transport: transport.clone(),
        launcher: Arc::new(MockLauncher {
            hub: Arc::clone(&hub),
        }),
        config: config.clone(),
        workspace,
        dispatcher: table.clone(),
    });
    table.bind_control(host.clone());
    host.start();

    Harness {
        transport,
        hub,
        config,
        host,
    }
}

/// Same wiring with a caller-supplied dispatcher instead of the handler
/// table, for exercising the router's request plumbing directly.
pub fn harness_with_dispatcher(
    workspace_dir: PathBuf,
    dispatcher: Arc<dyn RequestDispatcher>,
) -> Harness {
    let transport = Arc::new(RecordingTransport::new());
    let hub = Arc::new(MockWorkerHub::default());
    let config = Arc::new(MemoryConfig::default());
    let workspace = Arc::new(FixedWorkspace(workspace_dir));

    let host = AgentSessionHost::new(HostDeps {
        transport: transport.clone(),
        launcher: Arc::new(MockLauncher {
            hub: Arc::clone(&hub),
        }),
        config: config.clone(),
        workspace,
        dispatcher,
    });
    host.start();

    Harness {
        transport,
        hub,
        config,
        host,
    }
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition never became true");
}

pub fn launch_message(channel_id: &str) -> WireMessage {
    WireMessage::LaunchClaude {
        channel_id: channel_id.to_string(),
        resume: None,
        cwd: Some("/repo".to_string()),
        model: None,
        permission_mode: None,
        thinking_level: None,
    }
}
