use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::task::JoinHandle;

use claudix_protocol::{PermissionMode, WireMessage};

use crate::async_stream::{stream_channel, StreamConsumer, StreamProducer};
use crate::config::ConfigStore;
use crate::error::HostError;
use crate::permissions::PermissionBroker;
use crate::transport::Transport;
use crate::worker::{
    CapabilityArbiter, ChannelCapabilityCallback, WorkerControl, WorkerLauncher, WorkerSpawnParams,
};

/// Input-side filter: only recognized turn messages reach a worker's input
/// stream. Anything else is a deliberate drop at this layer, not an error.
const TURN_MESSAGE_TYPE: &str = "user";

/// Everything `launch` needs after the host has applied its defaults.
#[derive(Debug, Clone)]
pub struct LaunchParams {
    pub channel_id: String,
    pub resume: Option<String>,
    pub cwd: String,
    pub model: Option<String>,
    pub permission_mode: PermissionMode,
    pub max_thinking_tokens: u32,
}

/// A registered channel. `control` is `None` while the worker spawn is
/// still in flight; input can already buffer during that window.
struct ChannelSlot {
    input: StreamProducer<Value>,
    control: Option<Arc<dyn WorkerControl>>,
}

/// Owns the `channel id → channel` map and the per-channel forwarding
/// tasks that turn worker events into outbound `io_message`s.
///
/// The map is only ever touched under its lock; forwarding tasks are
/// recorded so shutdown can join every one of them deterministically.
pub struct ChannelRegistry {
    transport: Arc<dyn Transport>,
    launcher: Arc<dyn WorkerLauncher>,
    config: Arc<dyn ConfigStore>,
    arbiter: Arc<dyn CapabilityArbiter>,
    broker: Arc<PermissionBroker>,
    channels: Mutex<HashMap<String, ChannelSlot>>,
    forward_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ChannelRegistry {
    pub fn new(
        transport: Arc<dyn Transport>,
        launcher: Arc<dyn WorkerLauncher>,
        config: Arc<dyn ConfigStore>,
        arbiter: Arc<dyn CapabilityArbiter>,
        broker: Arc<PermissionBroker>,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            launcher,
            config,
            arbiter,
            broker,
            channels: Mutex::new(HashMap::new()),
            forward_tasks: Mutex::new(Vec::new()),
        })
    }

    /// Registers the channel and spawns its worker. Fails with
    /// `ChannelAlreadyExists` before anything is spawned; a spawn failure
    /// notifies the peer with a `close_channel` carrying the error text.
    pub async fn launch(self: &Arc<Self>, params: LaunchParams) -> Result<(), HostError> {
        let input = self.begin_launch(&params.channel_id)?;
        self.finish_launch(params, input).await
    }

    /// Synchronous half of a launch: reserves the channel id and creates
    /// its input stream. Must run before the router reads the next inbound
    /// message so that immediately-following `io_message`s find the
    /// channel and buffer in order.
    pub fn begin_launch(&self, channel_id: &str) -> Result<StreamConsumer<Value>, HostError> {
        let (input_producer, input_consumer) = stream_channel();
        let mut channels = self.channels.lock().expect("channel map lock poisoned");
        if channels.contains_key(channel_id) {
            return Err(HostError::ChannelAlreadyExists(channel_id.to_string()));
        }
        channels.insert(
            channel_id.to_string(),
            ChannelSlot {
                input: input_producer,
                control: None,
            },
        );
        Ok(input_consumer)
    }

    /// Asynchronous half of a launch: spawns the worker on the reserved
    /// channel and starts the forwarding task.
    pub async fn finish_launch(
        self: &Arc<Self>,
        params: LaunchParams,
        input_consumer: StreamConsumer<Value>,
    ) -> Result<(), HostError> {
        let channel_id = params.channel_id.clone();
        let callback =
            ChannelCapabilityCallback::new(channel_id.clone(), Arc::clone(&self.arbiter));
        let spawn_params = WorkerSpawnParams {
            channel_id: channel_id.clone(),
            resume: params.resume,
            cwd: params.cwd,
            model: params.model,
            permission_mode: params.permission_mode,
            max_thinking_tokens: params.max_thinking_tokens,
        };

        let spawned = match self.launcher.spawn(spawn_params, input_consumer, callback).await {
            Ok(spawned) => spawned,
            Err(error) => {
                self.close(&channel_id, true, Some(error.to_string())).await;
                return Err(error);
            }
        };

        let raced_close = {
            let mut channels = self.channels.lock().expect("channel map lock poisoned");
            match channels.get_mut(&channel_id) {
                Some(slot) => {
                    slot.control = Some(Arc::clone(&spawned.control));
                    false
                }
                None => true,
            }
        };
        if raced_close {
            // The channel was closed while the spawn was in flight; the
            // close already notified whoever needed to know.
            tracing::debug!(channel_id = %channel_id, "channel closed during launch, disposing worker");
            if let Err(error) = spawned.control.dispose().await {
                tracing::warn!(
                    channel_id = %channel_id,
                    error = %error,
                    "worker dispose failed after raced close"
                );
            }
            return Ok(());
        }

        self.spawn_forward_task(channel_id.clone(), spawned.events);
        tracing::debug!(channel_id = %channel_id, "channel launched");
        Ok(())
    }

    fn spawn_forward_task(self: &Arc<Self>, channel_id: String, mut events: StreamConsumer<Value>) {
        let registry = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                match events.next().await {
                    Some(Ok(event)) => registry.transport.send(WireMessage::IoMessage {
                        channel_id: channel_id.clone(),
                        message: event,
                        done: false,
                    }),
                    Some(Err(error)) => {
                        tracing::warn!(
                            channel_id = %channel_id,
                            error = %error,
                            "worker event stream failed"
                        );
                        registry.close(&channel_id, true, Some(error.0)).await;
                        break;
                    }
                    None => {
                        registry.close(&channel_id, true, None).await;
                        break;
                    }
                }
            }
        });

        let mut tasks = self.forward_tasks.lock().expect("forward task lock poisoned");
        tasks.retain(|handle| !handle.is_finished());
        tasks.push(task);
    }

    /// Feeds one inbound `io_message` to the channel's worker. Turn
    /// messages are enqueued in arrival order; other payload shapes are
    /// filtered out at this layer. `done` completes the input stream.
    pub fn forward_input(
        &self,
        channel_id: &str,
        payload: Value,
        done: bool,
    ) -> Result<(), HostError> {
        let channels = self.channels.lock().expect("channel map lock poisoned");
        let Some(slot) = channels.get(channel_id) else {
            return Err(HostError::ChannelNotFound(channel_id.to_string()));
        };

        let is_turn = payload.get("type").and_then(Value::as_str) == Some(TURN_MESSAGE_TYPE);
        if is_turn {
            if let Err(error) = slot.input.enqueue(payload) {
                tracing::warn!(
                    channel_id = %channel_id,
                    error = %error,
                    "dropping turn message for completed input stream"
                );
            }
        }
        if done {
            slot.input.finish();
        }
        Ok(())
    }

    /// Interruption is a control signal, not termination: the channel
    /// stays registered. An unknown channel only warns.
    pub async fn interrupt(&self, channel_id: &str) {
        let control = self.control_for(channel_id).ok();
        let Some(control) = control else {
            tracing::warn!(channel_id = %channel_id, "interrupt for unknown channel ignored");
            return;
        };
        if let Err(error) = control.interrupt().await {
            tracing::warn!(channel_id = %channel_id, error = %error, "worker interrupt failed");
        }
    }

    /// Idempotent teardown. The peer notification (when requested) goes
    /// out before the input stream completes and the worker is disposed;
    /// a close for an unknown channel does nothing, including no second
    /// notification.
    pub async fn close(&self, channel_id: &str, notify_peer: bool, error: Option<String>) {
        if let Some(control) = self.close_now(channel_id, notify_peer, error) {
            if let Err(error) = control.dispose().await {
                tracing::warn!(
                    channel_id = %channel_id,
                    error = %error,
                    "worker dispose failed during close"
                );
            }
        }
    }

    /// Router entry for a client-initiated close: the channel is
    /// unregistered before the next inbound message is read, so the id can
    /// be relaunched immediately; worker disposal continues in the
    /// background.
    pub fn close_detached(&self, channel_id: &str, notify_peer: bool, error: Option<String>) {
        let Some(control) = self.close_now(channel_id, notify_peer, error) else {
            return;
        };
        let channel_id = channel_id.to_string();
        tokio::spawn(async move {
            if let Err(error) = control.dispose().await {
                tracing::warn!(
                    channel_id = %channel_id,
                    error = %error,
                    "worker dispose failed during close"
                );
            }
        });
    }

    /// Synchronous close: removal, peer notification, input completion,
    /// and negotiation cleanup. Returns the control handle still awaiting
    /// disposal, when the channel had one.
    fn close_now(
        &self,
        channel_id: &str,
        notify_peer: bool,
        error: Option<String>,
    ) -> Option<Arc<dyn WorkerControl>> {
        let slot = self
            .channels
            .lock()
            .expect("channel map lock poisoned")
            .remove(channel_id);
        let Some(slot) = slot else {
            tracing::debug!(channel_id = %channel_id, "close for unknown channel ignored");
            return None;
        };

        if notify_peer {
            self.transport.send(WireMessage::CloseChannel {
                channel_id: channel_id.to_string(),
                error,
            });
        }

        slot.input.finish();
        let dropped = self.broker.remove_channel(channel_id);
        if dropped > 0 {
            tracing::debug!(
                channel_id = %channel_id,
                dropped,
                "dropped pending permission negotiations with their channel"
            );
        }
        tracing::debug!(channel_id = %channel_id, "channel closed");
        slot.control
    }

    /// Closes every registered channel; used at shutdown and on a global
    /// credential change (then with `notify_peer` so peers discard state).
    pub async fn close_all(&self, notify_peer: bool) {
        let channel_ids: Vec<String> = {
            let channels = self.channels.lock().expect("channel map lock poisoned");
            channels.keys().cloned().collect()
        };
        for channel_id in channel_ids {
            self.close(&channel_id, notify_peer, None).await;
        }
    }

    pub async fn set_permission_mode(
        &self,
        channel_id: &str,
        mode: PermissionMode,
    ) -> Result<(), HostError> {
        self.control_for(channel_id)?.set_permission_mode(mode).await
    }

    /// Forwards the model change and persists the selection so the next
    /// session starts on it.
    pub async fn set_model(&self, channel_id: &str, model: &str) -> Result<(), HostError> {
        self.control_for(channel_id)?.set_model(model).await?;
        self.config
            .set_selected_model(model)
            .map_err(|error| HostError::Config(format!("failed to persist model selection: {error}")))
    }

    pub async fn set_max_thinking_tokens(
        &self,
        channel_id: &str,
        tokens: u32,
    ) -> Result<(), HostError> {
        self.control_for(channel_id)?
            .set_max_thinking_tokens(tokens)
            .await
    }

    /// Joins every forwarding task recorded since startup. No timeout is
    /// applied, so a worker stream that never terminates stalls shutdown.
    pub async fn join_forward_tasks(&self) {
        let tasks: Vec<JoinHandle<()>> = {
            let mut tasks = self.forward_tasks.lock().expect("forward task lock poisoned");
            tasks.drain(..).collect()
        };
        for task in tasks {
            let _ = task.await;
        }
    }

    pub fn active_channels(&self) -> Vec<String> {
        self.channels
            .lock()
            .expect("channel map lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub fn contains(&self, channel_id: &str) -> bool {
        self.channels
            .lock()
            .expect("channel map lock poisoned")
            .contains_key(channel_id)
    }

    fn control_for(&self, channel_id: &str) -> Result<Arc<dyn WorkerControl>, HostError> {
        self.channels
            .lock()
            .expect("channel map lock poisoned")
            .get(channel_id)
            .and_then(|slot| slot.control.clone())
            .ok_or_else(|| HostError::ChannelNotFound(channel_id.to_string()))
    }
}
