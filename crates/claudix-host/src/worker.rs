use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use claudix_protocol::{PermissionMode, PermissionResult};

use crate::async_stream::StreamConsumer;
use crate::error::HostError;

/// Everything a worker needs to start one conversation channel.
#[derive(Debug, Clone)]
pub struct WorkerSpawnParams {
    pub channel_id: String,
    pub resume: Option<String>,
    pub cwd: String,
    pub model: Option<String>,
    pub permission_mode: PermissionMode,
    pub max_thinking_tokens: u32,
}

/// A running worker: its output event sequence plus the control handle the
/// registry keeps for the channel's lifetime.
pub struct SpawnedWorker {
    pub events: StreamConsumer<Value>,
    pub control: Arc<dyn WorkerControl>,
}

/// Spawns workers. Implemented by the external agent runtime.
#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    /// Starts a worker that consumes `input` and produces a lazy,
    /// non-restartable event sequence. The worker must await
    /// `permissions.can_use_tool` before using any gated capability.
    async fn spawn(
        &self,
        params: WorkerSpawnParams,
        input: StreamConsumer<Value>,
        permissions: ChannelCapabilityCallback,
    ) -> Result<SpawnedWorker, HostError>;
}

/// Control calls the registry forwards to a live worker. Every capability
/// has an explicit no-op default, so a minimal worker implements nothing
/// and the host never probes for method existence at runtime.
#[async_trait]
pub trait WorkerControl: Send + Sync {
    async fn interrupt(&self) -> Result<(), HostError> {
        Ok(())
    }

    async fn set_permission_mode(&self, _mode: PermissionMode) -> Result<(), HostError> {
        Ok(())
    }

    async fn set_model(&self, _model: &str) -> Result<(), HostError> {
        Ok(())
    }

    async fn set_max_thinking_tokens(&self, _tokens: u32) -> Result<(), HostError> {
        Ok(())
    }

    /// Best-effort resource release; failures are logged by the caller and
    /// never fail the surrounding close.
    async fn dispose(&self) -> Result<(), HostError> {
        Ok(())
    }
}

/// Decides whether a worker may use a named capability. The call suspends
/// the worker until a decision exists.
#[async_trait]
pub trait CapabilityArbiter: Send + Sync {
    async fn can_use_tool(
        &self,
        channel_id: &str,
        tool_name: &str,
        inputs: Value,
        suggestions: Vec<Value>,
    ) -> Result<PermissionResult, HostError>;
}

/// The capability callback handed to a worker at spawn: the arbiter bound
/// to the worker's own channel id.
#[derive(Clone)]
pub struct ChannelCapabilityCallback {
    channel_id: String,
    arbiter: Arc<dyn CapabilityArbiter>,
}

impl ChannelCapabilityCallback {
    pub fn new(channel_id: String, arbiter: Arc<dyn CapabilityArbiter>) -> Self {
        Self {
            channel_id,
            arbiter,
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub async fn can_use_tool(
        &self,
        tool_name: &str,
        inputs: Value,
        suggestions: Vec<Value>,
    ) -> Result<PermissionResult, HostError> {
        self.arbiter
            .can_use_tool(&self.channel_id, tool_name, inputs, suggestions)
            .await
    }
}
