//! Session multiplexing and RPC correlation engine for the claudix
//! extension host.
//!
//! One duplex transport carries every active conversation between the
//! client surface and the agent workers. This crate owns the pieces that
//! make that work: the per-channel input streams, the channel registry and
//! its forwarding tasks, the request/response correlator used symmetrically
//! by both ends, the single inbound message loop, and the in-band
//! permission negotiation that suspends a worker until the peer answers.
//!
//! Everything else — the concrete transport, the worker runtime, the
//! request-handler leaves, configuration sources — enters through the
//! narrow traits defined here.

pub mod async_stream;
pub mod config;
pub mod correlator;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod permissions;
pub mod registry;
mod router;
pub mod transport;
pub mod worker;
pub mod workspace;

pub use async_stream::{stream_channel, StreamConsumer, StreamError, StreamProducer};
pub use config::{ConfigStore, JsonFileConfigStore};
pub use correlator::{PendingRpc, RpcCorrelator};
pub use dispatcher::{RequestDispatcher, SessionControl};
pub use error::HostError;
pub use host::{AgentSessionHost, HostDeps};
pub use permissions::{PermissionBroker, PermissionNegotiation};
pub use registry::{ChannelRegistry, LaunchParams};
pub use transport::Transport;
pub use worker::{
    CapabilityArbiter, ChannelCapabilityCallback, SpawnedWorker, WorkerControl, WorkerLauncher,
    WorkerSpawnParams,
};
pub use workspace::{effective_workspace_dir, WorkspaceSurface};
