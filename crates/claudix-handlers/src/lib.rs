//! Request handler table for the claudix session host.
//!
//! The host's message router hands every inbound `request` to the
//! [`HandlerTable`] here. Each discriminator maps to one leaf handler; the
//! leaves do their work through injected collaborator surfaces (editor,
//! notifications, session store, …) or directly against the filesystem and
//! process APIs for the workspace-local operations.

pub mod dispatch;
mod editor;
mod files;
mod sessions;
mod state;
pub mod surfaces;

pub use dispatch::{HandlerContext, HandlerTable};
pub use surfaces::{
    AgentConfigSource, AssetCatalog, EditorSurface, McpDirectory, NotificationSurface,
    SessionStore,
};
