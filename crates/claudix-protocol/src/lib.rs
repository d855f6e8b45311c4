//! Wire protocol shared by the claudix session host and its client surface.
//!
//! One duplex transport carries every active conversation: a seven-variant
//! message envelope multiplexes channel lifecycle, streaming I/O, and a
//! symmetric request/response exchange keyed by request id. Discriminators
//! are snake_case; field names are camelCase on the wire.

pub mod envelope;
pub mod permissions;
pub mod requests;
pub mod thinking;

pub use envelope::{
    encode_wire_message, error_response_body, parse_wire_message, response_error_text, WireMessage,
};
pub use permissions::{PermissionMode, PermissionResult, ToolPermissionResponse};
pub use requests::{
    FileLocation, HostState, IncomingRequest, McpServerStatus, ModelOption, NotificationSeverity,
    OutgoingRequest, PathKind, PathStat, RequestResponse, SelectionRange, SessionSummary, TextEdit,
    WorkspaceFileEntry,
};
pub use thinking::{ThinkingLevel, MAX_THINKING_TOKENS_DEFAULT};
