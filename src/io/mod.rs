//! Input/Output handling for CLI and tool integration: the unified JSON
//! output envelope, exit codes, and terminal progress widgets shared by the
//! CLI, MCP, and HTTP adapters (§6).

pub mod envelope;
pub mod exit_code;
pub mod status_line;

pub use envelope::{
    EntityType as EnvelopeEntityType, Envelope, ErrorDetails as EnvelopeErrorDetails, MessageType,
    Meta, ResultCode, Status, SCHEMA_VERSION,
};
pub use exit_code::ExitCode;
pub use status_line::{
    DualProgressBar, ProgressBar, ProgressBarOptions, ProgressBarStyle, Spinner, SpinnerOptions,
};
