//! Backend process bridge for widgets.
//!
//! Each backend-capable widget instance owns one [`BackendHost`], which
//! supervises a child process and talks to it over newline-delimited JSON
//! on its standard streams:
//! - **host -> backend**: `hello`, `request`, `event`, `shutdown`
//! - **backend -> host**: `response`, `event`, `log`
//!
//! Requests are correlated purely by caller-supplied id. Every failure
//! (spawn error, crash, teardown) is delivered as a structured
//! [`BackendError`] on the same channel a success would use.

pub mod command;
pub mod error;
pub mod host;
pub mod protocol;

pub use command::{BackendCommand, CommandSource};
pub use error::{BackendError, ErrorCode};
pub use host::{BackendHost, HostIdentity, HostOptions, HostOutput, HostPhase};
pub use protocol::{HostMode, InboundMessage, OutboundMessage};
