//! Public API for the `holdwire` library.
//!
//! This crate provides the correlation layer that lets a connection-oriented
//! front end hand a request to a backend pipeline completing on another
//! thread and deliver the result back on the original connection: a
//! per-connection suspend/resume exchange, the completion callback handed to
//! the pipeline, and the driver loop tying them together.

pub mod completion;
pub mod connection;
pub mod error;
pub mod exchange;
pub mod handler;
pub mod message;
pub mod ownership;
pub mod session;
pub mod suspension;
pub mod writer;

pub use completion::{CompletionCallback, CompletionToken};
pub use connection::{ConnectionDriver, DriverConfig};
pub use error::{ProcessingFailure, ServiceError};
pub use exchange::{ExchangeState, ExchangeSynchronizer, ProtocolViolation, SuspendOutcome};
pub use handler::{Handler, HandlerRegistry, HandlerResolver, RoutingMode};
pub use message::{DefaultMessageFactory, Message, MessageFactory, RawRequest};
pub use ownership::{AccessControl, AccessViolation};
pub use session::ConnectionId;
pub use suspension::SuspensionHandle;
pub use writer::{ResponseWriter, SinkWriter};
