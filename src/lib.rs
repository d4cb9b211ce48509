//! Client for the VMS Events and State WebSocket API.
//!
//! Runnable programs live in `demos/` and are declared as cargo examples in
//! `Cargo.toml` (`autoexamples = false`), so `examples/` is not scanned:
//!
//! ```text
//! VMS_PASSWORD=... cargo run --example viewer -- eventviewer
//! VMS_PASSWORD=... cargo run --example viewer -- stateviewer
//! ```

pub mod channel;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod names;
pub mod protocol;
pub mod reader;
pub mod sink;
pub mod supervisor;
pub mod transport;

pub use channel::{CommandChannel, CommandIds};
pub use commands::*;
pub use config::{ClientOptions, Settings, SupervisorConfig};
pub use error::{EssError, Result};
pub use names::{NameResolver, RestNameResolver};
pub use protocol::{Command, CommandResponse, Event, EventBatch, InboundFrame};
pub use reader::{ReadOutcome, read_next};
pub use sink::{EventSink, EventViewer, StateCache, StateViewer, ViewerMode, viewer};
pub use supervisor::{ResumePoint, Supervisor, SupervisorState};
pub use transport::{Connector, FrameTransport, WsConnector, WsTransport};
