//! logsync-core — foundation for the block-range log sync engine.
//!
//! # Architecture
//!
//! ```text
//! EngineBuilder → SyncEngine
//!                     ├── ChainSource    (head queries, log fetch, head stream)
//!                     ├── LogRouter      (contract resolution → decode → dispatch)
//!                     │       ├── ContractSet   (static addresses + dynamic groups)
//!                     │       ├── LogDecoder    (ABI decode against InterfaceSpec)
//!                     │       └── RoutingTable  (user event / block-drained handlers)
//!                     ├── SyncStateStore (durable cursor, crash recovery)
//!                     └── Gate           (live-mode one-at-a-time height queue)
//! ```

pub mod config;
pub mod contracts;
pub mod cursor;
pub mod decode;
pub mod engine;
pub mod error;
pub mod gate;
pub mod router;
pub mod routes;
pub mod schema;
pub mod source;
pub mod state;
pub mod types;

pub use config::{EngineState, FailurePolicy, SyncConfig};
pub use contracts::{ContractSet, DynamicGroup, GroupMembership, StaticContract};
pub use cursor::Cursor;
pub use decode::{DecodeError, LogDecoder};
pub use engine::{ShutdownHandle, SyncEngine, SyncMetrics};
pub use error::{HandlerError, MembershipError, Severity, SyncError};
pub use gate::{Gate, GateClosed, GateQueue};
pub use router::{LogRouter, RouteOutcome};
pub use routes::{BlockDrainedHandler, EventHandler, RouteKey, RoutingTable};
pub use schema::{EventParam, EventSchema, InterfaceSpec, ParamKind};
pub use source::{ChainSource, HeightStream};
pub use state::{MemoryStateStore, SyncStateStore};
pub use types::{AbiValue, BlockRange, DecodedEvent, RawLogEvent, SyncContext, SyncPhase};
