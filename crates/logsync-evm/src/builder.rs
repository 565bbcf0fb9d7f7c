//! Fluent builder API for assembling a sync engine over an EVM client.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use logsync_core::{
//!     DecodedEvent, EventHandler, EventParam, HandlerError, InterfaceSpec, ParamKind,
//!     SyncContext,
//! };
//! use logsync_evm::{fingerprint, EngineBuilder, EvmRpcClient};
//!
//! struct LogTransfers;
//!
//! #[async_trait]
//! impl EventHandler for LogTransfers {
//!     async fn handle(&self, event: &DecodedEvent, _ctx: &SyncContext) -> Result<(), HandlerError> {
//!         println!("transfer of {:?}", event.arg("value"));
//!         Ok(())
//!     }
//! }
//!
//! async fn sync(client: impl EvmRpcClient) {
//!     let erc20 = InterfaceSpec::new(vec![fingerprint::event_schema(
//!         "Transfer",
//!         vec![
//!             EventParam::indexed("from", ParamKind::Address),
//!             EventParam::indexed("to", ParamKind::Address),
//!             EventParam::data("value", ParamKind::Uint(256)),
//!         ],
//!     )]);
//!
//!     let (mut engine, _shutdown) = EngineBuilder::new()
//!         .id("usdc-transfers")
//!         .start_block(19_000_000)
//!         .block_batch(500)
//!         .contract("usdc", "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", erc20)
//!         .route("usdc", "Transfer", Arc::new(LogTransfers))
//!         .build(client);
//!
//!     engine.run().await.unwrap();
//! }
//! ```

use std::sync::Arc;

use logsync_core::contracts::{ContractSet, DynamicGroup, GroupMembership, StaticContract};
use logsync_core::decode::LogDecoder;
use logsync_core::engine::{ShutdownHandle, SyncEngine};
use logsync_core::router::LogRouter;
use logsync_core::routes::{BlockDrainedHandler, EventHandler, RoutingTable};
use logsync_core::schema::InterfaceSpec;
use logsync_core::state::{MemoryStateStore, SyncStateStore};
use logsync_core::{FailurePolicy, SyncConfig};

use crate::decoder::AbiLogDecoder;
use crate::fetcher::{EvmLogSource, EvmRpcClient};

/// Fluent builder for an EVM-backed [`SyncEngine`].
///
/// Defaults: an in-memory cursor store (swap in a durable one for anything
/// beyond tests) and the [`AbiLogDecoder`].
#[derive(Default)]
pub struct EngineBuilder {
    config: SyncConfig,
    statics: Vec<StaticContract>,
    groups: Vec<DynamicGroup>,
    routes: RoutingTable,
    store: Option<Arc<dyn SyncStateStore>>,
    decoder: Option<Arc<dyn LogDecoder>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine ID (used as the cursor key in the state store).
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.config.id = id.into();
        self
    }

    /// Set the block a fresh engine starts scanning from.
    pub fn start_block(mut self, block: u64) -> Self {
        self.config.start_block = block;
        self
    }

    /// Set the maximum number of blocks per catch-up window.
    pub fn block_batch(mut self, blocks: u64) -> Self {
        self.config.block_batch = blocks;
        self
    }

    /// Set the capacity of the live-phase height gate.
    pub fn gate_capacity(mut self, capacity: usize) -> Self {
        self.config.gate_capacity = capacity;
        self
    }

    /// Set the backoff between retries of a failed pass, in milliseconds.
    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    /// Set what the engine does when an event handler fails.
    pub fn on_handler_failure(mut self, policy: FailurePolicy) -> Self {
        self.config.on_handler_failure = policy;
        self
    }

    /// Watch a contract at a fixed address.
    pub fn contract(
        mut self,
        name: impl Into<String>,
        address: impl Into<String>,
        interface: InterfaceSpec,
    ) -> Self {
        self.statics.push(StaticContract::new(name, address, interface));
        self
    }

    /// Watch a dynamic group of same-interface contracts whose addresses
    /// come from a membership oracle.
    pub fn dynamic_group(
        mut self,
        name: impl Into<String>,
        interface: InterfaceSpec,
        membership: Arc<dyn GroupMembership>,
    ) -> Self {
        self.groups.push(DynamicGroup::new(name, interface, membership));
        self
    }

    /// Register an event handler for a `(contract, event)` route.
    /// Registering the same route again replaces the earlier handler.
    pub fn route(
        mut self,
        contract: impl Into<String>,
        event: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> Self {
        self.routes.on_event(contract, event, handler);
        self
    }

    /// Register the block-drained hook.
    pub fn on_block_drained(mut self, handler: Arc<dyn BlockDrainedHandler>) -> Self {
        self.routes.on_block_drained(handler);
        self
    }

    /// Use a specific cursor store instead of the in-memory default.
    pub fn store(mut self, store: Arc<dyn SyncStateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a specific log decoder instead of [`AbiLogDecoder`].
    pub fn decoder(mut self, decoder: Arc<dyn LogDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Assemble the engine over `client`.
    pub fn build<C: EvmRpcClient>(self, client: C) -> (SyncEngine<EvmLogSource<C>>, ShutdownHandle) {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStateStore::new()));
        let decoder = self
            .decoder
            .unwrap_or_else(|| Arc::new(AbiLogDecoder::new()));
        let router = LogRouter::new(
            ContractSet::new(self.statics, self.groups),
            self.routes,
            decoder,
            self.config.on_handler_failure,
        );
        SyncEngine::new(self.config, EvmLogSource::new(client), router, store)
    }
}
