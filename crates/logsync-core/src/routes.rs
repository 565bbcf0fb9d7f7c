//! Handler traits + the routing table.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::HandlerError;
use crate::types::{DecodedEvent, SyncContext};

/// Identifies the handler for one event of one watched contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    /// Static contract or dynamic group name.
    pub contract: String,
    /// Event name within the contract's interface.
    pub event: String,
}

impl RouteKey {
    pub fn new(contract: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            contract: contract.into(),
            event: event.into(),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.contract, self.event)
    }
}

/// Trait for user-provided event handlers.
///
/// Implement this to process one decoded event type during syncing.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Called for each decoded event routed to this handler.
    async fn handle(&self, event: &DecodedEvent, ctx: &SyncContext) -> Result<(), HandlerError>;
}

/// Trait for the block-drained hook.
///
/// Called when the engine knows it has seen every log it will dispatch for
/// `block` within the current scan. Useful for end-of-block aggregation.
#[async_trait]
pub trait BlockDrainedHandler: Send + Sync {
    async fn block_drained(&self, block: u64, ctx: &SyncContext) -> Result<(), HandlerError>;
}

/// Registry mapping `(contract, event)` routes to handlers.
///
/// One handler per route; registering the same route again replaces the
/// earlier handler.
#[derive(Default)]
pub struct RoutingTable {
    routes: HashMap<RouteKey, Arc<dyn EventHandler>>,
    block_drained: Option<Arc<dyn BlockDrainedHandler>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            block_drained: None,
        }
    }

    /// Register an event handler for a `(contract, event)` route.
    pub fn on_event(
        &mut self,
        contract: impl Into<String>,
        event: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) {
        self.routes.insert(RouteKey::new(contract, event), handler);
    }

    /// Register the block-drained hook.
    pub fn on_block_drained(&mut self, handler: Arc<dyn BlockDrainedHandler>) {
        self.block_drained = Some(handler);
    }

    /// Look up the handler for a route.
    pub fn handler_for(&self, key: &RouteKey) -> Option<&Arc<dyn EventHandler>> {
        self.routes.get(key)
    }

    /// The block-drained hook, if one is registered.
    pub fn block_drained_handler(&self) -> Option<&Arc<dyn BlockDrainedHandler>> {
        self.block_drained.as_ref()
    }

    /// Number of registered event routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no event routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
