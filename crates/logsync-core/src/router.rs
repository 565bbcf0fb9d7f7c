//! Log router — resolves raw logs to contracts, decodes them, and invokes
//! the registered handler.
//!
//! Resolution order: static contract addresses first, then each dynamic
//! group in registration order. Membership is queried per log, so group
//! growth is picked up immediately. Undecodable and unrouted logs are
//! logged and skipped; only membership failures and (under the default
//! policy) handler failures surface as errors.

use std::sync::Arc;
use tracing::{debug, error, trace, warn};

use crate::config::FailurePolicy;
use crate::contracts::ContractSet;
use crate::decode::LogDecoder;
use crate::error::SyncError;
use crate::routes::{RouteKey, RoutingTable};
use crate::schema::InterfaceSpec;
use crate::types::{RawLogEvent, SyncContext};

/// What happened to a single routed log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Decoded and handled.
    Dispatched { route: RouteKey },
    /// Resolved to a contract, but its interface has no matching event or
    /// the payload did not decode.
    SkippedUndecodable,
    /// Decoded, but no handler is registered for the route.
    Unrouted { route: RouteKey },
    /// Emitted by an address the engine does not watch.
    Unmatched,
    /// The handler failed and [`FailurePolicy::Skip`] is in effect.
    HandlerFailed { route: RouteKey },
}

/// Routes raw logs through resolution, decode, and dispatch.
pub struct LogRouter {
    contracts: ContractSet,
    routes: RoutingTable,
    decoder: Arc<dyn LogDecoder>,
    on_handler_failure: FailurePolicy,
}

impl LogRouter {
    pub fn new(
        contracts: ContractSet,
        routes: RoutingTable,
        decoder: Arc<dyn LogDecoder>,
        on_handler_failure: FailurePolicy,
    ) -> Self {
        Self {
            contracts,
            routes,
            decoder,
            on_handler_failure,
        }
    }

    /// Route one raw log.
    ///
    /// Returns an error only for dynamic membership failures and, under
    /// [`FailurePolicy::Fatal`], handler failures. Every other miss is a
    /// [`RouteOutcome`] so the caller keeps scanning.
    pub async fn route(
        &self,
        log: &RawLogEvent,
        ctx: &SyncContext,
    ) -> Result<RouteOutcome, SyncError> {
        if let Some(contract) = self.contracts.resolve_static(&log.address) {
            return self
                .dispatch(&contract.name, &contract.interface, log, ctx)
                .await;
        }

        for group in self.contracts.groups() {
            let members =
                group
                    .membership()
                    .addresses(ctx)
                    .await
                    .map_err(|e| SyncError::Membership {
                        group: group.name.clone(),
                        reason: e.to_string(),
                    })?;
            if members.iter().any(|a| a.eq_ignore_ascii_case(&log.address)) {
                return self.dispatch(&group.name, &group.interface, log, ctx).await;
            }
        }

        trace!(address = %log.address, block = log.block_number, "Log from unwatched address");
        Ok(RouteOutcome::Unmatched)
    }

    async fn dispatch(
        &self,
        contract: &str,
        interface: &InterfaceSpec,
        log: &RawLogEvent,
        ctx: &SyncContext,
    ) -> Result<RouteOutcome, SyncError> {
        let event = match self.decoder.decode(interface, contract, log) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    contract,
                    topic = log.topic0().unwrap_or(""),
                    block = log.block_number,
                    error = %e,
                    "Undecodable log skipped"
                );
                return Ok(RouteOutcome::SkippedUndecodable);
            }
        };

        let key = RouteKey::new(contract, &event.event);
        let Some(handler) = self.routes.handler_for(&key) else {
            warn!(route = %key, block = log.block_number, "No handler registered for route");
            return Ok(RouteOutcome::Unrouted { route: key });
        };

        debug!(route = %key, block = log.block_number, log_index = log.log_index, "Dispatching event");
        match handler.handle(&event, ctx).await {
            Ok(()) => Ok(RouteOutcome::Dispatched { route: key }),
            Err(e) => match self.on_handler_failure {
                FailurePolicy::Fatal => Err(SyncError::Handler {
                    route: key.to_string(),
                    reason: e.to_string(),
                }),
                FailurePolicy::Skip => {
                    error!(route = %key, error = %e, "Handler failed; skipping per policy");
                    Ok(RouteOutcome::HandlerFailed { route: key })
                }
            },
        }
    }

    /// Fire the block-drained hook for `block`, if one is registered.
    /// Hook failures follow the same policy as event handler failures.
    pub async fn notify_block_drained(
        &self,
        block: u64,
        ctx: &SyncContext,
    ) -> Result<(), SyncError> {
        let Some(hook) = self.routes.block_drained_handler() else {
            return Ok(());
        };
        debug!(block, "Block drained");
        match hook.block_drained(block, ctx).await {
            Ok(()) => Ok(()),
            Err(e) => match self.on_handler_failure {
                FailurePolicy::Fatal => Err(SyncError::Handler {
                    route: "block-drained".into(),
                    reason: e.to_string(),
                }),
                FailurePolicy::Skip => {
                    error!(block, error = %e, "Block-drained hook failed; skipping per policy");
                    Ok(())
                }
            },
        }
    }
}
