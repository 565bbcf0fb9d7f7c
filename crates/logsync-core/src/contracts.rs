//! Watched contract definitions — static addresses and dynamic groups.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::MembershipError;
use crate::schema::InterfaceSpec;
use crate::types::SyncContext;

/// A contract watched at a single, fixed address.
#[derive(Debug, Clone)]
pub struct StaticContract {
    /// Name used for routing, e.g. `"Vault"`.
    pub name: String,
    /// The contract address (`0x…`). Matching is case-insensitive.
    pub address: String,
    /// Events the contract can emit.
    pub interface: InterfaceSpec,
}

impl StaticContract {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        interface: InterfaceSpec,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            interface,
        }
    }
}

/// Trait for membership oracles backing a dynamic group.
///
/// The engine queries the current membership on every routing attempt that
/// reaches the group, so an address added mid-sync is picked up by the very
/// next routed log.
#[async_trait]
pub trait GroupMembership: Send + Sync {
    /// The full set of member addresses at this point of the sync.
    async fn addresses(&self, ctx: &SyncContext) -> Result<Vec<String>, MembershipError>;
}

/// A family of same-interface contracts whose addresses are only known at
/// runtime (factory children, registry entries, and the like).
#[derive(Clone)]
pub struct DynamicGroup {
    /// Group name used for routing, e.g. `"Pool"`.
    pub name: String,
    /// Events every member contract can emit.
    pub interface: InterfaceSpec,
    membership: Arc<dyn GroupMembership>,
}

impl DynamicGroup {
    pub fn new(
        name: impl Into<String>,
        interface: InterfaceSpec,
        membership: Arc<dyn GroupMembership>,
    ) -> Self {
        Self {
            name: name.into(),
            interface,
            membership,
        }
    }

    /// The membership oracle for this group.
    pub fn membership(&self) -> &Arc<dyn GroupMembership> {
        &self.membership
    }
}

/// Everything the engine watches: static contracts plus dynamic groups.
///
/// Resolution checks static addresses first, then the dynamic groups in
/// registration order. A static contract and a group member must not share
/// an address; the static entry would shadow the group.
#[derive(Clone, Default)]
pub struct ContractSet {
    statics: Vec<StaticContract>,
    groups: Vec<DynamicGroup>,
}

impl ContractSet {
    pub fn new(statics: Vec<StaticContract>, groups: Vec<DynamicGroup>) -> Self {
        Self { statics, groups }
    }

    /// Resolve an emitting address against the static contracts.
    /// Comparison is case-insensitive to tolerate mixed-case hex.
    pub fn resolve_static(&self, address: &str) -> Option<&StaticContract> {
        self.statics
            .iter()
            .find(|c| c.address.eq_ignore_ascii_case(address))
    }

    /// The dynamic groups, in registration order.
    pub fn groups(&self) -> &[DynamicGroup] {
        &self.groups
    }

    /// The static contracts, in registration order.
    pub fn statics(&self) -> &[StaticContract] {
        &self.statics
    }

    /// Returns `true` if nothing is being watched.
    pub fn is_empty(&self) -> bool {
        self.statics.is_empty() && self.groups.is_empty()
    }
}
