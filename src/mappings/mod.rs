//! The per-kind translation contract and its supporting machinery
//!
//! Every synced resource kind implements [`Mapper`]; sync controllers
//! resolve identities exclusively through it, looked up from the
//! [`MapperRegistry`]. Store-backed behavior is layered on with the
//! [`Recorded`] decorator rather than built into individual mappers.

pub mod backend;
pub mod index;
pub mod migration;
pub mod recorder;
pub mod registry;
pub mod store;

pub use recorder::Recorded;
pub use registry::MapperRegistry;
pub use store::MappingStore;

use async_trait::async_trait;
use kube::api::DynamicObject;

use crate::context::SyncContext;
use crate::types::{ObjectName, ResourceKind};
use crate::Result;

/// Per-kind translation between virtual and host identities.
///
/// Implementations are stateless or index-backed; the only durable state
/// lives in the [`MappingStore`]. Both translation directions must be
/// idempotent: the same inputs against unchanged store state yield the same
/// result.
#[async_trait]
pub trait Mapper: Send + Sync {
    /// The kind this mapper serves.
    fn kind(&self) -> ResourceKind;

    /// Opaque fingerprint of the translation scheme.
    ///
    /// Changing it (a different strategy, namespace mode, or target) is what
    /// triggers [`Mapper::migrate`] at startup.
    fn scheme(&self) -> String;

    /// Forward translation: the host identity for a virtual identity.
    ///
    /// The object is passed when available because host identity can depend
    /// on object state, not just name.
    async fn virtual_to_host(
        &self,
        ctx: &SyncContext,
        name: &ObjectName,
        obj: Option<&DynamicObject>,
    ) -> Result<ObjectName>;

    /// Inverse translation: the virtual identity for a host identity.
    ///
    /// Returns the zero identity to signal "this host object is not one we
    /// manage" — a normal, expected outcome, not an error.
    async fn host_to_virtual(
        &self,
        ctx: &SyncContext,
        name: &ObjectName,
        obj: Option<&DynamicObject>,
    ) -> Result<ObjectName>;

    /// Ownership test run before any mutating action on a host object, so
    /// the system never adopts objects it did not create.
    async fn is_managed(&self, ctx: &SyncContext, obj: &DynamicObject) -> Result<bool>;

    /// Backfill recorded mappings for existing objects after the
    /// translation scheme for this kind changed.
    ///
    /// The default lists all virtual objects of the kind and pins the
    /// identity the current scheme produces. Kinds with indirect references
    /// override this to additionally seed mappings for referenced objects,
    /// attributed to their referencer.
    async fn migrate(&self, ctx: &SyncContext, registry: &MapperRegistry) -> Result<()> {
        let _ = registry;
        migration::backfill_kind(ctx, self).await
    }
}
