//! Burrow - virtual Kubernetes clusters inside a shared host cluster
//!
//! Burrow presents a full, independent cluster API to tenants while running
//! their workloads inside namespaces of a real, shared cluster. Every
//! object a tenant creates is projected into the host cluster under a
//! different name/namespace, and every relevant host-side change is
//! projected back.
//!
//! This crate is the resource identity mapping system that sync controllers
//! build on: the per-kind translation contract, the translation strategies,
//! the persistent conflict-detecting mapping store, and the migration
//! procedure that re-derives mappings when a translation scheme changes.
//!
//! # Modules
//!
//! - [`types`] - Identity types: kinds, object names, name mappings
//! - [`config`] - Virtual cluster configuration and sync toggles
//! - [`context`] - The per-virtual-cluster context threaded through every call
//! - [`mappings`] - The `Mapper` contract, store, recorder, registry, index
//!   and migration
//! - [`translate`] - Name functions, annotations and the strategy
//!   implementations
//! - [`resources`] - Per-kind mappers and registration wiring
//! - [`error`] - Error types for the mapping system

#![deny(missing_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod mappings;
pub mod resources;
pub mod translate;
pub mod types;

pub use config::VirtualClusterConfig;
pub use context::SyncContext;
pub use error::Error;
pub use mappings::{Mapper, MapperRegistry, MappingStore, Recorded};
pub use types::{NameMapping, ObjectName, ResourceKind};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
