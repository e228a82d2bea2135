//! Node mapper
//!
//! Nodes are host-owned and mirrored unchanged into the virtual view. Only
//! registered when node sync is enabled.

use std::sync::Arc;

use k8s_openapi::api::core::v1::Node;

use crate::mappings::Mapper;
use crate::translate::MirrorHostMapper;
use crate::types::ResourceKind;

/// Build the node mapper.
pub fn mapper() -> Arc<dyn Mapper> {
    Arc::new(MirrorHostMapper::new(ResourceKind::of::<Node>()))
}
