//! Capability descriptors for backend engines
//!
//! Static data describing which DRM types and content types each backend can
//! handle. The selector only ever consults this table; it never inspects a
//! concrete engine.

use crate::types::{BackendType, ContentType, DrmType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What a single backend engine supports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCapability {
    pub backend: BackendType,
    pub drm_types: BTreeSet<DrmType>,
    pub content_types: BTreeSet<ContentType>,
    /// Whether the engine accepts an adverts loader
    pub supports_adverts: bool,
}

impl BackendCapability {
    pub fn new(
        backend: BackendType,
        drm_types: impl IntoIterator<Item = DrmType>,
        content_types: impl IntoIterator<Item = ContentType>,
    ) -> Self {
        Self {
            backend,
            drm_types: drm_types.into_iter().collect(),
            content_types: content_types.into_iter().collect(),
            supports_adverts: false,
        }
    }

    pub fn with_adverts(mut self) -> Self {
        self.supports_adverts = true;
        self
    }

    pub fn supports(&self, drm_type: DrmType, content_type: ContentType) -> bool {
        self.drm_types.contains(&drm_type) && self.content_types.contains(&content_type)
    }

    pub fn supports_content(&self, content_type: ContentType) -> bool {
        self.content_types.contains(&content_type)
    }
}

/// Lookup table of backend capabilities, one entry per backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityTable {
    entries: Vec<BackendCapability>,
}

impl CapabilityTable {
    /// Empty table; every lookup reports unsupported
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in descriptors for the streaming engine and the platform decoder
    pub fn standard() -> Self {
        Self::new()
            .with(
                BackendCapability::new(
                    BackendType::Streaming,
                    [
                        DrmType::None,
                        DrmType::WidevineModularStream,
                        DrmType::WidevineModularDownload,
                    ],
                    [ContentType::H264, ContentType::Dash, ContentType::Hls],
                )
                .with_adverts(),
            )
            .with(BackendCapability::new(
                BackendType::Platform,
                [DrmType::None, DrmType::WidevineClassic],
                [ContentType::H264, ContentType::Hls],
            ))
    }

    /// Add or replace the descriptor for a backend
    pub fn with(mut self, capability: BackendCapability) -> Self {
        self.entries.retain(|c| c.backend != capability.backend);
        self.entries.push(capability);
        self
    }

    pub fn capability(&self, backend: BackendType) -> Option<&BackendCapability> {
        self.entries.iter().find(|c| c.backend == backend)
    }

    /// Unknown backends are unsupported
    pub fn supports(&self, backend: BackendType, drm_type: DrmType, content_type: ContentType) -> bool {
        self.capability(backend)
            .map(|c| c.supports(drm_type, content_type))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackendCapability> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
