//! Shared caches and registries.

use std::sync::Arc;

use crate::{Block, Conf, ConverterCache, DescriptorCache, TypeRegistry};

/// Converters, member descriptions and named types, shared by every [`Conf`]
/// loaded from it.
///
/// Build one per application, register converters and types, then wrap it in
/// an `Arc`. All caches are grow-only and safe to use from several threads.
#[derive(Default)]
pub struct Engine {
    converters: ConverterCache,
    descriptors: DescriptorCache,
    types: TypeRegistry,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn converters(&self) -> &ConverterCache {
        &self.converters
    }

    pub fn descriptors(&self) -> &DescriptorCache {
        &self.descriptors
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Parse `source` into a [`Conf`] bound to this engine.
    pub fn load(self: &Arc<Self>, source: &str) -> Conf {
        Conf::new(self.clone(), Block::parse(source))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("converters", &self.converters.len())
            .field("descriptors", &self.descriptors.len())
            .field("types", &self.types.names())
            .finish()
    }
}
