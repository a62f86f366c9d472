//! Resources referenced by hash or path from extension commands.

#![allow(missing_docs)]

use core::fmt;
use std::collections::HashMap;

use crate::{
    error::{GfxError, GfxResult},
    memory::{Arena, BufferHandle, Pointer},
};

/// A reference to an externally stored resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceRef {
    Hash(u64),
    Path(String),
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceRef::Hash(hash) => write!(f, "{:#018X}", hash),
            ResourceRef::Path(path) => write!(f, "{}", path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureType {
    /// N64 formatted texel data, decoded according to the tile format.
    #[default]
    Legacy,
    /// Pre-decoded RGBA32 data uploaded as is.
    Raw,
}

/// Extra information for textures that came from the resource manager.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawTexMetadata {
    pub kind: TextureType,
    pub width: u32,
    pub height: u32,
    /// Ratio of raw bytes to N64 bytes along each axis.
    pub h_byte_scale: f32,
    pub v_byte_scale: f32,
}

impl Default for RawTexMetadata {
    fn default() -> Self {
        Self {
            kind: TextureType::Legacy,
            width: 0,
            height: 0,
            h_byte_scale: 1.0,
            v_byte_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureResource {
    pub data: Vec<u8>,
    pub metadata: RawTexMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// Encoded commands, eight bytes each.
    DisplayList(Vec<u8>),
    Vertices(Vec<u8>),
    Matrix(Vec<u8>),
    Texture(TextureResource),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    DisplayList,
    Vertices,
    Matrix,
    Texture,
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::DisplayList(_) => ResourceKind::DisplayList,
            Resource::Vertices(_) => ResourceKind::Vertices,
            Resource::Matrix(_) => ResourceKind::Matrix,
            Resource::Texture(_) => ResourceKind::Texture,
        }
    }
}

/// Resolves resource references to their contents.
pub trait ResourceManager {
    fn load(&mut self, resource: &ResourceRef) -> Option<Resource>;
}

impl ResourceManager for HashMap<ResourceRef, Resource> {
    fn load(&mut self, resource: &ResourceRef) -> Option<Resource> {
        self.get(resource).cloned()
    }
}

/// A resource that has been copied into the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadedResource {
    pub kind: ResourceKind,
    pub buffer: BufferHandle,
    pub metadata: RawTexMetadata,
}

impl LoadedResource {
    pub fn pointer(&self) -> Pointer {
        Pointer::new(self.buffer, 0)
    }
}

/// Remembers which resources have already been loaded so each one is copied into the arena
/// only once.
#[derive(Debug, Default)]
pub struct ResourceCache {
    loaded: HashMap<ResourceRef, LoadedResource>,
}

impl ResourceCache {
    pub fn get_or_load(
        &mut self,
        arena: &mut Arena,
        manager: &mut dyn ResourceManager,
        resource: &ResourceRef,
        kind: ResourceKind,
    ) -> GfxResult<LoadedResource> {
        let loaded = match self.loaded.get(resource) {
            Some(loaded) => *loaded,
            None => {
                let contents = manager
                    .load(resource)
                    .ok_or_else(|| GfxError::MissingResource(resource.clone()))?;
                let (kind, data, metadata) = match contents {
                    Resource::DisplayList(data) => {
                        (ResourceKind::DisplayList, data, RawTexMetadata::default())
                    }
                    Resource::Vertices(data) => {
                        (ResourceKind::Vertices, data, RawTexMetadata::default())
                    }
                    Resource::Matrix(data) => {
                        (ResourceKind::Matrix, data, RawTexMetadata::default())
                    }
                    Resource::Texture(texture) => {
                        (ResourceKind::Texture, texture.data, texture.metadata)
                    }
                };
                let loaded = LoadedResource {
                    kind,
                    buffer: arena.insert(data),
                    metadata,
                };
                tracing::debug!("loaded resource {} as {:?}", resource, loaded.kind);
                self.loaded.insert(resource.clone(), loaded);
                loaded
            }
        };
        if loaded.kind != kind {
            return Err(GfxError::UnexpectedResource(resource.clone()));
        }
        Ok(loaded)
    }

    pub fn clear(&mut self) {
        self.loaded.clear();
    }
}

/// A manager that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResources;

impl ResourceManager for NoResources {
    fn load(&mut self, _resource: &ResourceRef) -> Option<Resource> {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_resources_load_once() {
        let mut arena = Arena::new();
        let mut manager: HashMap<ResourceRef, Resource> = HashMap::new();
        manager.insert(ResourceRef::Hash(7), Resource::Vertices(vec![0; 16]));
        let mut cache = ResourceCache::default();

        let a = cache
            .get_or_load(&mut arena, &mut manager, &ResourceRef::Hash(7), ResourceKind::Vertices)
            .unwrap();
        let b = cache
            .get_or_load(&mut arena, &mut manager, &ResourceRef::Hash(7), ResourceKind::Vertices)
            .unwrap();
        assert_eq!(a.buffer, b.buffer);
        assert_eq!(arena.len(), 1);

        assert!(matches!(
            cache.get_or_load(
                &mut arena,
                &mut manager,
                &ResourceRef::Hash(7),
                ResourceKind::Matrix
            ),
            Err(GfxError::UnexpectedResource(_))
        ));
        assert!(matches!(
            cache.get_or_load(
                &mut arena,
                &mut manager,
                &ResourceRef::Hash(8),
                ResourceKind::Matrix
            ),
            Err(GfxError::MissingResource(_))
        ));
    }
}
