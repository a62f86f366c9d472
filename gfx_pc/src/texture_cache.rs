#![allow(missing_docs)]

use lru::LruCache;

use crate::{
    backend::TextureId,
    cmd::{ComponentSize, ImageFormat},
    memory::Pointer,
};

/// Everything that determines the decoded contents of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureCacheKey {
    pub addr: Pointer,
    /// Only set for color indexed formats.
    pub palettes: [Option<Pointer>; 2],
    pub fmt: ImageFormat,
    pub size: ComponentSize,
    pub palette_index: u32,
    pub orig_size_bytes: u32,
}

/// Sampler parameters last applied to a cached texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SamplerParams {
    pub linear_filter: bool,
    pub cms: u32,
    pub cmt: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureCacheEntry {
    pub texture_id: TextureId,
    pub sampler: Option<SamplerParams>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Maps texture contents to backend textures, evicting the least recently used entry when
/// full.
///
/// Backend ids of evicted or invalidated entries are kept on a free list and handed out
/// again instead of allocating new backend textures.
#[derive(Debug)]
pub struct TextureCache {
    entries: LruCache<TextureCacheKey, TextureCacheEntry>,
    free_ids: Vec<TextureId>,
    stats: TextureCacheStats,
}

impl TextureCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::new(capacity.max(1)),
            free_ids: Vec::new(),
            stats: TextureCacheStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap()
    }

    pub fn stats(&self) -> TextureCacheStats {
        self.stats
    }

    pub fn contains(&self, key: &TextureCacheKey) -> bool {
        self.entries.contains(key)
    }

    /// Returns the entry for `key` and marks it most recently used.
    pub fn lookup(&mut self, key: &TextureCacheKey) -> Option<&mut TextureCacheEntry> {
        match self.entries.get_mut(key) {
            Some(entry) => {
                self.stats.hits += 1;
                Some(entry)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Returns the entry for `key` without touching its recency or the statistics.
    pub fn entry_mut(&mut self, key: &TextureCacheKey) -> Option<&mut TextureCacheEntry> {
        self.entries.peek_mut(key)
    }

    /// Adds an entry for `key`, evicting the least recently used entry if the cache is full.
    ///
    /// The backend id is taken from the free list, or from `new_texture` if the list is empty.
    pub fn insert(
        &mut self,
        key: TextureCacheKey,
        sampler: Option<SamplerParams>,
        new_texture: impl FnOnce() -> TextureId,
    ) -> TextureCacheEntry {
        if let Some(old) = self.entries.pop(&key) {
            self.free_ids.push(old.texture_id);
        }
        if self.entries.len() >= self.entries.cap() {
            if let Some((evicted, entry)) = self.entries.pop_lru() {
                tracing::debug!("evicting texture {:?} at {}", entry.texture_id, evicted.addr);
                self.free_ids.push(entry.texture_id);
                self.stats.evictions += 1;
            }
        }
        let entry = TextureCacheEntry {
            texture_id: self.free_ids.pop().unwrap_or_else(new_texture),
            sampler,
        };
        self.entries.put(key, entry);
        entry
    }

    /// Removes every entry whose source image starts at `addr`.
    pub fn invalidate(&mut self, addr: Pointer) {
        let invalidated_keys: Vec<TextureCacheKey> = self
            .entries
            .iter()
            .filter(|(key, _)| key.addr == addr)
            .map(|(key, _)| *key)
            .collect();

        for key in invalidated_keys {
            if let Some(entry) = self.entries.pop(&key) {
                self.free_ids.push(entry.texture_id);
            }
        }
    }

    /// Removes every entry and returns every backend id the cache has handed out, including
    /// free ones. The cache forgets all of them.
    pub fn clear(&mut self) -> Vec<TextureId> {
        let mut ids = std::mem::take(&mut self.free_ids);
        while let Some((_, entry)) = self.entries.pop_lru() {
            ids.push(entry.texture_id);
        }
        ids
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::BufferHandle;

    fn key(offset: u32) -> TextureCacheKey {
        TextureCacheKey {
            addr: Pointer::new(BufferHandle(0), offset),
            palettes: [None; 2],
            fmt: ImageFormat::Rgba,
            size: ComponentSize::Bits16,
            palette_index: 0,
            orig_size_bytes: 512,
        }
    }

    fn counter() -> impl FnMut() -> TextureId {
        let mut next = 0;
        move || {
            next += 1;
            TextureId(next)
        }
    }

    #[test]
    fn test_recently_used_entry_survives_eviction() {
        let mut next_id = counter();
        let mut cache = TextureCache::new(2);
        cache.insert(key(0), None, &mut next_id);
        cache.insert(key(1), None, &mut next_id);
        assert!(cache.lookup(&key(0)).is_some());

        cache.insert(key(2), None, &mut next_id);
        assert!(cache.contains(&key(0)));
        assert!(!cache.contains(&key(1)));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_insert_returns_stored_entry() {
        let mut next_id = counter();
        let mut cache = TextureCache::new(4);
        let sampler = Some(SamplerParams {
            linear_filter: true,
            cms: 1,
            cmt: 2,
        });
        let entry = cache.insert(key(0), sampler, &mut next_id);
        assert_eq!(entry.texture_id, TextureId(1));
        assert_eq!(cache.entry_mut(&key(0)).copied(), Some(entry));
        assert_eq!(cache.entry_mut(&key(0)).and_then(|e| e.sampler), sampler);
    }

    #[test]
    fn test_evicted_ids_are_reused() {
        let mut next_id = counter();
        let mut cache = TextureCache::new(1);
        let first = cache.insert(key(0), None, &mut next_id).texture_id;
        let second = cache.insert(key(1), None, &mut next_id).texture_id;
        assert_eq!(first, second);
        assert_eq!(next_id(), TextureId(2));
    }

    #[test]
    fn test_invalidate_by_address() {
        let mut next_id = counter();
        let mut cache = TextureCache::new(10);
        let mut palette_variant = key(0);
        palette_variant.fmt = ImageFormat::Ci;
        palette_variant.palettes[0] = Some(Pointer::new(BufferHandle(1), 0));
        cache.insert(key(0), None, &mut next_id);
        cache.insert(palette_variant, None, &mut next_id);
        cache.insert(key(8), None, &mut next_id);

        cache.invalidate(Pointer::new(BufferHandle(0), 0));
        assert_eq!(cache.len(), 1);
        assert!(cache.lookup(&key(0)).is_none());
        assert!(cache.lookup(&key(8)).is_some());
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);

        let mut released = cache.clear();
        released.sort();
        assert_eq!(released, vec![TextureId(1), TextureId(2), TextureId(3)]);
        assert!(cache.is_empty());
    }
}
