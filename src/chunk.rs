//! The chunk model shared by the forward and reverse pipelines (spec §3).

use std::collections::HashMap;

use crate::tile::TILE;

/// The 12 chunk dimensions the extractor is allowed to emit, in the
/// descending-area, wider-before-taller tie-break order spec §4.C requires
/// ("wider before taller, e.g. 64×32 before 32×64").
pub const ALLOWED_CHUNK_SIZES: [(u32, u32); 12] = [
    (64, 64),
    (64, 32),
    (32, 64),
    (32, 32),
    (32, 16),
    (16, 32),
    (32, 8),
    (8, 32),
    (16, 16),
    (16, 8),
    (8, 16),
    (8, 8),
];

pub const FALLBACK_SIZE: (u32, u32) = (8, 8);

/// Sweep order for the chunk extractor (spec §9: "expose it as a pluggable
/// strategy so larger-first and smaller-first orders can both be tested").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrder {
    LargestFirst,
    SmallestFirst,
}

impl ScanOrder {
    /// Orders `sizes` per this strategy. `LargestFirst` is the order spec
    /// §4.C and §4.D mandate for production use; `SmallestFirst` exists so
    /// the coverage behavior can be exercised under the opposite sweep in
    /// tests.
    pub fn order(self, sizes: &[(u32, u32)]) -> Vec<(u32, u32)> {
        let mut v = sizes.to_vec();
        match self {
            ScanOrder::LargestFirst => {
                v.sort_by(|a, b| (b.0 * b.1, b.0).cmp(&(a.0 * a.1, a.0)))
            }
            ScanOrder::SmallestFirst => {
                v.sort_by(|a, b| (a.0 * a.1, b.0).cmp(&(b.0 * b.1, a.0)))
            }
        }
        v
    }
}

/// A rectangular, tile-aligned, content-addressed chunk of palette indices.
///
/// Pixel data is stored in canonical form: transparent pixels are
/// normalized to local index 0, per spec §4.D's canonical representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub width: u32,
    pub height: u32,
    pub palette_group: u8,
    pub pixels: Vec<u8>,
}

impl Chunk {
    pub fn memory_tiles(width: u32, height: u32) -> u32 {
        let tiles = width.div_ceil(TILE) * height.div_ceil(TILE);
        tiles.div_ceil(4) * 4
    }

    pub fn memory_cost(&self) -> u32 {
        Self::memory_tiles(self.width, self.height)
    }

    /// The canonical byte buffer hashed for content-addressing (spec §4.D):
    /// `(width, height, palette_group, pixel bytes)`.
    fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(9 + self.pixels.len());
        buf.extend_from_slice(&self.width.to_le_bytes());
        buf.extend_from_slice(&self.height.to_le_bytes());
        buf.push(self.palette_group);
        buf.extend_from_slice(&self.pixels);
        buf
    }

    pub fn content_hash(&self) -> blake3::Hash {
        blake3::hash(&self.canonical_bytes())
    }
}

pub type ChunkId = u32;

/// A placement of a chunk inside a frame (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cel {
    pub chunk_id: ChunkId,
    pub x: i32,
    pub y: i32,
    pub palette_group: u8,
    pub layer: u32,
    pub z: u32,
}

/// An ordered list of cels, one frame of the sprite.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub cels: Vec<Cel>,
}

/// One (frame_id, duration) entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimFrame {
    pub frame_id: u32,
    pub duration_ticks: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Animation {
    pub frames: Vec<AnimFrame>,
}

/// Accumulates the chunk pool for one pipeline run. Chunks are only ever
/// added (spec §3's lifecycle); `chunk_id` is assignment order.
#[derive(Debug, Default)]
pub struct ChunkPool {
    chunks: Vec<Chunk>,
    by_hash: HashMap<blake3::Hash, Vec<ChunkId>>,
}

impl ChunkPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ChunkId) -> &Chunk {
        &self.chunks[id as usize]
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkId, &Chunk)> {
        self.chunks.iter().enumerate().map(|(i, c)| (i as ChunkId, c))
    }

    /// Looks up `chunk` by content hash, resolving collisions with an
    /// actual byte comparison (spec §9). Returns the existing id on a hit.
    pub fn find(&self, chunk: &Chunk) -> Option<ChunkId> {
        let hash = chunk.content_hash();
        self.by_hash.get(&hash)?.iter().copied().find(|&id| {
            let existing = &self.chunks[id as usize];
            existing.width == chunk.width
                && existing.height == chunk.height
                && existing.palette_group == chunk.palette_group
                && existing.pixels == chunk.pixels
        })
    }

    /// Inserts `chunk`, returning its existing id on a duplicate or a freshly
    /// assigned one otherwise.
    pub fn insert_or_get(&mut self, chunk: Chunk) -> ChunkId {
        if let Some(id) = self.find(&chunk) {
            return id;
        }
        self.force_insert(chunk)
    }

    /// Inserts `chunk` as a brand-new entry, even if an identical one
    /// already exists (used when inter-frame dedup is disabled).
    pub fn force_insert(&mut self, chunk: Chunk) -> ChunkId {
        let id = self.chunks.len() as ChunkId;
        self.by_hash.entry(chunk.content_hash()).or_default().push(id);
        self.chunks.push(chunk);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_cost_rounds_up_to_multiple_of_4() {
        assert_eq!(Chunk::memory_tiles(8, 8), 4); // 1 tile -> 4
        assert_eq!(Chunk::memory_tiles(32, 32), 16); // 16 tiles -> 16
        assert_eq!(Chunk::memory_tiles(16, 8), 4); // 2 tiles -> 4
        assert_eq!(Chunk::memory_tiles(64, 64), 64); // 64 tiles -> 64
    }

    #[test]
    fn scan_order_sorts_by_area_then_width() {
        let sizes = ALLOWED_CHUNK_SIZES;
        let ordered = ScanOrder::LargestFirst.order(&sizes);
        assert_eq!(ordered[0], (64, 64));
        // 64x32 before 32x64: equal area, wider first.
        let idx_64x32 = ordered.iter().position(|&s| s == (64, 32)).unwrap();
        let idx_32x64 = ordered.iter().position(|&s| s == (32, 64)).unwrap();
        assert!(idx_64x32 < idx_32x64);
        assert_eq!(*ordered.last().unwrap(), (8, 8));
    }

    #[test]
    fn pool_deduplicates_identical_chunks() {
        let mut pool = ChunkPool::new();
        let chunk = Chunk {
            width: 8,
            height: 8,
            palette_group: 0,
            pixels: vec![1; 64],
        };
        let id1 = pool.insert_or_get(chunk.clone());
        let id2 = pool.insert_or_get(chunk);
        assert_eq!(id1, id2);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn pool_distinguishes_different_palette_groups() {
        let mut pool = ChunkPool::new();
        let a = Chunk { width: 8, height: 8, palette_group: 0, pixels: vec![1; 64] };
        let b = Chunk { width: 8, height: 8, palette_group: 1, pixels: vec![1; 64] };
        let id_a = pool.insert_or_get(a);
        let id_b = pool.insert_or_get(b);
        assert_ne!(id_a, id_b);
        assert_eq!(pool.len(), 2);
    }
}
