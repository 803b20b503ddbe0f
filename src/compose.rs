//! The frame composer (spec §4.E): assembles a frame's accepted chunks into
//! an ordered cel list and checks the engine's memory-block budget.

use std::collections::HashSet;

use crate::chunk::{Cel, ChunkId, ChunkPool};
use crate::error::Warning;
use crate::extract::ExtractedChunk;

pub const MAX_CHUNKS_PER_FRAME: usize = 108;
/// Default per-animation memory budget for [`crate::palette::SpriteKind::Object`]:
/// 0x3C0 tile-units, per spec §3.
pub const DEFAULT_MEMORY_BUDGET: u32 = 0x3C0;

/// One layer's extracted-and-deduplicated chunks, ready to become cels.
pub struct LayerChunks {
    pub layer: u32,
    pub chunks: Vec<(ExtractedChunk, ChunkId)>,
}

/// Builds the ordered cel list for one frame: sort by (layer, y, x), per
/// spec §4.E step 2, and assign a sequential z-order within each layer.
pub fn compose_frame(layers: Vec<LayerChunks>) -> Vec<Cel> {
    let mut cels: Vec<Cel> = layers
        .into_iter()
        .flat_map(|lc| {
            let layer = lc.layer;
            lc.chunks.into_iter().map(move |(ec, chunk_id)| Cel {
                chunk_id,
                x: ec.origin_x as i32,
                y: ec.origin_y as i32,
                palette_group: ec.palette_group,
                layer,
                z: 0,
            })
        })
        .collect();

    cels.sort_by_key(|c| (c.layer, c.y, c.x));

    let mut next_z = std::collections::HashMap::new();
    for cel in &mut cels {
        let z = next_z.entry(cel.layer).or_insert(0u32);
        cel.z = *z;
        *z += 1;
    }
    cels
}

/// Per-frame memory cost: sum over *distinct* chunk ids of their memory
/// cost (spec §3: duplicates within a frame count once).
pub fn frame_memory(cels: &[Cel], pool: &ChunkPool) -> u32 {
    let mut seen = HashSet::new();
    cels.iter()
        .filter(|c| seen.insert(c.chunk_id))
        .map(|c| pool.get(c.chunk_id).memory_cost())
        .sum()
}

/// Checks the per-frame chunk-count and memory limits, returning warnings
/// (never errors: spec §7 downgrades both to non-fatal).
pub fn check_limits(frame_id: u32, cels: &[Cel], pool: &ChunkPool, memory_budget: u32) -> Vec<Warning> {
    let mut warnings = Vec::new();
    if cels.len() > MAX_CHUNKS_PER_FRAME {
        warnings.push(Warning::ChunkLimitExceeded {
            frame: frame_id,
            count: cels.len(),
            limit: MAX_CHUNKS_PER_FRAME,
        });
    }
    let memory = frame_memory(cels, pool);
    if memory > memory_budget {
        warnings.push(Warning::MemoryLimitExceeded {
            frame: frame_id,
            memory,
            budget: memory_budget,
        });
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunk;

    fn dummy_chunk(pool: &mut ChunkPool, w: u32, h: u32, seed: u8) -> ChunkId {
        pool.insert_or_get(Chunk {
            width: w,
            height: h,
            palette_group: 0,
            pixels: vec![seed; (w * h) as usize],
        })
    }

    #[test]
    fn cels_sort_by_layer_then_y_then_x() {
        let mut pool = ChunkPool::new();
        let a = dummy_chunk(&mut pool, 8, 8, 1);
        let b = dummy_chunk(&mut pool, 8, 8, 2);
        let layers = vec![LayerChunks {
            layer: 0,
            chunks: vec![
                (
                    ExtractedChunk { origin_x: 8, origin_y: 0, width: 8, height: 8, palette_group: 0, pixels: vec![] },
                    b,
                ),
                (
                    ExtractedChunk { origin_x: 0, origin_y: 0, width: 8, height: 8, palette_group: 0, pixels: vec![] },
                    a,
                ),
            ],
        }];
        let cels = compose_frame(layers);
        assert_eq!(cels[0].chunk_id, a);
        assert_eq!(cels[1].chunk_id, b);
        assert_eq!(cels[0].z, 0);
        assert_eq!(cels[1].z, 1);
    }

    /// P-MEM: reported memory equals the sum over distinct chunks.
    #[test]
    fn memory_counts_distinct_chunks_once() {
        let mut pool = ChunkPool::new();
        let a = dummy_chunk(&mut pool, 32, 32, 1); // 16 tiles -> 16
        let cels = vec![
            Cel { chunk_id: a, x: 0, y: 0, palette_group: 0, layer: 0, z: 0 },
            Cel { chunk_id: a, x: 32, y: 0, palette_group: 0, layer: 0, z: 1 },
        ];
        assert_eq!(frame_memory(&cels, &pool), 16);
    }

    #[test]
    fn warns_on_chunk_count_and_memory_limits() {
        let mut pool = ChunkPool::new();
        let big = dummy_chunk(&mut pool, 64, 64, 9); // 64 tiles
        let cels: Vec<Cel> = (0..200)
            .map(|i| Cel { chunk_id: big, x: i, y: 0, palette_group: 0, layer: 0, z: i as u32 })
            .collect();
        let warnings = check_limits(0, &cels, &pool, 32);
        assert!(warnings.iter().any(|w| matches!(w, Warning::ChunkLimitExceeded { .. })));
        assert!(warnings.iter().any(|w| matches!(w, Warning::MemoryLimitExceeded { .. })));
    }
}
