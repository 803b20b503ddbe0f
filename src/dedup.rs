//! The chunk deduplicator (spec §4.D): intra-frame sub-chunk registration
//! and inter-frame chunk-pool reuse.
//!
//! Open Question #1 (spec §9) is resolved here: when the intra scan finds a
//! smaller chunk inside an already-accepted larger one, the larger chunk is
//! *kept* as the frame's cel and the smaller one is *additionally
//! registered* in the shared pool, available for other frames to reuse via
//! the inter-frame scan. The larger chunk is never split into multiple
//! cels.

use crate::chunk::{Chunk, ChunkId, ChunkPool, ScanOrder};
use crate::extract::ExtractedChunk;
use crate::tile::{IndexedImage, TileGrid, TileRect, TILE};

#[derive(Debug, Clone, Copy)]
pub struct DedupConfig {
    pub intra_scan: bool,
    pub inter_scan: bool,
}

impl ExtractedChunk {
    fn to_chunk(&self) -> Chunk {
        Chunk {
            width: self.width,
            height: self.height,
            palette_group: self.palette_group,
            pixels: self.pixels.clone(),
        }
    }
}

/// Registers a top-level extracted chunk (one that will back a cel) in the
/// pool. When `inter_scan` is disabled, lookup is skipped and a fresh
/// chunk_id is always assigned, so identical chunks across frames (or
/// within one) are never merged.
pub fn register_top_level(pool: &mut ChunkPool, cfg: DedupConfig, chunk: &ExtractedChunk) -> ChunkId {
    let c = chunk.to_chunk();
    if cfg.inter_scan {
        pool.insert_or_get(c)
    } else {
        pool.force_insert(c)
    }
}

/// Runs the intra-frame sub-chunk scan over one accepted top-level chunk:
/// re-extracts at the enabled sizes smaller than the chunk itself and
/// registers any valid sub-rectangle into the pool, ignoring `inter_scan`
/// (registration only matters if a later lookup can find it, but it's
/// harmless and simpler to always register).
pub fn run_intra_scan(
    pool: &mut ChunkPool,
    cfg: DedupConfig,
    chunk: &ExtractedChunk,
    min_density: f64,
    enabled_sizes: &[(u32, u32)],
) {
    if !cfg.intra_scan {
        return;
    }
    let sub_image = IndexedImage {
        width: chunk.width,
        height: chunk.height,
        indices: chunk.pixels.clone(),
    };
    let grid = TileGrid::new(&sub_image);
    let tiles_wide = sub_image.tiles_wide();
    let tiles_high = sub_image.tiles_high();

    let mut covered = vec![false; (tiles_wide * tiles_high) as usize];
    let smaller_sizes: Vec<(u32, u32)> = enabled_sizes
        .iter()
        .copied()
        .filter(|&(w, h)| w * h < chunk.width * chunk.height)
        .collect();

    for (w, h) in ScanOrder::LargestFirst.order(&smaller_sizes) {
        let tw = w / TILE;
        let th = h / TILE;
        if tw == 0 || th == 0 || tw > tiles_wide || th > tiles_high {
            continue;
        }
        for ty in 0..=(tiles_high - th) {
            for tx in 0..=(tiles_wide - tw) {
                let rect = TileRect { tx, ty, tw, th };
                if !grid.has_non_empty_tile(&rect) {
                    continue;
                }
                if already_fully_covered(&covered, tiles_wide, &rect) {
                    continue;
                }
                if !grid.meets_density(&rect, min_density) {
                    continue;
                }
                mark_covered(&mut covered, tiles_wide, &rect);

                let mut pixels = Vec::with_capacity((w * h) as usize);
                for y in rect.ty * TILE..(rect.ty + rect.th) * TILE {
                    for x in rect.tx * TILE..(rect.tx + rect.tw) * TILE {
                        pixels.push(sub_image.indices[(y * sub_image.width + x) as usize]);
                    }
                }
                pool.insert_or_get(Chunk {
                    width: w,
                    height: h,
                    palette_group: chunk.palette_group,
                    pixels,
                });
            }
        }
    }
}

fn already_fully_covered(covered: &[bool], tiles_wide: u32, rect: &TileRect) -> bool {
    (rect.ty..rect.ty + rect.th)
        .all(|ty| (rect.tx..rect.tx + rect.tw).all(|tx| covered[(ty * tiles_wide + tx) as usize]))
}

fn mark_covered(covered: &mut [bool], tiles_wide: u32, rect: &TileRect) {
    for ty in rect.ty..rect.ty + rect.th {
        for tx in rect.tx..rect.tx + rect.tw {
            covered[(ty * tiles_wide + tx) as usize] = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ALLOWED_CHUNK_SIZES;
    use crate::extract::extract_layer;
    use crate::tile::IndexedImage;
    use std::path::Path;

    fn solid_image(w: u32, h: u32, color_index: u8) -> IndexedImage {
        IndexedImage { width: w, height: h, indices: vec![color_index; (w * h) as usize] }
    }

    /// S3: two 32x32 frames, both fully filled with group 0. With
    /// inter_scan on, they must share one chunk.
    #[test]
    fn s3_identical_frames_share_a_chunk() {
        let cfg = DedupConfig { intra_scan: false, inter_scan: true };
        let mut pool = ChunkPool::new();

        let frame0 = solid_image(32, 32, 1);
        let frame1 = solid_image(32, 32, 1);
        let chunks0 = extract_layer(&frame0, 0.5, &[(32, 32)], Path::new("f0.png")).unwrap();
        let chunks1 = extract_layer(&frame1, 0.5, &[(32, 32)], Path::new("f1.png")).unwrap();
        assert_eq!(chunks0.len(), 1);
        assert_eq!(chunks1.len(), 1);

        let id0 = register_top_level(&mut pool, cfg, &chunks0[0]);
        let id1 = register_top_level(&mut pool, cfg, &chunks1[0]);
        assert_eq!(id0, id1);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(id0).memory_cost(), 16); // 4x4 tiles -> already a multiple of 4
    }

    #[test]
    fn inter_scan_disabled_keeps_duplicates_separate() {
        let cfg = DedupConfig { intra_scan: false, inter_scan: false };
        let mut pool = ChunkPool::new();
        let frame = solid_image(32, 32, 1);
        let chunks = extract_layer(&frame, 0.5, &[(32, 32)], Path::new("f.png")).unwrap();
        let id0 = register_top_level(&mut pool, cfg, &chunks[0]);
        let id1 = register_top_level(&mut pool, cfg, &chunks[0]);
        assert_ne!(id0, id1);
        assert_eq!(pool.len(), 2);
    }

    /// P-IDEM: running the inter-frame scan twice never introduces new ids
    /// on the second pass.
    #[test]
    fn p_idem_second_pass_introduces_no_new_ids() {
        let cfg = DedupConfig { intra_scan: false, inter_scan: true };
        let mut pool = ChunkPool::new();
        let frame = solid_image(16, 16, 1);
        let chunks = extract_layer(&frame, 0.5, &[(16, 16)], Path::new("f.png")).unwrap();

        let id_first = register_top_level(&mut pool, cfg, &chunks[0]);
        let len_after_first = pool.len();
        let id_second = register_top_level(&mut pool, cfg, &chunks[0]);
        assert_eq!(id_first, id_second);
        assert_eq!(pool.len(), len_after_first);
    }

    /// Open Question #1: the intra scan registers a sub-chunk in the pool
    /// without altering the outer chunk's standing as the frame's cel.
    #[test]
    fn intra_scan_registers_subchunk_without_splitting_cel() {
        let cfg = DedupConfig { intra_scan: true, inter_scan: true };
        let mut pool = ChunkPool::new();
        let frame = solid_image(32, 32, 1);
        let chunks = extract_layer(&frame, 0.5, &[(32, 32)], Path::new("f.png")).unwrap();
        assert_eq!(chunks.len(), 1);

        let top_id = register_top_level(&mut pool, cfg, &chunks[0]);
        run_intra_scan(&mut pool, cfg, &chunks[0], 0.5, &ALLOWED_CHUNK_SIZES);

        // The sub-scan registered additional (smaller) chunks, but the
        // frame's single cel still references the original 32x32 chunk.
        assert!(pool.len() > 1);
        assert_eq!(pool.get(top_id).width, 32);
        assert_eq!(pool.get(top_id).height, 32);
    }
}
