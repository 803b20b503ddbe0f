//! The overlap resolver (spec §4.G): assigns each cel parsed from
//! `frames.xml` a layer via deterministic first-fit graph coloring.
//!
//! First-fit is intentional (spec §9): it is not guaranteed to find the
//! minimum number of layers for every policy, and that suboptimality must
//! be preserved as observable behavior rather than "fixed" with an optimal
//! coloring algorithm.

use crate::chunk::{Cel, ChunkPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapPolicy {
    Chunk,
    Pixel,
    Palette,
    None,
}

impl OverlapPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "chunk" => Some(Self::Chunk),
            "pixel" => Some(Self::Pixel),
            "palette" => Some(Self::Palette),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

fn rects_intersect(a: &Cel, pool: &ChunkPool, b: &Cel) -> bool {
    let ca = pool.get(a.chunk_id);
    let cb = pool.get(b.chunk_id);
    let (ax0, ay0, ax1, ay1) = (a.x, a.y, a.x + ca.width as i32, a.y + ca.height as i32);
    let (bx0, by0, bx1, by1) = (b.x, b.y, b.x + cb.width as i32, b.y + cb.height as i32);
    ax0 < bx1 && bx0 < ax1 && ay0 < by1 && by0 < ay1
}

fn pixels_overlap(a: &Cel, pool: &ChunkPool, b: &Cel) -> bool {
    if !rects_intersect(a, pool, b) {
        return false;
    }
    let ca = pool.get(a.chunk_id);
    let cb = pool.get(b.chunk_id);
    let x0 = a.x.max(b.x);
    let y0 = a.y.max(b.y);
    let x1 = (a.x + ca.width as i32).min(b.x + cb.width as i32);
    let y1 = (a.y + ca.height as i32).min(b.y + cb.height as i32);
    for y in y0..y1 {
        for x in x0..x1 {
            let a_local = ca.pixels[((y - a.y) as u32 * ca.width + (x - a.x) as u32) as usize];
            let b_local = cb.pixels[((y - b.y) as u32 * cb.width + (x - b.x) as u32) as usize];
            if a_local != 0 && b_local != 0 {
                return true;
            }
        }
    }
    false
}

fn conflicts(policy: OverlapPolicy, pool: &ChunkPool, a: &Cel, b: &Cel) -> bool {
    match policy {
        OverlapPolicy::None => false,
        OverlapPolicy::Palette => a.palette_group != b.palette_group,
        OverlapPolicy::Chunk => a.palette_group != b.palette_group && rects_intersect(a, pool, b),
        OverlapPolicy::Pixel => a.palette_group != b.palette_group && pixels_overlap(a, pool, b),
    }
}

/// Assigns a layer to each cel in `cels` (processed in XML order), returning
/// a new vector with `layer` set. First-fit: each cel goes to the
/// lowest-numbered layer with no conflict, opening a new one if needed.
pub fn assign_layers(cels: &[Cel], pool: &ChunkPool, policy: OverlapPolicy) -> Vec<Cel> {
    let mut layers: Vec<Vec<Cel>> = Vec::new();
    let mut out = Vec::with_capacity(cels.len());

    for cel in cels {
        let mut placed = None;
        for (layer_idx, layer_cels) in layers.iter().enumerate() {
            if layer_cels.iter().all(|existing| !conflicts(policy, pool, existing, cel)) {
                placed = Some(layer_idx);
                break;
            }
        }
        let layer_idx = placed.unwrap_or(layers.len());
        if layer_idx == layers.len() {
            layers.push(Vec::new());
        }
        let mut assigned = cel.clone();
        assigned.layer = layer_idx as u32;
        layers[layer_idx].push(assigned.clone());
        out.push(assigned);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunk;

    fn pool_with_one_chunk(w: u32, h: u32) -> (ChunkPool, u32) {
        let mut pool = ChunkPool::new();
        let id = pool.insert_or_get(Chunk {
            width: w,
            height: h,
            palette_group: 0,
            pixels: vec![1; (w * h) as usize],
        });
        (pool, id)
    }

    /// S4: two cels at the same (x, y), same palette group. Under `chunk`
    /// policy they'd overlap in area but share a palette, so no conflict;
    /// both land on layer 0.
    #[test]
    fn s4_same_palette_same_position_shares_a_layer() {
        let (pool, chunk_id) = pool_with_one_chunk(8, 8);
        let cels = vec![
            Cel { chunk_id, x: 0, y: 0, palette_group: 0, layer: 0, z: 0 },
            Cel { chunk_id, x: 0, y: 0, palette_group: 0, layer: 0, z: 1 },
        ];
        let resolved = assign_layers(&cels, &pool, OverlapPolicy::Chunk);
        assert_eq!(resolved[0].layer, 0);
        assert_eq!(resolved[1].layer, 0);

        let resolved_pal = assign_layers(&cels, &pool, OverlapPolicy::Palette);
        assert_eq!(resolved_pal[1].layer, 0);
    }

    #[test]
    fn different_palette_overlapping_rects_split_layers() {
        let (pool, chunk_id) = pool_with_one_chunk(8, 8);
        let cels = vec![
            Cel { chunk_id, x: 0, y: 0, palette_group: 0, layer: 0, z: 0 },
            Cel { chunk_id, x: 0, y: 0, palette_group: 1, layer: 0, z: 1 },
        ];
        let resolved = assign_layers(&cels, &pool, OverlapPolicy::Chunk);
        assert_ne!(resolved[0].layer, resolved[1].layer);
    }

    /// P-OVR: under `none`, every cel lands on the single layer 0.
    #[test]
    fn none_policy_never_conflicts() {
        let (pool, chunk_id) = pool_with_one_chunk(8, 8);
        let cels: Vec<Cel> = (0..5)
            .map(|i| Cel { chunk_id, x: i * 8, y: 0, palette_group: (i % 2) as u8, layer: 0, z: i as u32 })
            .collect();
        let resolved = assign_layers(&cels, &pool, OverlapPolicy::None);
        assert!(resolved.iter().all(|c| c.layer == 0));
    }

    #[test]
    fn non_overlapping_different_palette_share_a_layer_under_chunk_policy() {
        let (pool, chunk_id) = pool_with_one_chunk(8, 8);
        let cels = vec![
            Cel { chunk_id, x: 0, y: 0, palette_group: 0, layer: 0, z: 0 },
            Cel { chunk_id, x: 100, y: 100, palette_group: 1, layer: 0, z: 1 },
        ];
        let resolved = assign_layers(&cels, &pool, OverlapPolicy::Chunk);
        assert_eq!(resolved[0].layer, resolved[1].layer);
    }
}
