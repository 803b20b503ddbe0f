//! The chunk extractor (spec §4.C): scans one layer image under the enabled
//! chunk sizes and emits the covering set of candidate chunks.

use std::path::Path;

use crate::chunk::{ScanOrder, ALLOWED_CHUNK_SIZES, FALLBACK_SIZE};
use crate::error::Result;
use crate::palette::Palette;
use crate::tile::{IndexedImage, TileGrid, TileRect, TILE};

/// One accepted chunk candidate, still in the coordinate space of the
/// (possibly palette-group-split) derived image it came from.
#[derive(Debug, Clone)]
pub struct ExtractedChunk {
    pub origin_x: u32,
    pub origin_y: u32,
    pub width: u32,
    pub height: u32,
    pub palette_group: u8,
    /// Canonical local-index (0..16) pixel buffer, row-major.
    pub pixels: Vec<u8>,
}

/// Scans `image` for the palette groups its non-empty tiles reference and,
/// if more than one is present, splits it into one derived image per group
/// with other-group tiles cleared to transparent (spec §4.C step 1, the
/// "Single-Cel Frame Mode split"). Tiles are cleared with the literal index
/// 0: since index 0 is transparent in every group, this marks the tile
/// empty regardless of which group actually owns it.
fn split_by_palette_group(image: &IndexedImage) -> Vec<(u8, IndexedImage)> {
    let grid = TileGrid::new(image);
    let tw = image.tiles_wide();
    let th = image.tiles_high();

    let mut tile_group = vec![None; (tw * th) as usize];
    let mut groups_present = Vec::new();
    for ty in 0..th {
        for tx in 0..tw {
            let tile = grid.tile_at(tx, ty);
            if grid.is_empty(&tile) {
                continue;
            }
            let group = tile
                .iter()
                .find(|&&idx| !Palette::is_transparent(idx))
                .map(|&idx| Palette::group_of(idx))
                .unwrap();
            tile_group[(ty * tw + tx) as usize] = Some(group);
            if !groups_present.contains(&group) {
                groups_present.push(group);
            }
        }
    }
    groups_present.sort_unstable();

    if groups_present.len() <= 1 {
        let group = groups_present.first().copied().unwrap_or(0);
        return vec![(group, image.clone())];
    }

    groups_present
        .into_iter()
        .map(|group| {
            let mut derived = image.clone();
            for ty in 0..th {
                for tx in 0..tw {
                    if tile_group[(ty * tw + tx) as usize] != Some(group) {
                        clear_tile(&mut derived, tx, ty);
                    }
                }
            }
            (group, derived)
        })
        .collect()
}

fn clear_tile(image: &mut IndexedImage, tx: u32, ty: u32) {
    let base_x = tx * TILE;
    let base_y = ty * TILE;
    for row in 0..TILE {
        for col in 0..TILE {
            let x = base_x + col;
            let y = base_y + row;
            let idx = (y * image.width + x) as usize;
            image.indices[idx] = 0;
        }
    }
}

struct Covering {
    tiles_wide: u32,
    covered: Vec<bool>,
}

impl Covering {
    fn new(tiles_wide: u32, tiles_high: u32) -> Self {
        Self {
            tiles_wide,
            covered: vec![false; (tiles_wide * tiles_high) as usize],
        }
    }

    fn is_covered(&self, tx: u32, ty: u32) -> bool {
        self.covered[(ty * self.tiles_wide + tx) as usize]
    }

    fn mark_covered(&mut self, rect: &TileRect) {
        for ty in rect.ty..rect.ty + rect.th {
            for tx in rect.tx..rect.tx + rect.tw {
                self.covered[(ty * self.tiles_wide + tx) as usize] = true;
            }
        }
    }

    fn has_uncovered_non_empty(&self, rect: &TileRect, grid: &TileGrid) -> bool {
        (rect.ty..rect.ty + rect.th).any(|ty| {
            (rect.tx..rect.tx + rect.tw).any(|tx| !self.is_covered(tx, ty) && !grid.is_tile_empty(tx, ty))
        })
    }
}

/// Covers the non-empty tiles of one (already single-group) derived image,
/// per spec §4.C steps 2-5: largest-enabled-size-first, row-major scan,
/// falling back to 8×8 for anything the enabled sizes can't claim.
fn cover_image(
    image: &IndexedImage,
    palette_group: u8,
    min_density: f64,
    sizes: &[(u32, u32)],
    path: &Path,
) -> Result<Vec<ExtractedChunk>> {
    let grid = TileGrid::new(image);
    let tiles_wide = image.tiles_wide();
    let tiles_high = image.tiles_high();
    let mut covering = Covering::new(tiles_wide, tiles_high);
    let mut rects: Vec<TileRect> = Vec::new();

    let mut ordered = ScanOrder::LargestFirst.order(sizes);
    if !ordered.contains(&FALLBACK_SIZE) {
        ordered.push(FALLBACK_SIZE);
    }

    for (w, h) in ScanOrder::LargestFirst.order(&ordered) {
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
                if !covering.has_uncovered_non_empty(&rect, &grid) {
                    continue;
                }
                if (w, h) != FALLBACK_SIZE && !grid.meets_density(&rect, min_density) {
                    continue;
                }
                match grid.palette_group_of(&rect, path)? {
                    Some(_) => {
                        covering.mark_covered(&rect);
                        rects.push(rect);
                    }
                    None => continue,
                }
            }
        }
    }

    Ok(rects
        .into_iter()
        .map(|rect| {
            let width = rect.tw * TILE;
            let height = rect.th * TILE;
            let origin_x = rect.tx * TILE;
            let origin_y = rect.ty * TILE;
            let mut pixels = Vec::with_capacity((width * height) as usize);
            for y in origin_y..origin_y + height {
                for x in origin_x..origin_x + width {
                    pixels.push(Palette::local_index(image.pixel(x, y)));
                }
            }
            ExtractedChunk {
                origin_x,
                origin_y,
                width,
                height,
                palette_group,
                pixels,
            }
        })
        .collect())
}

/// Extracts the full candidate chunk list for one layer image.
pub fn extract_layer(
    image: &IndexedImage,
    min_density: f64,
    enabled_sizes: &[(u32, u32)],
    path: &Path,
) -> Result<Vec<ExtractedChunk>> {
    image.check_multiple_of_8(path)?;
    let sizes = if enabled_sizes.is_empty() {
        &ALLOWED_CHUNK_SIZES[..]
    } else {
        enabled_sizes
    };
    let mut out = Vec::new();
    for (group, derived) in split_by_palette_group(image) {
        out.extend(cover_image(&derived, group, min_density, sizes, path)?);
    }
    Ok(out)
}
