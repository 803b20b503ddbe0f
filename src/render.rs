//! The frame renderer (spec §4.H): pastes layered cels onto per-layer
//! canvases and writes `Frame-<f>-Layer-<l>.png`.

use std::collections::HashMap;
use std::path::Path;

use crate::chunk::{Cel, ChunkPool};
use crate::error::Result;
use crate::indexed_png::write_indexed_png;
use crate::palette::Palette;

/// A canvas of global palette indices for one (frame, layer) pair.
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    indices: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        // Transparent: global index 0 (group 0's transparent color).
        Self { width, height, indices: vec![0; (width * height) as usize] }
    }

    /// Paints one cel's chunk at `(cel.x, cel.y)`; non-transparent pixels
    /// overwrite, transparent pixels are skipped (spec §4.H).
    pub fn paint(&mut self, cel: &Cel, pool: &ChunkPool) {
        let chunk = pool.get(cel.chunk_id);
        for row in 0..chunk.height {
            let dest_y = cel.y + row as i32;
            if dest_y < 0 || dest_y as u32 >= self.height {
                continue;
            }
            for col in 0..chunk.width {
                let dest_x = cel.x + col as i32;
                if dest_x < 0 || dest_x as u32 >= self.width {
                    continue;
                }
                let local = chunk.pixels[(row * chunk.width + col) as usize];
                if local == 0 {
                    continue; // transparent: skip
                }
                let global = cel.palette_group * crate::palette::GROUP_SIZE as u8 + local;
                self.indices[(dest_y as u32 * self.width + dest_x as u32) as usize] = global;
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>, palette: &Palette) -> Result<()> {
        write_indexed_png(path, self.width, self.height, &self.indices, &palette.to_flat_colors())
    }
}

/// Renders every (frame, layer) pair in `frames` to `Frame-<f>-Layer-<l>.png`
/// files under `out_dir`. `canvas_size` is the common bounding box (spec
/// §4.H: the original input size on round-trip, or a derived+margined box
/// otherwise — computed by the caller, see [`crate::pipeline`]).
pub fn render_frames(
    out_dir: &Path,
    frames: &[(u32, Vec<Cel>)],
    pool: &ChunkPool,
    palette: &Palette,
    canvas_size: (u32, u32),
) -> Result<()> {
    std::fs::create_dir_all(out_dir).map_err(|e| crate::error::SpriteError::Io {
        path: out_dir.to_path_buf(),
        message: e,
    })?;
    for (frame_id, cels) in frames {
        let mut by_layer: HashMap<u32, Vec<&Cel>> = HashMap::new();
        for cel in cels {
            by_layer.entry(cel.layer).or_default().push(cel);
        }
        for (layer, mut layer_cels) in by_layer {
            layer_cels.sort_by_key(|c| c.z);
            let mut canvas = Canvas::new(canvas_size.0, canvas_size.1);
            for cel in layer_cels {
                canvas.paint(cel, pool);
            }
            let path = out_dir.join(format!("Frame-{frame_id}-Layer-{layer}.png"));
            canvas.save(&path, palette)?;
        }
    }
    Ok(())
}

/// The reverse-render canvas margin policy for a sprite never produced by
/// the forward tool (spec §9 Open Question #2): bounding box of all cels,
/// rounded up to a multiple of 8, plus a fixed 8-pixel margin.
pub fn derive_canvas_size(cels: &[Cel], pool: &ChunkPool) -> (u32, u32) {
    let mut max_x = 0i32;
    let mut max_y = 0i32;
    for cel in cels {
        let chunk = pool.get(cel.chunk_id);
        max_x = max_x.max(cel.x + chunk.width as i32);
        max_y = max_y.max(cel.y + chunk.height as i32);
    }
    const MARGIN: i32 = 8;
    let w = (max_x + MARGIN).max(0) as u32;
    let h = (max_y + MARGIN).max(0) as u32;
    (w.next_multiple_of(8), h.next_multiple_of(8))
}
