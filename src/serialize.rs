//! The serializer (spec §4.F): writes the object folder —
//! `palette.pal`, `imgs/NNNN.png`, `frames.xml`, `animations.xml`, and
//! `config.json`.

use std::path::Path;

use crate::chunk::{Animation, ChunkPool, Frame};
use crate::config::Config;
use crate::error::Result;
use crate::indexed_png::write_indexed_png;
use crate::palette::Palette;
use crate::xmlio::{write_animations_xml, write_frames_xml};

/// Applies the `displace_sprite` translation (spec §4.F's coordinate
/// system: the engine actor center sits at (256, 512), and every cel's
/// origin is displaced so the user's chosen alignment point maps there)
/// to every cel of every frame, returning new frames (originals are left
/// untouched, since the in-memory pipeline state works in undisplaced
/// coordinates throughout composition and overlap resolution).
pub fn displace_frames(frames: &[Frame], displace: (i32, i32)) -> Vec<Frame> {
    frames
        .iter()
        .map(|f| Frame {
            cels: f
                .cels
                .iter()
                .map(|c| {
                    let mut c = c.clone();
                    c.x += displace.0;
                    c.y += displace.1;
                    c
                })
                .collect(),
        })
        .collect()
}

/// Writes the full object folder. `frames` must already have
/// `displace_sprite` applied (see [`displace_frames`]).
pub fn write_object_folder(
    out_dir: &Path,
    palette: &Palette,
    pool: &ChunkPool,
    frames: &[Frame],
    animations: &[Animation],
    config: &Config,
) -> Result<()> {
    std::fs::create_dir_all(out_dir).map_err(|e| crate::error::SpriteError::Io {
        path: out_dir.to_path_buf(),
        message: e,
    })?;

    palette
        .write_jasc_pal(out_dir.join("palette.pal"))
        .map_err(|e| crate::error::SpriteError::Io { path: out_dir.join("palette.pal"), message: e })?;

    let imgs_dir = out_dir.join("imgs");
    std::fs::create_dir_all(&imgs_dir).map_err(|e| crate::error::SpriteError::Io {
        path: imgs_dir.clone(),
        message: e,
    })?;
    let flat_palette = palette.to_flat_colors();
    for (id, chunk) in pool.iter() {
        let global_pixels: Vec<u8> = chunk
            .pixels
            .iter()
            .map(|&local| chunk.palette_group * crate::palette::GROUP_SIZE as u8 + local)
            .collect();
        let path = imgs_dir.join(format!("{id:04}.png"));
        write_indexed_png(&path, chunk.width, chunk.height, &global_pixels, &flat_palette)?;
    }

    write_frames_xml(out_dir.join("frames.xml"), frames)?;
    write_animations_xml(out_dir.join("animations.xml"), animations)?;
    config.save(out_dir.join("config.json"))?;

    Ok(())
}
