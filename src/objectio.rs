//! Reads a forward-generated object folder back in (spec §6, reverse
//! pipeline input): `palette.pal`, `imgs/*.png`, `frames.xml`,
//! `animations.xml`.

use std::path::Path;

use crate::chunk::{Animation, Chunk, ChunkPool, Frame};
use crate::config::Config;
use crate::error::{Result, SpriteError};
use crate::indexed_png::read_indexed_png;
use crate::palette::{Palette, SpriteKind};
use crate::xmlio::{read_animations_xml, read_frames_xml};

pub struct ObjectFolder {
    pub palette: Palette,
    pub pool: ChunkPool,
    pub frames: Vec<Frame>,
    pub animations: Vec<Animation>,
    /// The original canvas size recorded in `config.json` by the forward
    /// pipeline (spec §4.H), if present.
    pub canvas_size: Option<(u32, u32)>,
}

pub fn read_object_folder(dir: &Path, kind: SpriteKind) -> Result<ObjectFolder> {
    let palette_path = dir.join("palette.pal");
    if !palette_path.exists() {
        return Err(SpriteError::MissingFile { path: palette_path });
    }
    let palette = Palette::read_jasc_pal(&palette_path, kind)?;

    let frames_path = dir.join("frames.xml");
    if !frames_path.exists() {
        return Err(SpriteError::MissingFile { path: frames_path });
    }
    let frames = read_frames_xml(&frames_path)?;

    let animations_path = dir.join("animations.xml");
    let animations = if animations_path.exists() {
        read_animations_xml(&animations_path)?
    } else {
        Vec::new()
    };

    let config_path = dir.join("config.json");
    let canvas_size = if config_path.exists() { Config::load(&config_path)?.canvas_size } else { None };

    let imgs_dir = dir.join("imgs");
    if !imgs_dir.exists() {
        return Err(SpriteError::MissingFile { path: imgs_dir });
    }

    // Every chunk referenced from frames.xml carries its palette group in
    // the `pal` attribute of (at least) one cel; collect that mapping
    // before decoding images, since global-to-local index conversion only
    // needs `% 16` but the pool's `Chunk::palette_group` field is the
    // group itself.
    let mut chunk_group = std::collections::HashMap::new();
    for frame in &frames {
        for cel in &frame.cels {
            chunk_group.entry(cel.chunk_id).or_insert(cel.palette_group);
        }
    }

    let mut entries: Vec<_> = std::fs::read_dir(&imgs_dir)
        .map_err(|e| SpriteError::Io { path: imgs_dir.clone(), message: e })?
        .filter_map(|e| e.ok())
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut pool = ChunkPool::new();
    for entry in entries {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("png") {
            continue;
        }
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let id: u32 = stem.parse().map_err(|_| SpriteError::InvalidFilename {
            path: path.clone(),
            reason: "expected a zero-padded chunk id".to_string(),
        })?;
        let decoded = read_indexed_png(&path)?;
        let palette_group = chunk_group.get(&id).copied().unwrap_or(0);
        let local_pixels: Vec<u8> = decoded.image.indices.iter().map(|&g| Palette::local_index(g)).collect();
        let chunk = Chunk {
            width: decoded.image.width,
            height: decoded.image.height,
            palette_group,
            pixels: local_pixels,
        };
        let assigned = pool.force_insert(chunk);
        debug_assert_eq!(assigned, id, "imgs/NNNN.png numbering must be contiguous from 0000");
    }

    Ok(ObjectFolder { palette, pool, frames, animations, canvas_size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{Cel, Chunk};
    use crate::config::Config;
    use crate::serialize::write_object_folder;

    #[test]
    fn reads_back_what_serialize_wrote() {
        let dir = tempfile::tempdir().unwrap();
        let palette =
            Palette::from_flat_colors(&(0..16).map(|i| [i as u8; 3]).collect::<Vec<_>>(), SpriteKind::Object).unwrap();
        let mut pool = ChunkPool::new();
        let chunk_id = pool.insert_or_get(Chunk { width: 8, height: 8, palette_group: 0, pixels: vec![2; 64] });
        let frames = vec![Frame { cels: vec![Cel { chunk_id, x: 0, y: 0, palette_group: 0, layer: 0, z: 0 }] }];
        write_object_folder(dir.path(), &palette, &pool, &frames, &[], &Config::default()).unwrap();

        let read_back = read_object_folder(dir.path(), SpriteKind::Object).unwrap();
        assert_eq!(read_back.pool.len(), 1);
        assert_eq!(read_back.pool.get(0).width, 8);
        assert_eq!(read_back.frames.len(), 1);
        assert_eq!(read_back.frames[0].cels[0].chunk_id, chunk_id);
    }
}
