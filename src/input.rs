//! Parses a forward-pipeline input folder (spec §6): cel PNGs named
//! `Frame-<f>-Layer-<l>.png`, sharing one embedded palette.

use std::collections::BTreeMap;
use std::path::Path;

use lazy_regex::regex;

use crate::error::{Result, SpriteError};
use crate::indexed_png::read_indexed_png;
use crate::palette::{Palette, SpriteKind};
use crate::tile::IndexedImage;

/// One input layer image, keyed by (frame, layer).
pub struct InputFolder {
    pub palette: Palette,
    /// frame -> layer -> image, both ascending (BTreeMap preserves order;
    /// spec: "missing intermediate indices are allowed").
    pub frames: BTreeMap<u32, BTreeMap<u32, IndexedImage>>,
    /// The common dimensions shared by every cel image (spec §4.A: all
    /// input PNGs for one sprite agree on size). `None` if the folder
    /// contained no images, which `read_input_folder` already rejects
    /// before returning, so callers can treat this as always `Some`.
    pub canvas_size: Option<(u32, u32)>,
}

fn parse_frame_layer(filename: &str) -> Option<(u32, u32)> {
    let re = regex!(r"^Frame-(\d+)-Layer-(\d+)\.png$");
    let caps = re.captures(filename)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

pub fn read_input_folder(dir: &Path, kind: SpriteKind) -> Result<InputFolder> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| SpriteError::Io { path: dir.to_path_buf(), message: e })?
        .filter_map(|e| e.ok())
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut frames: BTreeMap<u32, BTreeMap<u32, IndexedImage>> = BTreeMap::new();
    let mut shared_palette: Option<Vec<[u8; 3]>> = None;
    let mut common_size: Option<(u32, u32)> = None;

    for entry in entries {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("png") {
            continue;
        }
        let filename = entry.file_name();
        let filename = filename.to_string_lossy();
        let Some((frame, layer)) = parse_frame_layer(&filename) else {
            return Err(SpriteError::InvalidFilename {
                path: path.clone(),
                reason: "expected `Frame-<f>-Layer-<l>.png`".to_string(),
            });
        };

        let decoded = read_indexed_png(&path)?;
        decoded.image.check_multiple_of_8(&path)?;

        match common_size {
            None => common_size = Some((decoded.image.width, decoded.image.height)),
            Some((w, h)) if (w, h) != (decoded.image.width, decoded.image.height) => {
                return Err(SpriteError::DimensionMismatch {
                    path,
                    a: (w, h),
                    b: (decoded.image.width, decoded.image.height),
                });
            }
            _ => {}
        }

        match &shared_palette {
            None => shared_palette = Some(decoded.palette_rgb.clone()),
            Some(p) if p != &decoded.palette_rgb => {
                return Err(SpriteError::PaletteMismatch { path });
            }
            _ => {}
        }

        frames.entry(frame).or_default().insert(layer, decoded.image);
    }

    let flat_palette = shared_palette.ok_or_else(|| SpriteError::InvalidFilename {
        path: dir.to_path_buf(),
        reason: "no `Frame-<f>-Layer-<l>.png` images found".to_string(),
    })?;
    let palette = Palette::from_flat_colors(&flat_palette, kind).map_err(|_| SpriteError::PaletteMismatch {
        path: dir.to_path_buf(),
    })?;

    Ok(InputFolder { palette, frames, canvas_size: common_size })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_frame_and_layer_from_filename() {
        assert_eq!(parse_frame_layer("Frame-3-Layer-1.png"), Some((3, 1)));
        assert_eq!(parse_frame_layer("Frame-0-Layer-0.png"), Some((0, 0)));
        assert_eq!(parse_frame_layer("not-a-frame.png"), None);
    }

    #[test]
    fn reads_a_minimal_folder() {
        let dir = tempfile::tempdir().unwrap();
        let palette: Vec<[u8; 3]> = (0..16).map(|i| [i as u8; 3]).collect();
        crate::indexed_png::write_indexed_png(
            dir.path().join("Frame-0-Layer-0.png"),
            8,
            8,
            &[1u8; 64],
            &palette,
        )
        .unwrap();
        let input = read_input_folder(dir.path(), SpriteKind::Object).unwrap();
        assert_eq!(input.frames.len(), 1);
        assert_eq!(input.palette.group_count(), 1);
    }

    #[test]
    fn rejects_mismatched_filenames() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("oops.png"), b"not a png").unwrap();
        let result = read_input_folder(dir.path(), SpriteKind::Object);
        assert!(matches!(result, Err(SpriteError::InvalidFilename { .. })));
    }
}
