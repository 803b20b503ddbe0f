//! Ties the components together for one folder conversion (spec §5,
//! §9: "global singletons should be owned by a `Pipeline` value with an
//! explicit lifetime spanning one folder conversion").

use std::path::Path;

use crate::chunk::{Animation, Cel, ChunkPool, Frame};
use crate::compose::{check_limits, compose_frame, LayerChunks};
use crate::config::Config;
use crate::dedup::{register_top_level, run_intra_scan, DedupConfig};
use crate::error::{Result, Warning};
use crate::extract::extract_layer;
use crate::input::read_input_folder;
use crate::objectio::read_object_folder;
use crate::overlap::{assign_layers, OverlapPolicy};
use crate::palette::SpriteKind;
use crate::render::{derive_canvas_size, render_frames};
use crate::serialize::{displace_frames, write_object_folder};

/// Owns the palette and chunk pool for one conversion run.
pub struct Pipeline {
    pub kind: SpriteKind,
    pub config: Config,
}

/// Outcome of a forward run (spec §7: non-fatal conditions are warnings,
/// not errors).
pub struct ForwardSummary {
    pub frame_count: usize,
    pub chunk_count: usize,
    pub warnings: Vec<Warning>,
}

impl Pipeline {
    pub fn new(kind: SpriteKind, config: Config) -> Self {
        Self { kind, config }
    }

    /// Runs the Object Generator: reads `input_dir`'s `Frame-<f>-Layer-<l>.png`
    /// files and writes the object folder to `output_dir`.
    pub fn forward(&self, input_dir: &Path, output_dir: &Path) -> Result<ForwardSummary> {
        let input = read_input_folder(input_dir, self.kind)?;
        let mut pool = ChunkPool::new();
        let dedup_cfg = DedupConfig { intra_scan: self.config.intra_scan, inter_scan: self.config.inter_scan };

        let mut frames = Vec::new();
        let mut warnings = Vec::new();
        let original_frame_ids: Vec<u32> = input.frames.keys().copied().collect();

        for (&frame_id, layers) in &input.frames {
            let mut layer_chunks = Vec::new();
            for (&layer_id, image) in layers {
                let path = input_dir.join(format!("Frame-{frame_id}-Layer-{layer_id}.png"));
                let extracted = extract_layer(
                    image,
                    self.config.min_density,
                    &self.config.scan_chunk_sizes,
                    &path,
                )?;
                let mut chunks = Vec::with_capacity(extracted.len());
                for ec in &extracted {
                    let chunk_id = register_top_level(&mut pool, dedup_cfg, ec);
                    run_intra_scan(&mut pool, dedup_cfg, ec, self.config.min_density, &self.config.scan_chunk_sizes);
                    chunks.push((ec.clone(), chunk_id));
                }
                layer_chunks.push(LayerChunks { layer: layer_id, chunks });
            }
            let cels = compose_frame(layer_chunks);
            warnings.extend(check_limits(frame_id, &cels, &pool, crate::compose::DEFAULT_MEMORY_BUDGET));
            frames.push(Frame { cels });
        }

        let animations = self.build_animations(&original_frame_ids)?;
        let displaced = displace_frames(&frames, self.config.displace_sprite);
        let mut config = self.config.clone();
        config.canvas_size = input.canvas_size;
        write_object_folder(output_dir, &input.palette, &pool, &displaced, &animations, &config)?;

        Ok(ForwardSummary { frame_count: frames.len(), chunk_count: pool.len(), warnings })
    }

    /// Translates each animation's configured frame numbers (spec §6: "the
    /// frame numbering used in animations refers to these [original
    /// input] integers") through the frame-id -> compacted position
    /// mapping, dropping any animation entry whose frame number was never
    /// present in the input folder.
    fn build_animations(&self, original_frame_ids: &[u32]) -> Result<Vec<Animation>> {
        use crate::chunk::AnimFrame;
        self.config.validate()?;
        let position_of: std::collections::HashMap<u32, usize> =
            original_frame_ids.iter().enumerate().map(|(pos, &id)| (id, pos)).collect();
        Ok(self
            .config
            .animations
            .iter()
            .map(|a| Animation {
                frames: a
                    .frames
                    .iter()
                    .filter_map(|f| {
                        position_of
                            .get(&f.frame)
                            .map(|&pos| AnimFrame { frame_id: pos as u32, duration_ticks: f.duration })
                    })
                    .collect(),
            })
            .collect())
    }

    /// Runs the Frames Generator: reads an object folder from `input_dir`
    /// and writes `Frame-<f>-Layer-<l>.png` files to `output_dir`.
    pub fn reverse(&self, input_dir: &Path, output_dir: &Path, policy: OverlapPolicy) -> Result<usize> {
        let object = read_object_folder(input_dir, self.kind)?;
        let undisplaced = displace_frames(&object.frames, (-self.config.displace_sprite.0, -self.config.displace_sprite.1));

        let mut rendered = 0;
        let mut by_frame: Vec<(u32, Vec<Cel>)> = Vec::new();
        for (idx, frame) in undisplaced.iter().enumerate() {
            let resolved = assign_layers(&frame.cels, &object.pool, policy);
            by_frame.push((idx as u32, resolved));
            rendered += 1;
        }

        let canvas_size = match object.canvas_size {
            Some(size) => size,
            None => {
                let all_cels: Vec<Cel> = by_frame.iter().flat_map(|(_, c)| c.clone()).collect();
                derive_canvas_size(&all_cels, &object.pool)
            }
        };

        render_frames(output_dir, &by_frame, &object.pool, &object.palette, canvas_size)?;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::GROUP_SIZE;

    fn write_frame_png(dir: &Path, frame: u32, layer: u32, palette: &[[u8; 3]]) {
        let indices: Vec<u8> = vec![1u8; 16 * 16];
        crate::indexed_png::write_indexed_png(
            dir.join(format!("Frame-{frame}-Layer-{layer}.png")),
            16,
            16,
            &indices,
            palette,
        )
        .unwrap();
    }

    /// P-RT: running forward then reverse on a simple one-frame, one-layer
    /// sprite reproduces a layer image with the same painted pixels.
    #[test]
    fn p_rt_round_trips_a_simple_sprite() {
        let input_dir = tempfile::tempdir().unwrap();
        let object_dir = tempfile::tempdir().unwrap();
        let rendered_dir = tempfile::tempdir().unwrap();

        let palette: Vec<[u8; 3]> = (0..GROUP_SIZE).map(|i| [i as u8; 3]).collect();
        write_frame_png(input_dir.path(), 0, 0, &palette);

        let config = Config { scan_chunk_sizes: vec![(16, 16), (8, 8)], ..Config::default() };
        let pipeline = Pipeline::new(SpriteKind::Object, config);

        let summary = pipeline.forward(input_dir.path(), object_dir.path()).unwrap();
        assert_eq!(summary.frame_count, 1);
        assert!(summary.chunk_count >= 1);
        assert!(object_dir.path().join("frames.xml").exists());

        let rendered = pipeline.reverse(object_dir.path(), rendered_dir.path(), OverlapPolicy::Chunk).unwrap();
        assert_eq!(rendered, 1);
        let out_path = rendered_dir.path().join("Frame-0-Layer-0.png");
        assert!(out_path.exists());
        let decoded = crate::indexed_png::read_indexed_png(&out_path).unwrap();
        assert_eq!(decoded.image.pixel(0, 0), 1);
        assert_eq!((decoded.image.width, decoded.image.height), (16, 16));
    }

    /// Round-tripping a sprite whose content doesn't fill its canvas must
    /// reproduce the original canvas size exactly (spec §4.H), not a
    /// smaller bounding-box-plus-margin size.
    #[test]
    fn p_rt_preserves_canvas_size_when_content_does_not_fill_it() {
        let input_dir = tempfile::tempdir().unwrap();
        let object_dir = tempfile::tempdir().unwrap();
        let rendered_dir = tempfile::tempdir().unwrap();

        let palette: Vec<[u8; 3]> = (0..GROUP_SIZE).map(|i| [i as u8; 3]).collect();
        let mut indices = vec![0u8; 32 * 32];
        for y in 0..16 {
            for x in 0..16 {
                indices[y * 32 + x] = 1;
            }
        }
        crate::indexed_png::write_indexed_png(
            input_dir.path().join("Frame-0-Layer-0.png"),
            32,
            32,
            &indices,
            &palette,
        )
        .unwrap();

        let config = Config { scan_chunk_sizes: vec![(16, 16), (8, 8)], ..Config::default() };
        let pipeline = Pipeline::new(SpriteKind::Object, config);
        pipeline.forward(input_dir.path(), object_dir.path()).unwrap();
        pipeline.reverse(object_dir.path(), rendered_dir.path(), OverlapPolicy::Chunk).unwrap();

        let out_path = rendered_dir.path().join("Frame-0-Layer-0.png");
        let decoded = crate::indexed_png::read_indexed_png(&out_path).unwrap();
        assert_eq!((decoded.image.width, decoded.image.height), (32, 32));
    }

    /// Animation frame numbers in config.json refer to the original
    /// `Frame-<f>-...` integers, not to positions in the compacted frame
    /// list; a reference to a frame past a gap must still resolve.
    #[test]
    fn build_animations_maps_original_frame_ids_past_gaps() {
        let input_dir = tempfile::tempdir().unwrap();
        let object_dir = tempfile::tempdir().unwrap();

        let palette: Vec<[u8; 3]> = (0..GROUP_SIZE).map(|i| [i as u8; 3]).collect();
        write_frame_png(input_dir.path(), 0, 0, &palette);
        write_frame_png(input_dir.path(), 3, 0, &palette);

        let config = Config {
            scan_chunk_sizes: vec![(16, 16), (8, 8)],
            animations: vec![crate::config::AnimationConfig {
                frames: vec![
                    crate::config::AnimFrameConfig { frame: 0, duration: 10 },
                    crate::config::AnimFrameConfig { frame: 3, duration: 20 },
                ],
            }],
            ..Config::default()
        };
        let pipeline = Pipeline::new(SpriteKind::Object, config);
        pipeline.forward(input_dir.path(), object_dir.path()).unwrap();

        let object = read_object_folder(object_dir.path(), SpriteKind::Object).unwrap();
        assert_eq!(object.animations.len(), 1);
        let frame_ids: Vec<u32> = object.animations[0].frames.iter().map(|f| f.frame_id).collect();
        assert_eq!(frame_ids, vec![0, 1]);
    }
}
