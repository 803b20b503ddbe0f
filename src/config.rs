//! `config.json` schema (spec §6), round-trippable between a forward run
//! and a later one seeded from the same settings.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpriteError};

pub const MAX_ANIMATIONS: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimFrameConfig {
    pub frame: u32,
    pub duration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationConfig {
    pub frames: Vec<AnimFrameConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub min_density: f64,
    pub displace_sprite: (i32, i32),
    pub intra_scan: bool,
    pub inter_scan: bool,
    pub scan_chunk_sizes: Vec<(u32, u32)>,
    pub animations: Vec<AnimationConfig>,
    /// The original input folder's common cel size (spec §4.H: round-
    /// tripping must reproduce this exactly). Populated by the forward
    /// pipeline; absent for object folders never produced by it, in which
    /// case the reverse pipeline falls back to deriving one from the cels.
    #[serde(default)]
    pub canvas_size: Option<(u32, u32)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_density: 0.5,
            displace_sprite: (0, 0),
            intra_scan: true,
            inter_scan: true,
            scan_chunk_sizes: crate::chunk::ALLOWED_CHUNK_SIZES.to_vec(),
            animations: Vec::new(),
            canvas_size: None,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SpriteError::Io {
            path: path.to_path_buf(),
            message: e,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| SpriteError::InvalidConfig {
            reason: format!("{}: {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self).expect("Config always serializes");
        std::fs::write(path, text).map_err(|e| SpriteError::Io {
            path: path.to_path_buf(),
            message: e,
        })
    }

    /// Validates spec §7's `TooManyAnimations` and §9 Open Question #3's
    /// "empty scan_chunk_sizes is rejected, not silently implied".
    pub fn validate(&self) -> Result<()> {
        if self.animations.len() > MAX_ANIMATIONS {
            return Err(SpriteError::TooManyAnimations { count: self.animations.len() });
        }
        if !(0.0..=1.0).contains(&self.min_density) {
            return Err(SpriteError::InvalidConfig {
                reason: format!("min_density {} is out of range 0.0..=1.0", self.min_density),
            });
        }
        if self.scan_chunk_sizes.is_empty() {
            return Err(SpriteError::InvalidConfig {
                reason: "scan_chunk_sizes must not be empty".to_string(),
            });
        }
        for &(w, h) in &self.scan_chunk_sizes {
            if !crate::chunk::ALLOWED_CHUNK_SIZES.contains(&(w, h)) {
                return Err(SpriteError::InvalidConfig {
                    reason: format!("{w}x{h} is not one of the 12 allowed chunk sizes"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.animations.push(AnimationConfig {
            frames: vec![AnimFrameConfig { frame: 0, duration: 15 }],
        });
        config.save(&path).unwrap();
        let read_back = Config::load(&path).unwrap();
        assert_eq!(read_back.animations.len(), 1);
        assert_eq!(read_back.animations[0].frames[0].duration, 15);
    }

    #[test]
    fn rejects_too_many_animations() {
        let config = Config {
            animations: (0..9)
                .map(|_| AnimationConfig { frames: vec![AnimFrameConfig { frame: 0, duration: 1 }] })
                .collect(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(SpriteError::TooManyAnimations { count: 9 })));
    }

    #[test]
    fn rejects_empty_scan_chunk_sizes() {
        let mut config = Config::default();
        config.scan_chunk_sizes.clear();
        assert!(config.validate().is_err());
    }
}
