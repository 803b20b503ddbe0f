//! The palette model (spec §4.A): a global palette is an ordered sequence of
//! 16-color groups. Index 0 of every group is transparent; the first group's
//! transparent color is the canonical transparent used for cross-group
//! comparisons.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::{Result, SpriteError};

pub const GROUP_SIZE: usize = 16;

/// A 24-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }
}

/// What a sprite's palette budget looks like, per spec §9's tagged
/// `SpriteKind`: it replaces an inheritance hierarchy (sprite/object/effect)
/// with one enum that only parameterizes the palette-group count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteKind {
    Object,
    Effect,
}

impl SpriteKind {
    pub const fn max_groups(self) -> usize {
        match self {
            SpriteKind::Object => 12,
            SpriteKind::Effect => 3,
        }
    }
}

/// An ordered sequence of exactly 16 [`Color`]s. Index 0 is transparent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteGroup(pub [Color; GROUP_SIZE]);

impl PaletteGroup {
    pub fn transparent(&self) -> Color {
        self.0[0]
    }
}

/// The global palette: 1..=max_groups (per [`SpriteKind`]) palette groups,
/// preserved in input order and never reordered by the serializer.
#[derive(Debug, Clone)]
pub struct Palette {
    groups: Vec<PaletteGroup>,
}

impl Palette {
    /// Builds a palette from a flat, already-validated list of RGB triples
    /// (as embedded in a PNG's `PLTE` chunk), grouping every 16 entries.
    pub fn from_flat_colors(colors: &[[u8; 3]], kind: SpriteKind) -> Result<Self> {
        if colors.is_empty() || !colors.len().is_multiple_of(GROUP_SIZE) {
            return Err(SpriteError::InvalidConfig {
                reason: format!(
                    "palette has {} entries, which is not a positive multiple of {GROUP_SIZE}",
                    colors.len()
                ),
            });
        }
        let group_count = colors.len() / GROUP_SIZE;
        if group_count > kind.max_groups() {
            return Err(SpriteError::InvalidConfig {
                reason: format!(
                    "palette has {group_count} groups, exceeding the {:?} budget of {}",
                    kind,
                    kind.max_groups()
                ),
            });
        }
        let groups = colors
            .chunks_exact(GROUP_SIZE)
            .map(|chunk| {
                let mut arr = [Color::rgb(0, 0, 0); GROUP_SIZE];
                for (dst, src) in arr.iter_mut().zip(chunk) {
                    *dst = Color(*src);
                }
                PaletteGroup(arr)
            })
            .collect();
        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[PaletteGroup] {
        &self.groups
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// `group_of` per spec §4.A: integer division by 16.
    pub fn group_of(color_index: u8) -> u8 {
        color_index / GROUP_SIZE as u8
    }

    /// `local_index` per spec §4.A: remainder mod 16.
    pub fn local_index(color_index: u8) -> u8 {
        color_index % GROUP_SIZE as u8
    }

    pub fn is_transparent(color_index: u8) -> bool {
        Self::local_index(color_index) == 0
    }

    pub fn color_at(&self, color_index: u8) -> Option<Color> {
        let group = self.groups.get(Self::group_of(color_index) as usize)?;
        group.0.get(Self::local_index(color_index) as usize).copied()
    }

    /// Canonical transparent color: the first group's index 0.
    pub fn canonical_transparent(&self) -> Color {
        self.groups[0].transparent()
    }

    /// Flattens the palette back into one RGB-triple-per-index list, in
    /// group order, suitable for embedding in a PNG `PLTE` chunk.
    pub fn to_flat_colors(&self) -> Vec<[u8; 3]> {
        self.groups
            .iter()
            .flat_map(|g| g.0.iter().map(|c| c.0))
            .collect()
    }

    /// Serializes to the JASC-PAL text format (spec §4.A): a
    /// `JASC-PAL\n0100\n<count>\n` header followed by one `R G B` line per
    /// color, preserving the input order.
    pub fn write_jasc_pal(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let flat = self.to_flat_colors();
        let mut out = String::with_capacity(16 + flat.len() * 12);
        out.push_str("JASC-PAL\n0100\n");
        writeln!(out, "{}", flat.len()).unwrap();
        for [r, g, b] in &flat {
            writeln!(out, "{r} {g} {b}").unwrap();
        }
        fs::write(path, out)
    }

    /// Parses a JASC-PAL file back into groups of 16, per `kind`'s budget.
    pub fn read_jasc_pal(path: impl AsRef<Path>, kind: SpriteKind) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| SpriteError::Io {
            path: path.to_path_buf(),
            message: e,
        })?;
        let mut lines = text.lines();
        let header = lines.next().unwrap_or_default();
        if header.trim() != "JASC-PAL" {
            return Err(SpriteError::InvalidConfig {
                reason: format!("{}: missing JASC-PAL header", path.display()),
            });
        }
        let _version = lines.next();
        let count: usize = lines
            .next()
            .and_then(|l| l.trim().parse().ok())
            .ok_or_else(|| SpriteError::InvalidConfig {
                reason: format!("{}: missing or invalid color count", path.display()),
            })?;
        let mut colors = Vec::with_capacity(count);
        for line in lines.take(count) {
            let parts: Vec<_> = line.split_whitespace().collect();
            if parts.len() != 3 {
                return Err(SpriteError::InvalidConfig {
                    reason: format!("{}: malformed color line {:?}", path.display(), line),
                });
            }
            let mut rgb = [0u8; 3];
            for (dst, s) in rgb.iter_mut().zip(parts) {
                *dst = s.parse().map_err(|_| SpriteError::InvalidConfig {
                    reason: format!("{}: invalid color component {:?}", path.display(), s),
                })?;
            }
            colors.push(rgb);
        }
        Self::from_flat_colors(&colors, kind)
    }
}
