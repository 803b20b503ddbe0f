use std::path::PathBuf;

use thiserror::Error;

/// Typed error taxonomy for the chunking pipeline (see spec §7).
///
/// Every fatal condition the pipeline can hit gets its own variant so a
/// caller can match on `kind()` and print `{kind, path, message}` without
/// parsing a string. Non-fatal conditions (`ChunkLimitExceeded`,
/// `MemoryLimitExceeded`) are reported via [`Warning`] instead, since they
/// don't abort the run.
#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("invalid filename {path}: {reason}")]
    InvalidFilename { path: PathBuf, reason: String },

    #[error("palette mismatch: {path} does not share the folder's palette")]
    PaletteMismatch { path: PathBuf },

    #[error("{path} is not an indexed image, or has more than 256 palette entries")]
    WrongPixelFormat { path: PathBuf },

    #[error("{path} has dimensions {width}x{height}, which is not a multiple of 8")]
    NotMultipleOf8 {
        path: PathBuf,
        width: u32,
        height: u32,
    },

    #[error("{path}: dimensions {a:?} and {b:?} disagree across frame layers")]
    DimensionMismatch {
        path: PathBuf,
        a: (u32, u32),
        b: (u32, u32),
    },

    #[error("tile at ({tile_x}, {tile_y}) in {path} references more than one palette group")]
    MultiGroupTile {
        path: PathBuf,
        tile_x: u32,
        tile_y: u32,
    },

    #[error("config declares {count} animations, but at most 8 are supported")]
    TooManyAnimations { count: usize },

    #[error("config rejects: {reason}")]
    InvalidConfig { reason: String },

    #[error("missing required file: {path}")]
    MissingFile { path: PathBuf },

    #[error("XML parse error in {path} at line {line}, column {column}: {message}")]
    XmlParseError {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("{path}: {message}")]
    Io {
        path: PathBuf,
        #[source]
        message: std::io::Error,
    },
}

/// A condition the pipeline warns about but continues past (spec §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    ChunkLimitExceeded { frame: u32, count: usize, limit: usize },
    MemoryLimitExceeded { frame: u32, memory: u32, budget: u32 },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::ChunkLimitExceeded { frame, count, limit } => write!(
                f,
                "frame {frame}: {count} chunks exceeds the per-frame limit of {limit}"
            ),
            Warning::MemoryLimitExceeded { frame, memory, budget } => write!(
                f,
                "frame {frame}: memory cost {memory} exceeds the budget of {budget}"
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, SpriteError>;
