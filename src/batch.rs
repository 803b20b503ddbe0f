//! Bulk folder conversion (spec §5's "bulk conversion entrypoint"):
//! runs one direction of the pipeline over every subfolder of a root
//! directory in parallel, grounded on the teacher's `rayon`-parallel
//! per-chunk processing in `archive_tool.rs`/`stitch.rs` — generalized
//! from "abort on first error" to "log and continue past a failing
//! folder", since spec §7 requires the bulk driver to keep going.
//! Folder enumeration uses `walkdir::WalkDir` the way the teacher's
//! `collect_chunks` walks a directory tree, and progress is shown with
//! the teacher's `stylized_progress_bar`.

use std::path::{Path, PathBuf};

use log::{error, info};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::overlap::OverlapPolicy;
use crate::pipeline::Pipeline;
use crate::stylized_progress_bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchDirection {
    Forward,
    Reverse,
}

pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: Vec<(PathBuf, String)>,
}

/// Runs `pipeline` over every immediate subdirectory of `root_dir`,
/// writing each result under `out_root` in a same-named subdirectory.
pub fn run_batch(
    pipeline: &Pipeline,
    root_dir: &Path,
    out_root: &Path,
    direction: BatchDirection,
    overlap_policy: OverlapPolicy,
) -> std::io::Result<BatchSummary> {
    let folders: Vec<PathBuf> = WalkDir::new(root_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.is_dir())
        .collect();

    let pb = stylized_progress_bar(folders.len() as u64);
    let results: Vec<Result<PathBuf, (PathBuf, String)>> = folders
        .par_iter()
        .map(|folder| {
            let name = folder.file_name().unwrap_or_default();
            let out_dir = out_root.join(name);
            let outcome = match direction {
                BatchDirection::Forward => pipeline.forward(folder, &out_dir).map(|_| ()),
                BatchDirection::Reverse => pipeline.reverse(folder, &out_dir, overlap_policy).map(|_| ()),
            };
            pb.inc(1);
            match outcome {
                Ok(()) => Ok(folder.clone()),
                Err(e) => Err((folder.clone(), e.to_string())),
            }
        })
        .collect();
    pb.finish_and_clear();

    let mut succeeded = 0;
    let mut failed = Vec::new();
    for r in results {
        match r {
            Ok(folder) => {
                info!("converted {}", folder.display());
                succeeded += 1;
            }
            Err((folder, message)) => {
                error!("failed to convert {}: {message}", folder.display());
                failed.push((folder, message));
            }
        }
    }

    Ok(BatchSummary { succeeded, failed })
}
