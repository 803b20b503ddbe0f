pub mod batch;
pub mod chunk;
pub mod compose;
pub mod config;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod indexed_png;
pub mod input;
pub mod objectio;
pub mod overlap;
pub mod palette;
pub mod pipeline;
pub mod render;
pub mod serialize;
pub mod tile;
pub mod xmlio;

use std::env;

use indicatif::{ProgressBar, ProgressStyle};

/// Initializes the logger with a default `RUST_LOG=info` (grounded on the
/// teacher's `set_up_logger`).
pub fn set_up_logger() {
    if env::var("RUST_LOG").is_err() {
        unsafe {
            env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();
}

/// A progress bar styled the way the teacher's `stylized_progress_bar`
/// does, for the bulk batch driver's folder-by-folder progress.
pub fn stylized_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {wide_bar} {pos:>}/{len:7} {eta}")
            .unwrap()
            .progress_chars(">>-"),
    );
    pb
}
