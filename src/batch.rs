// SPDX-License-Identifier: MPL-2.0
//! Batch processing of image directories.
//!
//! The runner walks one directory, applies a restoration operation to every
//! supported image file, and writes results as PNG into an output directory.
//! Files are processed strictly one at a time; the first failure aborts the
//! whole run and propagates, leaving already-written outputs in place.

use crate::error::{Error, Result};
use image_rs::DynamicImage;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// File extensions the batch runner picks up.
pub const SUPPORTED_FORMATS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "tiff", "bmp"];

/// Suffix appended to the input file stem when naming outputs.
const OUTPUT_SUFFIX: &str = "_processed.png";

/// Progress reporting capability for batch runs.
///
/// Strictly a side channel: implementations observe the run but must never
/// affect it. The default method bodies make every callback optional.
pub trait Progress {
    /// Called once before the first file, with the total file count.
    fn begin(&mut self, _total: usize) {}
    /// Called after each file has been written.
    fn advance(&mut self, _file: &Path) {}
    /// Called once after the last file.
    fn finish(&mut self) {}
}

/// Default reporter that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {}

/// Lists files in `dir` whose extension is one of [`SUPPORTED_FORMATS`].
///
/// Extensions are compared as written; `photo.JPG` is not matched. The order
/// of the returned paths is whatever the directory listing yields and must
/// not be relied upon.
///
/// # Errors
///
/// Returns [`Error::Io`] when the directory cannot be read.
pub fn list_image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir).map_err(|e| Error::Io(e.to_string()))? {
        let entry = entry.map_err(|e| Error::Io(e.to_string()))?;
        let path = entry.path();

        if path.is_file() && has_supported_extension(&path) {
            files.push(path);
        }
    }

    Ok(files)
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| SUPPORTED_FORMATS.contains(&ext))
}

/// Output file name for an input path: `<stem>_processed.png`, always PNG
/// regardless of the input format.
#[must_use]
pub fn output_name(input: &Path) -> PathBuf {
    let mut name = input
        .file_stem()
        .map_or_else(|| OsStr::new("image").to_os_string(), OsStr::to_os_string);
    name.push(OUTPUT_SUFFIX);
    PathBuf::from(name)
}

/// Applies `op` to every supported image in `input_dir`, writing results to
/// `output_dir`.
///
/// Creates `output_dir` (including missing parents) if absent. Each input is
/// loaded, converted to 3-channel RGB, transformed, and saved as PNG.
///
/// # Errors
///
/// Propagates the first failure (listing, decoding, `op`, or saving); files
/// processed before the failure remain written.
pub fn run_batch(
    input_dir: &Path,
    output_dir: &Path,
    progress: &mut dyn Progress,
    op: &mut dyn FnMut(&DynamicImage) -> Result<DynamicImage>,
) -> Result<()> {
    let files = list_image_files(input_dir)?;

    std::fs::create_dir_all(output_dir).map_err(|e| Error::Io(e.to_string()))?;

    progress.begin(files.len());

    for file in &files {
        // Decode failures are codec errors, not filesystem errors.
        let image = image_rs::open(file).map_err(|e| Error::Preprocessing(e.to_string()))?;
        let image = DynamicImage::ImageRgb8(image.to_rgb8());

        let restored = op(&image)?;

        restored
            .save(output_dir.join(output_name(file)))
            .map_err(|e| Error::Io(e.to_string()))?;

        progress.advance(file);
    }

    progress.finish();
    Ok(())
}
