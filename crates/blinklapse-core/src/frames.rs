//! Frame file naming and on-disk checks.

use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

/// Timestamp layout for frame file names. Lexical order is chronological.
pub const FRAME_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Frame file extension
pub const FRAME_EXTENSION: &str = "jpg";

/// File name for a frame requested at `at`, e.g. `20240131_235959.jpg`
pub fn frame_file_name<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("{}.{}", at.format(FRAME_TIMESTAMP_FORMAT), FRAME_EXTENSION)
}

pub fn frame_path<Tz>(dir: &Path, at: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    dir.join(frame_file_name(at))
}

/// Create `<frames_dir>/<camera>` if needed and return it. Safe to call when
/// the directory already exists.
pub fn ensure_camera_dir(frames_dir: &Path, camera: &str) -> io::Result<PathBuf> {
    let dir = frames_dir.join(camera);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Size of the frame at `path` if it is a usable frame (exists, non-empty).
pub fn valid_frame_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .filter(|&len| len > 0)
}
