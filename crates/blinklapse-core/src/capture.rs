//! One snapshot from one camera.

use std::path::Path;
use std::time::Duration;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::error::ServiceError;
use crate::frames::{frame_path, valid_frame_size};
use crate::service::CameraService;

/// Trigger a snapshot on `camera`, wait for it to reach the cloud, then save
/// it under `output_dir`.
///
/// The file is named after the moment the snapshot was requested. Returns
/// `true` only when a non-empty frame was written; every failure is logged
/// here and reported as `false`.
pub async fn capture_frame<S: CameraService>(
    service: &mut S,
    camera: &str,
    output_dir: &Path,
    settle_delay: Duration,
) -> bool {
    let path = frame_path(output_dir, &Local::now());

    match try_capture(service, camera, &path, settle_delay).await {
        Ok(()) => match valid_frame_size(&path) {
            Some(size) => {
                info!(camera = %camera, path = %path.display(), bytes = size, "Saved frame");
                true
            }
            None => {
                warn!(camera = %camera, "Frame capture failed - file missing or empty");
                false
            }
        },
        Err(e) => {
            warn!(camera = %camera, error = %e, "Frame capture failed");
            false
        }
    }
}

async fn try_capture<S: CameraService>(
    service: &mut S,
    camera: &str,
    path: &Path,
    settle_delay: Duration,
) -> Result<(), ServiceError> {
    info!(camera = %camera, "Triggering snapshot");
    service.snap_picture(camera).await?;

    // Battery cameras need time to wake, take the photo and upload it
    debug!(camera = %camera, delay_secs = settle_delay.as_secs(), "Waiting for upload");
    tokio::time::sleep(settle_delay).await;

    // Picks up the new thumbnail reference
    service.refresh(true).await?;

    service.image_to_file(camera, path).await
}
