//! Photo evidence pipeline.
//!
//! A capture is prepared (downscaled and re-encoded), tagged with its
//! metadata and delivered to the [`PhotoStorage`] service, tracked by an
//! [`UploadItem`] the whole way. Captures made while offline fail outright
//! instead of being queued.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use jiff::Timestamp;
use log::{debug, warn};
use tokio::sync::Mutex;

use crate::{
    config::WorkflowConfig,
    error::{Result, WorkflowError, OFFLINE_UPLOAD_MESSAGE},
    models::{CameraSnapshot, PhotoMetadata, PhotoTags, UploadItem, UploadStatus},
};

pub mod analysis;
pub mod connectivity;
pub mod gate;
pub mod geolocation;
pub mod processing;
pub mod queue;
pub mod storage;

pub use analysis::{FrameAnalyzer, FrameAssessment, FrameDefect, SharpnessAnalyzer};
pub use connectivity::{Connectivity, ConnectivityFlag};
pub use gate::{spawn_validation_loop, CaptureGate, FrameSource, ValidationLoop};
pub use geolocation::{locate_best_effort, FixedLocation, Geolocator, NoGeolocation};
pub use processing::{prepare_photo, ProcessedPhoto};
pub use queue::UploadQueue;
pub use storage::{LocalDirectoryStorage, PhotoStorage};

/// Everything needed to (re)deliver one capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub source: PathBuf,
    pub tags: PhotoTags,
    pub camera: Option<CameraSnapshot>,
}

/// A photo accepted by the storage service, not yet attached to its step.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredPhoto {
    pub upload_id: u64,
    pub url: String,
    pub metadata: PhotoMetadata,
}

/// Capture preparation and delivery.
pub struct PhotoPipeline {
    config: Arc<WorkflowConfig>,
    storage: Arc<dyn PhotoStorage>,
    connectivity: Arc<dyn Connectivity>,
    geolocator: Arc<dyn Geolocator>,
    queue: UploadQueue,
    requests: Mutex<HashMap<u64, CaptureRequest>>,
}

impl std::fmt::Debug for PhotoPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoPipeline")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl PhotoPipeline {
    pub fn new(
        config: Arc<WorkflowConfig>,
        storage: Arc<dyn PhotoStorage>,
        connectivity: Arc<dyn Connectivity>,
        geolocator: Arc<dyn Geolocator>,
    ) -> Self {
        let queue = UploadQueue::new(config.max_concurrent_uploads);
        Self {
            config,
            storage,
            connectivity,
            geolocator,
            queue,
            requests: Mutex::new(HashMap::new()),
        }
    }

    pub fn queue(&self) -> &UploadQueue {
        &self.queue
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Gate for the capture control, using the configured minimum score.
    pub fn capture_gate(&self) -> CaptureGate {
        CaptureGate::new(self.config.capture.min_frame_score)
    }

    /// Tracks a new capture and delivers it.
    pub async fn capture(&self, request: CaptureRequest) -> Result<DeliveredPhoto> {
        let item = self
            .queue
            .enqueue(
                request.source.clone(),
                request.tags.intervention_id,
                request.tags.step_type,
            )
            .await;
        self.requests.lock().await.insert(item.id, request.clone());
        self.deliver(item.id, &request).await
    }

    /// Delivers a failed capture again. Only items in `error` qualify.
    pub async fn retry(&self, upload_id: u64) -> Result<DeliveredPhoto> {
        let item = self
            .queue
            .get(upload_id)
            .await
            .ok_or(WorkflowError::UploadNotFound { id: upload_id })?;
        if item.status != UploadStatus::Error {
            return Err(WorkflowError::invalid_input("upload_id")
                .with_reason(format!("upload {upload_id} is {}, only failed uploads can be retried", item.status)));
        }
        let request = self
            .requests
            .lock()
            .await
            .get(&upload_id)
            .cloned()
            .ok_or(WorkflowError::UploadNotFound { id: upload_id })?;

        self.queue
            .set_progress(upload_id, UploadStatus::Queued, 0)
            .await?;
        self.deliver(upload_id, &request).await
    }

    /// Marks the item completed once its URL is attached to the step.
    pub async fn mark_attached(&self, upload_id: u64, url: String) -> Result<UploadItem> {
        self.queue.complete(upload_id, url).await
    }

    /// Marks the item failed and returns the `UploadFailed` error to surface.
    pub async fn mark_failed(&self, upload_id: u64, message: String) -> WorkflowError {
        warn!("Upload {upload_id} failed: {message}");
        if let Err(e) = self.queue.fail(upload_id, message.clone()).await {
            warn!("Could not record failure of upload {upload_id}: {e}");
        }
        WorkflowError::UploadFailed { message }
    }

    /// Drops a settled item and the capture context kept for retries.
    pub async fn acknowledge(&self, upload_id: u64) -> Result<UploadItem> {
        let item = self.queue.acknowledge(upload_id).await?;
        self.requests.lock().await.remove(&upload_id);
        Ok(item)
    }

    async fn deliver(&self, upload_id: u64, request: &CaptureRequest) -> Result<DeliveredPhoto> {
        if !self.connectivity.is_online() {
            warn!("Upload {upload_id} rejected: device offline");
            if let Err(e) = self
                .queue
                .fail(upload_id, OFFLINE_UPLOAD_MESSAGE.to_string())
                .await
            {
                warn!("Could not record offline rejection of upload {upload_id}: {e}");
            }
            return Err(WorkflowError::OfflineUploadUnavailable);
        }

        let _permit = self.queue.acquire().await?;
        self.queue
            .set_progress(upload_id, UploadStatus::Uploading, 10)
            .await?;
        let captured_at = Timestamp::now();

        let timeout = self.config.geolocation_timeout();
        let (raw, location) = tokio::join!(
            tokio::fs::read(&request.source),
            locate_best_effort(self.geolocator.as_ref(), timeout)
        );
        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                let message = format!("cannot read {}: {e}", request.source.display());
                return Err(self.mark_failed(upload_id, message).await);
            }
        };

        let settings = self.config.capture.clone();
        let processed = match tokio::task::spawn_blocking(move || prepare_photo(&raw, &settings)).await {
            Ok(Ok(processed)) => processed,
            Ok(Err(e)) => return Err(self.mark_failed(upload_id, e.to_string()).await),
            Err(e) => return Err(self.mark_failed(upload_id, e.to_string()).await),
        };
        debug!(
            "Upload {upload_id}: prepared {}x{} jpeg, {} -> {} bytes",
            processed.width,
            processed.height,
            processed.original_size,
            processed.byte_size()
        );
        self.queue
            .set_progress(upload_id, UploadStatus::Uploading, 50)
            .await?;

        let url = match self.storage.upload(&processed, &request.tags).await {
            Ok(url) => url,
            Err(e) => return Err(self.mark_failed(upload_id, e.to_string()).await),
        };
        self.queue
            .set_progress(upload_id, UploadStatus::Uploading, 90)
            .await?;
        debug!("Upload {upload_id} stored at {url}");

        Ok(DeliveredPhoto {
            upload_id,
            url,
            metadata: PhotoMetadata {
                captured_at,
                tags: request.tags.clone(),
                location,
                camera: request.camera.clone(),
                width: processed.width,
                height: processed.height,
                byte_size: processed.byte_size(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use tempfile::TempDir;

    use super::*;
    use crate::models::{GeoLocation, StepType};

    struct FlakyStorage {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PhotoStorage for FlakyStorage {
        async fn upload(&self, _photo: &ProcessedPhoto, tags: &PhotoTags) -> Result<String> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(WorkflowError::UploadFailed {
                    message: "storage unavailable".into(),
                })
            } else {
                Ok(format!("https://cdn.example/{}/{}.jpg", tags.intervention_id, tags.step_type))
            }
        }
    }

    fn write_capture(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("capture.png");
        let img = RgbImage::from_pixel(40, 30, Rgb([200, 10, 10]));
        DynamicImage::ImageRgb8(img)
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();
        path
    }

    fn request(source: PathBuf) -> CaptureRequest {
        CaptureRequest {
            source,
            tags: PhotoTags {
                intervention_id: 9,
                step_type: StepType::Inspection,
                angle: Some("front".into()),
                category: Some("damage".into()),
            },
            camera: Some(CameraSnapshot {
                facing: Some("back".into()),
                ..Default::default()
            }),
        }
    }

    fn pipeline(online: bool) -> PhotoPipeline {
        PhotoPipeline::new(
            Arc::new(WorkflowConfig::default()),
            Arc::new(FlakyStorage {
                calls: AtomicUsize::new(0),
            }),
            Arc::new(ConnectivityFlag::new(online)),
            Arc::new(FixedLocation(GeoLocation {
                latitude: 45.76,
                longitude: 4.83,
                accuracy: Some(8.0),
                altitude: Some(170.0),
            })),
        )
    }

    #[tokio::test]
    async fn test_offline_capture_fails_without_completing() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(false);

        let err = pipeline.capture(request(write_capture(&dir))).await.unwrap_err();
        assert_eq!(err.to_string(), "Upload photo indisponible hors ligne");

        let items = pipeline.queue().items().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].status, UploadStatus::Error);
        assert_eq!(items[0].error.as_deref(), Some(OFFLINE_UPLOAD_MESSAGE));
    }

    #[tokio::test]
    async fn test_failed_upload_is_retried_manually() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(true);

        let err = pipeline.capture(request(write_capture(&dir))).await.unwrap_err();
        assert!(matches!(err, WorkflowError::UploadFailed { .. }));
        let failed = &pipeline.queue().items().await[0];
        assert_eq!(failed.status, UploadStatus::Error);
        assert!(failed.error.as_deref().unwrap().contains("storage unavailable"));

        let delivered = pipeline.retry(failed.id).await.unwrap();
        assert_eq!(delivered.url, "https://cdn.example/9/inspection.jpg");
        assert_eq!(delivered.metadata.location.unwrap().altitude, Some(170.0));
        assert_eq!((delivered.metadata.width, delivered.metadata.height), (40, 30));
        assert_eq!(delivered.metadata.tags.angle.as_deref(), Some("front"));

        let item = pipeline
            .mark_attached(delivered.upload_id, delivered.url.clone())
            .await
            .unwrap();
        assert_eq!(item.status, UploadStatus::Completed);
        assert!(pipeline.retry(item.id).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_source_marks_error() {
        let pipeline = pipeline(true);
        let err = pipeline
            .capture(request(PathBuf::from("/nonexistent/capture.jpg")))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::UploadFailed { .. }));
        assert_eq!(pipeline.queue().items().await[0].status, UploadStatus::Error);
    }
}
