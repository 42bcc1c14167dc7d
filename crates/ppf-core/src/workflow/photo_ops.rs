//! Photo capture and upload tracking.

use log::debug;

use super::{PhotoAttached, Workflow};
use crate::{
    error::{Result, WorkflowError},
    models::{PhotoTags, UploadItem},
    params::{CapturePhoto, UploadRef},
    photo::{CaptureGate, CaptureRequest, DeliveredPhoto},
    session::Session,
};

impl Workflow {
    /// Captures a photo for a step: prepares it, uploads it and appends the
    /// resulting URL to the step's photo list.
    ///
    /// Fails with `OfflineUploadUnavailable` while offline and with
    /// `UploadFailed` when delivery fails; the upload item then stays in
    /// `error` until retried or acknowledged.
    pub async fn capture_photo(&self, session: &Session, params: &CapturePhoto) -> Result<PhotoAttached> {
        session.require()?;
        let intervention_id = params.intervention_id;
        let step_type = params.step_type;

        let step = self
            .with_db(move |db, _| db.get_step(intervention_id, step_type))
            .await?
            .ok_or(WorkflowError::StepNotFound {
                intervention_id,
                step: step_type,
            })?;
        if step.is_completed() {
            return Err(WorkflowError::InvalidTransition {
                step: step_type,
                reason: "completed steps do not accept new photos".into(),
            });
        }

        let delivered = self
            .photos
            .capture(CaptureRequest {
                source: params.source.clone(),
                tags: PhotoTags {
                    intervention_id,
                    step_type,
                    angle: params.angle.clone(),
                    category: params.category.clone(),
                },
                camera: params.camera.clone(),
            })
            .await?;
        self.attach(delivered).await
    }

    /// Delivers a failed upload again.
    pub async fn retry_upload(&self, session: &Session, params: &UploadRef) -> Result<PhotoAttached> {
        session.require()?;
        let delivered = self.photos.retry(params.upload_id).await?;
        self.attach(delivered).await
    }

    /// Every tracked upload in creation order.
    pub async fn upload_items(&self, session: &Session) -> Result<Vec<UploadItem>> {
        session.require()?;
        Ok(self.photos.queue().items().await)
    }

    /// Removes a completed or failed upload from the list.
    pub async fn acknowledge_upload(&self, session: &Session, params: &UploadRef) -> Result<UploadItem> {
        session.require()?;
        self.photos.acknowledge(params.upload_id).await
    }

    /// Gate for the capture control of a camera view.
    pub fn capture_gate(&self) -> CaptureGate {
        self.photos.capture_gate()
    }

    async fn attach(&self, delivered: DeliveredPhoto) -> Result<PhotoAttached> {
        let DeliveredPhoto {
            upload_id,
            url,
            metadata,
        } = delivered;
        let intervention_id = metadata.tags.intervention_id;
        let step_type = metadata.tags.step_type;

        let attach_url = url.clone();
        let attached = self
            .with_db(move |db, _| db.attach_step_photo(intervention_id, step_type, &attach_url, &metadata))
            .await;
        let (step, photo) = match attached {
            Ok(attached) => attached,
            Err(e) => {
                self.photos.mark_failed(upload_id, e.public_message()).await;
                return Err(e);
            }
        };

        let upload = self.photos.mark_attached(upload_id, url).await?;
        self.evict_progress(intervention_id).await;
        debug!(
            "Photo {} attached to '{step_type}' of intervention {intervention_id} ({} total)",
            photo.id,
            step.photo_count()
        );
        Ok(PhotoAttached { upload, step, photo })
    }
}
