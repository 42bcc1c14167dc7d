//! In-memory upload tracking.
//!
//! Items live for the lifetime of the process only. Each capture gets its own
//! item; the number of uploads running at once is capped by a semaphore.

use std::{
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
};

use jiff::Timestamp;
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};

use crate::{
    error::{Result, WorkflowError},
    models::{StepType, UploadItem, UploadStatus},
};

#[derive(Debug)]
pub struct UploadQueue {
    items: Mutex<Vec<UploadItem>>,
    next_id: AtomicU64,
    permits: Semaphore,
    capacity: usize,
}

impl UploadQueue {
    pub fn new(max_concurrent: usize) -> Self {
        let capacity = max_concurrent.max(1);
        Self {
            items: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            permits: Semaphore::new(capacity),
            capacity,
        }
    }

    /// Registers a new `queued` item.
    pub async fn enqueue(&self, source: PathBuf, intervention_id: u64, step_type: StepType) -> UploadItem {
        let item = UploadItem {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            source,
            intervention_id,
            step_type,
            status: UploadStatus::Queued,
            progress: 0,
            url: None,
            error: None,
            created_at: Timestamp::now(),
        };
        self.items.lock().await.push(item.clone());
        item
    }

    /// Applies `change` to one item and returns the updated copy.
    pub async fn update<F>(&self, id: u64, change: F) -> Result<UploadItem>
    where
        F: FnOnce(&mut UploadItem),
    {
        let mut items = self.items.lock().await;
        let item = items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(WorkflowError::UploadNotFound { id })?;
        change(item);
        Ok(item.clone())
    }

    pub async fn set_progress(&self, id: u64, status: UploadStatus, progress: u8) -> Result<UploadItem> {
        self.update(id, |item| {
            item.status = status;
            item.progress = progress.min(100);
            if status != UploadStatus::Error {
                item.error = None;
            }
        })
        .await
    }

    pub async fn complete(&self, id: u64, url: String) -> Result<UploadItem> {
        self.update(id, |item| {
            item.status = UploadStatus::Completed;
            item.progress = 100;
            item.url = Some(url);
            item.error = None;
        })
        .await
    }

    pub async fn fail(&self, id: u64, message: String) -> Result<UploadItem> {
        self.update(id, |item| {
            item.status = UploadStatus::Error;
            item.error = Some(message);
        })
        .await
    }

    pub async fn get(&self, id: u64) -> Option<UploadItem> {
        self.items.lock().await.iter().find(|i| i.id == id).cloned()
    }

    /// Snapshot of every tracked item in creation order.
    pub async fn items(&self) -> Vec<UploadItem> {
        self.items.lock().await.clone()
    }

    /// Removes a settled (`completed` or `error`) item the UI has seen.
    pub async fn acknowledge(&self, id: u64) -> Result<UploadItem> {
        let mut items = self.items.lock().await;
        let index = items
            .iter()
            .position(|i| i.id == id)
            .ok_or(WorkflowError::UploadNotFound { id })?;
        match items[index].status {
            UploadStatus::Completed | UploadStatus::Error => Ok(items.remove(index)),
            status => Err(WorkflowError::invalid_input("upload_id")
                .with_reason(format!("upload {id} is still {status}"))),
        }
    }

    /// Waits for a free upload slot.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>> {
        self.permits.acquire().await.map_err(|e| WorkflowError::UploadFailed {
            message: e.to_string(),
        })
    }

    /// Uploads currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_item_lifecycle() {
        let queue = UploadQueue::new(2);
        let item = queue
            .enqueue(PathBuf::from("/tmp/a.jpg"), 1, StepType::Inspection)
            .await;
        assert_eq!(item.status, UploadStatus::Queued);

        assert!(queue.acknowledge(item.id).await.is_err());

        queue.set_progress(item.id, UploadStatus::Uploading, 50).await.unwrap();
        let done = queue.complete(item.id, "https://cdn/a.jpg".into()).await.unwrap();
        assert_eq!(done.progress, 100);
        assert_eq!(done.url.as_deref(), Some("https://cdn/a.jpg"));

        queue.acknowledge(item.id).await.unwrap();
        assert!(queue.items().await.is_empty());
        assert!(queue.get(item.id).await.is_none());
    }

    #[tokio::test]
    async fn test_failed_item_keeps_error_until_retried() {
        let queue = UploadQueue::new(1);
        let item = queue
            .enqueue(PathBuf::from("/tmp/b.jpg"), 1, StepType::Installation)
            .await;
        let failed = queue.fail(item.id, "timeout".into()).await.unwrap();
        assert_eq!(failed.status, UploadStatus::Error);
        assert_eq!(failed.error.as_deref(), Some("timeout"));

        let retried = queue.set_progress(item.id, UploadStatus::Queued, 0).await.unwrap();
        assert_eq!(retried.error, None);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let queue = UploadQueue::new(2);
        let first = queue.acquire().await.unwrap();
        let _second = queue.acquire().await.unwrap();
        assert_eq!(queue.in_flight(), 2);
        assert!(queue.permits.try_acquire().is_err());
        drop(first);
        assert_eq!(queue.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_unknown_item() {
        let queue = UploadQueue::new(1);
        assert!(matches!(
            queue.fail(42, "x".into()).await,
            Err(WorkflowError::UploadNotFound { id: 42 })
        ));
    }
}
