//! Photo storage service boundary.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use jiff::Timestamp;
use sha2::{Digest, Sha256};

use super::processing::ProcessedPhoto;
use crate::{
    error::{Result, WorkflowError},
    models::PhotoTags,
};

/// External storage accepting a processed photo and returning its public
/// URL.
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    async fn upload(&self, photo: &ProcessedPhoto, tags: &PhotoTags) -> Result<String>;
}

/// Stores photos under a local directory, one folder per intervention and
/// step. File names combine the upload time with a content hash prefix, so
/// capturing the same image twice yields two distinct photos.
#[derive(Debug, Clone)]
pub struct LocalDirectoryStorage {
    root: PathBuf,
}

impl LocalDirectoryStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn photo_path(&self, photo: &ProcessedPhoto, tags: &PhotoTags) -> PathBuf {
        let mut hash = format!("{:x}", Sha256::digest(&photo.bytes));
        hash.truncate(16);
        let mut name = format!("{}-{hash}", Timestamp::now().as_nanosecond());
        if let Some(angle) = tags.angle.as_deref().filter(|a| !a.is_empty()) {
            name = format!("{}-{name}", sanitize(angle));
        }
        self.root
            .join(tags.intervention_id.to_string())
            .join(tags.step_type.as_str())
            .join(format!("{name}.jpg"))
    }
}

fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[async_trait]
impl PhotoStorage for LocalDirectoryStorage {
    async fn upload(&self, photo: &ProcessedPhoto, tags: &PhotoTags) -> Result<String> {
        let path = self.photo_path(photo, tags);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| WorkflowError::FileSystem {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        tokio::fs::write(&path, &photo.bytes)
            .await
            .map_err(|e| WorkflowError::FileSystem {
                path: path.clone(),
                source: e,
            })?;
        Ok(format!("file://{}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::models::StepType;

    #[tokio::test]
    async fn test_upload_writes_file_and_returns_url() {
        let dir = TempDir::new().unwrap();
        let storage = LocalDirectoryStorage::new(dir.path());
        let photo = ProcessedPhoto {
            bytes: vec![0xFF, 0xD8, 0xFF, 0xD9],
            width: 1,
            height: 1,
            content_type: "image/jpeg",
            original_size: 4,
        };
        let tags = PhotoTags {
            intervention_id: 3,
            step_type: StepType::Inspection,
            angle: Some("front left".into()),
            category: None,
        };

        let url = storage.upload(&photo, &tags).await.unwrap();
        let path = url.strip_prefix("file://").unwrap();
        assert!(path.contains("/3/inspection/front_left-"));
        assert_eq!(std::fs::read(path).unwrap(), photo.bytes);

        let again = storage.upload(&photo, &tags).await.unwrap();
        assert_ne!(again, url);
        assert!(std::path::Path::new(again.strip_prefix("file://").unwrap()).exists());
        assert!(std::path::Path::new(path).exists());
    }
}
