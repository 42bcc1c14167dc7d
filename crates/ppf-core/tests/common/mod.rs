#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use ppf_core::{
    models::PhotoTags,
    photo::{ConnectivityFlag, NoGeolocation, PhotoStorage, ProcessedPhoto},
    Result, Session, Workflow, WorkflowBuilder,
};
use tempfile::TempDir;

/// Storage that keeps uploads in memory and hands out predictable URLs.
#[derive(Default)]
pub struct MemoryStorage {
    uploads: Mutex<Vec<(String, usize)>>,
}

impl MemoryStorage {
    pub fn uploaded(&self) -> Vec<(String, usize)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl PhotoStorage for MemoryStorage {
    async fn upload(&self, photo: &ProcessedPhoto, tags: &PhotoTags) -> Result<String> {
        let mut uploads = self.uploads.lock().unwrap();
        let url = format!(
            "https://cdn.test/{}/{}/{}.jpg",
            tags.intervention_id,
            tags.step_type,
            uploads.len()
        );
        uploads.push((url.clone(), photo.bytes.len()));
        Ok(url)
    }
}

pub struct TestEnv {
    pub temp_dir: TempDir,
    pub workflow: Workflow,
    pub storage: Arc<MemoryStorage>,
    pub connectivity: Arc<ConnectivityFlag>,
}

impl TestEnv {
    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("test.db")
    }
}

/// Helper function to create a workflow backed by a temporary database
pub async fn create_test_env() -> TestEnv {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let storage = Arc::new(MemoryStorage::default());
    let connectivity = Arc::new(ConnectivityFlag::default());
    let workflow = WorkflowBuilder::new()
        .with_database_path(Some(&db_path))
        .with_storage(storage.clone())
        .with_connectivity(connectivity.clone())
        .with_geolocator(Arc::new(NoGeolocation))
        .build()
        .await
        .expect("Failed to create workflow");
    TestEnv {
        temp_dir,
        workflow,
        storage,
        connectivity,
    }
}

pub fn technician() -> Session {
    Session::new("tech-42")
}

/// URL list of `count` already uploaded photos.
pub fn photo_urls(count: usize) -> Option<Vec<String>> {
    Some(
        (0..count)
            .map(|i| format!("https://cdn.test/existing/{i}.jpg"))
            .collect(),
    )
}

/// Writes a small gradient PNG and returns its path.
pub fn write_png(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let image = image::RgbImage::from_fn(64, 48, |x, y| image::Rgb([(x * 4) as u8, (y * 5) as u8, 128]));
    image.save(&path).expect("Failed to write test image");
    path
}
