//! Draft autosave deduplication.
//!
//! Every draft save computes a content signature of the step payload. A save
//! whose signature equals the last one written for that step in this process
//! is dropped, which gives at most one write per distinct state without a
//! debounce timer. The cache is process-local and safe to lose.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::{error::Result, models::StepType};

/// Identity of a step inside an intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepKey {
    pub intervention_id: u64,
    pub step_type: StepType,
}

#[derive(Serialize)]
struct SignedContent<'a> {
    collected_data: &'a Value,
    notes: Option<&'a str>,
    photos: Option<&'a [String]>,
}

/// SHA-256 hex digest over a deterministic serialization of the payload.
///
/// `serde_json` objects keep their keys sorted, so two payloads with the same
/// content produce the same signature regardless of insertion order. A
/// missing photo list (keep the stored one) and an empty one (clear it) sign
/// differently.
pub fn draft_signature(
    collected_data: &Value,
    notes: Option<&str>,
    photos: Option<&[String]>,
) -> Result<String> {
    let bytes = serde_json::to_vec(&SignedContent {
        collected_data,
        notes,
        photos,
    })?;
    let hash = Sha256::digest(&bytes);
    Ok(format!("{hash:x}"))
}

/// Last saved signature per step.
#[derive(Debug, Default)]
pub struct DraftSignatures {
    inner: Mutex<HashMap<StepKey, String>>,
}

impl DraftSignatures {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `signature` is what was last written for `key`.
    pub async fn is_unchanged(&self, key: StepKey, signature: &str) -> bool {
        self.inner
            .lock()
            .await
            .get(&key)
            .is_some_and(|last| last == signature)
    }

    /// Records a committed write.
    pub async fn record(&self, key: StepKey, signature: String) {
        self.inner.lock().await.insert(key, signature);
    }

    /// Drops the signature, e.g. once the step is completed.
    pub async fn forget(&self, key: StepKey) {
        self.inner.lock().await.remove(&key);
    }

    /// Drops every signature of an intervention.
    pub async fn forget_intervention(&self, intervention_id: u64) {
        self.inner
            .lock()
            .await
            .retain(|key, _| key.intervention_id != intervention_id);
    }
}
