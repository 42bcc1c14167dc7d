//! Delivered photo bookkeeping.

use jiff::Timestamp;
use rusqlite::params;

use super::{
    json_column,
    step_queries::{ensure_open, mark_intervention_started, require_step},
};
use crate::{
    error::{DatabaseResultExt, Result, WorkflowError},
    models::{PhotoMetadata, StepPhoto, StepRecord, StepType},
};

const INSERT_PHOTO_SQL: &str =
    "INSERT INTO step_photos (step_id, url, metadata, created_at) VALUES (?1, ?2, ?3, ?4)";
const UPDATE_PHOTO_URLS_SQL: &str = "UPDATE intervention_steps SET photo_urls = ?1, revision = revision + 1, updated_at = ?2 WHERE id = ?3";
const SELECT_PHOTOS_SQL: &str = "SELECT p.id, p.step_id, p.url, p.metadata FROM step_photos p JOIN intervention_steps s ON s.id = p.step_id WHERE s.intervention_id = ?1 AND s.step_type = ?2 ORDER BY p.id";

impl super::Database {
    /// Appends an uploaded photo to a step: the URL joins the step's photo
    /// list and the metadata is stored alongside.
    pub fn attach_step_photo(
        &mut self,
        intervention_id: u64,
        step_type: StepType,
        url: &str,
        metadata: &PhotoMetadata,
    ) -> Result<(StepRecord, StepPhoto)> {
        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        ensure_open(&tx, intervention_id)?;
        let step = require_step(&tx, intervention_id, step_type)?;
        if step.is_completed() {
            return Err(WorkflowError::InvalidTransition {
                step: step_type,
                reason: "completed steps do not accept new photos".into(),
            });
        }

        let mut urls = step.photo_urls.clone().unwrap_or_default();
        urls.push(url.to_string());
        if urls.len() as u32 > step.max_photos_allowed {
            return Err(WorkflowError::PhotoLimitExceeded {
                step: step_type,
                allowed: step.max_photos_allowed,
                actual: urls.len() as u32,
            });
        }

        let now_str = Timestamp::now().to_string();
        tx.execute(
            UPDATE_PHOTO_URLS_SQL,
            params![serde_json::to_string(&urls)?, &now_str, step.id as i64],
        )
        .db_context("Failed to update step photos")?;
        tx.execute(
            INSERT_PHOTO_SQL,
            params![
                step.id as i64,
                url,
                serde_json::to_string(metadata)?,
                &now_str
            ],
        )
        .db_context("Failed to insert photo")?;
        let photo_id = tx.last_insert_rowid() as u64;
        mark_intervention_started(&tx, intervention_id, &now_str)?;

        let updated = require_step(&tx, intervention_id, step_type)?;
        tx.commit().db_context("Failed to commit transaction")?;

        Ok((
            updated,
            StepPhoto {
                id: photo_id,
                step_id: step.id,
                url: url.to_string(),
                metadata: metadata.clone(),
            },
        ))
    }

    /// Photos stored for one step, oldest first.
    pub fn get_step_photos(&self, intervention_id: u64, step_type: StepType) -> Result<Vec<StepPhoto>> {
        let mut stmt = self
            .connection
            .prepare(SELECT_PHOTOS_SQL)
            .db_context("Failed to prepare query")?;
        let photos = stmt
            .query_map(params![intervention_id as i64, step_type.as_str()], |row| {
                let metadata: Option<PhotoMetadata> = json_column(row, 3)?;
                Ok(StepPhoto {
                    id: row.get::<_, i64>(0)? as u64,
                    step_id: row.get::<_, i64>(1)? as u64,
                    url: row.get(2)?,
                    metadata: metadata.ok_or(rusqlite::Error::InvalidColumnType(
                        3,
                        "metadata".into(),
                        rusqlite::types::Type::Null,
                    ))?,
                })
            })
            .db_context("Failed to query photos")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch photos")?;
        Ok(photos)
    }
}
