//! Step record queries and state changes.

use jiff::Timestamp;
use log::error;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde_json::Value;

use super::{json_column, parse_column, parse_optional_column};
use crate::{
    error::{DatabaseResultExt, Result, WorkflowError},
    models::{progress_percentage, InterventionStatus, StepRecord, StepStatus, StepType},
};

const STEP_COLUMNS: &str = "id, intervention_id, step_type, step_order, status, is_mandatory, requires_photos, min_photos_required, max_photos_allowed, collected_data, notes, photo_urls, quality_score, quality_check_passed, issues, requires_supervisor_approval, approved_by, approved_at, revision, started_at, completed_at, created_at, updated_at";
const UPDATE_DRAFT_SQL: &str = "UPDATE intervention_steps SET collected_data = ?1, notes = COALESCE(?2, notes), photo_urls = COALESCE(?3, photo_urls), revision = revision + 1, updated_at = ?4 WHERE id = ?5";
const UPDATE_STEP_STARTED_SQL: &str = "UPDATE intervention_steps SET status = ?1, started_at = COALESCE(started_at, ?2), revision = revision + 1, updated_at = ?2 WHERE id = ?3 AND status = ?4";
const UPDATE_STEP_COMPLETED_SQL: &str = "UPDATE intervention_steps SET status = ?1, collected_data = ?2, notes = COALESCE(?3, notes), photo_urls = ?4, quality_score = ?5, quality_check_passed = ?6, issues = ?7, started_at = COALESCE(started_at, ?8), completed_at = ?8, revision = revision + 1, updated_at = ?8 WHERE id = ?9";
const UPDATE_STEP_APPROVAL_SQL: &str = "UPDATE intervention_steps SET approved_by = ?1, approved_at = ?2, revision = revision + 1, updated_at = ?2 WHERE id = ?3";
const MARK_INTERVENTION_STARTED_SQL: &str = "UPDATE interventions SET status = ?1, started_at = COALESCE(started_at, ?2), updated_at = ?2 WHERE id = ?3 AND status = ?4";
const UPDATE_PROGRESS_SQL: &str = "UPDATE interventions SET progress_percentage = ?1, updated_at = ?2 WHERE id = ?3";
const SELECT_INTERVENTION_STATUS_SQL: &str = "SELECT status FROM interventions WHERE id = ?1";

/// Everything written when a step becomes completed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepCompletion {
    pub collected_data: Value,
    pub notes: Option<String>,
    pub photo_urls: Vec<String>,
    pub quality_score: Option<f64>,
    pub quality_check_passed: Option<bool>,
    pub issues: Vec<String>,
}

/// Builds a [`StepRecord`] from a row selected with `STEP_COLUMNS`.
fn build_step_from_row(row: &rusqlite::Row) -> rusqlite::Result<StepRecord> {
    Ok(StepRecord {
        id: row.get::<_, i64>(0)? as u64,
        intervention_id: row.get::<_, i64>(1)? as u64,
        step_type: parse_column(row, 2)?,
        order: row.get::<_, i64>(3)? as u32,
        status: parse_column(row, 4)?,
        is_mandatory: row.get(5)?,
        requires_photos: row.get(6)?,
        min_photos_required: row.get::<_, i64>(7)? as u32,
        max_photos_allowed: row.get::<_, i64>(8)? as u32,
        collected_data: json_column(row, 9)?.unwrap_or(Value::Null),
        notes: row.get(10)?,
        photo_urls: json_column(row, 11)?,
        quality_score: row.get(12)?,
        quality_check_passed: row.get(13)?,
        issues: json_column(row, 14)?.unwrap_or_default(),
        requires_supervisor_approval: row.get(15)?,
        approved_by: row.get(16)?,
        approved_at: parse_optional_column(row, 17)?,
        revision: row.get::<_, i64>(18)? as u32,
        started_at: parse_optional_column(row, 19)?,
        completed_at: parse_optional_column(row, 20)?,
        created_at: parse_column(row, 21)?,
        updated_at: parse_column(row, 22)?,
    })
}

/// All step records of an intervention in catalog order.
pub(crate) fn load_steps(conn: &Connection, intervention_id: u64) -> Result<Vec<StepRecord>> {
    let sql = format!(
        "SELECT {STEP_COLUMNS} FROM intervention_steps WHERE intervention_id = ?1 ORDER BY step_order"
    );
    let mut stmt = conn.prepare(&sql).db_context("Failed to prepare query")?;
    let steps = stmt
        .query_map(params![intervention_id as i64], build_step_from_row)
        .db_context("Failed to query steps")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .db_context("Failed to fetch steps")?;
    Ok(steps)
}

/// One step record, `None` if the intervention has no such step.
pub(crate) fn load_step(
    conn: &Connection,
    intervention_id: u64,
    step_type: StepType,
) -> Result<Option<StepRecord>> {
    let sql = format!(
        "SELECT {STEP_COLUMNS} FROM intervention_steps WHERE intervention_id = ?1 AND step_type = ?2"
    );
    conn.query_row(
        &sql,
        params![intervention_id as i64, step_type.as_str()],
        build_step_from_row,
    )
    .optional()
    .db_context("Failed to get step")
}

/// Like [`load_step`] but a missing record is an integrity error.
pub(crate) fn require_step(
    conn: &Connection,
    intervention_id: u64,
    step_type: StepType,
) -> Result<StepRecord> {
    load_step(conn, intervention_id, step_type)?.ok_or_else(|| {
        error!("Step record '{step_type}' missing for intervention {intervention_id}");
        WorkflowError::StepNotFound {
            intervention_id,
            step: step_type,
        }
    })
}

/// Current status of an intervention, failing if it does not exist.
pub(crate) fn intervention_status(conn: &Connection, intervention_id: u64) -> Result<InterventionStatus> {
    let status: Option<String> = conn
        .query_row(
            SELECT_INTERVENTION_STATUS_SQL,
            params![intervention_id as i64],
            |row| row.get(0),
        )
        .optional()
        .db_context("Failed to query intervention status")?;
    let status = status.ok_or(WorkflowError::InterventionNotFound {
        id: intervention_id,
    })?;
    status
        .parse()
        .map_err(|reason: String| WorkflowError::Configuration { message: reason })
}

/// Fails with `AlreadyFinalized` for completed interventions.
pub(crate) fn ensure_open(conn: &Connection, intervention_id: u64) -> Result<()> {
    match intervention_status(conn, intervention_id)? {
        InterventionStatus::Completed => Err(WorkflowError::AlreadyFinalized {
            id: intervention_id,
        }),
        _ => Ok(()),
    }
}

/// Moves a `not_started` intervention to `in_progress`.
pub(crate) fn mark_intervention_started(tx: &Transaction, intervention_id: u64, now: &str) -> Result<()> {
    tx.execute(
        MARK_INTERVENTION_STARTED_SQL,
        params![
            InterventionStatus::InProgress.as_str(),
            now,
            intervention_id as i64,
            InterventionStatus::NotStarted.as_str()
        ],
    )
    .db_context("Failed to mark intervention as started")?;
    Ok(())
}

/// Recomputes and stores the derived progress percentage.
pub(crate) fn refresh_progress(tx: &Transaction, intervention_id: u64, now: &str) -> Result<f64> {
    let steps = load_steps(tx, intervention_id)?;
    let progress = progress_percentage(&steps);
    tx.execute(
        UPDATE_PROGRESS_SQL,
        params![progress, now, intervention_id as i64],
    )
    .db_context("Failed to update intervention progress")?;
    Ok(progress)
}

/// Writes the completed state of one step.
pub(crate) fn write_completion(
    tx: &Transaction,
    step_id: u64,
    completion: &StepCompletion,
    now: &str,
) -> Result<()> {
    let data = serde_json::to_string(&completion.collected_data)?;
    let photos = serde_json::to_string(&completion.photo_urls)?;
    let issues = if completion.issues.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&completion.issues)?)
    };
    tx.execute(
        UPDATE_STEP_COMPLETED_SQL,
        params![
            StepStatus::Completed.as_str(),
            data,
            completion.notes,
            photos,
            completion.quality_score,
            completion.quality_check_passed,
            issues,
            now,
            step_id as i64
        ],
    )
    .db_context("Failed to complete step")?;
    Ok(())
}

impl super::Database {
    /// Retrieves all step records of an intervention.
    pub fn get_steps(&self, intervention_id: u64) -> Result<Vec<StepRecord>> {
        load_steps(&self.connection, intervention_id)
    }

    /// Retrieves a single step record.
    pub fn get_step(&self, intervention_id: u64, step_type: StepType) -> Result<Option<StepRecord>> {
        load_step(&self.connection, intervention_id, step_type)
    }

    /// Partial update of a step's draft data. Status is left untouched.
    /// `photos` replaces the photo list when given.
    pub fn save_step_draft(
        &mut self,
        intervention_id: u64,
        step_type: StepType,
        collected_data: &Value,
        notes: Option<&str>,
        photos: Option<&[String]>,
    ) -> Result<StepRecord> {
        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        ensure_open(&tx, intervention_id)?;
        let step = require_step(&tx, intervention_id, step_type)?;
        if step.is_completed() {
            return Err(WorkflowError::InvalidTransition {
                step: step_type,
                reason: "completed steps do not accept drafts".into(),
            });
        }
        if let Some(photos) = photos {
            if photos.len() as u32 > step.max_photos_allowed {
                return Err(WorkflowError::PhotoLimitExceeded {
                    step: step_type,
                    allowed: step.max_photos_allowed,
                    actual: photos.len() as u32,
                });
            }
        }

        let now_str = Timestamp::now().to_string();
        let data = serde_json::to_string(collected_data)?;
        let photos = photos.map(serde_json::to_string).transpose()?;

        tx.execute(
            UPDATE_DRAFT_SQL,
            params![data, notes, photos, &now_str, step.id as i64],
        )
        .db_context("Failed to save draft")?;
        mark_intervention_started(&tx, intervention_id, &now_str)?;

        let saved = require_step(&tx, intervention_id, step_type)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(saved)
    }

    /// Moves a pending step to `in_progress` once `guard` accepts it. The
    /// guard sees every step record of the intervention.
    pub fn begin_step<F>(&mut self, intervention_id: u64, step_type: StepType, guard: F) -> Result<StepRecord>
    where
        F: FnOnce(&[StepRecord], &StepRecord) -> Result<()>,
    {
        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        ensure_open(&tx, intervention_id)?;
        let steps = load_steps(&tx, intervention_id)?;
        let step = require_step(&tx, intervention_id, step_type)?;
        guard(&steps, &step)?;

        let now_str = Timestamp::now().to_string();
        tx.execute(
            UPDATE_STEP_STARTED_SQL,
            params![
                StepStatus::InProgress.as_str(),
                &now_str,
                step.id as i64,
                StepStatus::Pending.as_str()
            ],
        )
        .db_context("Failed to start step")?;
        mark_intervention_started(&tx, intervention_id, &now_str)?;

        let started = require_step(&tx, intervention_id, step_type)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(started)
    }

    /// Completes a non-terminal step. `prepare` runs inside the transaction
    /// against fresh records, validates the request and returns what to
    /// write. Returns the completed record and every record afterwards.
    pub fn complete_step<F>(
        &mut self,
        intervention_id: u64,
        step_type: StepType,
        prepare: F,
    ) -> Result<(StepRecord, Vec<StepRecord>)>
    where
        F: FnOnce(&[StepRecord], &StepRecord) -> Result<StepCompletion>,
    {
        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        ensure_open(&tx, intervention_id)?;
        let steps = load_steps(&tx, intervention_id)?;
        let step = require_step(&tx, intervention_id, step_type)?;
        let completion = prepare(&steps, &step)?;

        let now_str = Timestamp::now().to_string();
        write_completion(&tx, step.id, &completion, &now_str)?;
        mark_intervention_started(&tx, intervention_id, &now_str)?;
        refresh_progress(&tx, intervention_id, &now_str)?;

        let steps = load_steps(&tx, intervention_id)?;
        let completed = require_step(&tx, intervention_id, step_type)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok((completed, steps))
    }

    /// Records the supervisor sign-off of a completed step.
    pub fn approve_step(
        &mut self,
        intervention_id: u64,
        step_type: StepType,
        approver: &str,
    ) -> Result<StepRecord> {
        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        let step = require_step(&tx, intervention_id, step_type)?;
        if !step.is_completed() {
            return Err(WorkflowError::InvalidTransition {
                step: step_type,
                reason: "only completed steps can be approved".into(),
            });
        }
        if !step.requires_supervisor_approval {
            return Err(WorkflowError::InvalidTransition {
                step: step_type,
                reason: "step does not require supervisor approval".into(),
            });
        }
        if step.approved_by.is_some() {
            return Err(WorkflowError::InvalidTransition {
                step: step_type,
                reason: "step is already approved".into(),
            });
        }

        let now_str = Timestamp::now().to_string();
        tx.execute(
            UPDATE_STEP_APPROVAL_SQL,
            params![approver, &now_str, step.id as i64],
        )
        .db_context("Failed to approve step")?;

        let approved = require_step(&tx, intervention_id, step_type)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(approved)
    }
}
