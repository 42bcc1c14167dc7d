//! Intervention CRUD operations and finalization.

use jiff::Timestamp;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::{
    json_column, parse_column, parse_optional_column,
    step_queries::{ensure_open, load_steps, refresh_progress, require_step, write_completion, StepCompletion},
};
use crate::{
    aggregator::CompletionMetrics,
    catalog::StepCatalog,
    error::{DatabaseResultExt, Result, WorkflowError},
    models::{Intervention, InterventionStatus, StepRecord, StepType},
};

const INSERT_INTERVENTION_SQL: &str = "INSERT INTO interventions (task_ref, status, technician_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)";
const INSERT_STEP_SQL: &str = "INSERT INTO intervention_steps (intervention_id, step_type, step_order, is_mandatory, requires_photos, min_photos_required, max_photos_allowed, requires_supervisor_approval, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";
const INTERVENTION_COLUMNS: &str = "id, task_ref, status, technician_id, progress_percentage, requires_supervisor_approval, metrics, started_at, finalized_at, created_at, updated_at";
const UPDATE_FINALIZED_SQL: &str = "UPDATE interventions SET status = ?1, requires_supervisor_approval = ?2, metrics = ?3, finalization_data = ?4, started_at = COALESCE(started_at, ?5), finalized_at = ?5, updated_at = ?5 WHERE id = ?6";

fn build_intervention_from_row(row: &rusqlite::Row) -> rusqlite::Result<Intervention> {
    Ok(Intervention {
        id: row.get::<_, i64>(0)? as u64,
        task_ref: row.get(1)?,
        status: parse_column(row, 2)?,
        technician_id: row.get(3)?,
        progress_percentage: row.get(4)?,
        requires_supervisor_approval: row.get(5)?,
        metrics: json_column::<CompletionMetrics>(row, 6)?,
        started_at: parse_optional_column(row, 7)?,
        finalized_at: parse_optional_column(row, 8)?,
        created_at: parse_column(row, 9)?,
        updated_at: parse_column(row, 10)?,
        steps: Vec::new(),
    })
}

fn load_intervention(conn: &Connection, id: u64) -> Result<Option<Intervention>> {
    let sql = format!("SELECT {INTERVENTION_COLUMNS} FROM interventions WHERE id = ?1");
    let intervention = conn
        .query_row(&sql, params![id as i64], build_intervention_from_row)
        .optional()
        .db_context("Failed to get intervention")?;

    match intervention {
        Some(mut intervention) => {
            intervention.steps = load_steps(conn, id)?;
            Ok(Some(intervention))
        }
        None => Ok(None),
    }
}

impl super::Database {
    /// Creates an intervention with one pending step record per catalog
    /// definition.
    pub fn create_intervention(
        &mut self,
        task_ref: &str,
        technician_id: &str,
        catalog: &StepCatalog,
    ) -> Result<Intervention> {
        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        let now_str = Timestamp::now().to_string();
        tx.execute(
            INSERT_INTERVENTION_SQL,
            params![
                task_ref,
                InterventionStatus::NotStarted.as_str(),
                technician_id,
                &now_str,
                &now_str
            ],
        )
        .db_context("Failed to insert intervention")?;
        let id = tx.last_insert_rowid() as u64;

        {
            let mut stmt = tx
                .prepare(INSERT_STEP_SQL)
                .db_context("Failed to prepare step insert")?;
            for (order, def) in catalog.iter().enumerate() {
                stmt.execute(params![
                    id as i64,
                    def.step_type.as_str(),
                    order as i64,
                    def.is_mandatory,
                    def.requires_photos,
                    i64::from(def.min_photos_required),
                    i64::from(def.max_photos_allowed),
                    def.requires_supervisor_approval,
                    &now_str,
                    &now_str
                ])
                .db_context("Failed to insert step record")?;
            }
        }

        let intervention = load_intervention(&tx, id)?.ok_or_else(|| {
            WorkflowError::database(format!("Intervention {id} vanished after insert"))
                .with_source(rusqlite::Error::QueryReturnedNoRows)
        })?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(intervention)
    }

    /// Retrieves an intervention with its step records.
    pub fn get_intervention(&self, id: u64) -> Result<Option<Intervention>> {
        load_intervention(&self.connection, id)
    }

    /// Lists interventions, newest first, without their steps.
    pub fn list_interventions(
        &self,
        status: Option<InterventionStatus>,
        task_ref: Option<&str>,
    ) -> Result<Vec<Intervention>> {
        let sql = format!(
            "SELECT {INTERVENTION_COLUMNS} FROM interventions \
             WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR task_ref = ?2) \
             ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = self
            .connection
            .prepare(&sql)
            .db_context("Failed to prepare query")?;
        let interventions = stmt
            .query_map(
                params![status.map(|s| s.as_str()), task_ref],
                build_intervention_from_row,
            )
            .db_context("Failed to query interventions")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch interventions")?;
        Ok(interventions)
    }

    /// Completes the terminal step and closes the intervention in one
    /// transaction.
    ///
    /// `prepare` validates the terminal step against fresh records and
    /// returns what to write; `aggregate` computes the metrics from the
    /// post-write records. Any error from either rolls the whole call back.
    pub fn finalize_intervention<P, A>(
        &mut self,
        intervention_id: u64,
        terminal: StepType,
        finalization_data: &Value,
        prepare: P,
        aggregate: A,
    ) -> Result<(Intervention, CompletionMetrics)>
    where
        P: FnOnce(&[StepRecord], &StepRecord) -> Result<StepCompletion>,
        A: FnOnce(&[StepRecord]) -> Result<CompletionMetrics>,
    {
        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        ensure_open(&tx, intervention_id)?;
        let steps = load_steps(&tx, intervention_id)?;
        let step = require_step(&tx, intervention_id, terminal)?;
        let completion = prepare(&steps, &step)?;

        let now_str = Timestamp::now().to_string();
        write_completion(&tx, step.id, &completion, &now_str)?;

        let steps = load_steps(&tx, intervention_id)?;
        let metrics = aggregate(&steps)?;
        let metrics_json = serde_json::to_string(&metrics)?;
        let data_json = serde_json::to_string(finalization_data)?;

        refresh_progress(&tx, intervention_id, &now_str)?;
        tx.execute(
            UPDATE_FINALIZED_SQL,
            params![
                InterventionStatus::Completed.as_str(),
                metrics.requires_supervisor_approval,
                metrics_json,
                data_json,
                &now_str,
                intervention_id as i64
            ],
        )
        .db_context("Failed to finalize intervention")?;

        let intervention = load_intervention(&tx, intervention_id)?.ok_or(
            WorkflowError::InterventionNotFound {
                id: intervention_id,
            },
        )?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok((intervention, metrics))
    }
}
