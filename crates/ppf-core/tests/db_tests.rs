use jiff::Timestamp;
use ppf_core::{
    models::{PhotoMetadata, PhotoTags},
    Database, InterventionStatus, StepCatalog, StepStatus, StepType, WorkflowError,
};
use serde_json::json;
use tempfile::NamedTempFile;

/// Helper function to create a temporary database for testing
fn create_test_db() -> (NamedTempFile, Database) {
    let temp_file = NamedTempFile::new().expect("Failed to create temporary file");
    let db = Database::new(temp_file.path()).expect("Failed to create test database");
    (temp_file, db)
}

fn metadata(intervention_id: u64, step_type: StepType) -> PhotoMetadata {
    PhotoMetadata {
        captured_at: Timestamp::now(),
        tags: PhotoTags {
            intervention_id,
            step_type,
            angle: None,
            category: Some("overview".to_string()),
        },
        location: None,
        camera: None,
        width: 1920,
        height: 1080,
        byte_size: 204_800,
    }
}

#[test]
fn test_create_intervention_follows_catalog() {
    let (_temp_file, mut db) = create_test_db();
    let catalog = StepCatalog::default();

    let intervention = db
        .create_intervention("TASK-1", "tech-1", &catalog)
        .expect("Failed to create intervention");

    assert!(intervention.id > 0);
    assert_eq!(intervention.status, InterventionStatus::NotStarted);
    assert_eq!(intervention.progress_percentage, 0.0);
    let types: Vec<StepType> = intervention.steps.iter().map(|s| s.step_type).collect();
    assert_eq!(types, StepType::ALL.to_vec());
    for (order, (step, def)) in intervention.steps.iter().zip(catalog.iter()).enumerate() {
        assert_eq!(step.order as usize, order);
        assert_eq!(step.is_mandatory, def.is_mandatory);
        assert_eq!(step.min_photos_required, def.min_photos_required);
        assert_eq!(step.max_photos_allowed, def.max_photos_allowed);
        assert_eq!(step.status, StepStatus::Pending);
        assert_eq!(step.revision, 0);
    }
}

#[test]
fn test_reopening_keeps_data() {
    let (temp_file, mut db) = create_test_db();
    let created = db
        .create_intervention("TASK-REOPEN", "tech-1", &StepCatalog::default())
        .unwrap();
    drop(db);

    let reopened = Database::new(temp_file.path()).expect("Failed to reopen database");
    let loaded = reopened.get_intervention(created.id).unwrap().unwrap();
    assert_eq!(loaded.task_ref, "TASK-REOPEN");
    assert_eq!(loaded.steps.len(), 5);
}

#[test]
fn test_get_missing_intervention() {
    let (_temp_file, db) = create_test_db();
    assert!(db.get_intervention(99).unwrap().is_none());
    assert!(db.get_step(99, StepType::Inspection).unwrap().is_none());
}

#[test]
fn test_list_interventions_filters() {
    let (_temp_file, mut db) = create_test_db();
    let catalog = StepCatalog::default();
    let first = db.create_intervention("TASK-A", "tech-1", &catalog).unwrap();
    db.create_intervention("TASK-B", "tech-1", &catalog).unwrap();
    db.save_step_draft(first.id, StepType::Inspection, &json!({}), None, None)
        .unwrap();

    assert_eq!(db.list_interventions(None, None).unwrap().len(), 2);
    let started = db
        .list_interventions(Some(InterventionStatus::InProgress), None)
        .unwrap();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].task_ref, "TASK-A");
    let by_ref = db.list_interventions(None, Some("TASK-B")).unwrap();
    assert_eq!(by_ref.len(), 1);
    assert!(by_ref[0].steps.is_empty());
}

#[test]
fn test_save_step_draft_keeps_status_and_counts_revisions() {
    let (_temp_file, mut db) = create_test_db();
    let intervention = db
        .create_intervention("TASK-1", "tech-1", &StepCatalog::default())
        .unwrap();
    let photos = vec!["https://cdn.test/1.jpg".to_string()];

    let first = db
        .save_step_draft(
            intervention.id,
            StepType::Inspection,
            &json!({"checklist": {"hood": true}}),
            Some("first pass"),
            Some(&photos),
        )
        .unwrap();
    assert_eq!(first.status, StepStatus::Pending);
    assert_eq!(first.revision, 1);
    assert_eq!(first.photo_urls, Some(photos.clone()));

    let second = db
        .save_step_draft(intervention.id, StepType::Inspection, &json!({"checklist": {}}), None, None)
        .unwrap();
    assert_eq!(second.revision, 2);
    assert_eq!(second.collected_data, json!({"checklist": {}}));
    assert_eq!(second.notes.as_deref(), Some("first pass"));
    assert_eq!(second.photo_urls, Some(photos));
}

#[test]
fn test_save_step_draft_rejects_too_many_photos() {
    let (_temp_file, mut db) = create_test_db();
    let intervention = db
        .create_intervention("TASK-1", "tech-1", &StepCatalog::default())
        .unwrap();
    let photos: Vec<String> = (0..11).map(|i| format!("https://cdn.test/{i}.jpg")).collect();

    let err = db
        .save_step_draft(intervention.id, StepType::Preparation, &json!({}), None, Some(&photos))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PhotoLimitExceeded { allowed: 10, actual: 11, .. }));
    let step = db.get_step(intervention.id, StepType::Preparation).unwrap().unwrap();
    assert_eq!(step.revision, 0);
}

#[test]
fn test_begin_step_runs_guard_inside_transaction() {
    let (_temp_file, mut db) = create_test_db();
    let intervention = db
        .create_intervention("TASK-1", "tech-1", &StepCatalog::default())
        .unwrap();

    let err = db
        .begin_step(intervention.id, StepType::Inspection, |steps, record| {
            assert_eq!(steps.len(), 5);
            assert_eq!(record.status, StepStatus::Pending);
            Err(WorkflowError::InvalidInput {
                field: "step_type".into(),
                reason: "rejected by guard".into(),
            })
        })
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidInput { .. }));
    let unchanged = db.get_intervention(intervention.id).unwrap().unwrap();
    assert_eq!(unchanged.status, InterventionStatus::NotStarted);

    let started = db
        .begin_step(intervention.id, StepType::Inspection, |_, _| Ok(()))
        .unwrap();
    assert_eq!(started.status, StepStatus::InProgress);
    assert!(started.started_at.is_some());
}

#[test]
fn test_attach_step_photo_appends_url_and_metadata() {
    let (_temp_file, mut db) = create_test_db();
    let intervention = db
        .create_intervention("TASK-1", "tech-1", &StepCatalog::default())
        .unwrap();

    let (step, photo) = db
        .attach_step_photo(
            intervention.id,
            StepType::Inspection,
            "https://cdn.test/a.jpg",
            &metadata(intervention.id, StepType::Inspection),
        )
        .unwrap();
    assert_eq!(step.photo_urls, Some(vec!["https://cdn.test/a.jpg".to_string()]));
    assert_eq!(step.revision, 1);
    assert_eq!(photo.step_id, step.id);

    db.attach_step_photo(
        intervention.id,
        StepType::Inspection,
        "https://cdn.test/b.jpg",
        &metadata(intervention.id, StepType::Inspection),
    )
    .unwrap();

    let photos = db
        .get_step_photos(intervention.id, StepType::Inspection)
        .unwrap();
    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0].url, "https://cdn.test/a.jpg");
    assert_eq!(photos[1].metadata.tags.category.as_deref(), Some("overview"));
    assert_eq!(photos[1].metadata.width, 1920);
    assert!(db
        .get_step_photos(intervention.id, StepType::Installation)
        .unwrap()
        .is_empty());
}

#[test]
fn test_approve_step_requires_flag() {
    let (_temp_file, mut db) = create_test_db();
    let mut definitions: Vec<_> = StepCatalog::default().iter().cloned().collect();
    definitions[0].requires_supervisor_approval = true;
    let catalog = StepCatalog::new(definitions).unwrap();
    let intervention = db.create_intervention("TASK-1", "tech-1", &catalog).unwrap();

    let pending = db.approve_step(intervention.id, StepType::Inspection, "supervisor-1");
    assert!(matches!(pending, Err(WorkflowError::InvalidTransition { .. })));

    db.complete_step(intervention.id, StepType::Inspection, |_, _| {
        Ok(ppf_core::db::step_queries::StepCompletion {
            collected_data: json!({"checklist": {}}),
            photo_urls: (0..4).map(|i| format!("https://cdn.test/{i}.jpg")).collect(),
            ..Default::default()
        })
    })
    .unwrap();

    let approved = db
        .approve_step(intervention.id, StepType::Inspection, "supervisor-1")
        .unwrap();
    assert_eq!(approved.approved_by.as_deref(), Some("supervisor-1"));
    assert!(approved.approved_at.is_some());

    let twice = db.approve_step(intervention.id, StepType::Inspection, "supervisor-1");
    assert!(matches!(twice, Err(WorkflowError::InvalidTransition { .. })));
}
