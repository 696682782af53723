//! Review Session Manager and feedback integration tests

use catwalk_common::config::ReviewConfig;
use catwalk_common::db::init_memory_database;
use catwalk_common::{time, Error};
use catwalk_ingest::db::{catalog, rules, sessions};
use catwalk_ingest::models::{NewCatalogEntry, ReviewStatus, TrainingStatus};
use catwalk_ingest::services::feedback::{record_feedback, FeedbackInput};
use catwalk_ingest::services::feedback_learner::apply_learning;
use catwalk_ingest::services::review_manager::{create_session, get_status, setup_review};
use chrono::Duration;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

async fn seed_catalog(pool: &SqlitePool, count: usize) -> Vec<i64> {
    let mut ids = Vec::new();
    for i in 0..count {
        let entry = NewCatalogEntry {
            original_url: format!("https://cdn.example.com/look{}.jpg", i),
            title: format!("Look {}", i),
            description: "Crawled from https://www.example.com/fashion/".to_string(),
            category: "street-style".to_string(),
            page_url: Some("https://www.example.com/fashion/".to_string()),
            width: 400,
            height: 600,
        };
        // Distinct timestamps so "newest first" is well defined
        let crawled_at = time::now() + Duration::seconds(i as i64);
        ids.push(catalog::insert_entry(pool, &entry, crawled_at).await.unwrap().unwrap());
    }
    ids
}

fn verdict(image_id: i64, approved: bool) -> FeedbackInput {
    FeedbackInput {
        image_id,
        approved,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_setup_review_queues_newest_pending_entries() {
    let pool = init_memory_database().await.unwrap();
    let ids = seed_catalog(&pool, 5).await;

    let config = ReviewConfig {
        batch_size: 3,
        ..Default::default()
    };
    let setup = setup_review(&pool, "manual", &config).await.unwrap();

    assert_eq!(setup.images_queued, 3);
    assert_eq!(setup.session.total_images, 3);
    assert!(setup.review_url.ends_with(&setup.session.session_id));

    let queued = catalog::list_by_session(&pool, &setup.session.session_id).await.unwrap();
    let queued_ids: Vec<i64> = queued.iter().map(|e| e.id).collect();
    assert_eq!(queued_ids, vec![ids[2], ids[3], ids[4]]);
    assert!(queued.iter().all(|e| e.training_status == TrainingStatus::Queued));

    let oldest = catalog::get_entry(&pool, ids[0]).await.unwrap().unwrap();
    assert_eq!(oldest.training_status, TrainingStatus::Pending);
    assert!(oldest.review_session_id.is_none());
}

#[tokio::test]
async fn test_review_completes_after_all_verdicts() {
    let pool = init_memory_database().await.unwrap();
    seed_catalog(&pool, 10).await;
    let setup = setup_review(&pool, "manual", &ReviewConfig::default()).await.unwrap();
    let session_id = setup.session.session_id.clone();
    assert_eq!(setup.session.total_images, 10);

    let queued = catalog::list_by_session(&pool, &session_id).await.unwrap();
    for (i, entry) in queued.iter().enumerate() {
        let input = match i {
            0..=5 => verdict(entry.id, true),
            6..=8 => FeedbackInput {
                rejection_reason: Some("blurry".to_string()),
                ..verdict(entry.id, false)
            },
            _ => FeedbackInput {
                duplicate: true,
                ..verdict(entry.id, false)
            },
        };
        record_feedback(&pool, input).await.unwrap();

        if i == 4 {
            let midway = get_status(&pool, Some(&session_id)).await.unwrap();
            assert!(!midway.review_completed);
            assert_eq!(midway.review_progress.images_reviewed, 5);
            assert_eq!(midway.review_progress.completion_percentage, 50);
        }
    }

    let report = get_status(&pool, Some(&session_id)).await.unwrap();
    assert!(report.review_completed);
    assert_eq!(report.session_info.status, ReviewStatus::Completed);
    assert_eq!(report.review_progress.images_approved, 6);
    assert_eq!(report.review_progress.images_rejected, 3);
    assert_eq!(report.review_progress.images_duplicates, 1);
    assert_eq!(report.review_progress.completion_percentage, 100);
    assert!(report.session_info.completed_at.is_some());
}

#[tokio::test]
async fn test_completed_session_is_frozen() {
    let pool = init_memory_database().await.unwrap();
    seed_catalog(&pool, 2).await;
    let setup = setup_review(&pool, "manual", &ReviewConfig::default()).await.unwrap();
    let session_id = setup.session.session_id.clone();

    for entry in catalog::list_by_session(&pool, &session_id).await.unwrap() {
        record_feedback(&pool, verdict(entry.id, false)).await.unwrap();
    }
    let first = get_status(&pool, Some(&session_id)).await.unwrap();
    assert!(first.review_completed);

    // Catalog changes after completion do not reach the stored tallies
    for entry in catalog::list_by_session(&pool, &session_id).await.unwrap() {
        catalog::delete_entry(&pool, entry.id).await.unwrap();
    }
    let second = get_status(&pool, Some(&session_id)).await.unwrap();
    assert_eq!(second.review_progress.images_rejected, 2);
    assert_eq!(
        second.session_info.completed_at.map(|t| t.timestamp_micros()),
        first.session_info.completed_at.map(|t| t.timestamp_micros())
    );
    assert_eq!(second.session_info.status, ReviewStatus::Completed);
}

#[tokio::test]
async fn test_learning_before_first_poll_keeps_session_progress() {
    let pool = init_memory_database().await.unwrap();
    seed_catalog(&pool, 4).await;
    let setup = setup_review(&pool, "manual", &ReviewConfig::default()).await.unwrap();
    let session_id = setup.session.session_id.clone();

    let queued = catalog::list_by_session(&pool, &session_id).await.unwrap();
    for (i, entry) in queued.iter().enumerate() {
        record_feedback(&pool, verdict(entry.id, i < 2)).await.unwrap();
    }

    // Learning deletes the rejected rows before anyone asks for status
    let report = apply_learning(&pool, &CancellationToken::new()).await.unwrap();
    assert_eq!(report.stats.deleted, 2);
    assert_eq!(catalog::list_by_session(&pool, &session_id).await.unwrap().len(), 2);

    let status = get_status(&pool, Some(&session_id)).await.unwrap();
    assert!(status.review_completed);
    assert_eq!(status.session_info.status, ReviewStatus::Completed);
    assert_eq!(status.review_progress.images_reviewed, 4);
    assert_eq!(status.review_progress.images_approved, 2);
    assert_eq!(status.review_progress.images_rejected, 2);
}

#[tokio::test]
async fn test_changed_verdict_is_counted_once() {
    let pool = init_memory_database().await.unwrap();
    seed_catalog(&pool, 2).await;
    let setup = setup_review(&pool, "manual", &ReviewConfig::default()).await.unwrap();
    let session_id = setup.session.session_id.clone();
    let queued = catalog::list_by_session(&pool, &session_id).await.unwrap();

    record_feedback(&pool, verdict(queued[0].id, false)).await.unwrap();
    record_feedback(&pool, verdict(queued[0].id, true)).await.unwrap();

    let status = get_status(&pool, Some(&session_id)).await.unwrap();
    assert!(!status.review_completed);
    assert_eq!(status.review_progress.images_reviewed, 1);
    assert_eq!(status.review_progress.images_approved, 1);
    assert_eq!(status.review_progress.images_rejected, 0);
}

#[tokio::test]
async fn test_overdue_session_expires_on_read_and_stays_expired() {
    let pool = init_memory_database().await.unwrap();
    let session = create_session(&pool, "manual", 4, Duration::seconds(-1)).await.unwrap();

    let stored = sessions::load_session(&pool, &session.session_id).await.unwrap().unwrap();
    assert_eq!(stored.status, ReviewStatus::Active);

    let report = get_status(&pool, Some(&session.session_id)).await.unwrap();
    assert!(report.session_expired);
    assert!(!report.review_completed);

    let persisted = sessions::load_session(&pool, &session.session_id).await.unwrap().unwrap();
    assert_eq!(persisted.status, ReviewStatus::Expired);

    let again = get_status(&pool, Some(&session.session_id)).await.unwrap();
    assert!(again.session_expired);
    assert_eq!(again.session_info.status, ReviewStatus::Expired);
}

#[tokio::test]
async fn test_empty_session_never_completes() {
    let pool = init_memory_database().await.unwrap();
    let setup = setup_review(&pool, "manual", &ReviewConfig::default()).await.unwrap();
    assert_eq!(setup.session.total_images, 0);

    let report = get_status(&pool, Some(&setup.session.session_id)).await.unwrap();
    assert!(!report.review_completed);
    assert_eq!(report.session_info.status, ReviewStatus::Active);
    assert_eq!(report.review_progress.completion_percentage, 0);
}

#[tokio::test]
async fn test_status_without_id_uses_latest_active_session() {
    let pool = init_memory_database().await.unwrap();
    assert!(matches!(get_status(&pool, None).await, Err(Error::NotFound(_))));

    let session = create_session(&pool, "manual", 3, Duration::hours(6)).await.unwrap();
    let report = get_status(&pool, None).await.unwrap();
    assert_eq!(report.session_id, session.session_id);

    assert!(matches!(
        get_status(&pool, Some("review_unknown")).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_rejection_records_learned_keywords() {
    let pool = init_memory_database().await.unwrap();
    let entry = NewCatalogEntry {
        original_url: "https://cdn.example.com/movie-poster.jpg".to_string(),
        title: "Poster".to_string(),
        description: "Crawled from https://www.example.com/fashion/".to_string(),
        category: "fashion".to_string(),
        page_url: None,
        width: 800,
        height: 1200,
    };
    let id = catalog::insert_entry(&pool, &entry, time::now()).await.unwrap().unwrap();

    let outcome = record_feedback(
        &pool,
        FeedbackInput {
            rejection_reason: Some("poster_campaign".to_string()),
            notes: Some("film key art".to_string()),
            ..verdict(id, false)
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome.training_status, TrainingStatus::Rejected);
    assert_eq!(outcome.updated_rules, vec!["poster", "campaign", "movie", "trailer"]);

    let stored = catalog::get_entry(&pool, id).await.unwrap().unwrap();
    assert_eq!(stored.training_feedback.as_deref(), Some("poster_campaign"));
    assert_eq!(stored.training_notes.as_deref(), Some("film key art"));

    let learned = rules::learned_keywords(&pool, rules::RULE_EXCLUDE_KEYWORD).await.unwrap();
    assert_eq!(learned.len(), 4);
}

#[tokio::test]
async fn test_approval_learns_nothing_and_can_set_category() {
    let pool = init_memory_database().await.unwrap();
    let ids = seed_catalog(&pool, 1).await;

    let outcome = record_feedback(
        &pool,
        FeedbackInput {
            category: Some("runway".to_string()),
            ..verdict(ids[0], true)
        },
    )
    .await
    .unwrap();

    assert!(outcome.updated_rules.is_empty());
    let stored = catalog::get_entry(&pool, ids[0]).await.unwrap().unwrap();
    assert_eq!(stored.training_status, TrainingStatus::Approved);
    assert_eq!(stored.category, "runway");
}

#[tokio::test]
async fn test_feedback_for_unknown_entry_is_not_found() {
    let pool = init_memory_database().await.unwrap();
    let result = record_feedback(&pool, verdict(42, true)).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}
