//! Concurrent submission tests
//!
//! Shortcode uniqueness is checked and claimed under one lock, so racing
//! submissions for the same custom shortcode must yield exactly one link.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use rand::RngExt;
use serde_json::Value;
use shortlinks::api;
use shortlinks::config::Config;
use shortlinks::models::LinkEntryRequest;
use shortlinks::storage::{EntryField, ErrorKind, SharedStore, SubmitError};
use std::collections::HashSet;
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn test_concurrent_same_custom_shortcode() {
    let store = SharedStore::default();
    let app = api::create_api_router(store.clone(), Arc::new(Config::default()));

    let mut handles = vec![];
    for i in 0..10 {
        let app_clone = app.clone();
        handles.push(tokio::spawn(async move {
            let request = Request::builder()
                .method("POST")
                .uri("/links")
                .header("content-type", "application/json")
                .body(Body::from(format!(
                    r#"[{{"originalUrl": "https://example.com/{i}", "customShortcode": "race1"}}]"#
                )))
                .unwrap();
            app_clone.oneshot(request).await.unwrap()
        }));
    }

    let mut success_count = 0;
    let mut taken_count = 0;
    for handle in handles {
        let response = handle.await.unwrap();
        match response.status() {
            StatusCode::CREATED => success_count += 1,
            StatusCode::BAD_REQUEST => {
                let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                    .await
                    .unwrap();
                let json: Value = serde_json::from_slice(&body).unwrap();
                assert_eq!(json["errors"]["0"]["customShortcode"], "shortcode_taken");
                taken_count += 1;
            }
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(success_count, 1, "Exactly one creation should succeed");
    assert_eq!(taken_count, 9, "All others should see the shortcode taken");
    assert_eq!(store.list(None, Utc::now()).await.len(), 1);
}

#[tokio::test]
async fn test_concurrent_generated_shortcodes_are_unique() {
    let store = SharedStore::default();

    let mut handles = vec![];
    for i in 0..40 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let jitter = rand::rng().random_range(0..250);
            tokio::time::sleep(tokio::time::Duration::from_micros(jitter)).await;
            store
                .submit(
                    vec![
                        LinkEntryRequest::new(format!("https://example.com/{i}/a")),
                        LinkEntryRequest::new(format!("https://example.com/{i}/b")),
                    ],
                    Utc::now(),
                )
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().len(), 2);
    }

    let links = store.list(None, Utc::now()).await;
    assert_eq!(links.len(), 80);
    let codes: HashSet<_> = links.iter().map(|link| link.shortcode().to_string()).collect();
    let ids: HashSet<_> = links.iter().map(|link| link.id()).collect();
    assert_eq!(codes.len(), 80);
    assert_eq!(ids.len(), 80);
}

#[tokio::test]
async fn test_repeated_submission_never_duplicates_live_shortcode() {
    let store = SharedStore::default();

    for attempt in 0..5 {
        let result = store
            .submit(
                vec![LinkEntryRequest::new("https://example.com").with_shortcode("solo1")],
                Utc::now(),
            )
            .await;

        if attempt == 0 {
            assert!(result.is_ok());
        } else {
            match result {
                Err(SubmitError::Rejected(rejection)) => assert_eq!(
                    rejection.errors.get(0, EntryField::CustomShortcode),
                    Some(ErrorKind::ShortcodeTaken)
                ),
                other => panic!("expected shortcode_taken, got {other:?}"),
            }
        }
    }

    assert_eq!(store.list(None, Utc::now()).await.len(), 1);
}
