use anyhow::Result;
use axum::http::StatusCode;
use serde_json::Value;

mod common;
use common::{harness, send};

#[tokio::test]
async fn health_reports_db_ok_without_a_token() -> Result<()> {
    let h = harness().await?;

    let (status, body) = send(&h, "GET", "/api/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db_ok"].as_bool(), Some(true), "got: {body}");
    assert_eq!(body["db_error"], Value::Null);

    Ok(())
}
