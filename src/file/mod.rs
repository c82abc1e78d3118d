//! Goal attachment storage: uploads land in the org's bucket prefix and are
//! read back through short-lived presigned URLs.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use aws_sdk_s3::presigning::PresigningConfig;
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::appraisal::answers::parse_objectives;
use crate::appraisal::load_answer_by_id;
use crate::shared::schema::appraisal_answers;
use crate::shared::state::AppState;
use crate::shared::utils::{db_conn, viewer_contract_id};

/// Presigned retrieval links expire after a minute.
const SIGNED_URL_TTL: Duration = Duration::from_secs(60);

fn attachment_key(org_id: Uuid, cycle_id: Uuid, goal_id: Uuid, filename: &str) -> String {
    format!("org/{org_id}/appraisals/{cycle_id}/{goal_id}/{filename}")
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub key: String,
}

pub async fn upload_goal_attachment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((answer_id, goal_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<UploadResponse>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let drive = state.drive.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "File storage is not configured".to_string(),
    ))?;

    let mut conn = db_conn(&state.conn)?;
    let answer = load_answer_by_id(&mut conn, answer_id)
        .map_err(|_| (StatusCode::NOT_FOUND, "Answer not found".to_string()))?;

    // Objectives are employee authored; only the employee attaches files.
    if answer.contract_id != viewer {
        return Err((
            StatusCode::FORBIDDEN,
            "only the employee can attach files to their goals".to_string(),
        ));
    }

    let mut objectives = parse_objectives(&answer.objectives)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e))?;
    let goal = objectives
        .iter_mut()
        .flat_map(|o| o.goals.iter_mut())
        .find(|g| g.id == goal_id)
        .ok_or((StatusCode::NOT_FOUND, "Goal not found".to_string()))?;

    let key = attachment_key(answer.org_id, answer.cycle_id, goal_id, &query.filename);

    drive
        .put_object()
        .bucket(&state.config.drive.bucket)
        .key(&key)
        .body(body.to_vec().into())
        .send()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Upload error: {e}")))?;

    goal.attachment = Some(key.clone());
    let now = Utc::now();
    diesel::update(appraisal_answers::table.filter(appraisal_answers::id.eq(answer_id)))
        .set((
            appraisal_answers::objectives.eq(serde_json::json!(objectives)),
            appraisal_answers::revision.eq(answer.revision + 1),
            appraisal_answers::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;

    info!("attachment stored at {key}");
    Ok(Json(UploadResponse { key }))
}

#[derive(Debug, Serialize)]
pub struct AttachmentUrlResponse {
    pub url: String,
    pub expires_in_seconds: u64,
}

pub async fn get_goal_attachment_url(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((answer_id, goal_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<AttachmentUrlResponse>, (StatusCode, String)> {
    viewer_contract_id(&headers)?;
    let drive = state.drive.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "File storage is not configured".to_string(),
    ))?;

    let mut conn = db_conn(&state.conn)?;
    let answer = load_answer_by_id(&mut conn, answer_id)
        .map_err(|_| (StatusCode::NOT_FOUND, "Answer not found".to_string()))?;

    let objectives = parse_objectives(&answer.objectives)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e))?;
    let key = objectives
        .iter()
        .flat_map(|o| o.goals.iter())
        .find(|g| g.id == goal_id)
        .and_then(|g| g.attachment.clone())
        .ok_or((StatusCode::NOT_FOUND, "Goal has no attachment".to_string()))?;

    let presigning = PresigningConfig::expires_in(SIGNED_URL_TTL)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Presign error: {e}")))?;

    let presigned = drive
        .get_object()
        .bucket(&state.config.drive.bucket)
        .key(&key)
        .presigned(presigning)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Presign error: {e}")))?;

    Ok(Json(AttachmentUrlResponse {
        url: presigned.uri().to_string(),
        expires_in_seconds: SIGNED_URL_TTL.as_secs(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_keys_are_scoped_per_goal() {
        let org = Uuid::new_v4();
        let cycle = Uuid::new_v4();
        let goal = Uuid::new_v4();
        let key = attachment_key(org, cycle, goal, "report.pdf");
        assert_eq!(
            key,
            format!("org/{org}/appraisals/{cycle}/{goal}/report.pdf")
        );
    }
}
