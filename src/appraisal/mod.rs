pub mod answers;
pub mod review;
pub mod submit;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::schema::{
    appraisal_answers, appraisal_cycles, contracts, question_templates, template_questions,
};
use crate::shared::state::AppState;
use crate::shared::utils::{db_conn, viewer_contract_id, DbConn};
use review::{ReviewContext, ReviewType};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = appraisal_cycles)]
pub struct AppraisalCycle {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub self_review_due_date: NaiveDate,
    pub manager_review_due_date: NaiveDate,
    pub template_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = question_templates)]
pub struct QuestionTemplate {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    /// Optional display names per question group.
    pub group_names: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = template_questions)]
pub struct TemplateQuestion {
    pub id: Uuid,
    pub template_id: Uuid,
    pub group: String,
    pub position: i32,
    pub self_text: String,
    pub manager_text: String,
    pub answer_type: String,
    pub options: Option<Value>,
    pub required: bool,
    pub team_ids: Option<Value>,
    pub contract_ids: Option<Value>,
    pub scale_labels: Option<Value>,
}

fn uuid_list(value: &Option<Value>) -> Option<Vec<Uuid>> {
    value
        .as_ref()
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

/// Keeps only the answer-map entries whose question the viewer may see.
/// Entries under unknown keys are dropped too.
fn redact_answer_map(map: &Value, visible: &[Uuid]) -> Value {
    match map {
        Value::Object(entries) => Value::Object(
            entries
                .iter()
                .filter(|(key, _)| {
                    Uuid::parse_str(key)
                        .map(|id| visible.contains(&id))
                        .unwrap_or(false)
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        _ => Value::Object(Default::default()),
    }
}

impl TemplateQuestion {
    pub fn gate_question(&self) -> submit::GateQuestion {
        submit::GateQuestion {
            id: self.id,
            group: self.group.clone(),
            required: self.required,
            team_ids: uuid_list(&self.team_ids),
            contract_ids: uuid_list(&self.contract_ids),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = appraisal_answers)]
pub struct AppraisalAnswer {
    pub id: Uuid,
    pub org_id: Uuid,
    pub cycle_id: Uuid,
    pub contract_id: Uuid,
    pub status: String,
    pub answers: Value,
    pub manager_answers: Value,
    pub self_direct_score: Option<i32>,
    pub manager_direct_score: Option<i32>,
    pub objectives: Value,
    pub employee_goal_scores: Value,
    pub manager_goal_scores: Value,
    pub employee_submission_date: Option<DateTime<Utc>>,
    pub manager_submission_date: Option<DateTime<Utc>>,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn load_answer_by_id(conn: &mut DbConn, id: Uuid) -> QueryResult<AppraisalAnswer> {
    appraisal_answers::table
        .filter(appraisal_answers::id.eq(id))
        .first(conn)
}

/// Assembles the rule inputs for one (cycle, employee, viewer) triple. The
/// answer row may not exist yet; its absence just means nothing is submitted.
pub fn load_review_context(
    conn: &mut DbConn,
    cycle_id: Uuid,
    employee_contract_id: Uuid,
    viewer: Uuid,
) -> Result<(ReviewContext, AppraisalCycle), (StatusCode, String)> {
    let cycle: AppraisalCycle = appraisal_cycles::table
        .filter(appraisal_cycles::id.eq(cycle_id))
        .first(conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Appraisal cycle not found".to_string()))?;

    let manager_id: Option<Uuid> = contracts::table
        .filter(contracts::id.eq(employee_contract_id))
        .select(contracts::manager_id)
        .first(conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Contract not found".to_string()))?;

    let answer: Option<AppraisalAnswer> = appraisal_answers::table
        .filter(appraisal_answers::cycle_id.eq(cycle_id))
        .filter(appraisal_answers::contract_id.eq(employee_contract_id))
        .first(conn)
        .optional()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let ctx = ReviewContext {
        viewer_contract_id: viewer,
        employee_contract_id,
        employee_manager_id: manager_id,
        self_review_due_date: cycle.self_review_due_date,
        manager_review_due_date: cycle.manager_review_due_date,
        employee_submission_date: answer.as_ref().and_then(|a| a.employee_submission_date),
        manager_submission_date: answer.as_ref().and_then(|a| a.manager_submission_date),
        today: Utc::now().date_naive(),
    };
    Ok((ctx, cycle))
}

pub fn question_rows_for_template(
    conn: &mut DbConn,
    template_id: Uuid,
) -> Result<Vec<TemplateQuestion>, (StatusCode, String)> {
    template_questions::table
        .filter(template_questions::template_id.eq(template_id))
        .order(template_questions::position.asc())
        .load(conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))
}

fn require_admin(conn: &mut DbConn, viewer: Uuid) -> Result<Uuid, (StatusCode, String)> {
    let (org_id, role): (Uuid, String) = contracts::table
        .filter(contracts::id.eq(viewer))
        .select((contracts::org_id, contracts::role))
        .first(conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Contract not found".to_string()))?;
    if role != "admin" {
        return Err((
            StatusCode::FORBIDDEN,
            "admin role required".to_string(),
        ));
    }
    Ok(org_id)
}

#[derive(Debug, Deserialize)]
pub struct CreateCycleRequest {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub self_review_due_date: NaiveDate,
    pub manager_review_due_date: NaiveDate,
    pub template_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCycleRequest {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub self_review_due_date: Option<NaiveDate>,
    pub manager_review_due_date: Option<NaiveDate>,
}

pub async fn create_cycle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateCycleRequest>,
) -> Result<Json<AppraisalCycle>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;
    let org_id = require_admin(&mut conn, viewer)?;

    let now = Utc::now();
    let cycle = AppraisalCycle {
        id: Uuid::new_v4(),
        org_id,
        name: req.name,
        start_date: req.start_date,
        end_date: req.end_date,
        self_review_due_date: req.self_review_due_date,
        manager_review_due_date: req.manager_review_due_date,
        template_id: req.template_id,
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(appraisal_cycles::table)
        .values(&cycle)
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {e}")))?;

    info!("appraisal cycle '{}' created for org {org_id}", cycle.name);
    crate::email::notify_admins(
        Arc::clone(&state),
        org_id,
        format!("Appraisal cycle created: {}", cycle.name),
        format!(
            "The appraisal cycle '{}' runs {} to {}. Self reviews are due {}, manager reviews {}.",
            cycle.name,
            cycle.start_date,
            cycle.end_date,
            cycle.self_review_due_date,
            cycle.manager_review_due_date
        ),
    );

    Ok(Json(cycle))
}

pub async fn list_cycles(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<AppraisalCycle>>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;

    let org_id: Uuid = contracts::table
        .filter(contracts::id.eq(viewer))
        .select(contracts::org_id)
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Contract not found".to_string()))?;

    let cycles: Vec<AppraisalCycle> = appraisal_cycles::table
        .filter(appraisal_cycles::org_id.eq(org_id))
        .order(appraisal_cycles::start_date.desc())
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(cycles))
}

pub async fn get_cycle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AppraisalCycle>, (StatusCode, String)> {
    let mut conn = db_conn(&state.conn)?;

    let cycle: AppraisalCycle = appraisal_cycles::table
        .filter(appraisal_cycles::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Appraisal cycle not found".to_string()))?;

    Ok(Json(cycle))
}

pub async fn update_cycle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCycleRequest>,
) -> Result<Json<AppraisalCycle>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;
    let org_id = require_admin(&mut conn, viewer)?;

    let now = Utc::now();

    diesel::update(appraisal_cycles::table.filter(appraisal_cycles::id.eq(id)))
        .set(appraisal_cycles::updated_at.eq(now))
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;

    if let Some(name) = req.name {
        diesel::update(appraisal_cycles::table.filter(appraisal_cycles::id.eq(id)))
            .set(appraisal_cycles::name.eq(name))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }
    if let Some(start_date) = req.start_date {
        diesel::update(appraisal_cycles::table.filter(appraisal_cycles::id.eq(id)))
            .set(appraisal_cycles::start_date.eq(start_date))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }
    if let Some(end_date) = req.end_date {
        diesel::update(appraisal_cycles::table.filter(appraisal_cycles::id.eq(id)))
            .set(appraisal_cycles::end_date.eq(end_date))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }
    if let Some(due) = req.self_review_due_date {
        diesel::update(appraisal_cycles::table.filter(appraisal_cycles::id.eq(id)))
            .set(appraisal_cycles::self_review_due_date.eq(due))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }
    if let Some(due) = req.manager_review_due_date {
        diesel::update(appraisal_cycles::table.filter(appraisal_cycles::id.eq(id)))
            .set(appraisal_cycles::manager_review_due_date.eq(due))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }

    let cycle: AppraisalCycle = appraisal_cycles::table
        .filter(appraisal_cycles::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Appraisal cycle not found".to_string()))?;

    crate::email::notify_admins(
        Arc::clone(&state),
        org_id,
        format!("Appraisal cycle updated: {}", cycle.name),
        format!("The appraisal cycle '{}' was updated.", cycle.name),
    );

    Ok(Json(cycle))
}

/// Cycle deletion cascades to its answer rows.
pub async fn delete_cycle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;
    require_admin(&mut conn, viewer)?;

    diesel::delete(appraisal_answers::table.filter(appraisal_answers::cycle_id.eq(id)))
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete error: {e}")))?;

    diesel::delete(appraisal_cycles::table.filter(appraisal_cycles::id.eq(id)))
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete error: {e}")))?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CreateQuestionRequest {
    pub group: String,
    pub self_text: String,
    pub manager_text: String,
    pub answer_type: String,
    pub options: Option<Value>,
    #[serde(default)]
    pub required: bool,
    pub team_ids: Option<Vec<Uuid>>,
    pub contract_ids: Option<Vec<Uuid>>,
    pub scale_labels: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    #[serde(default)]
    pub group_names: Option<Value>,
    pub questions: Vec<CreateQuestionRequest>,
}

#[derive(Debug, Serialize)]
pub struct TemplateWithQuestions {
    pub template: QuestionTemplate,
    pub questions: Vec<TemplateQuestion>,
}

const ANSWER_TYPES: [&str; 4] = ["textarea", "yesno", "scale", "multiselect"];
const QUESTION_GROUPS: [&str; 4] = [
    review::GROUP_GROWTH,
    review::GROUP_VALUES,
    review::GROUP_COMPETENCIES,
    review::GROUP_PRIVATE_MANAGER,
];

pub async fn create_template(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateTemplateRequest>,
) -> Result<Json<TemplateWithQuestions>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;
    let org_id = require_admin(&mut conn, viewer)?;

    for q in &req.questions {
        if !ANSWER_TYPES.contains(&q.answer_type.as_str()) {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("Unknown answer type '{}'", q.answer_type),
            ));
        }
        if !QUESTION_GROUPS.contains(&q.group.as_str()) {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("Unknown question group '{}'", q.group),
            ));
        }
        if q.answer_type == "multiselect"
            && q.options.as_ref().and_then(|o| o.as_array()).map_or(true, |a| a.is_empty())
        {
            return Err((
                StatusCode::BAD_REQUEST,
                "Multiselect questions need options".to_string(),
            ));
        }
    }

    let template = QuestionTemplate {
        id: Uuid::new_v4(),
        org_id,
        name: req.name,
        group_names: req.group_names.unwrap_or_else(|| Value::Object(Default::default())),
        created_at: Utc::now(),
    };

    diesel::insert_into(question_templates::table)
        .values(&template)
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {e}")))?;

    let questions: Vec<TemplateQuestion> = req
        .questions
        .into_iter()
        .enumerate()
        .map(|(i, q)| TemplateQuestion {
            id: Uuid::new_v4(),
            template_id: template.id,
            group: q.group,
            position: i as i32,
            self_text: q.self_text,
            manager_text: q.manager_text,
            answer_type: q.answer_type,
            options: q.options,
            required: q.required,
            team_ids: q.team_ids.map(|v| serde_json::json!(v)),
            contract_ids: q.contract_ids.map(|v| serde_json::json!(v)),
            scale_labels: q.scale_labels,
        })
        .collect();

    diesel::insert_into(template_questions::table)
        .values(&questions)
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {e}")))?;

    Ok(Json(TemplateWithQuestions { template, questions }))
}

pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<QuestionTemplate>>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;

    let org_id: Uuid = contracts::table
        .filter(contracts::id.eq(viewer))
        .select(contracts::org_id)
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Contract not found".to_string()))?;

    let templates: Vec<QuestionTemplate> = question_templates::table
        .filter(question_templates::org_id.eq(org_id))
        .order(question_templates::name.asc())
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(templates))
}

pub async fn get_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TemplateWithQuestions>, (StatusCode, String)> {
    let mut conn = db_conn(&state.conn)?;

    let template: QuestionTemplate = question_templates::table
        .filter(question_templates::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Template not found".to_string()))?;

    let questions = question_rows_for_template(&mut conn, id)?;
    Ok(Json(TemplateWithQuestions { template, questions }))
}

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    pub cycle_id: Uuid,
    pub contract_id: Uuid,
    pub review_type: ReviewType,
}

/// One question as served to a reviewer: the text matching the active flow.
#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: Uuid,
    pub group: String,
    pub text: String,
    pub answer_type: String,
    pub options: Option<Value>,
    pub required: bool,
    pub scale_labels: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ReviewView {
    pub cycle: AppraisalCycle,
    pub questions: Vec<QuestionView>,
    pub answer_id: Option<Uuid>,
    pub revision: Option<i64>,
    pub status: Option<String>,
    pub editable: bool,
    /// Populated only when the viewer may see the respective answer set.
    pub answers: Option<Value>,
    pub self_direct_score: Option<i32>,
    pub manager_answers: Option<Value>,
    pub manager_direct_score: Option<i32>,
    pub objectives: Option<Value>,
    pub employee_goal_scores: Option<Value>,
    pub manager_goal_scores: Option<Value>,
    pub employee_submission_date: Option<DateTime<Utc>>,
    pub manager_submission_date: Option<DateTime<Utc>>,
}

/// Serves a review: the visible questions plus whatever answer sets the
/// viewer is allowed to see under the view rules.
pub async fn get_review(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<ReviewView>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;

    let (ctx, cycle) = load_review_context(&mut conn, query.cycle_id, query.contract_id, viewer)?;

    if !ctx.is_self() && !ctx.is_manager() {
        // Third parties only get past here once something is submitted.
        if !ctx.can_view(ReviewType::SelfReview) && !ctx.can_view(ReviewType::Manager) {
            return Err((
                StatusCode::FORBIDDEN,
                "not allowed to view this review".to_string(),
            ));
        }
    }

    let employee_team_id: Option<Uuid> = contracts::table
        .filter(contracts::id.eq(query.contract_id))
        .select(contracts::team_id)
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Contract not found".to_string()))?;

    let all_questions = question_rows_for_template(&mut conn, cycle.template_id)?;
    let self_visible: Vec<Uuid> = all_questions
        .iter()
        .filter(|q| ctx.group_visible(&q.group, ReviewType::SelfReview))
        .map(|q| q.id)
        .collect();
    let manager_visible: Vec<Uuid> = all_questions
        .iter()
        .filter(|q| ctx.group_visible(&q.group, ReviewType::Manager))
        .map(|q| q.id)
        .collect();

    let questions = all_questions
        .into_iter()
        .filter(|q| ctx.group_visible(&q.group, query.review_type))
        .filter(|q| {
            review::question_targets_employee(
                uuid_list(&q.team_ids).as_deref(),
                uuid_list(&q.contract_ids).as_deref(),
                employee_team_id,
                query.contract_id,
            )
        })
        .map(|q| QuestionView {
            id: q.id,
            group: q.group.clone(),
            text: match query.review_type {
                ReviewType::SelfReview => q.self_text.clone(),
                ReviewType::Manager => q.manager_text.clone(),
            },
            answer_type: q.answer_type,
            options: q.options,
            required: q.required,
            scale_labels: q.scale_labels,
        })
        .collect();

    let answer: Option<AppraisalAnswer> = appraisal_answers::table
        .filter(appraisal_answers::cycle_id.eq(query.cycle_id))
        .filter(appraisal_answers::contract_id.eq(query.contract_id))
        .first(&mut conn)
        .optional()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let editable = ctx.can_edit(query.review_type).is_ok();
    let see_self = ctx.can_view(ReviewType::SelfReview);
    let see_manager = ctx.can_view(ReviewType::Manager);

    let view = ReviewView {
        cycle,
        questions,
        answer_id: answer.as_ref().map(|a| a.id),
        revision: answer.as_ref().map(|a| a.revision),
        status: answer.as_ref().map(|a| a.status.clone()),
        editable,
        answers: answer
            .as_ref()
            .filter(|_| see_self)
            .map(|a| redact_answer_map(&a.answers, &self_visible)),
        self_direct_score: answer
            .as_ref()
            .filter(|_| see_self)
            .and_then(|a| a.self_direct_score),
        manager_answers: answer
            .as_ref()
            .filter(|_| see_manager)
            .map(|a| redact_answer_map(&a.manager_answers, &manager_visible)),
        manager_direct_score: answer
            .as_ref()
            .filter(|_| see_manager)
            .and_then(|a| a.manager_direct_score),
        objectives: answer
            .as_ref()
            .filter(|_| see_self || see_manager)
            .map(|a| a.objectives.clone()),
        employee_goal_scores: answer
            .as_ref()
            .filter(|_| see_self)
            .map(|a| a.employee_goal_scores.clone()),
        manager_goal_scores: answer
            .as_ref()
            .filter(|_| see_manager)
            .map(|a| a.manager_goal_scores.clone()),
        employee_submission_date: answer.as_ref().and_then(|a| a.employee_submission_date),
        manager_submission_date: answer.as_ref().and_then(|a| a.manager_submission_date),
    };

    Ok(Json(view))
}

pub fn configure_appraisal_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/appraisals/cycles", get(list_cycles).post(create_cycle))
        .route(
            "/api/appraisals/cycles/:id",
            get(get_cycle).put(update_cycle).delete(delete_cycle),
        )
        .route(
            "/api/appraisals/templates",
            get(list_templates).post(create_template),
        )
        .route("/api/appraisals/templates/:id", get(get_template))
        .route("/api/appraisals/review", get(get_review))
        .route("/api/appraisals/answers/autosave", post(answers::autosave_answer))
        .route("/api/appraisals/answers/:id/submit", post(submit::submit_review))
        .route(
            "/api/appraisals/answers/:id/goals/:goal_id/attachment",
            get(crate::file::get_goal_attachment_url).put(crate::file::upload_goal_attachment),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_list_decodes_jsonb_arrays() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let value = Some(serde_json::json!([a, b]));
        assert_eq!(uuid_list(&value), Some(vec![a, b]));
        assert_eq!(uuid_list(&None), None);
        assert_eq!(uuid_list(&Some(serde_json::json!("junk"))), None);
    }

    #[test]
    fn served_manager_answers_drop_private_group_for_employee() {
        let employee = Uuid::new_v4();
        let manager = Uuid::new_v4();
        let ctx = ReviewContext {
            viewer_contract_id: employee,
            employee_contract_id: employee,
            employee_manager_id: Some(manager),
            self_review_due_date: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            manager_review_due_date: NaiveDate::from_ymd_opt(2026, 7, 15).unwrap(),
            employee_submission_date: None,
            manager_submission_date: Some(Utc::now()),
            today: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
        };

        let open_q = Uuid::new_v4();
        let private_q = Uuid::new_v4();
        let groups = [
            (open_q, review::GROUP_COMPETENCIES),
            (private_q, review::GROUP_PRIVATE_MANAGER),
        ];
        let stored = serde_json::json!({
            open_q.to_string(): {"kind": "text", "value": "solid quarter"},
            private_q.to_string(): {"kind": "text", "value": "keep confidential"},
        });

        let visible: Vec<Uuid> = groups
            .iter()
            .filter(|(_, group)| ctx.group_visible(group, ReviewType::Manager))
            .map(|(id, _)| *id)
            .collect();
        let served = redact_answer_map(&stored, &visible);
        assert!(served.get(open_q.to_string().as_str()).is_some());
        assert!(served.get(private_q.to_string().as_str()).is_none());

        // the manager keeps the private entry
        let mut manager_ctx = ctx.clone();
        manager_ctx.viewer_contract_id = manager;
        let visible: Vec<Uuid> = groups
            .iter()
            .filter(|(_, group)| manager_ctx.group_visible(group, ReviewType::Manager))
            .map(|(id, _)| *id)
            .collect();
        let served = redact_answer_map(&stored, &visible);
        assert!(served.get(private_q.to_string().as_str()).is_some());
    }

    #[test]
    fn redaction_drops_keys_that_match_no_question() {
        let known = Uuid::new_v4();
        let stored = serde_json::json!({
            known.to_string(): {"kind": "scale", "value": 4},
            "not-a-uuid": {"kind": "text", "value": "junk"},
        });
        let served = redact_answer_map(&stored, &[known]);
        assert!(served.get(known.to_string().as_str()).is_some());
        assert!(served.get("not-a-uuid").is_none());
    }

    #[test]
    fn create_template_request_parses() {
        let json = r#"{
            "name": "Engineering 2026",
            "questions": [{
                "group": "competencies",
                "self_text": "How did you grow this year?",
                "manager_text": "How did they grow this year?",
                "answer_type": "textarea",
                "required": true
            }]
        }"#;
        let req: CreateTemplateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.questions.len(), 1);
        assert!(req.questions[0].required);
    }
}
