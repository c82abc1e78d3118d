//! Typed answer payloads and the canonical autosave operation.
//!
//! Answer maps, objectives and goal scores live in jsonb columns; the shapes
//! below are the application-boundary contract for those columns. Autosave is
//! one operation for every savable field so there is exactly one place that
//! creates the lazily-initialized answer row.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::appraisal::review::ReviewType;
use crate::appraisal::{load_review_context, AppraisalAnswer};
use crate::shared::schema::{appraisal_answers, appraisal_cycles};
use crate::shared::state::AppState;
use crate::shared::utils::{db_conn, viewer_contract_id};

/// One answer to one question, tagged by the question's answer type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Text(String),
    YesNo(bool),
    Scale(i32),
    Multiselect(Vec<String>),
}

impl AnswerValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(t) => t.trim().is_empty(),
            Self::YesNo(_) => false,
            Self::Scale(_) => false,
            Self::Multiselect(options) => options.is_empty(),
        }
    }
}

pub type AnswerMap = BTreeMap<Uuid, AnswerValue>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Object-storage key of the attached file, if any.
    #[serde(default)]
    pub attachment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub weight: Option<u32>,
    #[serde(default)]
    pub goals: Vec<Goal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalScore {
    pub goal_id: Uuid,
    /// 1..=5; zero is treated as "not scored".
    pub score: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

pub type GoalScoreMap = BTreeMap<Uuid, GoalScore>;

pub fn parse_answer_map(value: &Value) -> Result<AnswerMap, String> {
    serde_json::from_value(value.clone()).map_err(|e| format!("malformed answer map: {e}"))
}

pub fn parse_objectives(value: &Value) -> Result<Vec<Objective>, String> {
    serde_json::from_value(value.clone()).map_err(|e| format!("malformed objectives: {e}"))
}

pub fn parse_goal_scores(value: &Value) -> Result<GoalScoreMap, String> {
    serde_json::from_value(value.clone()).map_err(|e| format!("malformed goal scores: {e}"))
}

/// Which column an autosave call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutosaveField {
    Answers,
    ManagerAnswers,
    Objectives,
    EmployeeGoalScores,
    ManagerGoalScores,
    SelfDirectScore,
    ManagerDirectScore,
}

impl AutosaveField {
    pub fn review_type(self) -> ReviewType {
        match self {
            Self::ManagerAnswers | Self::ManagerGoalScores | Self::ManagerDirectScore => {
                ReviewType::Manager
            }
            _ => ReviewType::SelfReview,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AutosaveRequest {
    pub cycle_id: Uuid,
    pub contract_id: Uuid,
    pub field: AutosaveField,
    pub value: Value,
    /// Stale-save guard: a save carrying a revision older than the stored one
    /// is rejected so a network-reordered response cannot clobber newer data.
    pub revision: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AutosaveResponse {
    pub answer_id: Uuid,
    pub revision: i64,
}

fn merge_map_field(current: &Value, incoming: &Value) -> Value {
    let mut merged = match current {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    if let Value::Object(update) = incoming {
        for (k, v) in update {
            merged.insert(k.clone(), v.clone());
        }
    }
    Value::Object(merged)
}

fn validate_field_value(field: AutosaveField, value: &Value) -> Result<(), String> {
    match field {
        AutosaveField::Answers | AutosaveField::ManagerAnswers => {
            parse_answer_map(value).map(|_| ())
        }
        AutosaveField::Objectives => parse_objectives(value).map(|_| ()),
        AutosaveField::EmployeeGoalScores | AutosaveField::ManagerGoalScores => {
            parse_goal_scores(value).map(|_| ())
        }
        AutosaveField::SelfDirectScore | AutosaveField::ManagerDirectScore => {
            match value {
                Value::Null => Ok(()),
                Value::Number(n) if n.is_i64() => Ok(()),
                _ => Err("direct score must be an integer".to_string()),
            }
        }
    }
}

/// Find the answer row for (cycle, contract), creating a draft on first save.
/// `ON CONFLICT DO NOTHING` plus the follow-up select makes rapid concurrent
/// first saves converge on a single row.
pub fn find_or_create_answer(
    conn: &mut PgConnection,
    org_id: Uuid,
    cycle_id: Uuid,
    contract_id: Uuid,
) -> QueryResult<AppraisalAnswer> {
    let now = Utc::now();
    let fresh = AppraisalAnswer {
        id: Uuid::new_v4(),
        org_id,
        cycle_id,
        contract_id,
        status: "draft".to_string(),
        answers: Value::Object(Default::default()),
        manager_answers: Value::Object(Default::default()),
        self_direct_score: None,
        manager_direct_score: None,
        objectives: Value::Array(vec![]),
        employee_goal_scores: Value::Object(Default::default()),
        manager_goal_scores: Value::Object(Default::default()),
        employee_submission_date: None,
        manager_submission_date: None,
        revision: 0,
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(appraisal_answers::table)
        .values(&fresh)
        .on_conflict((appraisal_answers::cycle_id, appraisal_answers::contract_id))
        .do_nothing()
        .execute(conn)?;

    appraisal_answers::table
        .filter(appraisal_answers::cycle_id.eq(cycle_id))
        .filter(appraisal_answers::contract_id.eq(contract_id))
        .first(conn)
}

pub async fn autosave_answer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AutosaveRequest>,
) -> Result<Json<AutosaveResponse>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;

    validate_field_value(req.field, &req.value).map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let review_type = req.field.review_type();
    let (ctx, _cycle) = load_review_context(&mut conn, req.cycle_id, req.contract_id, viewer)?;
    ctx.can_edit(review_type)
        .map_err(|e| (StatusCode::FORBIDDEN, e.to_string()))?;

    let org_id: Uuid = appraisal_cycles::table
        .filter(appraisal_cycles::id.eq(req.cycle_id))
        .select(appraisal_cycles::org_id)
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Appraisal cycle not found".to_string()))?;

    let answer = find_or_create_answer(&mut conn, org_id, req.cycle_id, req.contract_id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    if let Some(revision) = req.revision {
        if revision < answer.revision {
            warn!(
                "stale autosave for answer {} dropped (client revision {revision}, stored {})",
                answer.id, answer.revision
            );
            return Err((
                StatusCode::CONFLICT,
                "a newer save already exists".to_string(),
            ));
        }
    }

    let now = Utc::now();
    let next_revision = answer.revision + 1;
    let target = appraisal_answers::table.filter(appraisal_answers::id.eq(answer.id));

    match req.field {
        AutosaveField::Answers => {
            let merged = merge_map_field(&answer.answers, &req.value);
            diesel::update(target)
                .set((
                    appraisal_answers::answers.eq(merged),
                    appraisal_answers::revision.eq(next_revision),
                    appraisal_answers::updated_at.eq(now),
                ))
                .execute(&mut conn)
        }
        AutosaveField::ManagerAnswers => {
            let merged = merge_map_field(&answer.manager_answers, &req.value);
            diesel::update(target)
                .set((
                    appraisal_answers::manager_answers.eq(merged),
                    appraisal_answers::revision.eq(next_revision),
                    appraisal_answers::updated_at.eq(now),
                ))
                .execute(&mut conn)
        }
        AutosaveField::Objectives => diesel::update(target)
            .set((
                appraisal_answers::objectives.eq(req.value.clone()),
                appraisal_answers::revision.eq(next_revision),
                appraisal_answers::updated_at.eq(now),
            ))
            .execute(&mut conn),
        AutosaveField::EmployeeGoalScores => {
            let merged = merge_map_field(&answer.employee_goal_scores, &req.value);
            diesel::update(target)
                .set((
                    appraisal_answers::employee_goal_scores.eq(merged),
                    appraisal_answers::revision.eq(next_revision),
                    appraisal_answers::updated_at.eq(now),
                ))
                .execute(&mut conn)
        }
        AutosaveField::ManagerGoalScores => {
            let merged = merge_map_field(&answer.manager_goal_scores, &req.value);
            diesel::update(target)
                .set((
                    appraisal_answers::manager_goal_scores.eq(merged),
                    appraisal_answers::revision.eq(next_revision),
                    appraisal_answers::updated_at.eq(now),
                ))
                .execute(&mut conn)
        }
        AutosaveField::SelfDirectScore => {
            let score: Option<i32> = req.value.as_i64().map(|v| v as i32);
            diesel::update(target)
                .set((
                    appraisal_answers::self_direct_score.eq(score),
                    appraisal_answers::revision.eq(next_revision),
                    appraisal_answers::updated_at.eq(now),
                ))
                .execute(&mut conn)
        }
        AutosaveField::ManagerDirectScore => {
            let score: Option<i32> = req.value.as_i64().map(|v| v as i32);
            diesel::update(target)
                .set((
                    appraisal_answers::manager_direct_score.eq(score),
                    appraisal_answers::revision.eq(next_revision),
                    appraisal_answers::updated_at.eq(now),
                ))
                .execute(&mut conn)
        }
    }
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;

    Ok(Json(AutosaveResponse {
        answer_id: answer.id,
        revision: next_revision,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn answer_value_tags_round_trip() {
        let text = json!({"kind": "text", "value": "did well"});
        let parsed: AnswerValue = serde_json::from_value(text).unwrap();
        assert_eq!(parsed, AnswerValue::Text("did well".to_string()));

        let multi = json!({"kind": "multiselect", "value": ["a", "b"]});
        let parsed: AnswerValue = serde_json::from_value(multi).unwrap();
        assert!(!parsed.is_empty());
    }

    #[test]
    fn emptiness_per_answer_kind() {
        assert!(AnswerValue::Text("   ".to_string()).is_empty());
        assert!(!AnswerValue::Text("ok".to_string()).is_empty());
        assert!(!AnswerValue::YesNo(false).is_empty());
        assert!(!AnswerValue::Scale(1).is_empty());
        assert!(AnswerValue::Multiselect(vec![]).is_empty());
    }

    #[test]
    fn map_merge_is_per_key() {
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let current = json!({
            q1.to_string(): {"kind": "text", "value": "old"},
        });
        let incoming = json!({
            q2.to_string(): {"kind": "scale", "value": 4},
        });
        let merged = merge_map_field(&current, &incoming);
        let map = parse_answer_map(&merged).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&q1], AnswerValue::Text("old".to_string()));
        assert_eq!(map[&q2], AnswerValue::Scale(4));
    }

    #[test]
    fn merge_overwrites_existing_key() {
        let q1 = Uuid::new_v4();
        let current = json!({ q1.to_string(): {"kind": "text", "value": "old"} });
        let incoming = json!({ q1.to_string(): {"kind": "text", "value": "new"} });
        let map = parse_answer_map(&merge_map_field(&current, &incoming)).unwrap();
        assert_eq!(map[&q1], AnswerValue::Text("new".to_string()));
    }

    #[test]
    fn field_selects_review_type() {
        assert_eq!(AutosaveField::Answers.review_type(), ReviewType::SelfReview);
        assert_eq!(
            AutosaveField::Objectives.review_type(),
            ReviewType::SelfReview
        );
        assert_eq!(
            AutosaveField::ManagerGoalScores.review_type(),
            ReviewType::Manager
        );
        assert_eq!(
            AutosaveField::ManagerDirectScore.review_type(),
            ReviewType::Manager
        );
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(validate_field_value(AutosaveField::Answers, &json!("nope")).is_err());
        assert!(validate_field_value(AutosaveField::Objectives, &json!({"x": 1})).is_err());
        assert!(
            validate_field_value(AutosaveField::SelfDirectScore, &json!("three")).is_err()
        );
        assert!(validate_field_value(AutosaveField::SelfDirectScore, &json!(3)).is_ok());
        assert!(validate_field_value(
            AutosaveField::Objectives,
            &json!([{"id": Uuid::new_v4(), "title": "Ship v2", "goals": []}])
        )
        .is_ok());
    }
}
