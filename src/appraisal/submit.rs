//! Completeness checks that gate setting a submission timestamp.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::appraisal::answers::{AnswerMap, GoalScoreMap, Objective};
use crate::appraisal::review::{ReviewContext, ReviewType};
use crate::appraisal::{load_answer_by_id, load_review_context, question_rows_for_template};
use crate::shared::schema::{appraisal_answers, contracts};
use crate::shared::state::AppState;
use crate::shared::utils::{db_conn, viewer_contract_id};

/// The question facts the gate needs, decoded from the template row.
#[derive(Debug, Clone)]
pub struct GateQuestion {
    pub id: Uuid,
    pub group: String,
    pub required: bool,
    pub team_ids: Option<Vec<Uuid>>,
    pub contract_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitError {
    NoAnswerRow,
    DueDatePassed,
    AlreadySubmitted,
    NotPermitted(String),
    MissingAnswer { question_id: Uuid },
    ObjectiveWithoutGoal { title: String },
    MissingWeight { title: String },
    WeightsNotHundred { total: u32 },
    UnknownGoalScore { goal_id: Uuid },
    UnscoredGoal { title: String },
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAnswerRow => write!(f, "nothing has been saved for this review yet"),
            Self::DueDatePassed => write!(f, "due date passed"),
            Self::AlreadySubmitted => write!(f, "review has already been submitted"),
            Self::NotPermitted(reason) => write!(f, "{reason}"),
            Self::MissingAnswer { question_id } => {
                write!(f, "required question {question_id} has no answer")
            }
            Self::ObjectiveWithoutGoal { title } => {
                write!(f, "objective '{title}' has no goals")
            }
            Self::MissingWeight { title } => {
                write!(f, "objective '{title}' is missing a weight")
            }
            Self::WeightsNotHundred { total } => {
                write!(f, "weights must equal 100 (currently {total})")
            }
            Self::UnknownGoalScore { goal_id } => {
                write!(f, "score refers to unknown goal {goal_id}")
            }
            Self::UnscoredGoal { title } => write!(f, "goal '{title}' has not been scored"),
        }
    }
}

impl SubmitError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotPermitted(_) => StatusCode::FORBIDDEN,
            Self::NoAnswerRow => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

pub struct GateInput<'a> {
    pub review_type: ReviewType,
    pub ctx: &'a ReviewContext,
    pub employee_team_id: Option<Uuid>,
    pub questions: &'a [GateQuestion],
    pub answers: &'a AnswerMap,
    pub manager_answers: &'a AnswerMap,
    pub objectives: &'a [Objective],
    pub employee_goal_scores: &'a GoalScoreMap,
    pub manager_goal_scores: &'a GoalScoreMap,
}

/// Runs the gate checks in order; the first failure is the one reported.
pub fn validate_submission(input: &GateInput<'_>) -> Result<(), SubmitError> {
    let ctx = input.ctx;
    let review_type = input.review_type;

    if ctx.due_date_passed(review_type) {
        return Err(SubmitError::DueDatePassed);
    }
    let already = match review_type {
        ReviewType::SelfReview => ctx.employee_submission_date.is_some(),
        ReviewType::Manager => ctx.manager_submission_date.is_some(),
    };
    if already {
        return Err(SubmitError::AlreadySubmitted);
    }
    match review_type {
        ReviewType::SelfReview if !ctx.is_self() => {
            return Err(SubmitError::NotPermitted(
                "only the employee can submit the self review".to_string(),
            ))
        }
        ReviewType::Manager if !ctx.is_manager() => {
            return Err(SubmitError::NotPermitted(
                "only the employee's manager can submit the manager review".to_string(),
            ))
        }
        _ => {}
    }

    let active_answers = match review_type {
        ReviewType::SelfReview => input.answers,
        ReviewType::Manager => input.manager_answers,
    };

    for q in input.questions {
        if !q.required {
            continue;
        }
        if !ctx.group_visible(&q.group, review_type) {
            continue;
        }
        if !crate::appraisal::review::question_targets_employee(
            q.team_ids.as_deref(),
            q.contract_ids.as_deref(),
            input.employee_team_id,
            ctx.employee_contract_id,
        ) {
            continue;
        }
        match active_answers.get(&q.id) {
            Some(v) if !v.is_empty() => {}
            _ => return Err(SubmitError::MissingAnswer { question_id: q.id }),
        }
    }

    for objective in input.objectives {
        if objective.goals.is_empty() {
            return Err(SubmitError::ObjectiveWithoutGoal {
                title: objective.title.clone(),
            });
        }
    }

    let weighting_enabled = input.objectives.iter().any(|o| o.weight.is_some());
    if weighting_enabled {
        let mut total: u32 = 0;
        for objective in input.objectives {
            match objective.weight {
                Some(w) => total += w,
                None => {
                    return Err(SubmitError::MissingWeight {
                        title: objective.title.clone(),
                    })
                }
            }
        }
        if total != 100 {
            return Err(SubmitError::WeightsNotHundred { total });
        }
    }

    let active_scores = match review_type {
        ReviewType::SelfReview => input.employee_goal_scores,
        ReviewType::Manager => input.manager_goal_scores,
    };

    // Every score must refer to a goal in this answer's objectives.
    for goal_id in active_scores.keys() {
        let known = input
            .objectives
            .iter()
            .flat_map(|o| o.goals.iter())
            .any(|g| g.id == *goal_id);
        if !known {
            return Err(SubmitError::UnknownGoalScore { goal_id: *goal_id });
        }
    }

    for objective in input.objectives {
        for goal in &objective.goals {
            let scored = active_scores
                .get(&goal.id)
                .map(|s| s.score != 0)
                .unwrap_or(false);
            if !scored {
                return Err(SubmitError::UnscoredGoal {
                    title: goal.title.clone(),
                });
            }
        }
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub review_type: ReviewType,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub answer_id: Uuid,
    pub status: String,
}

pub async fn submit_review(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(answer_id): Path<Uuid>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;

    let answer = load_answer_by_id(&mut conn, answer_id)
        .map_err(|_| (StatusCode::NOT_FOUND, SubmitError::NoAnswerRow.to_string()))?;

    let (ctx, cycle) = load_review_context(&mut conn, answer.cycle_id, answer.contract_id, viewer)?;

    let employee_team_id: Option<Uuid> = contracts::table
        .filter(contracts::id.eq(answer.contract_id))
        .select(contracts::team_id)
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Contract not found".to_string()))?;

    let questions = question_rows_for_template(&mut conn, cycle.template_id)?;
    let gate_questions: Vec<GateQuestion> = questions.iter().map(|q| q.gate_question()).collect();

    let answers = crate::appraisal::answers::parse_answer_map(&answer.answers)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e))?;
    let manager_answers = crate::appraisal::answers::parse_answer_map(&answer.manager_answers)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e))?;
    let objectives = crate::appraisal::answers::parse_objectives(&answer.objectives)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e))?;
    let employee_goal_scores =
        crate::appraisal::answers::parse_goal_scores(&answer.employee_goal_scores)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e))?;
    let manager_goal_scores =
        crate::appraisal::answers::parse_goal_scores(&answer.manager_goal_scores)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e))?;

    let input = GateInput {
        review_type: req.review_type,
        ctx: &ctx,
        employee_team_id,
        questions: &gate_questions,
        answers: &answers,
        manager_answers: &manager_answers,
        objectives: &objectives,
        employee_goal_scores: &employee_goal_scores,
        manager_goal_scores: &manager_goal_scores,
    };
    validate_submission(&input).map_err(|e| (e.status(), e.to_string()))?;

    let now = Utc::now();
    let target = appraisal_answers::table.filter(appraisal_answers::id.eq(answer.id));
    let status = match req.review_type {
        ReviewType::SelfReview => {
            diesel::update(target)
                .set((
                    appraisal_answers::employee_submission_date.eq(Some(now)),
                    appraisal_answers::status.eq("submitted"),
                    appraisal_answers::updated_at.eq(now),
                ))
                .execute(&mut conn)
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
            "submitted"
        }
        ReviewType::Manager => {
            diesel::update(target)
                .set((
                    appraisal_answers::manager_submission_date.eq(Some(now)),
                    appraisal_answers::status.eq("manager_reviewed"),
                    appraisal_answers::updated_at.eq(now),
                ))
                .execute(&mut conn)
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
            "manager_reviewed"
        }
    };

    Ok(Json(SubmitResponse {
        answer_id: answer.id,
        status: status.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appraisal::answers::{AnswerValue, Goal, GoalScore};
    use crate::appraisal::review::{GROUP_GROWTH, GROUP_PRIVATE_MANAGER};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    struct Fixture {
        ctx: ReviewContext,
        questions: Vec<GateQuestion>,
        answers: AnswerMap,
        manager_answers: AnswerMap,
        objectives: Vec<Objective>,
        employee_goal_scores: GoalScoreMap,
        manager_goal_scores: GoalScoreMap,
    }

    impl Fixture {
        fn new() -> Self {
            let employee = Uuid::new_v4();
            let manager = Uuid::new_v4();
            Self {
                ctx: ReviewContext {
                    viewer_contract_id: employee,
                    employee_contract_id: employee,
                    employee_manager_id: Some(manager),
                    self_review_due_date: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
                    manager_review_due_date: NaiveDate::from_ymd_opt(2026, 7, 15).unwrap(),
                    employee_submission_date: None,
                    manager_submission_date: None,
                    today: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                },
                questions: vec![],
                answers: BTreeMap::new(),
                manager_answers: BTreeMap::new(),
                objectives: vec![],
                employee_goal_scores: BTreeMap::new(),
                manager_goal_scores: BTreeMap::new(),
            }
        }

        fn validate(&self, review_type: ReviewType) -> Result<(), SubmitError> {
            validate_submission(&GateInput {
                review_type,
                ctx: &self.ctx,
                employee_team_id: None,
                questions: &self.questions,
                answers: &self.answers,
                manager_answers: &self.manager_answers,
                objectives: &self.objectives,
                employee_goal_scores: &self.employee_goal_scores,
                manager_goal_scores: &self.manager_goal_scores,
            })
        }

        fn required_question(&mut self, group: &str) -> Uuid {
            let id = Uuid::new_v4();
            self.questions.push(GateQuestion {
                id,
                group: group.to_string(),
                required: true,
                team_ids: None,
                contract_ids: None,
            });
            id
        }

        fn objective_with_goal(&mut self, weight: Option<u32>) -> Uuid {
            let goal_id = Uuid::new_v4();
            self.objectives.push(Objective {
                id: Uuid::new_v4(),
                title: format!("Objective {}", self.objectives.len() + 1),
                description: None,
                weight,
                goals: vec![Goal {
                    id: goal_id,
                    title: "a goal".to_string(),
                    description: None,
                    attachment: None,
                }],
            });
            goal_id
        }

        fn score_goal(&mut self, goal_id: Uuid, score: i32) {
            self.employee_goal_scores.insert(
                goal_id,
                GoalScore {
                    goal_id,
                    score,
                    comment: None,
                },
            );
        }
    }

    #[test]
    fn empty_review_submits() {
        let f = Fixture::new();
        assert!(f.validate(ReviewType::SelfReview).is_ok());
    }

    #[test]
    fn due_date_blocks_submission() {
        let mut f = Fixture::new();
        f.ctx.today = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        assert_eq!(
            f.validate(ReviewType::SelfReview),
            Err(SubmitError::DueDatePassed)
        );
    }

    #[test]
    fn double_submission_blocked() {
        let mut f = Fixture::new();
        f.ctx.employee_submission_date = Some(Utc::now());
        assert_eq!(
            f.validate(ReviewType::SelfReview),
            Err(SubmitError::AlreadySubmitted)
        );
    }

    #[test]
    fn required_question_must_have_answer() {
        let mut f = Fixture::new();
        let q = f.required_question(GROUP_GROWTH);
        assert_eq!(
            f.validate(ReviewType::SelfReview),
            Err(SubmitError::MissingAnswer { question_id: q })
        );

        f.answers.insert(q, AnswerValue::Text("done".to_string()));
        assert!(f.validate(ReviewType::SelfReview).is_ok());
    }

    #[test]
    fn blank_text_counts_as_missing() {
        let mut f = Fixture::new();
        let q = f.required_question(GROUP_GROWTH);
        f.answers.insert(q, AnswerValue::Text("  ".to_string()));
        assert_eq!(
            f.validate(ReviewType::SelfReview),
            Err(SubmitError::MissingAnswer { question_id: q })
        );
    }

    #[test]
    fn private_manager_group_skipped_in_self_review() {
        let mut f = Fixture::new();
        f.required_question(GROUP_PRIVATE_MANAGER);
        assert!(f.validate(ReviewType::SelfReview).is_ok());
    }

    #[test]
    fn private_manager_group_enforced_for_manager() {
        let mut f = Fixture::new();
        let q = f.required_question(GROUP_PRIVATE_MANAGER);
        f.ctx.viewer_contract_id = f.ctx.employee_manager_id.unwrap();
        assert_eq!(
            f.validate(ReviewType::Manager),
            Err(SubmitError::MissingAnswer { question_id: q })
        );
    }

    #[test]
    fn question_targeted_at_other_team_skipped() {
        let mut f = Fixture::new();
        let id = Uuid::new_v4();
        f.questions.push(GateQuestion {
            id,
            group: GROUP_GROWTH.to_string(),
            required: true,
            team_ids: Some(vec![Uuid::new_v4()]),
            contract_ids: None,
        });
        assert!(f.validate(ReviewType::SelfReview).is_ok());
    }

    #[test]
    fn objective_needs_a_goal() {
        let mut f = Fixture::new();
        f.objectives.push(Objective {
            id: Uuid::new_v4(),
            title: "Empty one".to_string(),
            description: None,
            weight: None,
            goals: vec![],
        });
        assert_eq!(
            f.validate(ReviewType::SelfReview),
            Err(SubmitError::ObjectiveWithoutGoal {
                title: "Empty one".to_string()
            })
        );
    }

    #[test]
    fn weights_must_sum_to_hundred() {
        let mut f = Fixture::new();
        let g1 = f.objective_with_goal(Some(60));
        let g2 = f.objective_with_goal(Some(30));
        f.score_goal(g1, 4);
        f.score_goal(g2, 3);
        assert_eq!(
            f.validate(ReviewType::SelfReview),
            Err(SubmitError::WeightsNotHundred { total: 90 })
        );
    }

    #[test]
    fn one_weighted_objective_forces_all() {
        let mut f = Fixture::new();
        let g1 = f.objective_with_goal(Some(100));
        let g2 = f.objective_with_goal(None);
        f.score_goal(g1, 4);
        f.score_goal(g2, 3);
        assert_eq!(
            f.validate(ReviewType::SelfReview),
            Err(SubmitError::MissingWeight {
                title: "Objective 2".to_string()
            })
        );
    }

    #[test]
    fn weighted_objectives_at_hundred_pass() {
        let mut f = Fixture::new();
        let g1 = f.objective_with_goal(Some(60));
        let g2 = f.objective_with_goal(Some(40));
        f.score_goal(g1, 4);
        f.score_goal(g2, 3);
        assert!(f.validate(ReviewType::SelfReview).is_ok());
    }

    #[test]
    fn unscored_goal_blocks_submission() {
        let mut f = Fixture::new();
        f.objective_with_goal(None);
        assert_eq!(
            f.validate(ReviewType::SelfReview),
            Err(SubmitError::UnscoredGoal {
                title: "a goal".to_string()
            })
        );
    }

    #[test]
    fn zero_score_counts_as_unscored() {
        let mut f = Fixture::new();
        let g = f.objective_with_goal(None);
        f.score_goal(g, 0);
        assert_eq!(
            f.validate(ReviewType::SelfReview),
            Err(SubmitError::UnscoredGoal {
                title: "a goal".to_string()
            })
        );
    }

    #[test]
    fn score_for_unknown_goal_rejected() {
        let mut f = Fixture::new();
        let g = f.objective_with_goal(None);
        f.score_goal(g, 4);
        let stray = Uuid::new_v4();
        f.score_goal(stray, 5);
        assert_eq!(
            f.validate(ReviewType::SelfReview),
            Err(SubmitError::UnknownGoalScore { goal_id: stray })
        );
    }

    #[test]
    fn manager_submission_checks_manager_scores() {
        let mut f = Fixture::new();
        let g = f.objective_with_goal(None);
        f.ctx.viewer_contract_id = f.ctx.employee_manager_id.unwrap();
        // employee scored it but the manager has not
        f.score_goal(g, 4);
        assert_eq!(
            f.validate(ReviewType::Manager),
            Err(SubmitError::UnscoredGoal {
                title: "a goal".to_string()
            })
        );

        f.manager_goal_scores.insert(
            g,
            GoalScore {
                goal_id: g,
                score: 5,
                comment: Some("strong".to_string()),
            },
        );
        assert!(f.validate(ReviewType::Manager).is_ok());
    }

    #[test]
    fn non_manager_cannot_submit_manager_review() {
        let mut f = Fixture::new();
        assert!(matches!(
            f.validate(ReviewType::Manager),
            Err(SubmitError::NotPermitted(_))
        ));
        f.ctx.viewer_contract_id = f.ctx.employee_manager_id.unwrap();
        assert!(f.validate(ReviewType::Manager).is_ok());
    }
}
