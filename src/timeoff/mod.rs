//! Leave requests with a sequential multi-level approval chain and
//! per-type day balances.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use diesel::prelude::*;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::schema::{contracts, leave_balances, time_off};
use crate::shared::state::AppState;
use crate::shared::utils::{db_conn, viewer_contract_id};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = time_off)]
pub struct TimeOff {
    pub id: Uuid,
    pub org_id: Uuid,
    pub contract_id: Uuid,
    pub leave_type: String,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    /// Ordered approval chain, snapshotted at request creation.
    pub approvals: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = leave_balances)]
pub struct LeaveBalance {
    pub id: Uuid,
    pub org_id: Uuid,
    pub contract_id: Uuid,
    pub leave_type: String,
    pub year: i32,
    pub allotment: BigDecimal,
    pub used: BigDecimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverRole {
    Admin,
    Manager,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelStatus {
    Pending,
    Approved,
    Denied,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalLevel {
    pub role: ApproverRole,
    pub status: LevelStatus,
    pub acted_by: Option<Uuid>,
    pub acted_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl ApprovalLevel {
    fn pending(role: ApproverRole) -> Self {
        Self {
            role,
            status: LevelStatus::Pending,
            acted_by: None,
            acted_at: None,
            note: None,
        }
    }
}

/// What the handler established about the acting user before touching the
/// chain; keeps the traversal itself pure.
#[derive(Debug, Clone, Copy)]
pub struct LevelActor {
    pub contract_id: Uuid,
    pub is_admin: bool,
    pub is_requesters_manager: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    StillPending,
    FullyApproved,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    NoSuchLevel,
    NotCurrentLevel,
    AlreadyResolved,
    WrongRole(ApproverRole),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchLevel => write!(f, "no such approval level"),
            Self::NotCurrentLevel => write!(f, "earlier level has not approved"),
            Self::AlreadyResolved => write!(f, "request has already been resolved"),
            Self::WrongRole(role) => {
                let name = match role {
                    ApproverRole::Admin => "an admin",
                    ApproverRole::Manager => "the requester's manager",
                };
                write!(f, "this level must be acted on by {name}")
            }
        }
    }
}

/// Records one approve/deny on the chain. The current level is the first
/// entry that is not yet approved; acting on any other index is an error, so
/// a later level can never move before an earlier one.
pub fn apply_level_action(
    chain: &mut [ApprovalLevel],
    index: usize,
    actor: LevelActor,
    approve: bool,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<ChainOutcome, ChainError> {
    if chain.iter().any(|l| l.status == LevelStatus::Denied) {
        return Err(ChainError::AlreadyResolved);
    }
    let current = chain
        .iter()
        .position(|l| l.status != LevelStatus::Approved)
        .ok_or(ChainError::AlreadyResolved)?;
    let level = chain.get(index).ok_or(ChainError::NoSuchLevel)?;
    if index != current {
        return Err(ChainError::NotCurrentLevel);
    }

    let role_ok = match level.role {
        ApproverRole::Admin => actor.is_admin,
        ApproverRole::Manager => actor.is_requesters_manager,
    };
    if !role_ok {
        return Err(ChainError::WrongRole(level.role));
    }

    let level = &mut chain[index];
    level.status = if approve {
        LevelStatus::Approved
    } else {
        LevelStatus::Denied
    };
    level.acted_by = Some(actor.contract_id);
    level.acted_at = Some(now);
    level.note = note;

    if !approve {
        return Ok(ChainOutcome::Denied);
    }
    if chain.iter().all(|l| l.status == LevelStatus::Approved) {
        Ok(ChainOutcome::FullyApproved)
    } else {
        Ok(ChainOutcome::StillPending)
    }
}

/// Weekdays between the two dates, both endpoints included.
pub fn business_days(from: NaiveDate, to: NaiveDate) -> i64 {
    if to < from {
        return 0;
    }
    let mut days = 0;
    let mut day = from;
    while day <= to {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days += 1;
        }
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    days
}

const DEFAULT_APPROVAL_CHAIN: [ApproverRole; 2] = [ApproverRole::Manager, ApproverRole::Admin];

#[derive(Debug, Deserialize)]
pub struct CreateTimeOffRequest {
    pub contract_id: Uuid,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    /// Defaults to manager-then-admin when absent.
    pub approval_chain: Option<Vec<ApproverRole>>,
}

pub async fn create_time_off(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateTimeOffRequest>,
) -> Result<Json<TimeOff>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;

    if req.end_date < req.start_date {
        return Err((
            StatusCode::BAD_REQUEST,
            "end_date before start_date".to_string(),
        ));
    }
    if viewer != req.contract_id {
        return Err((
            StatusCode::FORBIDDEN,
            "leave can only be requested for yourself".to_string(),
        ));
    }

    let org_id: Uuid = contracts::table
        .filter(contracts::id.eq(req.contract_id))
        .select(contracts::org_id)
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Contract not found".to_string()))?;

    let roles = req
        .approval_chain
        .unwrap_or_else(|| DEFAULT_APPROVAL_CHAIN.to_vec());
    if roles.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "approval chain cannot be empty".to_string(),
        ));
    }
    let chain: Vec<ApprovalLevel> = roles.into_iter().map(ApprovalLevel::pending).collect();

    let now = Utc::now();
    let request = TimeOff {
        id: Uuid::new_v4(),
        org_id,
        contract_id: req.contract_id,
        leave_type: req.leave_type,
        status: "pending".to_string(),
        start_date: req.start_date,
        end_date: req.end_date,
        reason: req.reason,
        approvals: serde_json::json!(chain),
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(time_off::table)
        .values(&request)
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {e}")))?;

    Ok(Json(request))
}

#[derive(Debug, Deserialize)]
pub struct TimeOffListQuery {
    pub contract_id: Option<Uuid>,
    pub status: Option<String>,
}

pub async fn list_time_off(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<TimeOffListQuery>,
) -> Result<Json<Vec<TimeOff>>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;

    let org_id: Uuid = contracts::table
        .filter(contracts::id.eq(viewer))
        .select(contracts::org_id)
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Contract not found".to_string()))?;

    let mut q = time_off::table
        .filter(time_off::org_id.eq(org_id))
        .into_boxed();
    if let Some(contract_id) = query.contract_id {
        q = q.filter(time_off::contract_id.eq(contract_id));
    }
    if let Some(status) = query.status {
        q = q.filter(time_off::status.eq(status));
    }

    let requests: Vec<TimeOff> = q
        .order(time_off::start_date.desc())
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(requests))
}

#[derive(Debug, Deserialize)]
pub struct LevelActionRequest {
    pub approve: bool,
    pub note: Option<String>,
}

fn parse_chain(value: &Value) -> Result<Vec<ApprovalLevel>, (StatusCode, String)> {
    serde_json::from_value(value.clone()).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("malformed approval chain: {e}"),
        )
    })
}

fn credit_used_days(
    conn: &mut PgConnection,
    org_id: Uuid,
    contract_id: Uuid,
    leave_type: &str,
    year: i32,
    days: i64,
) -> QueryResult<()> {
    let existing: Option<LeaveBalance> = leave_balances::table
        .filter(leave_balances::contract_id.eq(contract_id))
        .filter(leave_balances::leave_type.eq(leave_type))
        .filter(leave_balances::year.eq(year))
        .first(conn)
        .optional()?;

    match existing {
        Some(balance) => {
            diesel::update(leave_balances::table.filter(leave_balances::id.eq(balance.id)))
                .set(leave_balances::used.eq(balance.used + BigDecimal::from(days)))
                .execute(conn)?;
        }
        None => {
            warn!(
                "no {leave_type} balance row for contract {contract_id} year {year}; creating one"
            );
            let balance = LeaveBalance {
                id: Uuid::new_v4(),
                org_id,
                contract_id,
                leave_type: leave_type.to_string(),
                year,
                allotment: BigDecimal::from(0),
                used: BigDecimal::from(days),
            };
            diesel::insert_into(leave_balances::table)
                .values(&balance)
                .execute(conn)?;
        }
    }
    Ok(())
}

fn resolved_status(outcome: ChainOutcome) -> &'static str {
    match outcome {
        ChainOutcome::StillPending => "pending",
        ChainOutcome::FullyApproved => "approved",
        ChainOutcome::Denied => "denied",
    }
}

pub async fn act_on_level(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(req): Json<LevelActionRequest>,
) -> Result<Json<TimeOff>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;

    let request: TimeOff = time_off::table
        .filter(time_off::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Time off request not found".to_string()))?;

    if request.status != "pending" {
        return Err((
            StatusCode::BAD_REQUEST,
            "request has already been resolved".to_string(),
        ));
    }

    let (viewer_role, _viewer_org): (String, Uuid) = contracts::table
        .filter(contracts::id.eq(viewer))
        .select((contracts::role, contracts::org_id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Contract not found".to_string()))?;

    let requester_manager: Option<Uuid> = contracts::table
        .filter(contracts::id.eq(request.contract_id))
        .select(contracts::manager_id)
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Contract not found".to_string()))?;

    let actor = LevelActor {
        contract_id: viewer,
        is_admin: viewer_role == "admin",
        is_requesters_manager: requester_manager == Some(viewer),
    };

    let mut chain = parse_chain(&request.approvals)?;
    let now = Utc::now();
    let outcome = apply_level_action(&mut chain, index, actor, req.approve, req.note, now)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let status = resolved_status(outcome);
    let days = business_days(request.start_date, request.end_date);

    // Status change and balance credit land together or not at all.
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::update(time_off::table.filter(time_off::id.eq(id)))
            .set((
                time_off::approvals.eq(serde_json::json!(chain)),
                time_off::status.eq(status),
                time_off::updated_at.eq(now),
            ))
            .execute(conn)?;

        if outcome == ChainOutcome::FullyApproved {
            credit_used_days(
                conn,
                request.org_id,
                request.contract_id,
                &request.leave_type,
                request.start_date.year(),
                days,
            )?;
        }
        Ok(())
    })
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;

    if outcome == ChainOutcome::FullyApproved {
        info!(
            "time off {id} fully approved; {days} {} day(s) deducted for contract {}",
            request.leave_type, request.contract_id
        );
    }

    let updated: TimeOff = time_off::table
        .filter(time_off::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Time off request not found".to_string()))?;

    Ok(Json(updated))
}

pub async fn cancel_time_off(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<TimeOff>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;

    let request: TimeOff = time_off::table
        .filter(time_off::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Time off request not found".to_string()))?;

    if request.contract_id != viewer {
        return Err((
            StatusCode::FORBIDDEN,
            "only the requester can cancel".to_string(),
        ));
    }
    if request.status != "pending" {
        return Err((
            StatusCode::BAD_REQUEST,
            "only pending requests can be cancelled".to_string(),
        ));
    }

    let now = Utc::now();
    diesel::update(time_off::table.filter(time_off::id.eq(id)))
        .set((time_off::status.eq("cancelled"), time_off::updated_at.eq(now)))
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;

    let updated: TimeOff = time_off::table
        .filter(time_off::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Time off request not found".to_string()))?;

    Ok(Json(updated))
}

#[derive(Debug, Serialize)]
pub struct BalanceView {
    pub leave_type: String,
    pub year: i32,
    pub allotment: BigDecimal,
    pub used: BigDecimal,
    /// Business days requested but not yet fully approved. Shown alongside
    /// the balance; never deducted from it.
    pub pending_days: i64,
}

pub async fn get_balances(
    State(state): State<Arc<AppState>>,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<Vec<BalanceView>>, (StatusCode, String)> {
    let mut conn = db_conn(&state.conn)?;

    let balances: Vec<LeaveBalance> = leave_balances::table
        .filter(leave_balances::contract_id.eq(contract_id))
        .order((leave_balances::year.desc(), leave_balances::leave_type.asc()))
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let pending: Vec<TimeOff> = time_off::table
        .filter(time_off::contract_id.eq(contract_id))
        .filter(time_off::status.eq("pending"))
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let views = balances
        .into_iter()
        .map(|b| {
            let pending_days = pending
                .iter()
                .filter(|r| r.leave_type == b.leave_type && r.start_date.year() == b.year)
                .map(|r| business_days(r.start_date, r.end_date))
                .sum();
            BalanceView {
                leave_type: b.leave_type,
                year: b.year,
                allotment: b.allotment,
                used: b.used,
                pending_days,
            }
        })
        .collect();

    Ok(Json(views))
}

#[derive(Debug, Deserialize)]
pub struct SetBalanceRequest {
    pub contract_id: Uuid,
    pub leave_type: String,
    pub year: i32,
    pub allotment: BigDecimal,
}

/// Admin-set yearly allotment, upserted per (contract, type, year).
pub async fn set_balance(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SetBalanceRequest>,
) -> Result<Json<LeaveBalance>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;

    let (role, org_id): (String, Uuid) = contracts::table
        .filter(contracts::id.eq(viewer))
        .select((contracts::role, contracts::org_id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Contract not found".to_string()))?;
    if role != "admin" {
        return Err((StatusCode::FORBIDDEN, "admin role required".to_string()));
    }

    let existing: Option<LeaveBalance> = leave_balances::table
        .filter(leave_balances::contract_id.eq(req.contract_id))
        .filter(leave_balances::leave_type.eq(&req.leave_type))
        .filter(leave_balances::year.eq(req.year))
        .first(&mut conn)
        .optional()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let balance = match existing {
        Some(mut balance) => {
            diesel::update(leave_balances::table.filter(leave_balances::id.eq(balance.id)))
                .set(leave_balances::allotment.eq(&req.allotment))
                .execute(&mut conn)
                .map_err(|e| {
                    (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}"))
                })?;
            balance.allotment = req.allotment;
            balance
        }
        None => {
            let balance = LeaveBalance {
                id: Uuid::new_v4(),
                org_id,
                contract_id: req.contract_id,
                leave_type: req.leave_type,
                year: req.year,
                allotment: req.allotment,
                used: BigDecimal::from(0),
            };
            diesel::insert_into(leave_balances::table)
                .values(&balance)
                .execute(&mut conn)
                .map_err(|e| {
                    (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {e}"))
                })?;
            balance
        }
    };

    Ok(Json(balance))
}

pub fn configure_timeoff_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/timeoff", get(list_time_off).post(create_time_off))
        .route("/api/timeoff/:id/levels/:index", put(act_on_level))
        .route("/api/timeoff/:id/cancel", put(cancel_time_off))
        .route("/api/timeoff/balances", post(set_balance))
        .route("/api/timeoff/balances/:contract_id", get(get_balances))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(roles: &[ApproverRole]) -> Vec<ApprovalLevel> {
        roles.iter().copied().map(ApprovalLevel::pending).collect()
    }

    fn manager_actor() -> LevelActor {
        LevelActor {
            contract_id: Uuid::new_v4(),
            is_admin: false,
            is_requesters_manager: true,
        }
    }

    fn admin_actor() -> LevelActor {
        LevelActor {
            contract_id: Uuid::new_v4(),
            is_admin: true,
            is_requesters_manager: false,
        }
    }

    #[test]
    fn business_days_mon_to_fri_is_five() {
        // 2026-06-01 is a Monday
        let mon = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let fri = NaiveDate::from_ymd_opt(2026, 6, 5).unwrap();
        assert_eq!(business_days(mon, fri), 5);
    }

    #[test]
    fn business_days_skip_weekends() {
        let mon = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let next_mon = NaiveDate::from_ymd_opt(2026, 6, 8).unwrap();
        assert_eq!(business_days(mon, next_mon), 6);

        let sat = NaiveDate::from_ymd_opt(2026, 6, 6).unwrap();
        let sun = NaiveDate::from_ymd_opt(2026, 6, 7).unwrap();
        assert_eq!(business_days(sat, sun), 0);
    }

    #[test]
    fn business_days_single_day() {
        let wed = NaiveDate::from_ymd_opt(2026, 6, 3).unwrap();
        assert_eq!(business_days(wed, wed), 1);
    }

    #[test]
    fn reversed_range_is_zero() {
        let mon = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let fri = NaiveDate::from_ymd_opt(2026, 6, 5).unwrap();
        assert_eq!(business_days(fri, mon), 0);
    }

    #[test]
    fn two_level_chain_happy_path() {
        let mut c = chain(&[ApproverRole::Manager, ApproverRole::Admin]);
        let now = Utc::now();

        let outcome =
            apply_level_action(&mut c, 0, manager_actor(), true, None, now).unwrap();
        assert_eq!(outcome, ChainOutcome::StillPending);
        assert_eq!(c[0].status, LevelStatus::Approved);
        assert_eq!(c[1].status, LevelStatus::Pending);

        let outcome = apply_level_action(&mut c, 1, admin_actor(), true, None, now).unwrap();
        assert_eq!(outcome, ChainOutcome::FullyApproved);
    }

    #[test]
    fn later_level_cannot_act_first() {
        let mut c = chain(&[ApproverRole::Manager, ApproverRole::Admin]);
        let err = apply_level_action(&mut c, 1, admin_actor(), true, None, Utc::now());
        assert_eq!(err, Err(ChainError::NotCurrentLevel));
        assert_eq!(c[1].status, LevelStatus::Pending);
    }

    #[test]
    fn denial_halts_the_chain() {
        let mut c = chain(&[ApproverRole::Manager, ApproverRole::Admin]);
        let now = Utc::now();
        let outcome = apply_level_action(
            &mut c,
            0,
            manager_actor(),
            false,
            Some("coverage gap".to_string()),
            now,
        )
        .unwrap();
        assert_eq!(outcome, ChainOutcome::Denied);
        assert_eq!(c[0].status, LevelStatus::Denied);

        let err = apply_level_action(&mut c, 1, admin_actor(), true, None, now);
        assert_eq!(err, Err(ChainError::AlreadyResolved));
    }

    #[test]
    fn wrong_role_is_rejected() {
        let mut c = chain(&[ApproverRole::Manager, ApproverRole::Admin]);
        let err = apply_level_action(&mut c, 0, admin_actor(), true, None, Utc::now());
        assert_eq!(err, Err(ChainError::WrongRole(ApproverRole::Manager)));
    }

    #[test]
    fn approved_level_cannot_be_acted_on_again() {
        let mut c = chain(&[ApproverRole::Manager, ApproverRole::Admin]);
        let now = Utc::now();
        apply_level_action(&mut c, 0, manager_actor(), true, None, now).unwrap();
        let err = apply_level_action(&mut c, 0, manager_actor(), true, None, now);
        assert_eq!(err, Err(ChainError::NotCurrentLevel));
    }

    #[test]
    fn single_level_chain_approves_outright() {
        let mut c = chain(&[ApproverRole::Admin]);
        let outcome =
            apply_level_action(&mut c, 0, admin_actor(), true, None, Utc::now()).unwrap();
        assert_eq!(outcome, ChainOutcome::FullyApproved);
    }

    #[test]
    fn only_full_approval_resolves_to_approved() {
        assert_eq!(resolved_status(ChainOutcome::StillPending), "pending");
        assert_eq!(resolved_status(ChainOutcome::FullyApproved), "approved");
        assert_eq!(resolved_status(ChainOutcome::Denied), "denied");
    }

    #[test]
    fn chain_round_trips_through_json() {
        let c = chain(&[ApproverRole::Manager, ApproverRole::Admin]);
        let value = serde_json::json!(c);
        let back: Vec<ApprovalLevel> = serde_json::from_value(value).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].role, ApproverRole::Manager);
        assert_eq!(back[0].status, LevelStatus::Pending);
    }
}
