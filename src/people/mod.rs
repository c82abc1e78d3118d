//! Contracts (the employee identity) and teams.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::schema::{contracts, teams};
use crate::shared::state::AppState;
use crate::shared::utils::{db_conn, viewer_contract_id};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = contracts)]
pub struct Contract {
    pub id: Uuid,
    pub org_id: Uuid,
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub email: Option<String>,
    pub job_title: Option<String>,
    pub team_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    pub role: String,
    pub birthday: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = teams)]
pub struct Team {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

const ROLES: [&str; 3] = ["admin", "manager", "employee"];

#[derive(Debug, Deserialize)]
pub struct CreateContractRequest {
    pub full_name: String,
    pub email: Option<String>,
    pub job_title: Option<String>,
    pub team_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    #[serde(default)]
    pub role: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContractRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub job_title: Option<String>,
    pub team_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ContractListQuery {
    pub team_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn viewer_org(
    conn: &mut crate::shared::utils::DbConn,
    viewer: Uuid,
) -> Result<Uuid, (StatusCode, String)> {
    contracts::table
        .filter(contracts::id.eq(viewer))
        .select(contracts::org_id)
        .first(conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Contract not found".to_string()))
}

pub async fn create_contract(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateContractRequest>,
) -> Result<Json<Contract>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;
    let org_id = viewer_org(&mut conn, viewer)?;

    let role = req.role.unwrap_or_else(|| "employee".to_string());
    if !ROLES.contains(&role.as_str()) {
        return Err((StatusCode::BAD_REQUEST, format!("Unknown role '{role}'")));
    }

    let now = Utc::now();
    let contract = Contract {
        id: Uuid::new_v4(),
        org_id,
        user_id: None,
        full_name: req.full_name,
        email: req.email,
        job_title: req.job_title,
        team_id: req.team_id,
        manager_id: req.manager_id,
        role,
        birthday: req.birthday,
        start_date: req.start_date,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(contracts::table)
        .values(&contract)
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {e}")))?;

    Ok(Json(contract))
}

pub async fn list_contracts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ContractListQuery>,
) -> Result<Json<Vec<Contract>>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;
    let org_id = viewer_org(&mut conn, viewer)?;

    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let mut q = contracts::table
        .filter(contracts::org_id.eq(org_id))
        .into_boxed();

    if let Some(team_id) = query.team_id {
        q = q.filter(contracts::team_id.eq(team_id));
    }
    if let Some(manager_id) = query.manager_id {
        q = q.filter(contracts::manager_id.eq(manager_id));
    }
    if let Some(is_active) = query.is_active {
        q = q.filter(contracts::is_active.eq(is_active));
    }

    let rows: Vec<Contract> = q
        .order(contracts::full_name.asc())
        .limit(limit)
        .offset(offset)
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(rows))
}

pub async fn get_contract(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Contract>, (StatusCode, String)> {
    let mut conn = db_conn(&state.conn)?;

    let contract: Contract = contracts::table
        .filter(contracts::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Contract not found".to_string()))?;

    Ok(Json(contract))
}

pub async fn update_contract(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateContractRequest>,
) -> Result<Json<Contract>, (StatusCode, String)> {
    let mut conn = db_conn(&state.conn)?;

    if let Some(ref role) = req.role {
        if !ROLES.contains(&role.as_str()) {
            return Err((StatusCode::BAD_REQUEST, format!("Unknown role '{role}'")));
        }
    }

    let now = Utc::now();
    diesel::update(contracts::table.filter(contracts::id.eq(id)))
        .set(contracts::updated_at.eq(now))
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;

    if let Some(full_name) = req.full_name {
        diesel::update(contracts::table.filter(contracts::id.eq(id)))
            .set(contracts::full_name.eq(full_name))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }
    if let Some(email) = req.email {
        diesel::update(contracts::table.filter(contracts::id.eq(id)))
            .set(contracts::email.eq(email))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }
    if let Some(job_title) = req.job_title {
        diesel::update(contracts::table.filter(contracts::id.eq(id)))
            .set(contracts::job_title.eq(job_title))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }
    if let Some(team_id) = req.team_id {
        diesel::update(contracts::table.filter(contracts::id.eq(id)))
            .set(contracts::team_id.eq(Some(team_id)))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }
    if let Some(manager_id) = req.manager_id {
        diesel::update(contracts::table.filter(contracts::id.eq(id)))
            .set(contracts::manager_id.eq(Some(manager_id)))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }
    if let Some(role) = req.role {
        diesel::update(contracts::table.filter(contracts::id.eq(id)))
            .set(contracts::role.eq(role))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }
    if let Some(is_active) = req.is_active {
        diesel::update(contracts::table.filter(contracts::id.eq(id)))
            .set(contracts::is_active.eq(is_active))
            .execute(&mut conn)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;
    }

    let contract: Contract = contracts::table
        .filter(contracts::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Contract not found".to_string()))?;

    Ok(Json(contract))
}

pub async fn get_direct_reports(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Contract>>, (StatusCode, String)> {
    let mut conn = db_conn(&state.conn)?;

    let reports: Vec<Contract> = contracts::table
        .filter(contracts::manager_id.eq(id))
        .filter(contracts::is_active.eq(true))
        .order(contracts::full_name.asc())
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(reports))
}

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
}

pub async fn create_team(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateTeamRequest>,
) -> Result<Json<Team>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;
    let org_id = viewer_org(&mut conn, viewer)?;

    let team = Team {
        id: Uuid::new_v4(),
        org_id,
        name: req.name,
        created_at: Utc::now(),
    };

    diesel::insert_into(teams::table)
        .values(&team)
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {e}")))?;

    Ok(Json(team))
}

pub async fn list_teams(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Team>>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;
    let org_id = viewer_org(&mut conn, viewer)?;

    let rows: Vec<Team> = teams::table
        .filter(teams::org_id.eq(org_id))
        .order(teams::name.asc())
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(rows))
}

pub fn configure_people_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/contracts", get(list_contracts).post(create_contract))
        .route(
            "/api/contracts/:id",
            get(get_contract).put(update_contract),
        )
        .route("/api/contracts/:id/reports", get(get_direct_reports))
        .route("/api/teams", get(list_teams).post(create_team))
}
