use anyhow::{Context, Result};
use axum::http::{HeaderMap, StatusCode};
use chrono::NaiveDate;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::PgConnection;
use uuid::Uuid;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<PgConnection>>;

pub fn create_pool(database_url: &str) -> Result<DbPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(10)
        .build(manager)
        .context("failed to create database pool")
}

pub fn db_conn(pool: &DbPool) -> Result<DbConn, (StatusCode, String)> {
    pool.get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))
}

/// The authenticated caller's contract id, forwarded by the auth proxy.
pub fn viewer_contract_id(headers: &HeaderMap) -> Result<Uuid, (StatusCode, String)> {
    let raw = headers
        .get("x-contract-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                "Missing x-contract-id header".to_string(),
            )
        })?;

    Uuid::parse_str(raw).map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            "Invalid x-contract-id header".to_string(),
        )
    })
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate, (StatusCode, String)> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| (StatusCode::BAD_REQUEST, format!("Invalid {field}")))
}
