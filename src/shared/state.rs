use crate::config::AppConfig;
use crate::shared::utils::DbPool;
use aws_sdk_s3::Client as S3Client;

#[derive(Clone)]
pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub drive: Option<S3Client>,
}

impl AppState {
    pub fn new(conn: DbPool, config: AppConfig, drive: Option<S3Client>) -> Self {
        Self { conn, config, drive }
    }
}
