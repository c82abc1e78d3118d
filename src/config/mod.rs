use std::env;

#[derive(Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub mail: MailConfig,
    pub drive: DriveConfig,
    pub calendar_api_base: Option<String>,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub username: String,
    pub password: String,
    pub server: String,
    pub port: u32,
    pub database: String,
}

#[derive(Clone)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

#[derive(Clone)]
pub struct DriveConfig {
    pub bucket: String,
    pub enabled: bool,
}

fn get_str(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database = DatabaseConfig {
            username: get_str("TABLES_USERNAME", "hruser"),
            password: get_str("TABLES_PASSWORD", ""),
            server: get_str("TABLES_SERVER", "localhost"),
            port: env::var("TABLES_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5432),
            database: get_str("TABLES_DATABASE", "hrserver"),
        };

        let server = ServerConfig {
            host: get_str("SERVER_HOST", "0.0.0.0"),
            port: env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
        };

        let mail = MailConfig {
            server: get_str("SMTP_SERVER", "localhost"),
            port: env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            username: get_str("SMTP_USERNAME", ""),
            password: get_str("SMTP_PASSWORD", ""),
            from_address: get_str("SMTP_FROM", "hr@localhost"),
        };

        let bucket = get_str("DRIVE_BUCKET", "");
        let drive = DriveConfig {
            enabled: !bucket.is_empty(),
            bucket,
        };

        let calendar_api_base = env::var("CALENDAR_API_BASE").ok().filter(|v| !v.is_empty());

        Self {
            server,
            database,
            mail,
            drive,
            calendar_api_base,
        }
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.database.username,
            self.database.password,
            self.database.server,
            self.database.port,
            self.database.database
        )
    }
}
