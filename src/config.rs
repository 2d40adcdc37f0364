use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_connect_timeout_secs: u64,
    pub db_schema_timeout_secs: u64,
    pub db_read_timeout_secs: u64,
    pub db_write_timeout_secs: u64,
    pub log_level: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
        let db_name = env::var("DB_DATABASE").unwrap_or_else(|_| "process_db".to_string());
        let db_user = env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string());
        let db_pwd = env::var("DB_PWD").unwrap_or_else(|_| "postgres".to_string());
        let db_sslmode = env::var("DB_SSLMODE").unwrap_or_else(|_| "disable".to_string());

        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            db_user, db_pwd, db_host, db_port, db_name, db_sslmode
        );

        let db_connect_timeout_secs = secs_var("DB_CONNECT_TIMEOUT_SECS", 5);
        let db_schema_timeout_secs = secs_var("DB_SCHEMA_TIMEOUT_SECS", 5);
        let db_read_timeout_secs = secs_var("DB_READ_TIMEOUT_SECS", 10);
        let db_write_timeout_secs = secs_var("DB_WRITE_TIMEOUT_SECS", 50);

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            db_connect_timeout_secs,
            db_schema_timeout_secs,
            db_read_timeout_secs,
            db_write_timeout_secs,
            log_level,
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.db_connect_timeout_secs)
    }

    pub fn schema_timeout(&self) -> Duration {
        Duration::from_secs(self.db_schema_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.db_read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.db_write_timeout_secs)
    }
}

fn secs_var(key: &str, default: u64) -> u64 {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or(default)
}
