//! MySQL client and connection management

use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::MySql;

use creditai_config::DatabaseConfig;

use crate::error::StoreError;

/// MySQL configuration
#[derive(Clone)]
pub struct MySqlConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl std::fmt::Debug for MySqlConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl TryFrom<&DatabaseConfig> for MySqlConfig {
    type Error = StoreError;

    fn try_from(config: &DatabaseConfig) -> Result<Self, Self::Error> {
        let password = config
            .password
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| StoreError::Configuration("database password is not set".to_string()))?;

        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            user: config.user.clone(),
            password,
            database: config.database.clone(),
            max_connections: config.max_connections,
            acquire_timeout: Duration::from_secs(config.acquire_timeout_seconds),
        })
    }
}

/// MySQL pool wrapper
#[derive(Clone)]
pub struct MySqlClient {
    pool: MySqlPool,
    database: String,
}

impl MySqlClient {
    /// Create a pool that opens connections on first use
    pub fn connect_lazy(config: MySqlConfig) -> Self {
        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            max_connections = config.max_connections,
            "Configuring MySQL pool"
        );

        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_lazy_with(options);

        Self {
            pool,
            database: config.database,
        }
    }

    /// Acquire one pooled connection
    ///
    /// The connection returns to the pool when the guard is dropped.
    pub async fn acquire(&self) -> Result<PoolConnection<MySql>, StoreError> {
        self.pool.acquire().await.map_err(|e| {
            tracing::error!(database = %self.database, error = %e, "Failed to acquire MySQL connection");
            StoreError::Connection(e.to_string())
        })
    }

    /// Round-trip a trivial query
    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.acquire().await?;
        sqlx::query("SELECT 1").execute(&mut *conn).await?;
        Ok(())
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_requires_password() {
        let mut settings = DatabaseConfig::default();
        assert!(matches!(
            MySqlConfig::try_from(&settings),
            Err(StoreError::Configuration(_))
        ));

        settings.password = Some("s3cret".to_string());
        let config = MySqlConfig::try_from(&settings).unwrap();
        assert_eq!(config.port, 3306);
        assert_eq!(config.acquire_timeout, Duration::from_secs(10));
        assert!(!format!("{:?}", config).contains("s3cret"));
    }
}
