//! MySQL client and connection management

use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};

use crate::StoreResult;

/// Pool sizing for the write path.
///
/// Ingestion is bursty: a handful of connections absorbs a polling burst,
/// and a generous acquire timeout rides out short server stalls instead of
/// failing the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle on the observation database. Cheap to clone; clones share the
/// underlying pool.
#[derive(Clone)]
pub struct DbClient {
    pool: MySqlPool,
}

impl DbClient {
    /// Connect from a connection string with default pool settings.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        Self::connect_with(database_url, PoolSettings::default()).await
    }

    pub async fn connect_with(database_url: &str, settings: PoolSettings) -> StoreResult<Self> {
        let pool = pool_options(settings).connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Connect from component-wise options, for credentials that do not
    /// embed cleanly in a URL.
    pub async fn connect_opts(
        opts: MySqlConnectOptions,
        settings: PoolSettings,
    ) -> StoreResult<Self> {
        let pool = pool_options(settings).connect_with(opts).await?;
        Ok(Self { pool })
    }

    /// The underlying pool, for statements the store does not wrap.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Round-trip a trivial statement to prove the connection.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool gracefully.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn pool_options(settings: PoolSettings) -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
}

/// Component-wise connection setup for callers without a URL.
pub struct ConnectionBuilder {
    opts: MySqlConnectOptions,
    settings: PoolSettings,
}

impl ConnectionBuilder {
    pub fn new(database: &str) -> Self {
        Self {
            opts: MySqlConnectOptions::new()
                .host("localhost")
                .port(3306)
                .username("stratus")
                .database(database),
            settings: PoolSettings::default(),
        }
    }

    pub fn host(mut self, host: &str) -> Self {
        self.opts = self.opts.host(host);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.opts = self.opts.port(port);
        self
    }

    pub fn username(mut self, username: &str) -> Self {
        self.opts = self.opts.username(username);
        self
    }

    pub fn password(mut self, password: &str) -> Self {
        self.opts = self.opts.password(password);
        self
    }

    pub fn pool(mut self, settings: PoolSettings) -> Self {
        self.settings = settings;
        self
    }

    pub async fn connect(self) -> StoreResult<DbClient> {
        DbClient::connect_opts(self.opts, self.settings).await
    }
}
