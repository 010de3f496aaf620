// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server configuration loaded from environment variables.

use time::UtcOffset;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on.
    pub port: u16,
    /// Postgres connection string.
    pub database_url: String,
    /// Upper bound on pooled database connections.
    pub db_max_connections: u32,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Runtime ids per viewer call, handed to the panel's engine.
    pub color_batch_size: usize,
    /// How long a bulk-delete token waits for its confirmations.
    pub confirmation_ttl_secs: u64,
    /// Allowed CORS origins (comma-separated, or "*" for all in development).
    pub cors_origins: Vec<String>,
    /// Apply bundled migrations at start-up.
    pub run_migrations: bool,
    /// Site offset from UTC, used to map timestamps to calendar days.
    pub site_utc_offset_minutes: i32,
}

fn var_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            port: var_or("PORT", 8080),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/site_progress".into()),
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 5),
            request_timeout_secs: var_or("REQUEST_TIMEOUT_SECS", 30),
            color_batch_size: var_or("COLOR_BATCH_SIZE", site_progress_core::DEFAULT_BATCH_SIZE),
            confirmation_ttl_secs: var_or("CONFIRMATION_TTL_SECS", 120),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| {
                    // Default: allow common development origins
                    "http://localhost:3000,http://localhost:5173,http://127.0.0.1:3000,http://127.0.0.1:5173".into()
                })
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            run_migrations: var_or("RUN_MIGRATIONS", true),
            site_utc_offset_minutes: var_or("SITE_UTC_OFFSET_MINUTES", 0),
        }
    }

    /// Site offset; out-of-range values fall back to UTC.
    pub fn site_utc_offset(&self) -> UtcOffset {
        UtcOffset::from_whole_seconds(self.site_utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|_| {
            tracing::warn!(
                minutes = self.site_utc_offset_minutes,
                "SITE_UTC_OFFSET_MINUTES out of range, using UTC"
            );
            UtcOffset::UTC
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(minutes: i32) -> Config {
        Config {
            site_utc_offset_minutes: minutes,
            ..Config::from_env()
        }
    }

    #[test]
    fn offset_in_minutes() {
        assert_eq!(config(120).site_utc_offset().whole_hours(), 2);
        assert_eq!(config(-330).site_utc_offset().whole_minutes(), -330);
    }

    #[test]
    fn absurd_offset_falls_back_to_utc() {
        assert_eq!(config(100_000).site_utc_offset(), UtcOffset::UTC);
    }
}
