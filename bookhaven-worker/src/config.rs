/// Worker configuration, read from environment variables
///
/// - `DATABASE_URL` (required)
/// - `DATABASE_MAX_CONNECTIONS` (default 2)
/// - `SWEEP_INTERVAL_SECS` (default 1)

use std::env;

use bookhaven_shared::db::pool::DatabaseConfig;
use tokio::time::Duration;

use crate::sweeper::SweeperConfig;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database: DatabaseConfig,
    pub sweeper: SweeperConfig,
}

impl WorkerConfig {
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a number fails to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "2".to_string())
            .parse::<u32>()?;
        let interval_secs = parse_interval(&env::var("SWEEP_INTERVAL_SECS").unwrap_or_else(|_| "1".to_string()))?;

        Ok(Self {
            database: DatabaseConfig {
                url,
                max_connections,
                ..DatabaseConfig::default()
            },
            sweeper: SweeperConfig {
                interval: Duration::from_secs(interval_secs),
            },
        })
    }
}

fn parse_interval(raw: &str) -> anyhow::Result<u64> {
    let secs = raw.trim().parse::<u64>()?;
    if secs == 0 {
        anyhow::bail!("SWEEP_INTERVAL_SECS must be at least 1");
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("5").unwrap(), 5);
        assert_eq!(parse_interval(" 30 ").unwrap(), 30);
        assert!(parse_interval("0").is_err());
        assert!(parse_interval("soon").is_err());
    }
}
