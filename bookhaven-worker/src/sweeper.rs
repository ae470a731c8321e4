/// Expiry sweeper
///
/// Periodically switches off announcements and discounts whose end date has
/// passed, so the catalog stops advertising them.
///
/// # Architecture
///
/// ```text
/// ExpirySweeper (every poll interval)
///   ├─> AnnouncementSweep: is_active = false past end_date
///   └─> DiscountSweep: is_active = on_sale = false past end_date
/// ```
///
/// A failed sweep is logged and retried on the next tick; it never stops the
/// loop.
///
/// # Example
///
/// ```no_run
/// use bookhaven_worker::sweeper::ExpirySweeper;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> anyhow::Result<()> {
/// let sweeper = ExpirySweeper::new(pool);
/// let shutdown = sweeper.shutdown_token();
///
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     shutdown.cancel();
/// });
///
/// sweeper.run().await;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use bookhaven_shared::models::{announcement::Announcement, discount::Discount};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Sweeper configuration
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Time between sweeps
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        SweeperConfig {
            interval: Duration::from_secs(1),
        }
    }
}

/// One kind of record that expires
#[async_trait]
pub trait Sweep: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Deactivates every expired record, returning how many changed.
    async fn sweep(&self) -> Result<u64, sqlx::Error>;
}

pub struct AnnouncementSweep {
    db: PgPool,
}

impl AnnouncementSweep {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Sweep for AnnouncementSweep {
    fn name(&self) -> &'static str {
        "announcements"
    }

    async fn sweep(&self) -> Result<u64, sqlx::Error> {
        Announcement::deactivate_expired(&self.db).await
    }
}

pub struct DiscountSweep {
    db: PgPool,
}

impl DiscountSweep {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Sweep for DiscountSweep {
    fn name(&self) -> &'static str {
        "discounts"
    }

    async fn sweep(&self) -> Result<u64, sqlx::Error> {
        Discount::deactivate_expired(&self.db).await
    }
}

/// Runs every registered sweep on a fixed interval until shut down
pub struct ExpirySweeper {
    sweeps: Vec<Arc<dyn Sweep>>,
    config: SweeperConfig,
    shutdown_token: CancellationToken,
}

impl ExpirySweeper {
    /// Sweeper for announcements and discounts with the default interval
    pub fn new(db: PgPool) -> Self {
        Self::with_config(db, SweeperConfig::default())
    }

    pub fn with_config(db: PgPool, config: SweeperConfig) -> Self {
        Self::with_sweeps(
            vec![
                Arc::new(AnnouncementSweep::new(db.clone())),
                Arc::new(DiscountSweep::new(db)),
            ],
            config,
        )
    }

    pub fn with_sweeps(sweeps: Vec<Arc<dyn Sweep>>, config: SweeperConfig) -> Self {
        ExpirySweeper {
            sweeps,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Gets shutdown token
    ///
    /// Cancelling it stops the loop after the sweep in progress.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs one pass over every sweep. Returns the total records deactivated.
    pub async fn sweep_once(&self) -> u64 {
        let mut total = 0;

        for sweep in &self.sweeps {
            match sweep.sweep().await {
                Ok(0) => {}
                Ok(count) => {
                    tracing::info!(kind = sweep.name(), count, "Deactivated expired records");
                    total += count;
                }
                Err(e) => {
                    tracing::error!(kind = sweep.name(), error = %e, "Expiry sweep failed");
                }
            }
        }

        total
    }

    /// Sweeps on every tick until the shutdown token is cancelled
    pub async fn run(&self) {
        tracing::info!(
            interval_ms = self.config.interval.as_millis() as u64,
            sweeps = self.sweeps.len(),
            "Expiry sweeper starting"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => break,
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
            }
        }

        tracing::info!("Expiry sweeper shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FakeSweep {
        name: &'static str,
        expired: u64,
        fail: bool,
        calls: AtomicU64,
    }

    impl FakeSweep {
        fn new(name: &'static str, expired: u64, fail: bool) -> Arc<Self> {
            Arc::new(FakeSweep {
                name,
                expired,
                fail,
                calls: AtomicU64::new(0),
            })
        }
    }

    #[async_trait]
    impl Sweep for FakeSweep {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn sweep(&self) -> Result<u64, sqlx::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(sqlx::Error::PoolTimedOut);
            }
            Ok(self.expired)
        }
    }

    #[tokio::test]
    async fn test_sweep_once_sums_counts() {
        let announcements = FakeSweep::new("announcements", 2, false);
        let discounts = FakeSweep::new("discounts", 3, false);
        let sweeper = ExpirySweeper::with_sweeps(
            vec![announcements.clone(), discounts.clone()],
            SweeperConfig::default(),
        );

        assert_eq!(sweeper.sweep_once().await, 5);
        assert_eq!(announcements.calls.load(Ordering::SeqCst), 1);
        assert_eq!(discounts.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_sweep_does_not_block_others() {
        let broken = FakeSweep::new("announcements", 0, true);
        let discounts = FakeSweep::new("discounts", 4, false);
        let sweeper = ExpirySweeper::with_sweeps(
            vec![broken.clone(), discounts.clone()],
            SweeperConfig::default(),
        );

        assert_eq!(sweeper.sweep_once().await, 4);
        assert_eq!(discounts.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sweeps_until_cancelled() {
        let sweep = FakeSweep::new("discounts", 1, false);
        let sweeper = Arc::new(ExpirySweeper::with_sweeps(
            vec![sweep.clone()],
            SweeperConfig {
                interval: Duration::from_secs(1),
            },
        ));
        let shutdown = sweeper.shutdown_token();

        let handle = tokio::spawn({
            let sweeper = sweeper.clone();
            async move { sweeper.run().await }
        });

        // First tick fires immediately, then one per second
        tokio::time::sleep(Duration::from_millis(2500)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(sweep.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let sweep = FakeSweep::new("announcements", 0, false);
        let sweeper = ExpirySweeper::with_sweeps(vec![sweep.clone()], SweeperConfig::default());
        sweeper.shutdown_token().cancel();

        sweeper.run().await;
        assert_eq!(sweep.calls.load(Ordering::SeqCst), 0);
    }
}
