use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use tokio::sync::Mutex;
use tokio::time::interval;

use crate::db::accounts::AccountRepo;
use crate::db::models::AccountStatus;
use crate::supervisor::SupervisorHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct AccountHeartbeat {
    pub connected: bool,
    pub last_event_at: Instant,
    pub reconnect_count_in_window: u32,
    pub queue_depth: usize,
}

impl Default for AccountHeartbeat {
    fn default() -> Self {
        Self {
            connected: false,
            last_event_at: Instant::now(),
            reconnect_count_in_window: 0,
            queue_depth: 0,
        }
    }
}

/// shared registry the client supervisor writes heartbeats into and the
/// health monitor reads from on each tick.
pub type HeartbeatRegistry = Arc<Mutex<HashMap<i32, AccountHeartbeat>>>;

const STALE_AFTER: Duration = Duration::from_secs(120);
const FAILED_RECONNECTS: u32 = 3;

fn classify(heartbeat: &AccountHeartbeat) -> HealthStatus {
    if !heartbeat.connected && heartbeat.reconnect_count_in_window >= FAILED_RECONNECTS {
        return HealthStatus::Failed;
    }
    if !heartbeat.connected {
        return HealthStatus::Degraded;
    }
    if heartbeat.last_event_at.elapsed() > STALE_AFTER || heartbeat.queue_depth > 100 {
        return HealthStatus::Degraded;
    }
    HealthStatus::Healthy
}

/// runs on a fixed cadence; reclassifies every active account and restarts
/// any that have gone `Failed`.
pub async fn run(
    registry: HeartbeatRegistry,
    account_repo: AccountRepo,
    handle: SupervisorHandle,
    tick: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = interval(tick);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("health monitor shutting down");
                    return;
                }
            }
        }

        let snapshot: Vec<(i32, HealthStatus)> = {
            let guard = registry.lock().await;
            guard.iter().map(|(id, hb)| (*id, classify(hb))).collect()
        };

        for (account_id, status) in snapshot {
            match status {
                HealthStatus::Failed => {
                    warn!("account {account_id} classified failed, restarting");
                    if let Err(e) = account_repo
                        .update_status(account_id, AccountStatus::Error, Some("health monitor: repeated reconnect failures"))
                        .await
                    {
                        warn!("failed to record account {account_id} error status: {e}");
                    }
                    handle.stop_account(account_id);
                    handle.start_account(account_id);
                }
                HealthStatus::Degraded => {
                    info!("account {account_id} degraded");
                }
                HealthStatus::Healthy => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_recent_heartbeat_is_healthy() {
        let hb = AccountHeartbeat {
            connected: true,
            last_event_at: Instant::now(),
            reconnect_count_in_window: 0,
            queue_depth: 0,
        };
        assert_eq!(classify(&hb), HealthStatus::Healthy);
    }

    #[test]
    fn disconnected_with_few_reconnects_is_degraded() {
        let hb = AccountHeartbeat {
            connected: false,
            reconnect_count_in_window: 1,
            ..Default::default()
        };
        assert_eq!(classify(&hb), HealthStatus::Degraded);
    }

    #[test]
    fn disconnected_with_many_reconnects_is_failed() {
        let hb = AccountHeartbeat {
            connected: false,
            reconnect_count_in_window: FAILED_RECONNECTS,
            ..Default::default()
        };
        assert_eq!(classify(&hb), HealthStatus::Failed);
    }
}
