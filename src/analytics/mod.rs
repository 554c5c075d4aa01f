use chrono::Utc;
use deadpool_postgres::Pool;
use serde::Serialize;

use crate::error::AppResult;

#[derive(Debug, Clone, Serialize)]
pub struct TopUser {
    pub username: String,
    pub message_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageTypeCount {
    pub message_type: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopDestination {
    pub destination_name: String,
    pub message_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentForward {
    pub username: Option<String>,
    pub group_name: String,
    pub destination_id: i32,
    pub outcome: String,
    pub forwarded_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total_groups: i64,
    pub total_watchlist_users: i64,
    pub total_destinations: i64,
    pub total_messages: i64,
    pub messages_today: i64,
    pub total_forwarded: i64,
    pub forwarding_success_rate: f64,
    pub forwarded_today: i64,
    pub top_users: Vec<TopUser>,
    pub message_types: Vec<MessageTypeCount>,
    pub top_destinations: Vec<TopDestination>,
    pub recent_forwards: Vec<RecentForward>,
}

const TOP_N: i64 = 5;
const RECENT_N: i64 = 20;

/// on-demand rollups over the archive and forwarding ledger, scoped by
/// `tenant_id` like every other repository.
#[derive(Clone)]
pub struct AnalyticsAggregator {
    pool: Pool,
}

impl AnalyticsAggregator {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn compute(&self, tenant_id: i32) -> AppResult<Stats> {
        let client = self.pool.get().await?;
        let today_start = Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();

        let total_groups: i64 = client
            .query_one(
                "SELECT COUNT(*) FROM groups WHERE tenant_id = $1 AND is_active = TRUE",
                &[&tenant_id],
            )
            .await?
            .get(0);

        let total_watchlist_users: i64 = client
            .query_one(
                "SELECT COUNT(*) FROM watch_users WHERE tenant_id = $1 AND is_active = TRUE",
                &[&tenant_id],
            )
            .await?
            .get(0);

        let total_destinations: i64 = client
            .query_one(
                "SELECT COUNT(*) FROM destinations WHERE tenant_id = $1 AND is_active = TRUE",
                &[&tenant_id],
            )
            .await?
            .get(0);

        let total_messages: i64 = client
            .query_one("SELECT COUNT(*) FROM message_logs WHERE tenant_id = $1", &[&tenant_id])
            .await?
            .get(0);

        let messages_today: i64 = client
            .query_one(
                "SELECT COUNT(*) FROM message_logs WHERE tenant_id = $1 AND timestamp >= $2",
                &[&tenant_id, &today_start],
            )
            .await?
            .get(0);

        let total_forwarded: i64 = client
            .query_one(
                "SELECT COUNT(*) FROM forwarded_messages WHERE tenant_id = $1",
                &[&tenant_id],
            )
            .await?
            .get(0);

        let delivered: i64 = client
            .query_one(
                "SELECT COUNT(*) FROM forwarded_messages WHERE tenant_id = $1 AND outcome = 'delivered'",
                &[&tenant_id],
            )
            .await?
            .get(0);

        let forwarded_today: i64 = client
            .query_one(
                "SELECT COUNT(*) FROM forwarded_messages WHERE tenant_id = $1 AND forwarded_at >= $2",
                &[&tenant_id, &today_start],
            )
            .await?
            .get(0);

        let forwarding_success_rate = if total_forwarded > 0 {
            delivered as f64 / total_forwarded as f64
        } else {
            0.0
        };

        let top_users = client
            .query(
                "SELECT username, COUNT(*) AS message_count
                 FROM message_logs
                 WHERE tenant_id = $1 AND username IS NOT NULL
                 GROUP BY username
                 ORDER BY message_count DESC
                 LIMIT $2",
                &[&tenant_id, &TOP_N],
            )
            .await?
            .iter()
            .map(|row| TopUser {
                username: row.get("username"),
                message_count: row.get("message_count"),
            })
            .collect();

        let message_types = client
            .query(
                "SELECT message_type, COUNT(*) AS count
                 FROM message_logs
                 WHERE tenant_id = $1
                 GROUP BY message_type
                 ORDER BY count DESC",
                &[&tenant_id],
            )
            .await?
            .iter()
            .map(|row| MessageTypeCount {
                message_type: row.get("message_type"),
                count: row.get("count"),
            })
            .collect();

        let top_destinations = client
            .query(
                "SELECT destination_name, message_count
                 FROM destinations
                 WHERE tenant_id = $1
                 ORDER BY message_count DESC
                 LIMIT $2",
                &[&tenant_id, &TOP_N],
            )
            .await?
            .iter()
            .map(|row| TopDestination {
                destination_name: row.get("destination_name"),
                message_count: row.get("message_count"),
            })
            .collect();

        let recent_forwards = client
            .query(
                "SELECT username, group_name, destination_id, outcome, forwarded_at
                 FROM forwarded_messages
                 WHERE tenant_id = $1
                 ORDER BY forwarded_at DESC
                 LIMIT $2",
                &[&tenant_id, &RECENT_N],
            )
            .await?
            .iter()
            .map(|row| RecentForward {
                username: row.get("username"),
                group_name: row.get("group_name"),
                destination_id: row.get("destination_id"),
                outcome: row.get("outcome"),
                forwarded_at: row.get("forwarded_at"),
            })
            .collect();

        Ok(Stats {
            total_groups,
            total_watchlist_users,
            total_destinations,
            total_messages,
            messages_today,
            total_forwarded,
            forwarding_success_rate,
            forwarded_today,
            top_users,
            message_types,
            top_destinations,
            recent_forwards,
        })
    }
}
