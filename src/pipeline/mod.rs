use std::collections::HashMap;

use log::info;

use crate::db::destinations::DestinationRepo;
use crate::db::groups::GroupRepo;
use crate::db::messages::{MessageRepo, NewMessageLog};
use crate::db::models::{IngestedVia, MessageType, WatchUser};
use crate::db::watchlist::WatchlistRepo;
use crate::error::AppResult;
use crate::forwarding::ForwardRequest;

/// a raw event, arriving either from a session client receiver or the bot
/// webhook, normalized before it reaches the pipeline.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub tenant_id: i32,
    pub group_id: i32,
    pub group_name: String,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub message_id: i64,
    pub message_text: Option<String>,
    pub message_type: MessageType,
    pub media_info: HashMap<String, serde_json::Value>,
    pub ingested_via: IngestedVia,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOutcome {
    pub archived: bool,
    pub forward_requests: Vec<ForwardRequest>,
}

/// filter & archive pipeline, shared unchanged by both ingestion paths
/// (session supervisor and bot webhook) per the spec's closing paragraph
/// for this component.
#[derive(Clone)]
pub struct PipelineEngine {
    watchlist: WatchlistRepo,
    messages: MessageRepo,
    groups: GroupRepo,
    destinations: DestinationRepo,
}

impl PipelineEngine {
    pub fn new(
        watchlist: WatchlistRepo,
        messages: MessageRepo,
        groups: GroupRepo,
        destinations: DestinationRepo,
    ) -> Self {
        Self {
            watchlist,
            messages,
            groups,
            destinations,
        }
    }

    pub async fn process(&self, incoming: IncomingMessage) -> AppResult<PipelineOutcome> {
        let Some(username) = incoming.username.as_deref() else {
            return Ok(PipelineOutcome::default());
        };
        let normalized = WatchUser::normalize_username(username);

        let watch_users = self.watchlist.list_active(incoming.tenant_id).await?;
        let candidates: Vec<&WatchUser> = watch_users
            .iter()
            .filter(|w| w.username == normalized)
            .collect();
        if candidates.is_empty() {
            return Ok(PipelineOutcome::default());
        }

        let text_lower = incoming.message_text.as_deref().unwrap_or("").to_lowercase();
        let mut matched: Vec<&WatchUser> = Vec::new();
        let mut matched_keywords: Vec<String> = Vec::new();

        for watch_user in candidates {
            if !watch_user.group_ids.is_empty() && !watch_user.group_ids.contains(&incoming.group_id) {
                continue;
            }
            let keyword_hits: Vec<String> = watch_user
                .keywords
                .iter()
                .filter(|k| text_lower.contains(&k.to_lowercase()))
                .cloned()
                .collect();
            if !watch_user.keywords.is_empty() && keyword_hits.is_empty() {
                continue;
            }
            matched.push(watch_user);
            for kw in keyword_hits {
                if !matched_keywords.contains(&kw) {
                    matched_keywords.push(kw);
                }
            }
        }

        if matched.is_empty() {
            return Ok(PipelineOutcome::default());
        }

        let entry = NewMessageLog {
            tenant_id: incoming.tenant_id,
            group_id: incoming.group_id,
            group_name: &incoming.group_name,
            user_id: incoming.user_id,
            username: Some(username),
            message_id: incoming.message_id,
            message_text: incoming.message_text.as_deref(),
            message_type: incoming.message_type,
            media_info: &incoming.media_info,
            matched_keywords: &matched_keywords,
            ingested_via: incoming.ingested_via,
        };
        let log = self.messages.insert_if_new(entry).await?;

        let Some(log) = log else {
            info!(
                "message_logs duplicate ({}, {}, {}), skipping re-forward",
                incoming.tenant_id, incoming.group_id, incoming.message_id
            );
            return Ok(PipelineOutcome { archived: false, forward_requests: vec![] });
        };

        let mut forward_requests = Vec::new();
        for watch_user in matched {
            for destination_id in &watch_user.forwarding_destination_ids {
                forward_requests.push(ForwardRequest {
                    tenant_id: incoming.tenant_id,
                    source_message_ref: log.id,
                    username: Some(username.to_string()),
                    group_name: incoming.group_name.clone(),
                    destination_id: *destination_id,
                    message_text: incoming.message_text.clone(),
                    timestamp: log.timestamp,
                });
            }
        }

        Ok(PipelineOutcome {
            archived: true,
            forward_requests,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_watch_user(group_ids: Vec<i32>, keywords: Vec<&str>, destinations: Vec<i32>) -> WatchUser {
        WatchUser {
            id: 1,
            tenant_id: 1,
            username: "alice".into(),
            user_id: None,
            full_name: None,
            group_ids,
            keywords: keywords.into_iter().map(String::from).collect(),
            forwarding_destination_ids: destinations,
            is_active: true,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn keyword_match_is_case_insensitive_and_collects_hits() {
        let watch_user = sample_watch_user(vec![1], vec!["btc", "eth"], vec![10]);
        let text = "just bought BTC today".to_lowercase();
        let hits: Vec<String> = watch_user
            .keywords
            .iter()
            .filter(|k| text.contains(&k.to_lowercase()))
            .cloned()
            .collect();
        assert_eq!(hits, vec!["btc".to_string()]);
    }

    #[test]
    fn empty_keywords_matches_everything() {
        let watch_user = sample_watch_user(vec![], vec![], vec![]);
        assert!(watch_user.keywords.is_empty());
    }
}
