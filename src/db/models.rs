use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
    Enterprise,
}

impl Plan {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "free" => Some(Plan::Free),
            "pro" => Some(Plan::Pro),
            "enterprise" => Some(Plan::Enterprise),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::Enterprise => "enterprise",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub plan: Plan,
    pub usage_stats: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Viewer,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "owner" => Some(Role::Owner),
            "admin" => Some(Role::Admin),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Viewer => "viewer",
        }
    }

    /// `true` if this role may mutate tenant resources (admin+ gate).
    pub fn can_mutate(&self) -> bool {
        matches!(self, Role::Admin | Role::Owner)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub tenant_id: i32,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    Group,
    Supergroup,
    Channel,
}

impl GroupType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "group" => Some(GroupType::Group),
            "supergroup" => Some(GroupType::Supergroup),
            "channel" => Some(GroupType::Channel),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Group => "group",
            GroupType::Supergroup => "supergroup",
            GroupType::Channel => "channel",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i32,
    pub tenant_id: i32,
    pub group_id: String,
    pub group_name: String,
    pub group_type: GroupType,
    pub invite_link: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchUser {
    pub id: i32,
    pub tenant_id: i32,
    pub username: String,
    pub user_id: Option<i64>,
    pub full_name: Option<String>,
    pub group_ids: Vec<i32>,
    pub keywords: Vec<String>,
    pub forwarding_destination_ids: Vec<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl WatchUser {
    pub fn normalize_username(raw: &str) -> String {
        raw.trim_start_matches('@').to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationType {
    Channel,
    Group,
    User,
}

impl DestinationType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "channel" => Some(DestinationType::Channel),
            "group" => Some(DestinationType::Group),
            "user" => Some(DestinationType::User),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationType::Channel => "channel",
            DestinationType::Group => "group",
            DestinationType::User => "user",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub id: i32,
    pub tenant_id: i32,
    pub destination_id: String,
    pub destination_name: String,
    pub destination_type: DestinationType,
    pub description: Option<String>,
    pub message_count: i64,
    pub last_forwarded: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Active,
    Inactive,
    Error,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Error => "error",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(AccountStatus::Pending),
            "active" => Some(AccountStatus::Active),
            "inactive" => Some(AccountStatus::Inactive),
            "error" => Some(AccountStatus::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i32,
    pub tenant_id: i32,
    pub name: String,
    pub session_artifact_path: String,
    pub metadata_artifact_path: String,
    pub phone_number: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub status: AccountStatus,
    pub last_error: Option<String>,
    pub assigned_group_ids: Vec<i32>,
    pub created_at: DateTime<Utc>,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Photo,
    Video,
    Document,
    Audio,
    Voice,
    Sticker,
    Other,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Photo => "photo",
            MessageType::Video => "video",
            MessageType::Document => "document",
            MessageType::Audio => "audio",
            MessageType::Voice => "voice",
            MessageType::Sticker => "sticker",
            MessageType::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "text" => Some(MessageType::Text),
            "photo" => Some(MessageType::Photo),
            "video" => Some(MessageType::Video),
            "document" => Some(MessageType::Document),
            "audio" => Some(MessageType::Audio),
            "voice" => Some(MessageType::Voice),
            "sticker" => Some(MessageType::Sticker),
            "other" => Some(MessageType::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestedVia {
    Session,
    Webhook,
}

impl IngestedVia {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestedVia::Session => "session",
            IngestedVia::Webhook => "webhook",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "session" => Some(IngestedVia::Session),
            "webhook" => Some(IngestedVia::Webhook),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageLog {
    pub id: i32,
    pub tenant_id: i32,
    pub group_id: i32,
    pub group_name: String,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub message_id: i64,
    pub message_text: Option<String>,
    pub message_type: MessageType,
    pub media_info: HashMap<String, serde_json::Value>,
    pub matched_keywords: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub ingested_via: IngestedVia,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForwardOutcome {
    Delivered,
    Failed,
}

impl ForwardOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForwardOutcome::Delivered => "delivered",
            ForwardOutcome::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "delivered" => Some(ForwardOutcome::Delivered),
            "failed" => Some(ForwardOutcome::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardedMessage {
    pub id: i32,
    pub tenant_id: i32,
    pub source_message_ref: i32,
    pub username: Option<String>,
    pub group_name: String,
    pub destination_id: i32,
    pub forwarded_at: DateTime<Utc>,
    pub outcome: ForwardOutcome,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotCommand {
    pub id: i32,
    pub tenant_id: Option<i32>,
    pub telegram_user_id: i64,
    pub command: String,
    pub args: String,
    pub timestamp: DateTime<Utc>,
}
