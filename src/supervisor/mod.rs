pub mod health_monitor;
pub mod load_balancer;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use grammers_client::types::{Media, Message};
use grammers_client::{Client, Config as GrammersConfig, InitParams, Update};
use grammers_session::Session;
use log::{error, info, warn};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::db::accounts::AccountRepo;
use crate::db::groups::GroupRepo;
use crate::db::models::{AccountStatus, IngestedVia, MessageType};
use crate::forwarding::ForwardingEngine;
use crate::pipeline::{IncomingMessage, PipelineEngine};
use crate::supervisor::health_monitor::{AccountHeartbeat, HeartbeatRegistry};

const RECONNECT_SCHEDULE_SECS: [u64; 5] = [1, 2, 5, 15, 60];
const MAX_CONSECUTIVE_FAILURES: u32 = 8;

/// one running receiver actor, plus the state the load balancer and health
/// monitor need to reach into without restarting it.
struct RunningAccount {
    assigned_groups: Arc<Mutex<HashSet<i32>>>,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// everything a freshly spawned account actor needs to read/write tenant
/// state, shared by every account regardless of tenant.
#[derive(Clone)]
struct SupervisorDeps {
    accounts: AccountRepo,
    groups: GroupRepo,
    pipeline: PipelineEngine,
    forwarding: Arc<ForwardingEngine>,
    heartbeats: HeartbeatRegistry,
    tg_api_id: i32,
    tg_api_hash: String,
}

/// owns the lifecycle of every active account's receiver, one actor per
/// account, each wrapping a single long-lived `Client`.
#[derive(Clone)]
pub struct SupervisorHandle {
    deps: SupervisorDeps,
    running: Arc<Mutex<HashMap<i32, RunningAccount>>>,
    shutdown: watch::Receiver<bool>,
}

impl SupervisorHandle {
    pub fn new(
        accounts: AccountRepo,
        groups: GroupRepo,
        pipeline: PipelineEngine,
        forwarding: Arc<ForwardingEngine>,
        heartbeats: HeartbeatRegistry,
        tg_api_id: i32,
        tg_api_hash: String,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            deps: SupervisorDeps {
                accounts,
                groups,
                pipeline,
                forwarding,
                heartbeats,
                tg_api_id,
                tg_api_hash,
            },
            running: Arc::new(Mutex::new(HashMap::new())),
            shutdown,
        }
    }

    /// starts a receiver for every account already `active` in the store;
    /// called once at process start so restarts reconstruct runtime state
    /// from persisted accounts rather than an in-memory cache.
    pub async fn bootstrap(&self) {
        match self.deps.accounts.list_all_active().await {
            Ok(accounts) => {
                for account in accounts {
                    if account.status == AccountStatus::Active {
                        self.start_account(account.id);
                    }
                }
            }
            Err(e) => error!("supervisor bootstrap: failed to list active accounts: {e}"),
        }
    }

    /// spawns (or restarts) the receiver for `account_id`. Fire-and-forget:
    /// the account row lookup, session load and connect all happen inside
    /// the spawned task so callers (health monitor, HTTP handlers) never
    /// block on Telegram I/O.
    pub fn start_account(&self, account_id: i32) {
        let deps = self.deps.clone();
        let running = self.running.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            {
                let existing = running.lock().await;
                if existing.contains_key(&account_id) {
                    return;
                }
            }

            let account = match deps.accounts.get_by_id(account_id).await {
                Ok(a) => a,
                Err(e) => {
                    error!("cannot start account {account_id}: {e}");
                    return;
                }
            };

            let assigned_groups = Arc::new(Mutex::new(
                account.assigned_group_ids.iter().copied().collect::<HashSet<i32>>(),
            ));
            let (stop_tx, stop_rx) = watch::channel(false);

            let task_deps = deps.clone();
            let task_assigned = assigned_groups.clone();
            let task = tokio::spawn(async move {
                run_account_receiver(account.id, account.tenant_id, account.session_artifact_path.clone(), task_deps, task_assigned, stop_rx, shutdown).await;
            });

            running.lock().await.insert(
                account_id,
                RunningAccount {
                    assigned_groups,
                    stop_tx,
                    task,
                },
            );
        });
    }

    /// signals the receiver to stop and drops its handle; does not wait for
    /// it to exit, matching the fire-and-forget shape of `start_account`.
    pub fn stop_account(&self, account_id: i32) {
        let running = self.running.clone();
        tokio::spawn(async move {
            if let Some(account) = running.lock().await.remove(&account_id) {
                let _ = account.stop_tx.send(true);
                account.task.abort();
            }
        });
    }

    /// updates the live group assignment for a running account without
    /// restarting its receiver.
    pub async fn reassign(&self, account_id: i32, group_ids: HashSet<i32>) {
        let running = self.running.lock().await;
        if let Some(account) = running.get(&account_id) {
            *account.assigned_groups.lock().await = group_ids;
        }
    }

    /// recomputes the tenant's group→account assignment after a group or
    /// account roster change, persists it, and pushes the new filter set to
    /// every already-running receiver without restarting it.
    pub async fn rebalance(&self, tenant_id: i32) {
        let groups = match self.deps.groups.list(tenant_id).await {
            Ok(g) => g.into_iter().filter(|g| g.is_active).collect::<Vec<_>>(),
            Err(e) => {
                error!("rebalance: failed to list groups for tenant {tenant_id}: {e}");
                return;
            }
        };
        let accounts = match self.deps.accounts.list(tenant_id).await {
            Ok(a) => a
                .into_iter()
                .filter(|a| a.status == AccountStatus::Active)
                .collect::<Vec<_>>(),
            Err(e) => {
                error!("rebalance: failed to list accounts for tenant {tenant_id}: {e}");
                return;
            }
        };

        let assignment = load_balancer::assign(&groups, &accounts);

        let mut by_account: HashMap<i32, Vec<i32>> = accounts.iter().map(|a| (a.id, Vec::new())).collect();
        for (group_id, account_id) in &assignment {
            by_account.entry(*account_id).or_default().push(*group_id);
        }

        for (account_id, mut group_ids) in by_account {
            group_ids.sort_unstable();
            if let Err(e) = self.deps.accounts.assign_groups(tenant_id, account_id, &group_ids).await {
                error!("rebalance: failed to persist assignment for account {account_id}: {e}");
                continue;
            }
            self.reassign(account_id, group_ids.into_iter().collect()).await;
        }
    }
}

async fn run_account_receiver(
    account_id: i32,
    tenant_id: i32,
    session_path: String,
    deps: SupervisorDeps,
    assigned_groups: Arc<Mutex<HashSet<i32>>>,
    mut stop_rx: watch::Receiver<bool>,
    mut shutdown: watch::Receiver<bool>,
) {
    let session = match Session::load_file(&session_path) {
        Ok(s) => s,
        Err(e) => {
            error!("account {account_id}: invalid session artifact, not retrying: {e}");
            let _ = deps
                .accounts
                .update_status(account_id, AccountStatus::Error, Some("invalid session artifact"))
                .await;
            return;
        }
    };

    let mut consecutive_failures = 0u32;
    let mut client_session = Some(session);

    loop {
        if *stop_rx.borrow() || *shutdown.borrow() {
            info!("account {account_id}: stopping receiver");
            return;
        }

        let config = GrammersConfig {
            session: client_session.take().unwrap_or_else(Session::new),
            api_id: deps.tg_api_id,
            api_hash: deps.tg_api_hash.clone(),
            params: InitParams::default(),
        };

        let client = match Client::connect(config).await {
            Ok(c) => c,
            Err(e) => {
                consecutive_failures += 1;
                warn!("account {account_id}: connect failed ({consecutive_failures}): {e}");
                record_heartbeat(&deps.heartbeats, account_id, false, None).await;
                if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                    escalate(&deps, account_id, "repeated connect failures").await;
                    return;
                }
                sleep_backoff(consecutive_failures).await;
                continue;
            }
        };

        match client.is_authorized().await {
            Ok(true) => {}
            Ok(false) => {
                error!("account {account_id}: session no longer authorized, not retrying");
                escalate(&deps, account_id, "session revoked").await;
                return;
            }
            Err(e) => {
                warn!("account {account_id}: authorization check failed: {e}");
                consecutive_failures += 1;
                if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                    escalate(&deps, account_id, "repeated authorization check failures").await;
                    return;
                }
                sleep_backoff(consecutive_failures).await;
                continue;
            }
        }

        consecutive_failures = 0;
        let _ = deps.accounts.update_status(account_id, AccountStatus::Active, None).await;
        record_heartbeat(&deps.heartbeats, account_id, true, None).await;
        info!("account {account_id}: connected, streaming updates");

        loop {
            tokio::select! {
                update = client.next_update() => {
                    match update {
                        Ok(update) => {
                            record_heartbeat(&deps.heartbeats, account_id, true, None).await;
                            handle_update(&deps, tenant_id, account_id, &assigned_groups, update).await;
                        }
                        Err(e) => {
                            warn!("account {account_id}: connection error: {e}");
                            record_heartbeat(&deps.heartbeats, account_id, false, None).await;
                            consecutive_failures += 1;
                            break;
                        }
                    }
                }
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        info!("account {account_id}: stop requested");
                        return;
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("account {account_id}: shutdown requested");
                        return;
                    }
                }
            }
        }

        client_session = Some(client.session().clone());
        if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
            escalate(&deps, account_id, "repeated reconnect failures").await;
            return;
        }
        sleep_backoff(consecutive_failures).await;
    }
}

async fn escalate(deps: &SupervisorDeps, account_id: i32, reason: &str) {
    error!("account {account_id}: escalating to error ({reason})");
    let _ = deps.accounts.update_status(account_id, AccountStatus::Error, Some(reason)).await;
}

async fn sleep_backoff(attempt: u32) {
    let idx = (attempt as usize).saturating_sub(1).min(RECONNECT_SCHEDULE_SECS.len() - 1);
    tokio::time::sleep(Duration::from_secs(RECONNECT_SCHEDULE_SECS[idx])).await;
}

async fn record_heartbeat(registry: &HeartbeatRegistry, account_id: i32, connected: bool, queue_depth: Option<usize>) {
    let mut guard = registry.lock().await;
    let heartbeat = guard.entry(account_id).or_insert_with(AccountHeartbeat::default);
    if !connected && heartbeat.connected {
        heartbeat.reconnect_count_in_window += 1;
    }
    heartbeat.connected = connected;
    if connected {
        heartbeat.last_event_at = Instant::now();
    }
    if let Some(depth) = queue_depth {
        heartbeat.queue_depth = depth;
    }
}

async fn handle_update(
    deps: &SupervisorDeps,
    tenant_id: i32,
    account_id: i32,
    assigned_groups: &Arc<Mutex<HashSet<i32>>>,
    update: Update,
) {
    let Update::NewMessage(message) = update else {
        return;
    };
    if message.outgoing() {
        return;
    }

    let chat = message.chat();
    let external_group_id = chat.id().to_string();

    let group = match deps.groups.find_by_group_id(tenant_id, &external_group_id).await {
        Ok(Some(g)) if g.is_active => g,
        Ok(_) => return,
        Err(e) => {
            warn!("account {account_id}: group lookup failed for {external_group_id}: {e}");
            return;
        }
    };

    {
        let assigned = assigned_groups.lock().await;
        if !assigned.is_empty() && !assigned.contains(&group.id) {
            return;
        }
    }

    let (message_type, media_info) = classify_message(&message);
    let username = message.sender().and_then(|s| s.username().map(|u| u.to_string()));
    let user_id = message.sender().map(|s| s.id());

    let incoming = IncomingMessage {
        tenant_id,
        group_id: group.id,
        group_name: group.group_name.clone(),
        user_id,
        username,
        message_id: message.id() as i64,
        message_text: Some(message.text().to_string()).filter(|t| !t.is_empty()),
        message_type,
        media_info,
        ingested_via: IngestedVia::Session,
    };

    match deps.pipeline.process(incoming).await {
        Ok(outcome) => {
            for request in outcome.forward_requests {
                deps.forwarding.enqueue(request).await;
            }
        }
        Err(e) => error!("account {account_id}: pipeline processing failed: {e}"),
    }
}

/// classifies a received message's `media_info` without downloading its
/// content (file ids, sizes, mime type only).
fn classify_message(message: &Message) -> (MessageType, HashMap<String, serde_json::Value>) {
    let mut info = HashMap::new();
    let Some(media) = message.media() else {
        return (MessageType::Text, info);
    };

    match media {
        Media::Photo(photo) => {
            info.insert("file_id".into(), serde_json::json!(photo.id()));
            (MessageType::Photo, info)
        }
        Media::Sticker(_) => (MessageType::Sticker, info),
        Media::Document(document) => {
            let mime = document.mime_type().unwrap_or("").to_string();
            info.insert("file_id".into(), serde_json::json!(document.id()));
            info.insert("mime_type".into(), serde_json::json!(mime));
            info.insert("size".into(), serde_json::json!(document.size()));
            let message_type = if mime.starts_with("video") {
                MessageType::Video
            } else if mime == "audio/ogg" {
                MessageType::Voice
            } else if mime.starts_with("audio") {
                MessageType::Audio
            } else {
                MessageType::Document
            };
            (message_type, info)
        }
        _ => (MessageType::Other, info),
    }
}
