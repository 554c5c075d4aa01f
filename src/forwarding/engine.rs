use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use tokio::sync::{mpsc, Mutex};

use crate::db::destinations::DestinationRepo;
use crate::db::forwarded_messages::ForwardedMessageRepo;
use crate::db::models::ForwardOutcome;
use crate::forwarding::rate_limiter::DestinationRateLimiter;

const MAX_ATTEMPTS: u32 = 5;
const BACKOFF_SCHEDULE_SECS: [u64; 5] = [1, 2, 5, 15, 60];

#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub tenant_id: i32,
    pub source_message_ref: i32,
    pub username: Option<String>,
    pub group_name: String,
    pub destination_id: i32,
    pub message_text: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// outcome of a single Bot API delivery attempt; drives the retry policy.
pub enum DeliveryError {
    Transient(String),
    Permanent(String),
}

/// abstracts the Bot API send so the engine is testable without a live bot.
#[async_trait]
pub trait Deliverer: Send + Sync {
    async fn deliver(&self, destination_chat_id: &str, text: &str) -> Result<(), DeliveryError>;
}

pub struct TeloxideDeliverer {
    pub bot: teloxide::Bot,
}

#[async_trait]
impl Deliverer for TeloxideDeliverer {
    async fn deliver(&self, destination_chat_id: &str, text: &str) -> Result<(), DeliveryError> {
        use teloxide::prelude::*;
        use teloxide::types::ParseMode;

        let chat_id: i64 = destination_chat_id
            .parse()
            .map_err(|_| DeliveryError::Permanent("destination chat id is not numeric".into()))?;

        match self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .await
        {
            Ok(_) => Ok(()),
            Err(teloxide::RequestError::RetryAfter(_)) => {
                Err(DeliveryError::Transient("rate limited by Bot API".into()))
            }
            Err(teloxide::RequestError::Network(e)) => Err(DeliveryError::Transient(e.to_string())),
            Err(teloxide::RequestError::Api(e)) => Err(DeliveryError::Permanent(e.to_string())),
            Err(e) => Err(DeliveryError::Transient(e.to_string())),
        }
    }
}

fn render_body(req: &ForwardRequest) -> String {
    let sender = req.username.as_deref().unwrap_or("unknown");
    let body = req.message_text.as_deref().unwrap_or("[non-text message]");
    format!(
        "<b>@{sender}</b> in <i>{group}</i> at {ts}\n\n{body}\n\n— forwarded #{src}",
        group = html_escape::encode_text(&req.group_name),
        ts = req.timestamp.to_rfc3339(),
        body = html_escape::encode_text(body),
        src = req.source_message_ref,
    )
}

/// per-destination single-writer queue / single-reader delivery task, holding
/// archive order within a destination as required by the concurrency model.
pub struct ForwardingEngine {
    senders: Arc<Mutex<HashMap<i32, mpsc::Sender<ForwardRequest>>>>,
    destinations: DestinationRepo,
    ledger: ForwardedMessageRepo,
    rate_limiter: DestinationRateLimiter,
    deliverer: Arc<dyn Deliverer>,
    shutdown: tokio::sync::watch::Receiver<bool>,
}

impl ForwardingEngine {
    pub fn new(
        destinations: DestinationRepo,
        ledger: ForwardedMessageRepo,
        rate_limiter: DestinationRateLimiter,
        deliverer: Arc<dyn Deliverer>,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> Self {
        Self {
            senders: Arc::new(Mutex::new(HashMap::new())),
            destinations,
            ledger,
            rate_limiter,
            deliverer,
            shutdown,
        }
    }

    pub async fn enqueue(&self, request: ForwardRequest) {
        let destination_id = request.destination_id;
        let sender = {
            let mut senders = self.senders.lock().await;
            senders
                .entry(destination_id)
                .or_insert_with(|| self.spawn_delivery_task(destination_id))
                .clone()
        };
        if sender.send(request).await.is_err() {
            warn!("delivery task for destination {destination_id} gone, dropping request");
        }
    }

    fn spawn_delivery_task(&self, destination_id: i32) -> mpsc::Sender<ForwardRequest> {
        let (tx, mut rx) = mpsc::channel::<ForwardRequest>(256);
        let destinations = self.destinations.clone();
        let ledger = self.ledger.clone();
        let rate_limiter = self.rate_limiter.clone();
        let deliverer = self.deliverer.clone();
        let mut shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                let request = tokio::select! {
                    r = rx.recv() => match r {
                        Some(r) => r,
                        None => return,
                    },
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            info!("delivery task for destination {destination_id} draining queue before exit");
                        }
                        continue;
                    }
                };

                let destination = match destinations.get(request.tenant_id, request.destination_id).await {
                    Ok(d) => d,
                    Err(e) => {
                        error!("delivery task could not look up destination {destination_id}: {e}");
                        continue;
                    }
                };

                if !destination.is_active {
                    let _ = ledger
                        .record(
                            request.tenant_id,
                            request.source_message_ref,
                            request.username.as_deref(),
                            &request.group_name,
                            destination_id,
                            ForwardOutcome::Failed,
                            Some("destination_inactive"),
                        )
                        .await;
                    continue;
                }

                rate_limiter.acquire(destination_id).await;
                let body = render_body(&request);

                let mut attempt = 0u32;
                let outcome = loop {
                    attempt += 1;
                    match deliverer.deliver(&destination.destination_id, &body).await {
                        Ok(()) => break Ok(()),
                        Err(DeliveryError::Permanent(reason)) => break Err(reason),
                        Err(DeliveryError::Transient(reason)) => {
                            if attempt >= MAX_ATTEMPTS {
                                break Err(reason);
                            }
                            let idx = (attempt as usize - 1).min(BACKOFF_SCHEDULE_SECS.len() - 1);
                            tokio::time::sleep(Duration::from_secs(BACKOFF_SCHEDULE_SECS[idx])).await;
                        }
                    }
                };

                match outcome {
                    Ok(()) => {
                        let _ = ledger
                            .record(
                                request.tenant_id,
                                request.source_message_ref,
                                request.username.as_deref(),
                                &request.group_name,
                                destination_id,
                                ForwardOutcome::Delivered,
                                None,
                            )
                            .await;
                        let _ = destinations.record_forward(request.tenant_id, destination_id).await;
                    }
                    Err(reason) => {
                        warn!("delivery to destination {destination_id} failed: {reason}");
                        let _ = ledger
                            .record(
                                request.tenant_id,
                                request.source_message_ref,
                                request.username.as_deref(),
                                &request.group_name,
                                destination_id,
                                ForwardOutcome::Failed,
                                Some(&reason),
                            )
                            .await;
                    }
                }
            }
        });

        tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_body_escapes_and_labels_source() {
        let req = ForwardRequest {
            tenant_id: 1,
            source_message_ref: 42,
            username: Some("alice".into()),
            group_name: "<script>".into(),
            destination_id: 1,
            message_text: Some("hi & bye".into()),
            timestamp: Utc::now(),
        };
        let body = render_body(&req);
        assert!(body.contains("&lt;script&gt;"));
        assert!(body.contains("#42"));
    }
}
