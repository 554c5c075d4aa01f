use html_escape::encode_text;
use log::{error, warn};
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MaybeInaccessibleMessage, ParseMode, Update, UpdateKind,
};
use teloxide::utils::command::BotCommands;
use teloxide::Bot;

use crate::analytics::AnalyticsAggregator;
use crate::db::bot_commands::BotCommandRepo;
use crate::db::destinations::DestinationRepo;
use crate::db::groups::GroupRepo;
use crate::db::messages::MessageRepo;
use crate::db::models::User;
use crate::db::users::UserRepo;
use crate::db::watchlist::WatchlistRepo;
use crate::error::AppResult;

/// `/start, /help, /menu, /status, /groups, /watchlist, /messages`; no
/// payment, referral, or LLM commands (see DESIGN.md).
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "start using the bot")]
    Start,
    #[command(description = "show this help text")]
    Help,
    #[command(description = "open the main menu")]
    Menu,
    #[command(description = "show account/session status")]
    Status,
    #[command(description = "list monitored groups")]
    Groups,
    #[command(description = "list watched users")]
    Watchlist,
    #[command(description = "show recent archived messages")]
    Messages,
}

/// everything the webhook handler needs to answer a Telegram update.
#[derive(Clone)]
pub struct BotDeps {
    pub bot: Bot,
    pub users: UserRepo,
    pub groups: GroupRepo,
    pub watchlist: WatchlistRepo,
    pub destinations: DestinationRepo,
    pub messages: MessageRepo,
    pub bot_commands: BotCommandRepo,
    pub analytics: AnalyticsAggregator,
}

fn main_menu_keyboard(is_admin: bool) -> InlineKeyboardMarkup {
    let mut rows = vec![
        vec![
            InlineKeyboardButton::callback("Status", "status"),
            InlineKeyboardButton::callback("Groups", "groups"),
        ],
        vec![
            InlineKeyboardButton::callback("Watchlist", "watchlist"),
            InlineKeyboardButton::callback("Messages", "messages"),
        ],
        vec![
            InlineKeyboardButton::callback("Settings", "settings"),
            InlineKeyboardButton::callback("Help", "help"),
        ],
    ];
    if is_admin {
        rows.push(vec![InlineKeyboardButton::callback("Admin", "admin_menu")]);
    }
    InlineKeyboardMarkup::new(rows)
}

fn back_to_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback("« Main menu", "main_menu")]])
}

/// entry point for the webhook handler: one update, fully dispatched.
/// Errors are logged, never propagated to the caller — a malformed or
/// unsupported update must never fail the webhook response.
pub async fn process_update(deps: &BotDeps, update: Update) {
    let result = match update.kind {
        UpdateKind::Message(msg) => handle_message(deps, msg).await,
        UpdateKind::CallbackQuery(query) => handle_callback_query(deps, query).await,
        _ => Ok(()),
    };
    if let Err(e) = result {
        error!("bot: failed to handle update: {e}");
    }
}

async fn resolve_user(deps: &BotDeps, telegram_id: i64) -> AppResult<Option<User>> {
    deps.users.find_by_telegram_id(telegram_id).await
}

async fn reply(deps: &BotDeps, chat_id: ChatId, text: &str, keyboard: Option<InlineKeyboardMarkup>) -> AppResult<()> {
    let mut request = deps.bot.send_message(chat_id, text).parse_mode(ParseMode::Html);
    if let Some(keyboard) = keyboard {
        request = request.reply_markup(keyboard);
    }
    if let Err(e) = request.await {
        warn!("bot: send_message failed: {e}");
    }
    Ok(())
}

const ONBOARDING_TEXT: &str = "This Telegram account isn't linked to a registered organization yet. \
Sign in with Telegram on the dashboard to get started.";

async fn handle_message(deps: &BotDeps, msg: Message) -> AppResult<()> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Ok(cmd) = Command::parse(text, "") else {
        return Ok(());
    };

    let command_name = format!("{cmd:?}").to_lowercase();
    let args = text.splitn(2, ' ').nth(1).unwrap_or("");

    let user = resolve_user(deps, from.id.0 as i64).await?;
    deps.bot_commands
        .record(user.as_ref().map(|u| u.tenant_id), from.id.0 as i64, &command_name, args)
        .await?;

    let Some(user) = user else {
        reply(deps, msg.chat.id, ONBOARDING_TEXT, None).await?;
        return Ok(());
    };

    match cmd {
        Command::Start => {
            reply(
                deps,
                msg.chat.id,
                &format!("Welcome back, <b>{}</b>.", encode_text(&user.first_name)),
                Some(main_menu_keyboard(user.role.can_mutate())),
            )
            .await?;
        }
        Command::Help => {
            reply(deps, msg.chat.id, &Command::descriptions().to_string(), None).await?;
        }
        Command::Menu => {
            reply(deps, msg.chat.id, "Main menu:", Some(main_menu_keyboard(user.role.can_mutate()))).await?;
        }
        Command::Status => {
            let text = render_status(deps, &user).await?;
            reply(deps, msg.chat.id, &text, Some(back_to_menu_keyboard())).await?;
        }
        Command::Groups => {
            let text = render_groups(deps, &user).await?;
            reply(deps, msg.chat.id, &text, Some(back_to_menu_keyboard())).await?;
        }
        Command::Watchlist => {
            let text = render_watchlist(deps, &user).await?;
            reply(deps, msg.chat.id, &text, Some(back_to_menu_keyboard())).await?;
        }
        Command::Messages => {
            let text = render_recent_messages(deps, &user).await?;
            reply(deps, msg.chat.id, &text, Some(back_to_menu_keyboard())).await?;
        }
    }
    Ok(())
}

fn callback_chat_id(message: &MaybeInaccessibleMessage) -> ChatId {
    match message {
        MaybeInaccessibleMessage::Regular(msg) => msg.chat.id,
        MaybeInaccessibleMessage::Inaccessible(msg) => msg.chat.id,
    }
}

async fn handle_callback_query(deps: &BotDeps, query: CallbackQuery) -> AppResult<()> {
    let _ = deps.bot.answer_callback_query(query.id.clone()).await;

    let Some(data) = query.data.as_deref() else {
        return Ok(());
    };
    let Some(message) = query.message.as_ref() else {
        return Ok(());
    };
    let chat_id = callback_chat_id(message);

    let user = resolve_user(deps, query.from.id.0 as i64).await?;
    let Some(user) = user else {
        reply(deps, chat_id, ONBOARDING_TEXT, None).await?;
        return Ok(());
    };

    match data {
        "main_menu" => {
            reply(deps, chat_id, "Main menu:", Some(main_menu_keyboard(user.role.can_mutate()))).await?;
        }
        "status" => {
            let text = render_status(deps, &user).await?;
            reply(deps, chat_id, &text, Some(back_to_menu_keyboard())).await?;
        }
        "groups" => {
            let text = render_groups(deps, &user).await?;
            reply(deps, chat_id, &text, Some(back_to_menu_keyboard())).await?;
        }
        "watchlist" => {
            let text = render_watchlist(deps, &user).await?;
            reply(deps, chat_id, &text, Some(back_to_menu_keyboard())).await?;
        }
        "messages" => {
            let text = render_recent_messages(deps, &user).await?;
            reply(deps, chat_id, &text, Some(back_to_menu_keyboard())).await?;
        }
        "settings" => {
            reply(
                deps,
                chat_id,
                "Settings are managed from the dashboard for now.",
                Some(back_to_menu_keyboard()),
            )
            .await?;
        }
        "help" => {
            reply(deps, chat_id, &Command::descriptions().to_string(), Some(back_to_menu_keyboard())).await?;
        }
        "admin_menu" => {
            if !user.role.can_mutate() {
                reply(deps, chat_id, "Admin menu requires an admin or owner role.", Some(back_to_menu_keyboard())).await?;
            } else {
                let stats = deps.analytics.compute(user.tenant_id).await?;
                reply(
                    deps,
                    chat_id,
                    &format!(
                        "<b>Admin overview</b>\nAccounts forward success rate: {:.1}%\nForwarded today: {}",
                        stats.forwarding_success_rate * 100.0,
                        stats.forwarded_today
                    ),
                    Some(back_to_menu_keyboard()),
                )
                .await?;
            }
        }
        other => warn!("bot: unrecognized callback data {other}"),
    }
    Ok(())
}

async fn render_status(deps: &BotDeps, user: &User) -> AppResult<String> {
    let stats = deps.analytics.compute(user.tenant_id).await?;
    Ok(format!(
        "<b>Status</b>\nGroups: {}\nWatchlist: {}\nDestinations: {}\nMessages archived: {}\nMessages today: {}",
        stats.total_groups, stats.total_watchlist_users, stats.total_destinations, stats.total_messages, stats.messages_today
    ))
}

async fn render_groups(deps: &BotDeps, user: &User) -> AppResult<String> {
    let groups = deps.groups.list(user.tenant_id).await?;
    if groups.is_empty() {
        return Ok("No groups registered yet.".to_string());
    }
    let mut out = String::from("<b>Monitored groups</b>\n");
    for group in groups.iter().filter(|g| g.is_active).take(20) {
        out.push_str(&format!("• {}\n", encode_text(&group.group_name)));
    }
    Ok(out)
}

async fn render_watchlist(deps: &BotDeps, user: &User) -> AppResult<String> {
    let watch_users = deps.watchlist.list_active(user.tenant_id).await?;
    if watch_users.is_empty() {
        return Ok("Watchlist is empty.".to_string());
    }
    let mut out = String::from("<b>Watched users</b>\n");
    for w in watch_users.iter().take(20) {
        out.push_str(&format!("• @{}\n", encode_text(&w.username)));
    }
    Ok(out)
}

async fn render_recent_messages(deps: &BotDeps, user: &User) -> AppResult<String> {
    let messages = deps.messages.list(user.tenant_id, None, None, None, 10, 0).await?;
    if messages.is_empty() {
        return Ok("No archived messages yet.".to_string());
    }
    let mut out = String::from("<b>Recent messages</b>\n");
    for m in messages {
        let who = m.username.as_deref().unwrap_or("unknown");
        let snippet = m.message_text.as_deref().unwrap_or("[non-text message]");
        out.push_str(&format!(
            "• @{} in {}: {}\n",
            encode_text(who),
            encode_text(&m.group_name),
            encode_text(snippet)
        ));
    }
    Ok(out)
}
