use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{MessageEntity, MessageEntityKind, UpdateKind};
use tracing::{debug, info};

use super::{ChatMessage, ChatSelector, Fetcher, Span, SpanKind};

/// Updates requested per `getUpdates` call (the Bot API maximum)
const BATCH_LIMIT: u8 = 100;

/// Fetches messages the bot has received through the Bot API `getUpdates`
/// queue. Only updates still pending on Telegram's side are visible, and
/// every fetched batch is acknowledged.
pub struct UpdatesFetcher {
    bot: Bot,
}

impl UpdatesFetcher {
    pub fn new(bot_token: &str) -> Self {
        Self {
            bot: Bot::new(bot_token),
        }
    }
}

fn span_from_entity(entity: &MessageEntity) -> Span {
    let (kind, extra) = match &entity.kind {
        MessageEntityKind::Bold => (SpanKind::Bold, None),
        MessageEntityKind::Italic => (SpanKind::Italic, None),
        MessageEntityKind::Underline => (SpanKind::Underline, None),
        MessageEntityKind::Strikethrough => (SpanKind::Strikethrough, None),
        MessageEntityKind::Code => (SpanKind::Code, None),
        MessageEntityKind::Pre { .. } => (SpanKind::Pre, None),
        MessageEntityKind::Url => (SpanKind::Url, None),
        MessageEntityKind::TextLink { url } => (SpanKind::TextLink, Some(url.to_string())),
        _ => (SpanKind::Other, None),
    };

    Span {
        kind,
        offset: entity.offset,
        length: entity.length,
        extra,
    }
}

/// Convert a teloxide message, taking the caption when there is no text
pub fn chat_message_from(msg: &Message) -> ChatMessage {
    let (text, entities) = match msg.text() {
        Some(text) => (Some(text), msg.entities()),
        None => (msg.caption(), msg.caption_entities()),
    };

    ChatMessage {
        id: i64::from(msg.id.0),
        chat_id: msg.chat.id.0,
        date: msg.date,
        text: text.map(str::to_string),
        spans: entities
            .unwrap_or_default()
            .iter()
            .map(span_from_entity)
            .collect(),
    }
}

fn message_of(update: Update) -> Option<Message> {
    match update.kind {
        UpdateKind::Message(msg)
        | UpdateKind::EditedMessage(msg)
        | UpdateKind::ChannelPost(msg)
        | UpdateKind::EditedChannelPost(msg) => Some(msg),
        _ => None,
    }
}

#[async_trait]
impl Fetcher for UpdatesFetcher {
    async fn fetch_messages(&self, chat: &ChatSelector) -> Result<Vec<ChatMessage>> {
        info!("Fetching pending updates from Telegram...");

        let mut messages = Vec::new();
        let mut offset: i32 = 0;

        loop {
            let updates = self
                .bot
                .get_updates()
                .offset(offset)
                .limit(BATCH_LIMIT)
                .timeout(0)
                .await
                .context("Failed to fetch updates from Telegram")?;

            if updates.is_empty() {
                break;
            }
            debug!("Received {} updates", updates.len());

            for update in updates {
                offset = offset.max(update.id.0 as i32 + 1);
                let Some(msg) = message_of(update) else {
                    continue;
                };
                if chat.matches(msg.chat.id.0, msg.chat.username()) {
                    messages.push(chat_message_from(&msg));
                }
            }
        }

        info!("Fetched {} messages for {}", messages.len(), chat);
        Ok(messages)
    }
}
