use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use super::{ChatMessage, ChatSelector, Fetcher, Span, SpanKind};

/// A JSON file of Bot API messages: either a bare array of `Message`
/// objects or a saved `getUpdates` response.
#[derive(Deserialize)]
#[serde(untagged)]
enum DumpFile {
    Messages(Vec<RawMessage>),
    Updates { result: Vec<RawUpdate> },
}

#[derive(Deserialize)]
struct RawUpdate {
    message: Option<RawMessage>,
    edited_message: Option<RawMessage>,
    channel_post: Option<RawMessage>,
    edited_channel_post: Option<RawMessage>,
}

impl RawUpdate {
    fn into_message(self) -> Option<RawMessage> {
        self.message
            .or(self.edited_message)
            .or(self.channel_post)
            .or(self.edited_channel_post)
    }
}

#[derive(Deserialize)]
struct RawMessage {
    message_id: i64,
    /// Unix seconds
    date: i64,
    chat: RawChat,
    text: Option<String>,
    #[serde(default)]
    entities: Vec<RawEntity>,
    caption: Option<String>,
    #[serde(default)]
    caption_entities: Vec<RawEntity>,
}

#[derive(Deserialize)]
struct RawChat {
    id: i64,
    username: Option<String>,
}

#[derive(Deserialize)]
struct RawEntity {
    #[serde(rename = "type")]
    kind: SpanKind,
    offset: usize,
    length: usize,
    url: Option<String>,
}

impl From<RawEntity> for Span {
    fn from(entity: RawEntity) -> Self {
        Span {
            kind: entity.kind,
            offset: entity.offset,
            length: entity.length,
            extra: entity.url,
        }
    }
}

impl RawMessage {
    fn into_chat_message(self) -> Option<ChatMessage> {
        let Some(date) = DateTime::<Utc>::from_timestamp(self.date, 0) else {
            warn!("Message {} has an invalid date {}, dropping", self.message_id, self.date);
            return None;
        };

        // Media messages carry their text as a caption
        let (text, entities) = match self.text {
            Some(text) => (Some(text), self.entities),
            None => (self.caption, self.caption_entities),
        };

        Some(ChatMessage {
            id: self.message_id,
            chat_id: self.chat.id,
            date,
            text,
            spans: entities.into_iter().map(Span::from).collect(),
        })
    }
}

/// Reads messages from a JSON dump on disk instead of the network
pub struct DumpFetcher {
    path: PathBuf,
}

impl DumpFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse dump contents and keep the messages of the selected chat
fn parse_dump(content: &str, chat: &ChatSelector) -> Result<Vec<ChatMessage>> {
    let dump: DumpFile =
        serde_json::from_str(content).context("Dump is neither a message array nor a getUpdates response")?;

    let raw = match dump {
        DumpFile::Messages(messages) => messages,
        DumpFile::Updates { result } => result
            .into_iter()
            .filter_map(RawUpdate::into_message)
            .collect(),
    };

    Ok(raw
        .into_iter()
        .filter(|m| chat.matches(m.chat.id, m.chat.username.as_deref()))
        .filter_map(RawMessage::into_chat_message)
        .collect())
}

#[async_trait]
impl Fetcher for DumpFetcher {
    async fn fetch_messages(&self, chat: &ChatSelector) -> Result<Vec<ChatMessage>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read dump file: {}", self.path.display()))?;

        let messages = parse_dump(&content, chat)
            .with_context(|| format!("Failed to parse dump file: {}", self.path.display()))?;

        info!(
            "Loaded {} messages for {} from {}",
            messages.len(),
            chat,
            self.path.display()
        );
        Ok(messages)
    }
}
