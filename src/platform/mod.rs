pub mod dump;
pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Formatting or link kind carried by a [`Span`].
///
/// Deserializes from Bot API entity type strings; anything not listed here
/// (mentions, hashtags, spoilers, ...) becomes `Other` and renders as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
    Pre,
    Url,
    TextLink,
    #[serde(other)]
    Other,
}

/// An annotated range of a message's text.
/// `offset` and `length` count UTF-16 code units, not chars or bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub offset: usize,
    pub length: usize,
    /// Destination URL for `TextLink`
    pub extra: Option<String>,
}

#[cfg(test)]
impl Span {
    pub fn new(kind: SpanKind, offset: usize, length: usize) -> Self {
        Self {
            kind,
            offset,
            length,
            extra: None,
        }
    }

    pub fn text_link(offset: usize, length: usize, url: impl Into<String>) -> Self {
        Self {
            kind: SpanKind::TextLink,
            offset,
            length,
            extra: Some(url.into()),
        }
    }
}

/// A message as handed over by a [`Fetcher`]
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: i64,
    pub chat_id: i64,
    pub date: DateTime<Utc>,
    pub text: Option<String>,
    pub spans: Vec<Span>,
}

impl ChatMessage {
    /// The message body, or an empty string when the message has none
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// Which chat to export, parsed from a user-supplied string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatSelector {
    Id(i64),
    Username(String),
}

impl ChatSelector {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input.parse::<i64>() {
            Ok(id) => ChatSelector::Id(id),
            Err(_) => ChatSelector::Username(input.trim_start_matches('@').to_string()),
        }
    }

    pub fn matches(&self, chat_id: i64, username: Option<&str>) -> bool {
        match self {
            ChatSelector::Id(id) => *id == chat_id,
            ChatSelector::Username(name) => {
                username.is_some_and(|u| u.trim_start_matches('@').eq_ignore_ascii_case(name))
            }
        }
    }
}

impl std::fmt::Display for ChatSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatSelector::Id(id) => write!(f, "{}", id),
            ChatSelector::Username(name) => write!(f, "@{}", name),
        }
    }
}

/// Source of a chat's message history
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_messages(&self, chat: &ChatSelector) -> Result<Vec<ChatMessage>>;
}
