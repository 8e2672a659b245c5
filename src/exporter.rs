use anyhow::Result;
use tracing::{debug, info};

use crate::format;
use crate::platform::{ChatMessage, ChatSelector, Fetcher};
use crate::store::{ExportRow, MessageStore, UpsertOutcome};

impl ExportRow {
    /// Render a fetched message into its stored form
    pub fn from_message(message: &ChatMessage) -> Self {
        let text = message.text();
        Self {
            message_id: message.id,
            chat_id: message.chat_id,
            markup: format::render(text, &message.spans),
            date: message.date.format("%Y-%m-%d %H:%M:%S%:z").to_string(),
            urls: format::join_urls(&format::extract_urls(text, &message.spans)),
        }
    }
}

/// Counts from one export run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped_empty: usize,
}

/// Pulls a chat's messages from a fetcher and writes them to the store
pub struct Exporter<F: Fetcher> {
    fetcher: F,
    store: MessageStore,
}

impl<F: Fetcher> Exporter<F> {
    pub fn new(fetcher: F, store: MessageStore) -> Self {
        Self { fetcher, store }
    }

    pub async fn run(&self, chat: &ChatSelector) -> Result<ExportSummary> {
        info!("Exporting messages from chat: {}", chat);
        let messages = self.fetcher.fetch_messages(chat).await?;

        let mut summary = ExportSummary {
            fetched: messages.len(),
            ..Default::default()
        };

        let mut rows = Vec::with_capacity(messages.len());
        for message in &messages {
            if message.text().is_empty() {
                debug!("Message {} has no text, skipping", message.id);
                summary.skipped_empty += 1;
                continue;
            }
            rows.push(ExportRow::from_message(message));
        }

        // One transaction for the whole chat
        let outcomes = self.store.upsert_all(&rows).await?;

        for (row, outcome) in rows.iter().zip(outcomes) {
            match outcome {
                UpsertOutcome::Inserted => {
                    info!("Inserted new message {} into the database", row.message_id);
                    summary.inserted += 1;
                }
                UpsertOutcome::UrlsUpdated => {
                    info!("Updated URLs for message {}", row.message_id);
                    summary.updated += 1;
                }
                UpsertOutcome::Unchanged => {
                    info!("Message {} already exists, skipping", row.message_id);
                    summary.unchanged += 1;
                }
            }
        }

        info!(
            "Export finished: {} fetched, {} inserted, {} updated, {} unchanged, {} without text",
            summary.fetched,
            summary.inserted,
            summary.updated,
            summary.unchanged,
            summary.skipped_empty
        );
        Ok(summary)
    }
}
