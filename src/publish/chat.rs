//! Chat notifications for newly filed issues.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use super::tracker::IssueRef;
use super::HostedImage;
use crate::config::ChatConfig;
use crate::error::{MailError, Result};
use crate::model::address::Sender;
use crate::model::email::ParsedEmail;

/// Length limits imposed by the chat service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatLimits {
    pub title: usize,
    pub body: usize,
}

impl From<&ChatConfig> for ChatLimits {
    fn from(config: &ChatConfig) -> Self {
        Self {
            title: config.title_limit,
            body: config.body_limit,
        }
    }
}

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub title: String,
    pub description: String,
    /// Issue reference the notification points to.
    pub issue: String,
    pub sender: String,
    /// First image, shown as the preview.
    pub image: Option<String>,
    /// Remaining images, listed as links.
    pub links: Vec<String>,
}

impl ChatMessage {
    /// Webhook payload in the common "embeds" shape.
    pub fn to_webhook_payload(&self) -> serde_json::Value {
        let mut description = self.description.clone();
        if !self.links.is_empty() {
            description.push_str("\n\n");
            description.push_str(&self.links.join("\n"));
        }
        let mut embed = serde_json::json!({
            "title": self.title,
            "description": description,
            "footer": { "text": format!("{} · {}", self.issue, self.sender) },
        });
        if let Some(url) = &self.image {
            embed["image"] = serde_json::json!({ "url": url });
        }
        serde_json::json!({ "embeds": [embed] })
    }
}

/// Render the notification for a published email.
pub fn render_chat_message(
    email: &ParsedEmail,
    issue: &IssueRef,
    images: &[HostedImage],
    limits: ChatLimits,
) -> ChatMessage {
    let mut images = images.iter();
    let image = images.next().map(|img| img.url.clone());
    let links = images
        .map(|img| format!("[{}]({})", img.filename, img.url))
        .collect();

    ChatMessage {
        title: truncate_chars(&email.subject, limits.title),
        description: truncate_chars(&email.body, limits.body),
        issue: issue.reference.clone(),
        sender: Sender::from_header(&email.from).label().to_string(),
        image,
        links,
    }
}

/// Cut `s` to at most `limit` characters, marking the cut with `…`.
pub fn truncate_chars(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        return s.to_string();
    }
    if limit == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(limit - 1).collect();
    out.push('…');
    out
}

/// Something that delivers chat notifications.
pub trait Notifier {
    fn notify(&self, message: &ChatMessage) -> Result<()>;
}

/// A [`Notifier`] that appends webhook payloads to a JSON-lines outbox.
#[derive(Debug, Clone)]
pub struct JsonlNotifier {
    path: PathBuf,
}

impl JsonlNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Notifier for JsonlNotifier {
    fn notify(&self, message: &ChatMessage) -> Result<()> {
        let line = serde_json::to_string(&message.to_webhook_payload())?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| MailError::Notify(format!("{}: {e}", self.path.display())))?;
        writeln!(file, "{line}").map_err(|e| MailError::Notify(e.to_string()))
    }
}
