//! Publishing decoded emails: image hosting, issue creation, chat relay.
//!
//! The collaborators are traits so a network-backed implementation can be
//! dropped in; the crate ships local, file-based ones.

pub mod accounts;
pub mod chat;
pub mod images;
pub mod tracker;

use regex::{Captures, Regex};
use tracing::{info, warn};

use crate::error::Result;
use crate::model::attachment::Attachment;
use crate::model::email::{Decoded, ParsedEmail, SkipReason};
use crate::parser::{decode_with, DecodeOptions};

use accounts::{resolve_author, AccountLookup};
use chat::{render_chat_message, ChatLimits, Notifier};
use images::ImageHost;
use tracker::{IssueRef, IssueTracker, NewIssue};

/// An attachment after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedImage {
    pub filename: String,
    pub content_id: Option<String>,
    pub url: String,
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Nothing to publish.
    Skipped(SkipReason),
    /// An issue was filed.
    Published {
        issue: IssueRef,
        images: usize,
        dropped_images: usize,
    },
}

/// Upload every attachment; failed uploads are logged and left out.
pub fn upload_all(host: &dyn ImageHost, attachments: &[Attachment]) -> Vec<HostedImage> {
    attachments
        .iter()
        .filter_map(|att| match host.upload(&att.filename, &att.data) {
            Ok(url) => Some(HostedImage {
                filename: att.filename.clone(),
                content_id: att.content_id.clone(),
                url,
            }),
            Err(e) => {
                warn!(filename = %att.filename, error = %e, "Image upload failed, dropping it");
                None
            }
        })
        .collect()
}

/// Replace `cid:<id>` tokens with hosted URLs.
///
/// Images the body never references are appended as markdown images so they
/// still show up in the issue.
pub fn rewrite_cid_references(body: &str, images: &[HostedImage]) -> String {
    let mut result = body.to_string();
    let mut unreferenced = Vec::new();

    for image in images {
        let rewritten = image
            .content_id
            .as_deref()
            .and_then(|cid| replace_cid_token(&result, cid, &image.url));
        match rewritten {
            Some(body) => result = body,
            None => unreferenced.push(image),
        }
    }

    for image in unreferenced {
        result.push_str(&format!("\n\n![{}]({})", image.filename, image.url));
    }
    result
}

/// Replace every `cid:<id>` token in `body` with `url`.
///
/// A token only matches when the id is not followed by another Content-ID
/// character, so `cid:img1` leaves `cid:img10` alone. A single trailing `.`
/// counts as punctuation. Returns `None` when the body has no such token.
fn replace_cid_token(body: &str, cid: &str, url: &str) -> Option<String> {
    let pattern = format!(
        r"cid:{}([^A-Za-z0-9._@\-]|\.[^A-Za-z0-9._@\-]|\.$|$)",
        regex::escape(cid)
    );
    let token = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            warn!(cid, error = %e, "Unusable Content-ID, leaving it unreferenced");
            return None;
        }
    };
    if !token.is_match(body) {
        return None;
    }
    let replaced = token.replace_all(body, |caps: &Captures<'_>| format!("{url}{}", &caps[1]));
    Some(replaced.into_owned())
}

/// Runs the whole pipeline for one message.
pub struct Publisher<'a> {
    pub options: DecodeOptions,
    pub repository: String,
    pub labels: Vec<String>,
    pub images: &'a dyn ImageHost,
    pub tracker: &'a dyn IssueTracker,
    pub accounts: Vec<&'a dyn AccountLookup>,
    pub notifier: Option<&'a dyn Notifier>,
    pub chat_limits: ChatLimits,
}

impl Publisher<'_> {
    /// Decode `raw` and publish it.
    ///
    /// Decoding problems never fail this call. Tracker and notifier errors do,
    /// and nothing is retried.
    pub fn publish(&self, raw: &[u8]) -> Result<PublishOutcome> {
        let email = match decode_with(raw, &self.options) {
            Decoded::Email(email) => email,
            Decoded::Skip(reason) => {
                info!(%reason, "Skipping message");
                return Ok(PublishOutcome::Skipped(reason));
            }
        };

        let hosted = upload_all(self.images, &email.attachments);
        let dropped_images = email.attachments.len() - hosted.len();
        let body = rewrite_cid_references(&email.body, &hosted);

        let issue = NewIssue {
            repository: self.repository.clone(),
            title: email.subject.clone(),
            body: body.clone(),
            labels: self.labels.clone(),
            author: resolve_author(&self.accounts, &email.sender_email),
            sender_email: email.sender_email.clone(),
            message_id: email.message_id.clone(),
            date: email.date,
        };
        let issue_ref = self.tracker.create_issue(&issue)?;

        if let Some(notifier) = self.notifier {
            let email = ParsedEmail { body, ..email };
            let message = render_chat_message(&email, &issue_ref, &hosted, self.chat_limits);
            notifier.notify(&message)?;
        }

        Ok(PublishOutcome::Published {
            issue: issue_ref,
            images: hosted.len(),
            dropped_images,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosted(name: &str, cid: Option<&str>) -> HostedImage {
        HostedImage {
            filename: name.into(),
            content_id: cid.map(String::from),
            url: format!("https://img.test/{name}"),
        }
    }

    #[test]
    fn test_cid_reference_replaced() {
        let body = "See cid:img1 for details";
        let out = rewrite_cid_references(body, &[hosted("a.png", Some("img1"))]);
        assert_eq!(out, "See https://img.test/a.png for details");
    }

    #[test]
    fn test_cid_prefix_of_another_cid_is_not_replaced() {
        let images = [
            HostedImage {
                url: "https://h/a.png".into(),
                ..hosted("a.png", Some("img1"))
            },
            HostedImage {
                url: "https://h/b.png".into(),
                ..hosted("b.png", Some("img10"))
            },
        ];
        let out = rewrite_cid_references("first cid:img1 second cid:img10", &images);
        assert_eq!(out, "first https://h/a.png second https://h/b.png");
    }

    #[test]
    fn test_cid_token_boundaries() {
        let images = [hosted("a.png", Some("logo@mail.example"))];
        let out = rewrite_cid_references(
            "<img src=\"cid:logo@mail.example\"> and cid:logo@mail.example.",
            &images,
        );
        assert_eq!(
            out,
            "<img src=\"https://img.test/a.png\"> and https://img.test/a.png."
        );
    }

    #[test]
    fn test_unreferenced_images_appended() {
        let out = rewrite_cid_references(
            "Body",
            &[hosted("a.png", Some("nowhere")), hosted("b.png", None)],
        );
        assert_eq!(
            out,
            "Body\n\n![a.png](https://img.test/a.png)\n\n![b.png](https://img.test/b.png)"
        );
    }
}
