//! Issue creation.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MailError, Result};

/// An issue about to be created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIssue {
    pub repository: String,
    pub title: String,
    /// Markdown body, image references already resolved.
    pub body: String,
    pub labels: Vec<String>,
    /// Tracker login of the sender, when one was resolved.
    pub author: Option<String>,
    /// Sender address the issue was filed on behalf of.
    pub sender_email: String,
    pub message_id: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// A created issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub number: u64,
    /// Short reference, `owner/repo#number`.
    pub reference: String,
}

/// Something that can file issues.
pub trait IssueTracker {
    fn create_issue(&self, issue: &NewIssue) -> Result<IssueRef>;
}

/// An [`IssueTracker`] that appends issues to a JSON-lines file.
///
/// Issue numbers follow the line count of the file.
#[derive(Debug, Clone)]
pub struct JsonlIssueTracker {
    path: PathBuf,
}

#[derive(Serialize)]
struct IssueRecord<'a> {
    number: u64,
    #[serde(flatten)]
    issue: &'a NewIssue,
}

impl JsonlIssueTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn existing_issues(&self) -> Result<u64> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(MailError::io(&self.path, e)),
        };
        let mut count = 0;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| MailError::io(&self.path, e))?;
            if !line.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }
}

impl IssueTracker for JsonlIssueTracker {
    fn create_issue(&self, issue: &NewIssue) -> Result<IssueRef> {
        if issue.title.trim().is_empty() {
            return Err(MailError::Tracker("issue title must not be empty".into()));
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| MailError::io(parent, e))?;
        }

        let number = self.existing_issues()? + 1;
        let line = serde_json::to_string(&IssueRecord { number, issue })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| MailError::io(&self.path, e))?;
        writeln!(file, "{line}").map_err(|e| MailError::io(&self.path, e))?;

        let issue_ref = IssueRef {
            number,
            reference: format!("{}#{number}", issue.repository),
        };
        info!(issue = %issue_ref.reference, title = %issue.title, "Created issue");
        Ok(issue_ref)
    }
}
