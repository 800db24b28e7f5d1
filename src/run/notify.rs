//! Run notifications
//!
//! A run reports its outcome by email through the local `mail` program,
//! with the body on stdin. Notification problems are logged by the caller
//! and never change the outcome of a run.

use crate::{error_messages, NotifyError};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::error::Error;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Subject and body of a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Notification for a run that completed
///
/// Non-critical issues, if any, are listed after the summary line.
pub fn success_notification(date: NaiveDate, issues: &[String]) -> Notification {
    let mut body = "Website backup completed successfully.".to_string();
    if !issues.is_empty() {
        body.push_str("\n\nNon-critical issues encountered:\n");
        body.push_str(&bullet_list(issues));
    }

    Notification {
        subject: format!("Website Backup Successful - {}", date.format("%Y-%m-%d")),
        body,
    }
}

/// Notification for a run that aborted
///
/// Carries the error, every error in its source chain, and the issues
/// recorded before the failure.
pub fn failure_notification(
    date: NaiveDate,
    error: &(dyn Error + 'static),
    issues: &[String],
) -> Notification {
    let messages = error_messages(error);
    let mut body = format!("Error occurred in backup script: {}", messages[0]);

    if messages.len() > 1 {
        body.push_str("\n\nCaused by:\n");
        body.push_str(&bullet_list(&messages[1..]));
    }

    if !issues.is_empty() {
        body.push_str("\n\nDetailed errors:\n");
        body.push_str(&bullet_list(issues));
    }

    Notification {
        subject: format!("Website Backup Failed - {}", date.format("%Y-%m-%d")),
        body,
    }
}

/// Delivers notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Sends mail through `<program> -s <subject> <email>`
pub struct MailNotifier {
    program: String,
    email: String,
}

impl MailNotifier {
    pub fn new(program: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            email: email.into(),
        }
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let spawn_error = |source| NotifyError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .arg("-s")
            .arg(&notification.subject)
            .arg(&self.email)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(spawn_error)?;

        // A program that exits without reading its input is judged by its
        // exit status alone
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(notification.body.as_bytes()).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(spawn_error(e));
                }
            }
        }

        let status = child.wait().await.map_err(spawn_error)?;
        if !status.success() {
            return Err(NotifyError::Failed {
                program: self.program.clone(),
                code: status.code(),
            });
        }

        tracing::info!("Email notification sent to {}", self.email);
        Ok(())
    }
}
