//! Email alerts for authentication failures, delivered through the local
//! `sendmail` binary.

use std::fmt::Display;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const SENDMAIL: &str = "sendmail";

/// Sends a mail when login stops working. When no address is configured all
/// methods are no-ops.
#[derive(Debug, Clone)]
pub(crate) struct Notifier {
    email: Option<String>,
    username: String,
}

impl Notifier {
    pub(crate) fn new(email: Option<String>, username: &str) -> Self {
        Self {
            email,
            username: username.to_string(),
        }
    }

    /// Alert that the service rejected our credentials. Called at most once
    /// per run: either sign-in fails up front or the pass stops on it.
    pub(crate) async fn auth_failed(&self, reason: impl Display) {
        let Some(to) = self.email.as_deref() else {
            return;
        };
        let message = compose(to, &self.username, &reason);
        if let Err(e) = deliver(&message).await {
            tracing::warn!("Could not send notification email to {}: {}", to, e);
        } else {
            tracing::info!("Sent authentication failure notice to {}", to);
        }
    }
}

fn compose(to: &str, username: &str, reason: &dyn Display) -> String {
    format!(
        "To: {to}\n\
         Subject: photosync: authentication failed for {username}\n\
         \n\
         photosync could not sign in to the photo library as {username}.\n\
         \n\
         Reason: {reason}\n\
         \n\
         Downloads are paused until the credentials are fixed and photosync \
         is run again.\n"
    )
}

async fn deliver(message: &str) -> std::io::Result<()> {
    let mut child = Command::new(SENDMAIL)
        .arg("-t")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(message.as_bytes()).await?;
    }

    let status = child.wait().await?;
    if !status.success() {
        return Err(std::io::Error::other(format!("{SENDMAIL} exited with {status}")));
    }
    Ok(())
}
