use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::MailConfig;

/// Outbound email. Bodies are prebuilt HTML from `templates`.
#[derive(Debug, Clone, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> anyhow::Result<()>;
}

/// Hand an email to the mailer without waiting for delivery. The auth flows
/// only require "dispatched"; a delivery failure is logged and never reaches
/// the caller.
pub fn dispatch(mailer: &Arc<dyn Mailer>, email: Email) {
    let mailer = mailer.clone();
    tokio::spawn(async move {
        let to = email.to.clone();
        let subject = email.subject.clone();
        if let Err(e) = mailer.send(email).await {
            warn!(error = %e, to = %to, subject = %subject, "failed to send mail");
        } else {
            debug!(to = %to, subject = %subject, "mail dispatched");
        }
    });
}

/// Mailer backed by an HTTP mail API (JSON body, bearer auth).
pub struct HttpMailer {
    client: reqwest::Client,
    config: MailConfig,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "from": self.config.from,
                "to": email.to,
                "subject": email.subject,
                "html": email.html,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("mail api returned {}", response.status());
        }
        Ok(())
    }
}

/// Captures mail instead of sending it; used by `AppState::fake()` and the
/// engine tests.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .expect("mailbox poisoned")
            .iter()
            .map(|e| e.subject.clone())
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        self.sent.lock().expect("mailbox poisoned").push(email);
        Ok(())
    }
}
