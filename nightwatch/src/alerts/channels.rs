//! Per-channel delivery (§4.D). A failure on one channel never prevents
//! attempts on the others: every `send_*` swallows its own error after
//! logging it.

use serde_json::json;

use super::{Alert, AlertLevel};

fn slack_color(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Debug => "#6c757d",
        AlertLevel::Info => "#17a2b8",
        AlertLevel::Warning => "#ffc107",
        AlertLevel::Critical => "#dc3545",
        AlertLevel::Emergency => "#721c24",
    }
}

pub async fn send_log(alert: &Alert) {
    match alert.level {
        AlertLevel::Debug => tracing::debug!(source = %alert.source, "{}", alert.message),
        AlertLevel::Info => tracing::info!(source = %alert.source, "{}", alert.message),
        AlertLevel::Warning => tracing::warn!(source = %alert.source, "{}", alert.message),
        AlertLevel::Critical | AlertLevel::Emergency => {
            tracing::error!(source = %alert.source, "{}", alert.message)
        }
    }
}

/// Sends to every configured recipient; a failure on a subset (but not
/// all) is summarized as a single follow-up warning alert rather than
/// retried (§4.D failure semantics, §9 Open Question).
pub async fn send_email(alert: &Alert, recipients: &[String]) -> Option<Alert> {
    if recipients.is_empty() {
        return None;
    }
    let mut failed = Vec::new();
    for recipient in recipients {
        if let Err(err) = deliver_email(alert, recipient).await {
            tracing::error!(recipient = %recipient, error = %err, "email delivery failed");
            failed.push(recipient.clone());
        }
    }
    if failed.is_empty() || failed.len() == recipients.len() {
        return None;
    }
    Some(Alert {
        id: uuid::Uuid::new_v4().to_string()[..8].to_string(),
        level: AlertLevel::Warning,
        source: "alert_manager".to_string(),
        message: format!("email delivery failed for: {}", failed.join(", ")),
        at: chrono::Utc::now(),
        data: Default::default(),
        acknowledged: false,
        acknowledged_by: None,
        acknowledged_at: None,
        channels_sent: Vec::new(),
    })
}

/// Placeholder SMTP delivery: logs the intended send. A real deployment
/// would wire in `lettre` here without changing this function's contract.
async fn deliver_email(alert: &Alert, recipient: &str) -> anyhow::Result<()> {
    tracing::debug!(recipient = %recipient, "would send email: {}", alert.message);
    Ok(())
}

pub async fn send_push(alert: &Alert) {
    tracing::debug!("would send push notification: {}", alert.message);
}

pub async fn send_sms(alert: &Alert) {
    tracing::debug!("would send sms: {}", alert.message);
}

pub async fn send_call(alert: &Alert) {
    tracing::debug!("would place voice call: {}", alert.message);
}

pub async fn send_webhook(client: &reqwest::Client, url: &str, alert: &Alert) {
    let payload = if url.contains("slack") {
        json!({
            "attachments": [{
                "color": slack_color(alert.level),
                "title": format!("NIGHTWATCH {:?}", alert.level),
                "text": alert.message,
                "fields": [
                    {"title": "Source", "value": alert.source, "short": true},
                    {"title": "Time", "value": alert.at.format("%H:%M:%S").to_string(), "short": true},
                ],
                "footer": format!("Alert ID: {}", alert.id),
            }]
        })
    } else if url.contains("discord") {
        json!({
            "embeds": [{
                "title": format!("NIGHTWATCH {:?}", alert.level),
                "description": alert.message,
                "fields": [
                    {"name": "Source", "value": alert.source, "inline": true},
                    {"name": "Time", "value": alert.at.format("%H:%M:%S").to_string(), "inline": true},
                ],
                "footer": {"text": format!("Alert ID: {}", alert.id)},
            }]
        })
    } else {
        json!({
            "id": alert.id,
            "level": format!("{:?}", alert.level),
            "source": alert.source,
            "message": alert.message,
            "timestamp": alert.at.to_rfc3339(),
            "data": alert.data,
        })
    };

    let timeout = std::time::Duration::from_secs(crate::constants::alerts::WEBHOOK_TIMEOUT_SECONDS);
    match client.post(url).json(&payload).timeout(timeout).send().await {
        Ok(response) if response.status().is_success() => {
            tracing::debug!(url = %url, "webhook sent");
        }
        Ok(response) => {
            tracing::error!(url = %url, status = %response.status(), "webhook failed");
        }
        Err(err) => {
            tracing::error!(url = %url, error = %err, "webhook error");
        }
    }
}
