use callroster_core::section::{end_marker, start_marker};
use callroster_core::{ReportCategory, RunReport};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{error, info};

pub mod templates;
pub mod waha;

pub use templates::{render, TemplateError, COD_CONFIRMATION, PROMO_MESSAGE};
pub use waha::{WahaConfig, WahaSink};

pub const PERSONAL_SUFFIX: &str = "@c.us";
pub const GROUP_SUFFIX: &str = "@g.us";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid channel id: {0:?}")]
    InvalidChannel(String),
    #[error("{endpoint} returned http status {code}: {body}")]
    Status {
        endpoint: String,
        code: u16,
        body: String,
    },
    #[error("{endpoint} transport error: {message}")]
    Transport { endpoint: String, message: String },
    #[error("{endpoint} returned an unreadable body: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Personal,
    Group,
}

/// A delivery destination. Ids without a known suffix are personal chats.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn parse(raw: &str) -> Result<Self, NotifyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(NotifyError::InvalidChannel(raw.to_string()));
        }
        if trimmed.ends_with(PERSONAL_SUFFIX) || trimmed.contains(GROUP_SUFFIX) {
            return Ok(Self(trimmed.to_string()));
        }
        Ok(Self(format!("{trimmed}{PERSONAL_SUFFIX}")))
    }

    pub fn kind(&self) -> ChannelKind {
        if self.0.contains(GROUP_SUFFIX) {
            ChannelKind::Group
        } else {
            ChannelKind::Personal
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReceipt {
    pub channel: ChannelId,
    pub message_id: Option<String>,
    pub response: serde_json::Value,
}

pub trait NotificationSink {
    fn send(&self, channel: &ChannelId, text: &str) -> Result<DeliveryReceipt, NotifyError>;
}

impl<T: NotificationSink + ?Sized> NotificationSink for &T {
    fn send(&self, channel: &ChannelId, text: &str) -> Result<DeliveryReceipt, NotifyError> {
        (**self).send(channel, text)
    }
}

/// Renders the chat version of a report. Category lines use `- Label - n`,
/// unlike the log section.
pub fn format_report_message(report: &RunReport) -> String {
    let mut lines = vec![start_marker(&report.date_key), String::new()];
    for entry in &report.stakeholders {
        lines.push(format!("Calls assigned {}", entry.name));
        lines.push(format!("- Total Calls This Run - {}", entry.total()));
        for category in ReportCategory::ORDER {
            lines.push(format!("- {} - {}", category.label(), entry.count(category)));
        }
        lines.push(String::new());
    }
    lines.push(end_marker(&report.date_key));
    lines.join("\n")
}

pub struct Notifier<S> {
    sink: S,
    channel: ChannelId,
}

impl<S: NotificationSink> Notifier<S> {
    pub fn new(sink: S, channel: ChannelId) -> Self {
        Self { sink, channel }
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn notify_report(&self, report: &RunReport) -> Result<DeliveryReceipt, NotifyError> {
        let message = format_report_message(report);
        info!(
            channel = %self.channel,
            kind = ?self.channel.kind(),
            date_key = %report.date_key,
            "sending stakeholder report"
        );
        match self.sink.send(&self.channel, &message) {
            Ok(receipt) => {
                info!(channel = %self.channel, message_id = ?receipt.message_id, "report delivered");
                Ok(receipt)
            }
            Err(err) => {
                error!(channel = %self.channel, error = %err, "failed to deliver report");
                Err(err)
            }
        }
    }
}
