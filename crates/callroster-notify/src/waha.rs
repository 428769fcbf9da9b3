use crate::{ChannelId, DeliveryReceipt, NotificationSink, NotifyError};
use callroster_core::config::NotifySettings;
use serde::Serialize;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const SEND_TEXT: &str = "sendText";
const START_TYPING: &str = "startTyping";
const STOP_TYPING: &str = "stopTyping";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WahaConfig {
    pub base_url: String,
    pub session: String,
    /// Pause between the typing indicator starting and the message going out.
    pub typing: Duration,
    pub timeout: Duration,
}

impl WahaConfig {
    pub fn from_settings(settings: &NotifySettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            session: settings.session.clone(),
            typing: Duration::from_secs(settings.typing_seconds),
            timeout: Duration::from_millis(settings.timeout_ms),
        }
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/api/{endpoint}", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendTextRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    session: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TypingRequest<'a> {
    chat_id: &'a str,
    session: &'a str,
}

/// Delivers messages through a WAHA HTTP API session.
pub struct WahaSink {
    config: WahaConfig,
    agent: ureq::Agent,
}

impl WahaSink {
    pub fn new(config: WahaConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.timeout)
            .timeout_read(config.timeout)
            .timeout_write(config.timeout)
            .build();
        Self { config, agent }
    }

    pub fn config(&self) -> &WahaConfig {
        &self.config
    }

    fn post<T: Serialize>(&self, endpoint: &str, payload: &T) -> Result<serde_json::Value, NotifyError> {
        let url = self.config.endpoint_url(endpoint);
        debug!(%url, "posting to WAHA");
        match self
            .agent
            .post(&url)
            .set("content-type", "application/json")
            .send_json(payload)
        {
            Ok(resp) => {
                let body = resp.into_string().map_err(|source| NotifyError::Decode {
                    endpoint: endpoint.to_string(),
                    source,
                })?;
                if body.trim().is_empty() {
                    return Ok(serde_json::Value::Null);
                }
                Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body)))
            }
            Err(ureq::Error::Status(code, resp)) => Err(NotifyError::Status {
                endpoint: endpoint.to_string(),
                code,
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(err)) => Err(NotifyError::Transport {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            }),
        }
    }

    pub fn send_text(&self, channel: &ChannelId, text: &str) -> Result<DeliveryReceipt, NotifyError> {
        let response = self.post(
            SEND_TEXT,
            &SendTextRequest {
                chat_id: channel.as_str(),
                text,
                session: &self.config.session,
            },
        )?;
        Ok(DeliveryReceipt {
            channel: channel.clone(),
            message_id: message_id(&response),
            response,
        })
    }

    /// Typing indicators are cosmetic; failures are logged and swallowed.
    fn typing(&self, endpoint: &str, channel: &ChannelId) {
        let payload = TypingRequest {
            chat_id: channel.as_str(),
            session: &self.config.session,
        };
        if let Err(err) = self.post(endpoint, &payload) {
            warn!(endpoint, channel = %channel, error = %err, "typing indicator failed");
        }
    }
}

impl NotificationSink for WahaSink {
    fn send(&self, channel: &ChannelId, text: &str) -> Result<DeliveryReceipt, NotifyError> {
        self.typing(START_TYPING, channel);
        if !self.config.typing.is_zero() {
            thread::sleep(self.config.typing);
        }
        self.typing(STOP_TYPING, channel);

        let receipt = self.send_text(channel, text)?;
        info!(channel = %channel, chars = text.chars().count(), "message sent");
        Ok(receipt)
    }
}

/// WAHA answers `sendText` with the created message; its id is either a
/// plain string or an object carrying `_serialized`.
fn message_id(response: &serde_json::Value) -> Option<String> {
    let id = response.get("id")?;
    id.as_str()
        .or_else(|| id.get("_serialized").and_then(|value| value.as_str()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_url_tolerates_trailing_slash() {
        let config = WahaConfig {
            base_url: "http://localhost:3000/".to_string(),
            session: "default".to_string(),
            typing: Duration::ZERO,
            timeout: Duration::from_secs(1),
        };
        assert_eq!(config.endpoint_url(SEND_TEXT), "http://localhost:3000/api/sendText");
    }

    #[test]
    fn request_bodies_use_waha_field_names() {
        let body = serde_json::to_value(SendTextRequest {
            chat_id: "1@c.us",
            text: "hi",
            session: "bot",
        })
        .expect("serialize");
        assert_eq!(body, json!({"chatId": "1@c.us", "text": "hi", "session": "bot"}));

        let typing = serde_json::to_value(TypingRequest {
            chat_id: "1@g.us",
            session: "bot",
        })
        .expect("serialize");
        assert_eq!(typing, json!({"chatId": "1@g.us", "session": "bot"}));
    }

    #[test]
    fn message_id_reads_both_shapes() {
        assert_eq!(message_id(&json!({"id": "abc"})), Some("abc".to_string()));
        assert_eq!(
            message_id(&json!({"id": {"fromMe": true, "_serialized": "true_1@c.us_X"}})),
            Some("true_1@c.us_X".to_string())
        );
        assert_eq!(message_id(&json!({"ok": true})), None);
        assert_eq!(message_id(&serde_json::Value::Null), None);
    }

    #[test]
    fn settings_map_to_durations() {
        let settings = NotifySettings {
            base_url: "http://waha".to_string(),
            session: "bot".to_string(),
            channel: "1@g.us".to_string(),
            typing_seconds: 3,
            timeout_ms: 2_500,
        };
        let config = WahaConfig::from_settings(&settings);
        assert_eq!(config.typing, Duration::from_secs(3));
        assert_eq!(config.timeout, Duration::from_millis(2_500));
    }
}
