use crate::{LogicalColumn, Roster};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_SETTINGS_FILE: &str = "settings.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings file not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("settings parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("settings document is empty")]
    EmptyDocument,
    #[error("settings document has no stakeholders key")]
    MissingRoster,
    #[error("stakeholder roster is empty")]
    EmptyRoster,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub stakeholders: Option<Vec<String>>,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub columns: ColumnNames,
    #[serde(default = "default_read_range")]
    pub read_range: String,
    #[serde(default)]
    pub notify: Option<NotifySettings>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Err(ConfigError::EmptyDocument);
        }
        let parsed: Option<Settings> = serde_yaml::from_str(content)?;
        parsed.ok_or(ConfigError::EmptyDocument)
    }

    pub fn roster(&self) -> Result<Roster, ConfigError> {
        let names = self
            .stakeholders
            .clone()
            .ok_or(ConfigError::MissingRoster)?;
        Roster::new(names)
    }
}

fn default_read_range() -> String {
    "A:BD".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub path: PathBuf,
    pub orders_table: String,
    pub report_table: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("callroster.db"),
            orders_table: "Sheet1".to_string(),
            report_table: "Stakeholder Report".to_string(),
        }
    }
}

/// Zero-based offsets of the header row and the first data row in the raw table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub header_row_index: usize,
    pub data_start_row_index: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            header_row_index: 1,
            data_start_row_index: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub call_status: String,
    pub order_status: String,
    pub stakeholder: String,
    pub date_1: String,
    pub date_2: String,
    pub date_3: String,
    pub order_id: String,
    pub customer_name: String,
    pub created_at: String,
    pub customer_id: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            call_status: "Call-status".to_string(),
            order_status: "order status".to_string(),
            stakeholder: "Stakeholder".to_string(),
            date_1: "Date".to_string(),
            date_2: "Date 2".to_string(),
            date_3: "Date 3".to_string(),
            order_id: "Id".to_string(),
            customer_name: "Name".to_string(),
            created_at: "Created At".to_string(),
            customer_id: "Id (Customer)".to_string(),
        }
    }
}

impl ColumnNames {
    pub fn header_for(&self, column: LogicalColumn) -> &str {
        match column {
            LogicalColumn::CallStatus => &self.call_status,
            LogicalColumn::OrderStatus => &self.order_status,
            LogicalColumn::Stakeholder => &self.stakeholder,
            LogicalColumn::Date1 => &self.date_1,
            LogicalColumn::Date2 => &self.date_2,
            LogicalColumn::Date3 => &self.date_3,
            LogicalColumn::OrderId => &self.order_id,
            LogicalColumn::CustomerName => &self.customer_name,
            LogicalColumn::CreatedAt => &self.created_at,
            LogicalColumn::CustomerId => &self.customer_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifySettings {
    pub base_url: String,
    pub session: String,
    pub channel: String,
    #[serde(default = "default_typing_seconds")]
    pub typing_seconds: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_typing_seconds() -> u64 {
    3
}

fn default_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: Option<PathBuf>,
    pub level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
stakeholders:
  - Deepasha
  - Khushi
  - Komal
store:
  path: /tmp/orders.db
  orders_table: Orders
layout:
  header_row_index: 0
  data_start_row_index: 1
columns:
  call_status: Status
notify:
  base_url: http://localhost:3000
  session: default
  channel: "120363418230720597@g.us"
"#;

    #[test]
    fn parses_full_document_with_defaults() {
        let settings = Settings::from_yaml_str(SAMPLE).expect("parse");
        let roster = settings.roster().expect("roster");
        assert_eq!(roster.names(), ["Deepasha", "Khushi", "Komal"]);
        assert_eq!(settings.store.orders_table, "Orders");
        assert_eq!(settings.store.report_table, "Stakeholder Report");
        assert_eq!(settings.layout.header_row_index, 0);
        assert_eq!(settings.columns.call_status, "Status");
        assert_eq!(settings.columns.date_2, "Date 2");
        assert_eq!(settings.read_range, "A:BD");
        let notify = settings.notify.expect("notify section");
        assert_eq!(notify.typing_seconds, 3);
    }

    #[test]
    fn missing_and_empty_rosters_are_configuration_errors() {
        let missing = Settings::from_yaml_str("store:\n  path: x.db\n").expect("parse");
        assert!(matches!(missing.roster(), Err(ConfigError::MissingRoster)));

        let empty = Settings::from_yaml_str("stakeholders: []\n").expect("parse");
        assert!(matches!(empty.roster(), Err(ConfigError::EmptyRoster)));
    }

    #[test]
    fn empty_document_is_rejected() {
        assert!(matches!(
            Settings::from_yaml_str("   \n"),
            Err(ConfigError::EmptyDocument)
        ));
        assert!(matches!(
            Settings::from_yaml_str("~\n"),
            Err(ConfigError::EmptyDocument)
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Settings::load("/definitely/not/here/settings.yaml").expect_err("missing");
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn example_settings_parse() {
        let settings = Settings::from_yaml_str(include_str!("../../../settings.example.yaml"))
            .expect("example settings");
        assert_eq!(settings.roster().expect("roster").len(), 3);
        assert_eq!(settings.logging.dir, Some(PathBuf::from("logs")));
        assert_eq!(
            settings.notify.expect("notify").channel,
            "120363418230720597@g.us"
        );
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = NamedTempFile::new().expect("temp settings");
        file.write_all(b"stakeholders: [A, B]\n").expect("write");
        let settings = Settings::load(file.path()).expect("load");
        assert_eq!(settings.roster().expect("roster").len(), 2);
    }
}
