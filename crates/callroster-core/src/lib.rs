use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod config;
pub mod section;

pub use config::ConfigError;

pub const CALL_DIDNT_PICK: &str = "Call didn't Pick";
pub const DATE_KEY_FORMAT: &str = "%d-%b-%Y";
pub const ATTEMPT_SLOTS: usize = 3;

/// Ranked partition of the call-status vocabulary. Eligibility is membership
/// in any tier; the rank is informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    Tier1,
    Tier2,
    Tier3,
    Tier4,
}

impl PriorityTier {
    pub const ALL: [PriorityTier; 4] = [
        PriorityTier::Tier1,
        PriorityTier::Tier2,
        PriorityTier::Tier3,
        PriorityTier::Tier4,
    ];

    pub fn rank(self) -> u8 {
        match self {
            PriorityTier::Tier1 => 1,
            PriorityTier::Tier2 => 2,
            PriorityTier::Tier3 => 3,
            PriorityTier::Tier4 => 4,
        }
    }

    pub fn statuses(self) -> &'static [&'static str] {
        match self {
            PriorityTier::Tier1 => &["NDR"],
            PriorityTier::Tier2 => &["Confirmation Pending", "Fresh"],
            PriorityTier::Tier3 => &[CALL_DIDNT_PICK, "Follow up"],
            PriorityTier::Tier4 => &["Abandoned", "Number invalid/fake order"],
        }
    }

    pub fn for_status(status: &str) -> Option<Self> {
        let status = status.trim();
        Self::ALL
            .into_iter()
            .find(|tier| tier.statuses().contains(&status))
    }
}

pub fn is_priority_status(status: &str) -> bool {
    PriorityTier::for_status(status).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    Fresh,
    Abandoned,
    InvalidFake,
    Cnp,
    FollowUp,
    Ndr,
}

impl ReportCategory {
    /// Declared output order for report sections and messages.
    pub const ORDER: [ReportCategory; 6] = [
        ReportCategory::Fresh,
        ReportCategory::Abandoned,
        ReportCategory::InvalidFake,
        ReportCategory::Cnp,
        ReportCategory::FollowUp,
        ReportCategory::Ndr,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ReportCategory::Fresh => "Fresh",
            ReportCategory::Abandoned => "Abandoned",
            ReportCategory::InvalidFake => "Invalid/Fake",
            ReportCategory::Cnp => "CNP",
            ReportCategory::FollowUp => "Follow up",
            ReportCategory::Ndr => "NDR",
        }
    }

    pub fn for_status(status: &str) -> Option<Self> {
        match status.trim() {
            "Fresh" | "Confirmation Pending" => Some(ReportCategory::Fresh),
            "Abandoned" => Some(ReportCategory::Abandoned),
            "Number invalid/fake order" => Some(ReportCategory::InvalidFake),
            CALL_DIDNT_PICK => Some(ReportCategory::Cnp),
            "Follow up" => Some(ReportCategory::FollowUp),
            "NDR" => Some(ReportCategory::Ndr),
            _ => None,
        }
    }
}

impl fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Columns the engine understands by meaning rather than by header text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogicalColumn {
    CallStatus,
    OrderStatus,
    Stakeholder,
    Date1,
    Date2,
    Date3,
    OrderId,
    CustomerName,
    CreatedAt,
    CustomerId,
}

impl LogicalColumn {
    pub const ALL: [LogicalColumn; 10] = [
        LogicalColumn::CallStatus,
        LogicalColumn::OrderStatus,
        LogicalColumn::Stakeholder,
        LogicalColumn::Date1,
        LogicalColumn::Date2,
        LogicalColumn::Date3,
        LogicalColumn::OrderId,
        LogicalColumn::CustomerName,
        LogicalColumn::CreatedAt,
        LogicalColumn::CustomerId,
    ];

    /// Columns written back to the orders table after assignment.
    pub const WRITE_TARGETS: [LogicalColumn; 4] = [
        LogicalColumn::Stakeholder,
        LogicalColumn::Date1,
        LogicalColumn::Date2,
        LogicalColumn::Date3,
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub origin_row: u32,
    pub call_status: String,
    pub order_status: String,
    pub stakeholder: String,
    pub attempt_dates: [String; ATTEMPT_SLOTS],
    pub order_id: String,
    pub customer_name: String,
    pub created_at: String,
    pub customer_id: String,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Record {
    pub fn new(origin_row: u32, call_status: impl Into<String>) -> Self {
        Self {
            origin_row,
            call_status: call_status.into(),
            ..Self::default()
        }
    }

    pub fn is_eligible(&self) -> bool {
        is_priority_status(&self.call_status)
    }

    pub fn report_category(&self) -> Option<ReportCategory> {
        ReportCategory::for_status(&self.call_status)
    }

    pub fn populated_attempts(&self) -> usize {
        self.attempt_dates
            .iter()
            .filter(|value| !value.trim().is_empty())
            .count()
    }

    pub fn field(&self, column: LogicalColumn) -> &str {
        match column {
            LogicalColumn::CallStatus => &self.call_status,
            LogicalColumn::OrderStatus => &self.order_status,
            LogicalColumn::Stakeholder => &self.stakeholder,
            LogicalColumn::Date1 => &self.attempt_dates[0],
            LogicalColumn::Date2 => &self.attempt_dates[1],
            LogicalColumn::Date3 => &self.attempt_dates[2],
            LogicalColumn::OrderId => &self.order_id,
            LogicalColumn::CustomerName => &self.customer_name,
            LogicalColumn::CreatedAt => &self.created_at,
            LogicalColumn::CustomerId => &self.customer_id,
        }
    }

    pub fn set_field(&mut self, column: LogicalColumn, value: String) {
        match column {
            LogicalColumn::CallStatus => self.call_status = value,
            LogicalColumn::OrderStatus => self.order_status = value,
            LogicalColumn::Stakeholder => self.stakeholder = value,
            LogicalColumn::Date1 => self.attempt_dates[0] = value,
            LogicalColumn::Date2 => self.attempt_dates[1] = value,
            LogicalColumn::Date3 => self.attempt_dates[2] = value,
            LogicalColumn::OrderId => self.order_id = value,
            LogicalColumn::CustomerName => self.customer_name = value,
            LogicalColumn::CreatedAt => self.created_at = value,
            LogicalColumn::CustomerId => self.customer_id = value,
        }
    }
}

/// Ordered, non-empty stakeholder list used for round-robin assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    names: Vec<String>,
}

impl Roster {
    pub fn new(names: Vec<String>) -> Result<Self, ConfigError> {
        if names.is_empty() {
            return Err(ConfigError::EmptyRoster);
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn assignee(&self, position: usize) -> &str {
        &self.names[position % self.names.len()]
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|candidate| candidate == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeholderCounts {
    pub name: String,
    pub fresh: u32,
    pub abandoned: u32,
    pub invalid_fake: u32,
    pub cnp: u32,
    pub follow_up: u32,
    pub ndr: u32,
}

impl StakeholderCounts {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Always the sum of the category buckets; there is no separate tally.
    pub fn total(&self) -> u32 {
        ReportCategory::ORDER
            .into_iter()
            .map(|category| self.count(category))
            .sum()
    }

    pub fn count(&self, category: ReportCategory) -> u32 {
        match category {
            ReportCategory::Fresh => self.fresh,
            ReportCategory::Abandoned => self.abandoned,
            ReportCategory::InvalidFake => self.invalid_fake,
            ReportCategory::Cnp => self.cnp,
            ReportCategory::FollowUp => self.follow_up,
            ReportCategory::Ndr => self.ndr,
        }
    }

    pub fn increment(&mut self, category: ReportCategory) {
        let slot = match category {
            ReportCategory::Fresh => &mut self.fresh,
            ReportCategory::Abandoned => &mut self.abandoned,
            ReportCategory::InvalidFake => &mut self.invalid_fake,
            ReportCategory::Cnp => &mut self.cnp,
            ReportCategory::FollowUp => &mut self.follow_up,
            ReportCategory::Ndr => &mut self.ndr,
        };
        *slot = slot.saturating_add(1);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub date_key: String,
    pub stakeholders: Vec<StakeholderCounts>,
}

impl RunReport {
    /// One all-zero entry per distinct roster name, in roster order.
    pub fn zeroed(roster: &Roster, date_key: impl Into<String>) -> Self {
        let mut stakeholders: Vec<StakeholderCounts> = Vec::with_capacity(roster.len());
        for name in roster.names() {
            if stakeholders.iter().all(|entry| &entry.name != name) {
                stakeholders.push(StakeholderCounts::new(name.clone()));
            }
        }
        Self {
            date_key: date_key.into(),
            stakeholders,
        }
    }

    pub fn entry(&self, name: &str) -> Option<&StakeholderCounts> {
        self.stakeholders.iter().find(|entry| entry.name == name)
    }

    pub fn entry_mut(&mut self, name: &str) -> Option<&mut StakeholderCounts> {
        self.stakeholders.iter_mut().find(|entry| entry.name == name)
    }

    pub fn grand_total(&self) -> u32 {
        self.stakeholders.iter().map(StakeholderCounts::total).sum()
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn parse_date_key(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value.trim(), DATE_KEY_FORMAT)
}
