use callroster_core::{Record, Roster, ATTEMPT_SLOTS, CALL_DIDNT_PICK};
use tracing::{debug, info};

/// What `apply_attempt_dates` did to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptUpdate {
    /// A "didn't pick" retry landed in the zero-based `slot`.
    Recorded { slot: usize },
    /// All retry slots were already populated; nothing changed.
    Exhausted,
    /// Any other eligible status: the first slot now holds today's date.
    Touched,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssignmentSummary {
    /// Indices into the record slice, in source order.
    pub processed: Vec<usize>,
    pub attempts_recorded: usize,
    pub attempts_exhausted: usize,
    pub touched: usize,
}

pub struct AssignmentEngine {
    roster: Roster,
}

impl AssignmentEngine {
    pub fn new(roster: Roster) -> Self {
        Self { roster }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn filter_eligible(records: &[Record]) -> Vec<usize> {
        records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.is_eligible())
            .map(|(index, _)| index)
            .collect()
    }

    /// Round-robin over the whole eligible sequence; prior assignments are overwritten.
    pub fn assign_stakeholders(&self, records: &mut [Record], eligible: &[usize]) -> usize {
        for (position, &index) in eligible.iter().enumerate() {
            records[index].stakeholder = self.roster.assignee(position).to_string();
        }
        info!(
            assigned = eligible.len(),
            stakeholders = self.roster.len(),
            "stakeholders assigned cyclically"
        );
        eligible.len()
    }

    pub fn apply_attempt_dates(record: &mut Record, date_key: &str) -> AttemptUpdate {
        if record.call_status.trim() != CALL_DIDNT_PICK {
            record.attempt_dates[0] = date_key.to_string();
            debug!(origin_row = record.origin_row, status = %record.call_status, "touched first date slot");
            return AttemptUpdate::Touched;
        }

        match record
            .attempt_dates
            .iter()
            .position(|value| value.trim().is_empty())
        {
            Some(slot) => {
                record.attempt_dates[slot] = date_key.to_string();
                debug!(origin_row = record.origin_row, attempt = slot + 1, "recorded retry attempt");
                AttemptUpdate::Recorded { slot }
            }
            None => {
                debug!(
                    origin_row = record.origin_row,
                    slots = ATTEMPT_SLOTS,
                    "retry attempts exhausted; dates unchanged"
                );
                AttemptUpdate::Exhausted
            }
        }
    }

    pub fn run(&self, records: &mut [Record], date_key: &str) -> AssignmentSummary {
        let processed = Self::filter_eligible(records);
        info!(eligible = processed.len(), "filtered rows on priority statuses");
        if processed.is_empty() {
            return AssignmentSummary::default();
        }

        self.assign_stakeholders(records, &processed);

        let mut summary = AssignmentSummary {
            processed,
            ..AssignmentSummary::default()
        };
        for &index in &summary.processed {
            match Self::apply_attempt_dates(&mut records[index], date_key) {
                AttemptUpdate::Recorded { .. } => summary.attempts_recorded += 1,
                AttemptUpdate::Exhausted => summary.attempts_exhausted += 1,
                AttemptUpdate::Touched => summary.touched += 1,
            }
        }
        info!(
            rows = summary.processed.len(),
            retries = summary.attempts_recorded,
            exhausted = summary.attempts_exhausted,
            "applied date tracking"
        );
        summary
    }
}
