use crate::aggregate::aggregate;
use crate::assign::{AssignmentEngine, AssignmentSummary};
use crate::normalize::{NormalizeError, RecordNormalizer, SchemaWarning};
use crate::persist::{write_back, WriteBackReport};
use crate::writer::{ReportWriter, SectionWrite};
use callroster_core::config::{ColumnNames, Layout, Settings};
use callroster_core::{date_key, ConfigError, RunReport};
use callroster_storage::{A1Range, StoreError, TabularStore};
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("failed to read table {table}: {source}")]
    Read {
        table: String,
        #[source]
        source: StoreError,
    },
    #[error("normalize error: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("failed to write assignments back to {table}: {source}")]
    WriteBack {
        table: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone)]
pub struct DistributorConfig {
    pub orders_table: String,
    pub report_table: String,
    pub read_range: String,
    pub layout: Layout,
    pub columns: ColumnNames,
}

impl DistributorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            orders_table: settings.store.orders_table.clone(),
            report_table: settings.store.report_table.clone(),
            read_range: settings.read_range.clone(),
            layout: settings.layout,
            columns: settings.columns.clone(),
        }
    }
}

/// Result of the report-write phase. A failure here never unwinds the
/// assignments already written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportWrite {
    Written(SectionWrite),
    Skipped,
    Failed(String),
}

impl ReportWrite {
    pub fn is_failed(&self) -> bool {
        matches!(self, ReportWrite::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub date_key: String,
    pub report: RunReport,
    pub assignment: AssignmentSummary,
    /// `None` when nothing was eligible and no write-back was attempted.
    pub write_back: Option<WriteBackReport>,
    pub section: ReportWrite,
    pub warnings: Vec<SchemaWarning>,
}

impl RunOutcome {
    pub fn assigned(&self) -> usize {
        self.assignment.processed.len()
    }
}

pub struct Distributor {
    config: DistributorConfig,
    engine: AssignmentEngine,
    normalizer: RecordNormalizer,
    writer: ReportWriter,
}

impl Distributor {
    pub fn new(config: DistributorConfig, engine: AssignmentEngine) -> Self {
        let normalizer = RecordNormalizer::new(config.layout, config.columns.clone());
        let writer = ReportWriter::new(config.report_table.clone());
        Self {
            config,
            engine,
            normalizer,
            writer,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, RunError> {
        let roster = settings.roster()?;
        Ok(Self::new(
            DistributorConfig::from_settings(settings),
            AssignmentEngine::new(roster),
        ))
    }

    pub fn config(&self) -> &DistributorConfig {
        &self.config
    }

    pub fn engine(&self) -> &AssignmentEngine {
        &self.engine
    }

    /// One full pass: read, assign, persist, aggregate, then write the dated
    /// report section. Errors before the report phase abort the run.
    pub fn run<S: TabularStore + ?Sized>(&self, store: &mut S, today: NaiveDate) -> Result<RunOutcome, RunError> {
        let date_key = date_key(today);
        let table = self.config.orders_table.as_str();
        info!(table, date_key = %date_key, "starting stakeholder distribution run");

        let range = A1Range::parse_in(table, &self.config.read_range).map_err(|source| RunError::Read {
            table: table.to_string(),
            source,
        })?;
        let raw = store.read(&range).map_err(|source| RunError::Read {
            table: table.to_string(),
            source,
        })?;
        info!(rows = raw.len(), range = %range, "read orders table");

        let mut records = self.normalizer.normalize(&raw)?;
        let row_offset = range.first_row() - 1;
        if row_offset > 0 {
            for record in &mut records.records {
                record.origin_row += row_offset;
            }
        }
        let mut warnings = records.warnings;

        let assignment = self.engine.run(&mut records.records, &date_key);
        if assignment.processed.is_empty() {
            info!("no eligible rows; skipping write-back and report section");
            return Ok(RunOutcome {
                report: RunReport::zeroed(self.engine.roster(), &date_key),
                date_key,
                assignment,
                write_back: None,
                section: ReportWrite::Skipped,
                warnings,
            });
        }

        let written = write_back(
            store,
            table,
            range.first_col(),
            &records.columns,
            &self.config.columns,
            &records.records,
            &assignment.processed,
        )
        .map_err(|source| RunError::WriteBack {
            table: table.to_string(),
            source,
        })?;
        warnings.extend(written.warnings.iter().cloned());

        let report = aggregate(
            self.engine.roster(),
            &records.records,
            &assignment.processed,
            &date_key,
        );

        let section = match self.writer.write(store, &report) {
            Ok(outcome) => ReportWrite::Written(outcome),
            Err(err) => {
                error!(table = self.writer.log_table(), error = %err, "failed to write report section");
                ReportWrite::Failed(err.to_string())
            }
        };

        info!(
            assigned = assignment.processed.len(),
            total = report.grand_total(),
            warnings = warnings.len(),
            "distribution run finished"
        );
        Ok(RunOutcome {
            date_key,
            report,
            assignment,
            write_back: Some(written),
            section,
            warnings,
        })
    }
}

/// Runs the distribution and swallows fatal errors into `None` after logging
/// them, leaving the caller to decide on a fallback.
pub fn distribute_and_report<S: TabularStore + ?Sized>(
    settings: &Settings,
    store: &mut S,
    today: NaiveDate,
) -> Option<RunOutcome> {
    let distributor = match Distributor::from_settings(settings) {
        Ok(distributor) => distributor,
        Err(err) => {
            error!(error = %err, "cannot start distribution run");
            return None;
        }
    };
    match distributor.run(store, today) {
        Ok(outcome) => {
            for warning in &outcome.warnings {
                warn!(%warning, "schema warning");
            }
            Some(outcome)
        }
        Err(err) => {
            error!(error = %err, "distribution run aborted");
            None
        }
    }
}
