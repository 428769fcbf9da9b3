pub mod aggregate;
pub mod assign;
pub mod locate;
pub mod normalize;
pub mod persist;
pub mod run;
pub mod writer;

pub use aggregate::aggregate;
pub use assign::{AssignmentEngine, AssignmentSummary, AttemptUpdate};
pub use locate::{find_section_span, locate_section, SectionSpan};
pub use normalize::{ColumnMap, NormalizeError, RecordNormalizer, RecordTable, SchemaWarning};
pub use persist::{write_back, WriteBackReport};
pub use run::{distribute_and_report, Distributor, DistributorConfig, ReportWrite, RunError, RunOutcome};
pub use writer::{ReportWriter, SectionWrite};
