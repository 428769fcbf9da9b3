use callroster_core::{Record, Roster, RunReport};
use tracing::{debug, info};

/// Counts only the records processed in this run. A status without a report
/// category adds to no bucket and therefore not to the total either.
pub fn aggregate(roster: &Roster, records: &[Record], processed: &[usize], date_key: &str) -> RunReport {
    let mut report = RunReport::zeroed(roster, date_key);
    let mut counted = 0usize;
    for &index in processed {
        let record = &records[index];
        let Some(entry) = report.entry_mut(&record.stakeholder) else {
            continue;
        };
        counted += 1;
        match record.report_category() {
            Some(category) => entry.increment(category),
            None => debug!(
                origin_row = record.origin_row,
                status = %record.call_status,
                "status has no report category; excluded from counts"
            ),
        }
    }
    info!(counted, total = report.grand_total(), "calculated report counts");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use callroster_core::ReportCategory;

    fn roster(names: &[&str]) -> Roster {
        Roster::new(names.iter().map(|name| name.to_string()).collect()).expect("roster")
    }

    fn assigned(status: &str, stakeholder: &str) -> Record {
        let mut record = Record::new(3, status);
        record.stakeholder = stakeholder.to_string();
        record
    }

    #[test]
    fn counts_per_stakeholder_and_category() {
        let records = vec![
            assigned("Fresh", "A"),
            assigned("NDR", "B"),
            assigned("Follow up", "A"),
            assigned("Confirmation Pending", "B"),
        ];
        let report = aggregate(&roster(&["A", "B", "C"]), &records, &[0, 1, 2, 3], "01-May-2025");

        let a = report.entry("A").expect("A");
        assert_eq!(a.total(), 2);
        assert_eq!(a.count(ReportCategory::Fresh), 1);
        assert_eq!(a.count(ReportCategory::FollowUp), 1);

        let b = report.entry("B").expect("B");
        assert_eq!((b.ndr, b.fresh, b.total()), (1, 1, 2));

        let c = report.entry("C").expect("C present with zero counts");
        assert_eq!(c.total(), 0);
        assert_eq!(report.stakeholders.len(), 3);
    }

    #[test]
    fn only_processed_records_are_counted() {
        let records = vec![assigned("Fresh", "A"), assigned("Fresh", "A")];
        let report = aggregate(&roster(&["A"]), &records, &[1], "01-May-2025");
        assert_eq!(report.entry("A").expect("A").total(), 1);
    }

    #[test]
    fn uncategorized_status_is_dropped_from_every_bucket_and_the_total() {
        let records = vec![assigned("Escalated", "A"), assigned("NDR", "A")];
        let report = aggregate(&roster(&["A"]), &records, &[0, 1], "01-May-2025");
        let a = report.entry("A").expect("A");
        assert_eq!(a.total(), 1);
        assert_eq!(a.ndr, 1);
    }

    #[test]
    fn total_always_equals_bucket_sum() {
        let statuses = ["Fresh", "Abandoned", "Number invalid/fake order", "Call didn't Pick", "NDR", "Follow up"];
        let records: Vec<Record> = statuses
            .iter()
            .cycle()
            .take(17)
            .enumerate()
            .map(|(index, status)| assigned(status, ["A", "B"][index % 2]))
            .collect();
        let processed: Vec<usize> = (0..records.len()).collect();
        let report = aggregate(&roster(&["A", "B"]), &records, &processed, "01-May-2025");
        for entry in &report.stakeholders {
            let buckets: u32 = ReportCategory::ORDER.iter().map(|category| entry.count(*category)).sum();
            assert_eq!(entry.total(), buckets);
        }
        assert_eq!(report.grand_total(), 17);
    }
}
