//! Report listings grouped by CR name, and article rejection toggling.

use crate::database::models::{ArticleReportContract, Report};
use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

pub const NOT_AVAILABLE: &str = "N/A";

/// Reports without a CR name are grouped under this key
const UNNAMED_GROUP: &str = "";

/// Parse a submitted date given as `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_submitted_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

pub fn normalize_submitted_date(raw: Option<&str>) -> String {
    raw.and_then(parse_submitted_date)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn normalized(mut report: Report) -> Report {
    report.date_submitted_to_client =
        Some(normalize_submitted_date(report.date_submitted_to_client.as_deref()));
    report
}

fn group_name(report: &Report) -> String {
    report.name_cr_format.clone().unwrap_or_else(|| UNNAMED_GROUP.to_string())
}

/// CR name -> reports in listing order, dates normalized.
pub fn group_reports_table(reports: Vec<Report>) -> BTreeMap<String, Vec<Report>> {
    let mut groups: BTreeMap<String, Vec<Report>> = BTreeMap::new();
    for report in reports {
        groups.entry(group_name(&report)).or_default().push(normalized(report));
    }
    groups
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrNameGroup {
    pub cr_name: String,
    pub reports_array: Vec<Report>,
}

/// Groups newest CR name first; each group lists its newest report first.
pub fn group_reports_by_cr_name(reports: Vec<Report>) -> Vec<CrNameGroup> {
    group_reports_table(reports)
        .into_iter()
        .rev()
        .map(|(cr_name, mut reports_array)| {
            reports_array.sort_by(|a, b| b.id.cmp(&a.id));
            CrNameGroup { cr_name, reports_array }
        })
        .collect()
}

/// Flip acceptance; only a rejected contract keeps a reason.
pub fn toggle_rejection(
    mut contract: ArticleReportContract,
    reason: Option<String>,
) -> ArticleReportContract {
    contract.article_accepted_by_cpsc = !contract.article_accepted_by_cpsc;
    contract.article_rejection_reason =
        if contract.article_accepted_by_cpsc { None } else { reason };
    contract
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn report(id: i64, cr: &str, submitted: Option<&str>) -> Report {
        Report {
            id,
            name_cr_format: Some(cr.to_string()),
            name_zip_file: Some(format!("{}.zip", id)),
            date_submitted_to_client: submitted.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_normalize_submitted_date() {
        assert_eq!(normalize_submitted_date(Some("2026-02-22")), "2026-02-22");
        assert_eq!(normalize_submitted_date(Some("2026-02-22T18:00:00Z")), "2026-02-22");
        assert_eq!(normalize_submitted_date(Some("not-a-date")), NOT_AVAILABLE);
        assert_eq!(normalize_submitted_date(None), NOT_AVAILABLE);
    }

    #[test]
    fn test_group_reports_table() {
        let groups = group_reports_table(vec![
            report(1, "cr260222", Some("not-a-date")),
            report(2, "cr260222", Some("2026-02-22")),
            report(3, "cr260223", None),
        ]);

        assert_eq!(groups.len(), 2);
        let first = &groups["cr260222"];
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].date_submitted_to_client.as_deref(), Some(NOT_AVAILABLE));
        assert_eq!(first[1].date_submitted_to_client.as_deref(), Some("2026-02-22"));
    }

    #[test]
    fn test_group_reports_by_cr_name_newest_first() {
        let groups = group_reports_by_cr_name(vec![
            report(10, "cr260222", Some("2026-02-22")),
            report(11, "cr260223", None),
            report(12, "cr260222", None),
        ]);

        let names: Vec<_> = groups.iter().map(|g| g.cr_name.as_str()).collect();
        assert_eq!(names, ["cr260223", "cr260222"]);
        let ids: Vec<_> = groups[1].reports_array.iter().map(|r| r.id).collect();
        assert_eq!(ids, [12, 10]);
    }

    #[test]
    fn test_toggle_rejection() {
        let contract = ArticleReportContract {
            id: 77,
            report_id: 1,
            article_id: 5,
            article_reference_number_in_report: None,
            article_accepted_by_cpsc: true,
            article_rejection_reason: None,
        };

        let rejected = toggle_rejection(contract, Some("Insufficient details".to_string()));
        assert!(!rejected.article_accepted_by_cpsc);
        assert_eq!(rejected.article_rejection_reason.as_deref(), Some("Insufficient details"));

        let accepted = toggle_rejection(rejected, Some("ignored".to_string()));
        assert!(accepted.article_accepted_by_cpsc);
        assert_eq!(accepted.article_rejection_reason, None);
    }
}
