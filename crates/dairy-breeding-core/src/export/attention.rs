//! Herd attention list export.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::{Database, DbResult};
use crate::engine::{bucket_counts, build_summaries, classify_and_sort, ClassifiedCow, SortGroup};
use crate::models::AlertConfig;

/// Attention report metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttentionMetadata {
    /// Date the list was computed for
    pub report_date: NaiveDate,
    /// Export timestamp
    pub exported_at: String,
    /// Thresholds in effect
    pub config: AlertConfig,
}

/// Single row of the attention list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttentionRow {
    pub bucket: SortGroup,
    pub cow_id: String,
    pub cow_number: String,
    pub status: String,
    pub service_number: u32,
    pub latest_ai_date: NaiveDate,
    pub pd_date: Option<NaiveDate>,
    pub expected_delivery_date: NaiveDate,
    pub delivered_date: Option<NaiveDate>,
    /// Day count the row was sorted by within its bucket
    pub sort_days: Option<i64>,
    pub move_to_close_up: bool,
}

impl From<&ClassifiedCow> for AttentionRow {
    fn from(item: &ClassifiedCow) -> Self {
        let s = &item.summary;
        Self {
            bucket: item.bucket,
            cow_id: s.cow_id.clone(),
            cow_number: s.cow_number.clone(),
            status: s.status.to_string(),
            service_number: s.service_number,
            latest_ai_date: s.latest_ai_date,
            pd_date: s.pd_date,
            expected_delivery_date: s.expected_delivery_date,
            delivered_date: s.delivered_date,
            sort_days: item.sort_days,
            move_to_close_up: item.flags.move_to_close_up,
        }
    }
}

/// Ordered attention list for one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttentionReport {
    pub metadata: AttentionMetadata,
    /// Cows per bucket
    pub counts: BTreeMap<SortGroup, usize>,
    /// Rows in attention order
    pub rows: Vec<AttentionRow>,
}

impl AttentionReport {
    /// Build a report from an already classified and sorted list.
    pub fn from_classified(classified: &[ClassifiedCow], today: NaiveDate, config: AlertConfig) -> Self {
        Self {
            metadata: AttentionMetadata {
                report_date: today,
                exported_at: chrono::Utc::now().to_rfc3339(),
                config,
            },
            counts: bucket_counts(classified),
            rows: classified.iter().map(AttentionRow::from).collect(),
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        csv.push_str("bucket,cow_number,status,service_number,latest_ai_date,pd_date,expected_delivery_date,delivered_date,sort_days,move_to_close_up\n");

        for row in &self.rows {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{}\n",
                row.bucket,
                escape_csv(&row.cow_number),
                row.status,
                row.service_number,
                row.latest_ai_date,
                optional(row.pd_date),
                row.expected_delivery_date,
                optional(row.delivered_date),
                optional(row.sort_days),
                row.move_to_close_up,
            ));
        }

        csv
    }
}

/// Builds attention lists straight from the database.
pub struct AttentionExporter<'a> {
    db: &'a Database,
}

impl<'a> AttentionExporter<'a> {
    /// Create a new attention exporter.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Classify the whole herd for `today` using stored thresholds.
    pub fn classify(&self, today: NaiveDate) -> DbResult<Vec<ClassifiedCow>> {
        let config = self.db.get_alert_config()?;
        self.classify_with(today, &config)
    }

    fn classify_with(&self, today: NaiveDate, config: &AlertConfig) -> DbResult<Vec<ClassifiedCow>> {
        let cycles = self.db.list_all_cycles()?;
        let cows = self.db.list_cows()?;
        let summaries = build_summaries(&cycles, &cows, config);
        Ok(classify_and_sort(&summaries, today, config))
    }

    /// Full report for `today`.
    pub fn export(&self, today: NaiveDate) -> DbResult<AttentionReport> {
        let config = self.db.get_alert_config()?;
        let classified = self.classify_with(today, &config)?;
        Ok(AttentionReport::from_classified(&classified, today, config))
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cow, CyclePatch, NewCycle, PdOutcome, PdResult};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn setup_herd() -> Database {
        let db = Database::open_in_memory().unwrap();

        let due = Cow::new("12");
        let pregnant = Cow::new("7,B");
        db.insert_cow(&due).unwrap();
        db.insert_cow(&pregnant).unwrap();
        db.insert_cow(&Cow::new("99")).unwrap(); // no cycles

        db.create_cycle(&NewCycle::new(due.id.clone(), date("2024-01-01")))
            .unwrap();

        let mut new_cycle = NewCycle::new(pregnant.id.clone(), date("2023-07-01"));
        new_cycle.expected_delivery_date = Some(date("2024-04-01"));
        let cycle = db.create_cycle(&new_cycle).unwrap();
        db.update_cycle(
            &cycle.id,
            &CyclePatch::RecordPd(PdOutcome {
                result: PdResult::Positive,
                date: date("2023-09-01"),
            }),
        )
        .unwrap();

        db
    }

    #[test]
    fn test_export_orders_rows() {
        let db = setup_herd();
        let report = AttentionExporter::new(&db).export(date("2024-03-05")).unwrap();

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].bucket, SortGroup::AboutToDeliver);
        assert_eq!(report.rows[0].cow_number, "7,B");
        assert_eq!(report.rows[1].bucket, SortGroup::PdOverdue);
        assert_eq!(report.counts[&SortGroup::AboutToDeliver], 1);
        assert_eq!(report.counts[&SortGroup::Others], 0);
    }

    #[test]
    fn test_attention_csv() {
        let db = setup_herd();
        let report = AttentionExporter::new(&db).export(date("2024-03-05")).unwrap();

        let csv = report.to_csv();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3); // Header + 2 cows
        assert!(lines[0].starts_with("bucket,"));
        assert!(lines[1].starts_with("ABOUT_TO_DELIVER,\"7,B\",pregnant"));
        assert!(lines[2].starts_with("PD_OVERDUE,12,pending"));
    }

    #[test]
    fn test_attention_json() {
        let db = setup_herd();
        let report = AttentionExporter::new(&db).export(date("2024-03-05")).unwrap();

        let json = report.to_json().unwrap();
        assert!(json.contains("\"ABOUT_TO_DELIVER\""));
        assert!(json.contains("\"report_date\": \"2024-03-05\""));
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
    }
}
