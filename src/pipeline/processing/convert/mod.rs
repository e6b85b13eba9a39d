use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ConversionConfig;
use crate::domain::{Anomaly, CanonicalField, MaintenanceRecord};
use crate::error::{ConverterError, Result};
use crate::pipeline::ingestion::table::{RawCell, RawRow, RawTable};
use crate::pipeline::processing::anomaly::AnomalyDetector;
use crate::pipeline::processing::column_map::{ColumnMapper, ColumnMapping};
use crate::pipeline::processing::normalize::{
    confidence_score, normalize_cell, FieldValue, NormalizedCell,
};

/// Everything a legacy conversion produces: one record per source row,
/// the anomaly list, and the column mapping used, plus summary counts for
/// the persistence/report layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub records: Vec<MaintenanceRecord>,
    pub anomalies: Vec<Anomaly>,
    pub column_mapping: ColumnMapping,
    pub mapped_count: usize,
    pub issue_count: usize,
}

/// Composes column mapping, per-cell normalization and anomaly detection
/// over one parsed legacy sheet. Stateless between calls: converting the
/// same table twice yields identical output.
pub struct LegacyConverter {
    mapper: ColumnMapper,
    detector: AnomalyDetector,
}

impl LegacyConverter {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            mapper: ColumnMapper::new(config.vocabulary(), config.match_threshold),
            detector: AnomalyDetector::new(config),
        }
    }

    pub fn convert(&self, table: &RawTable) -> Result<ConversionOutcome> {
        if table.headers.is_empty() {
            return Err(ConverterError::NoData("sheet has no header row".to_string()));
        }
        if table.rows.is_empty() {
            return Err(ConverterError::NoData("sheet has no data rows".to_string()));
        }

        let column_mapping = self.mapper.map_columns(&table.headers);
        if column_mapping.mapped_count() == 0 {
            return Err(ConverterError::NoData(
                "no headers matched any canonical field".to_string(),
            ));
        }

        let records: Vec<MaintenanceRecord> = table
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| build_record(index + 1, row, &column_mapping))
            .collect();

        let anomalies = self.detector.detect(&records, table, &column_mapping);

        let mapped_count = column_mapping.mapped_count();
        let issue_count = anomalies.len();
        info!(
            "converted {} rows: {} fields mapped, {} anomalies",
            records.len(),
            mapped_count,
            issue_count
        );

        Ok(ConversionOutcome {
            records,
            anomalies,
            column_mapping,
            mapped_count,
            issue_count,
        })
    }
}

static BLANK: RawCell = RawCell::Blank;

/// Project one raw row through the mapping and normalize every mapped cell.
/// A row never fails: anything unreadable just stays null on the record.
fn build_record(row_number: usize, row: &RawRow, mapping: &ColumnMapping) -> MaintenanceRecord {
    let mut record = MaintenanceRecord::empty(row_number);

    for field in CanonicalField::ALL {
        let Some(matched) = mapping.get(field) else {
            continue;
        };
        let cell = row.get(matched.column).unwrap_or(&BLANK);
        if let NormalizedCell::Value(value) = normalize_cell(field.kind(), cell) {
            assign_field(&mut record, field, value);
        }
    }

    record.confidence_score = confidence_score(row, mapping);
    record
}

fn assign_field(record: &mut MaintenanceRecord, field: CanonicalField, value: FieldValue) {
    match (field, value) {
        (CanonicalField::Component, FieldValue::Text(t)) => record.component = Some(t),
        (CanonicalField::System, FieldValue::Text(t)) => record.system = Some(t),
        (CanonicalField::MaintAction, FieldValue::Text(t)) => record.maint_action = Some(t),
        (CanonicalField::Notes, FieldValue::Text(t)) => record.summary_notes = Some(t),
        (CanonicalField::Priority, FieldValue::Priority(p)) => record.priority = Some(p),
        (CanonicalField::CostEstimate, FieldValue::Cost(c)) => record.cost_estimate = Some(c),
        (CanonicalField::StartDate, FieldValue::Date(d)) => record.start_date = Some(d),
        (CanonicalField::EndDate, FieldValue::Date(d)) => record.end_date = Some(d),
        // a cell can only normalize into its field's own kind
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnomalyType, Priority, RecordStatus, Severity};
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    fn table(headers: &[&str], rows: &[&[RawCell]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter().map(|r| r.to_vec()).collect(),
        )
    }

    fn converter() -> LegacyConverter {
        LegacyConverter::new(&ConversionConfig::default())
    }

    #[test]
    fn converts_an_abbreviated_legacy_sheet() {
        let table = table(
            &["EQUIP", "COST$", "URG", "START", "DUE"],
            &[&[
                text("Pump A-101"),
                text("$1,500"),
                text("urgent"),
                text("2024-01-10"),
                text("01/20/2024"),
            ]],
        );

        let outcome = converter().convert(&table).unwrap();
        assert_eq!(outcome.records.len(), 1);

        let record = &outcome.records[0];
        assert_eq!(record.row, 1);
        assert_eq!(record.component.as_deref(), Some("Pump A-101"));
        assert_eq!(
            record.cost_estimate,
            Some(BigDecimal::from_str("1500").unwrap())
        );
        assert_eq!(record.priority, Some(Priority::High));
        assert_eq!(record.status, RecordStatus::Open);
        assert!(record.start_date.is_some());
        assert!(record.end_date.is_some());
        assert_eq!(outcome.mapped_count, 5);
    }

    #[test]
    fn extreme_cost_normalizes_unclamped_and_flags_once() {
        let table = table(
            &["EQUIP", "COST$", "URG", "START", "DUE"],
            &[&[
                text("Crane"),
                text("$15,000,000"),
                text("high"),
                text("2024-01-10"),
                text("2024-02-10"),
            ]],
        );

        let outcome = converter().convert(&table).unwrap();
        assert_eq!(
            outcome.records[0].cost_estimate,
            Some(BigDecimal::from_str("15000000").unwrap())
        );

        let extremes: Vec<_> = outcome
            .anomalies
            .iter()
            .filter(|a| a.anomaly_type == AnomalyType::ExtremeValue)
            .collect();
        assert_eq!(extremes.len(), 1);
        assert_eq!(extremes[0].severity, Severity::Medium);
    }

    #[test]
    fn zero_rows_is_a_no_data_error() {
        let table = table(&["EQUIP", "COST$"], &[]);
        let err = converter().convert(&table).unwrap_err();
        assert!(matches!(err, ConverterError::NoData(_)));
    }

    #[test]
    fn zero_headers_is_a_no_data_error() {
        let table = RawTable::new(Vec::new(), vec![vec![text("orphan")]]);
        let err = converter().convert(&table).unwrap_err();
        assert!(matches!(err, ConverterError::NoData(_)));
    }

    #[test]
    fn unrecognizable_headers_are_a_no_data_error() {
        let table = table(&["aaa", "bbb"], &[&[text("x"), text("y")]]);
        let err = converter().convert(&table).unwrap_err();
        assert!(matches!(err, ConverterError::NoData(_)));
    }

    #[test]
    fn malformed_rows_never_abort_the_rest() {
        let table = table(
            &["EQUIP", "COST$", "START"],
            &[
                &[text("Pump"), text("not a number"), text("not a date")],
                &[text("Valve"), text("250"), text("2024-03-01")],
            ],
        );

        let outcome = converter().convert(&table).unwrap();
        assert_eq!(outcome.records.len(), 2);
        // the malformed row survives with nulls
        assert!(outcome.records[0].cost_estimate.is_none());
        assert!(outcome.records[0].start_date.is_none());
        assert_eq!(outcome.records[0].component.as_deref(), Some("Pump"));
        // and its parse failures were annotated
        assert!(outcome
            .anomalies
            .iter()
            .any(|a| a.anomaly_type == AnomalyType::ParseError && a.row == Some(1)));
        assert!(outcome.records[1].cost_estimate.is_some());
    }

    #[test]
    fn unparseable_fields_zero_their_confidence_term() {
        let table = table(
            &["EQUIP", "COST$"],
            &[
                &[text("Pump"), text("100")],
                &[text("Pump"), text("garbage")],
            ],
        );

        let outcome = converter().convert(&table).unwrap();
        assert!(outcome.records[1].confidence_score < outcome.records[0].confidence_score);
    }

    #[test]
    fn rerunning_the_same_input_is_byte_identical() {
        let table = table(
            &["EQUIP", "COST$", "URG", "beginning"],
            &[
                &[text("Pump"), text("$100"), text("h"), text("2024-01-01")],
                &[text(""), text("TBD"), text("3"), text("45292")],
            ],
        );

        let converter = converter();
        let first = converter.convert(&table).unwrap();
        let second = converter.convert(&table).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn issue_count_matches_anomaly_list() {
        let table = table(&["EQUIP"], &[&[text("Pump")]]);
        let outcome = converter().convert(&table).unwrap();
        assert_eq!(outcome.issue_count, outcome.anomalies.len());
        assert!(outcome.issue_count > 0); // critical columns are unmapped here
    }
}
