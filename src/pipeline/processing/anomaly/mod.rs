use bigdecimal::{BigDecimal, Zero};
use tracing::debug;

use crate::config::ConversionConfig;
use crate::domain::{Anomaly, AnomalyType, CanonicalField, FieldKind, MaintenanceRecord, Severity};
use crate::pipeline::ingestion::table::{RawRow, RawTable};
use crate::pipeline::processing::column_map::ColumnMapping;
use crate::pipeline::processing::normalize::{confidence_terms, normalize_cell, NormalizedCell};

static EMPTY_ROW: RawRow = Vec::new();

/// Evaluates the data-quality rule set over a converted document.
///
/// Rules are independent: every rule runs against every record, a record can
/// carry several anomalies, and no rule ever drops or mutates a record.
/// Output order is stable: document-level anomalies first (canonical field
/// order), then records in row order with rules in declaration order.
pub struct AnomalyDetector {
    cost_ceiling: BigDecimal,
    confidence_floor: f64,
    critical_fields: Vec<CanonicalField>,
}

impl AnomalyDetector {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            cost_ceiling: BigDecimal::try_from(config.cost_ceiling)
                .unwrap_or_else(|_| BigDecimal::from(10_000_000u64)),
            confidence_floor: config.confidence_floor,
            critical_fields: config.critical_fields.clone(),
        }
    }

    pub fn detect(
        &self,
        records: &[MaintenanceRecord],
        table: &RawTable,
        mapping: &ColumnMapping,
    ) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        anomalies.extend(self.check_unmapped_columns(mapping));

        for record in records {
            let row = table.rows.get(record.row - 1).unwrap_or(&EMPTY_ROW);
            anomalies.extend(self.check_missing_fields(record));
            anomalies.extend(self.check_dates(record));
            anomalies.extend(self.check_cost(record));
            anomalies.extend(self.check_parse_failures(record, row, mapping));
            anomalies.extend(self.check_confidence(record, row, mapping));
        }

        debug!("detected {} anomalies", anomalies.len());
        anomalies
    }

    /// Document-level rule: a critical field with no header match at all.
    fn check_unmapped_columns(&self, mapping: &ColumnMapping) -> Vec<Anomaly> {
        CanonicalField::ALL
            .iter()
            .filter(|f| self.critical_fields.contains(f))
            .filter(|f| mapping.get(**f).is_none())
            .map(|field| Anomaly {
                row: None,
                anomaly_type: AnomalyType::UnmappedColumn,
                severity: Severity::High,
                description: format!(
                    "No source column could be mapped to required field '{}'",
                    field.as_str()
                ),
                field_name: Some(field.as_str().to_string()),
                field_value: None,
                suggested_fix: Some("Rename or add the column in the source sheet".to_string()),
            })
            .collect()
    }

    fn check_missing_fields(&self, record: &MaintenanceRecord) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        if record.component.is_none() {
            anomalies.push(Anomaly {
                row: Some(record.row),
                anomaly_type: AnomalyType::MissingField,
                severity: Severity::Medium,
                description: "Missing component/part identifier".to_string(),
                field_name: Some("component".to_string()),
                field_value: None,
                suggested_fix: Some("Review source document for component name".to_string()),
            });
        }

        if record.start_date.is_none() && record.end_date.is_none() {
            anomalies.push(Anomaly {
                row: Some(record.row),
                anomaly_type: AnomalyType::MissingField,
                severity: Severity::Medium,
                description: "Neither start nor end date present".to_string(),
                field_name: Some("start_date,end_date".to_string()),
                field_value: None,
                suggested_fix: Some("Review source document for schedule dates".to_string()),
            });
        }

        anomalies
    }

    fn check_dates(&self, record: &MaintenanceRecord) -> Vec<Anomaly> {
        let (Some(start), Some(end)) = (record.start_date, record.end_date) else {
            return Vec::new();
        };
        if end >= start {
            return Vec::new();
        }

        vec![Anomaly {
            row: Some(record.row),
            anomaly_type: AnomalyType::DateInconsistency,
            severity: Severity::High,
            description: format!("End date ({}) is before start date ({})", end, start),
            field_name: Some("end_date".to_string()),
            field_value: Some(end.to_string()),
            suggested_fix: Some("Verify and correct date sequence".to_string()),
        }]
    }

    fn check_cost(&self, record: &MaintenanceRecord) -> Vec<Anomaly> {
        let Some(cost) = &record.cost_estimate else {
            return Vec::new();
        };
        let zero = BigDecimal::zero();

        if *cost < zero || *cost > self.cost_ceiling {
            let description = if *cost < zero {
                format!("Negative cost estimate: ${}", cost)
            } else {
                format!("Unusually high cost estimate: ${}", cost)
            };
            return vec![Anomaly {
                row: Some(record.row),
                anomaly_type: AnomalyType::ExtremeValue,
                severity: Severity::Medium,
                description,
                field_name: Some("cost_estimate".to_string()),
                field_value: Some(cost.to_string()),
                suggested_fix: Some("Verify cost value is correct".to_string()),
            }];
        }

        if cost.is_zero() && record.maint_action.is_some() {
            return vec![Anomaly {
                row: Some(record.row),
                anomaly_type: AnomalyType::ExtremeValue,
                severity: Severity::Low,
                description: "Zero cost estimate for a described maintenance action".to_string(),
                field_name: Some("cost_estimate".to_string()),
                field_value: Some("0".to_string()),
                suggested_fix: Some("Confirm the work is free or fill in the estimate".to_string()),
            }];
        }

        Vec::new()
    }

    /// A mapped, typed field whose cell held real content that normalized to
    /// null. Null-like tokens ("n/a", blanks) never land here.
    fn check_parse_failures(
        &self,
        record: &MaintenanceRecord,
        row: &RawRow,
        mapping: &ColumnMapping,
    ) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        for field in CanonicalField::ALL {
            if field.kind() == FieldKind::Text {
                continue;
            }
            let Some(matched) = mapping.get(field) else {
                continue;
            };
            let Some(cell) = row.get(matched.column) else {
                continue;
            };
            if normalize_cell(field.kind(), cell) != NormalizedCell::Unparseable {
                continue;
            }

            let suggested_fix = match field.kind() {
                FieldKind::Cost => "Convert to numeric format",
                FieldKind::Date => "Use a recognized date format",
                FieldKind::Priority => "Use standard priority: high, medium, or low",
                FieldKind::Text => unreachable!(),
            };
            anomalies.push(Anomaly {
                row: Some(record.row),
                anomaly_type: AnomalyType::ParseError,
                severity: Severity::Low,
                description: format!(
                    "Could not parse {} value: {}",
                    field.as_str(),
                    cell.display()
                ),
                field_name: Some(field.as_str().to_string()),
                field_value: Some(cell.display()),
                suggested_fix: Some(suggested_fix.to_string()),
            });
        }

        anomalies
    }

    fn check_confidence(
        &self,
        record: &MaintenanceRecord,
        row: &RawRow,
        mapping: &ColumnMapping,
    ) -> Vec<Anomaly> {
        if record.confidence_score >= self.confidence_floor {
            return Vec::new();
        }

        // Attribute the anomaly to the weakest contributing field.
        let terms = confidence_terms(row, mapping);
        let weakest = terms
            .iter()
            .fold(None::<&(CanonicalField, f64)>, |lowest, term| match lowest {
                Some(best) if best.1 <= term.1 => lowest,
                _ => Some(term),
            })
            .map(|(field, _)| field.as_str().to_string());

        vec![Anomaly {
            row: Some(record.row),
            anomaly_type: AnomalyType::LowConfidence,
            severity: Severity::Low,
            description: format!(
                "Mapping confidence {:.2} below threshold {:.2}",
                record.confidence_score, self.confidence_floor
            ),
            field_name: weakest,
            field_value: None,
            suggested_fix: Some("Review column mapping and source data quality".to_string()),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Priority;
    use crate::pipeline::ingestion::table::RawCell;
    use crate::pipeline::processing::column_map::{ColumnMatch, FieldMapping};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn mapping_for(matches: &[(CanonicalField, usize, f64)]) -> ColumnMapping {
        let fields = CanonicalField::ALL
            .iter()
            .map(|&field| FieldMapping {
                field,
                matched: matches.iter().find(|(f, _, _)| *f == field).map(
                    |(_, column, score)| ColumnMatch {
                        header: field.as_str().to_string(),
                        column: *column,
                        score: *score,
                    },
                ),
            })
            .collect();
        ColumnMapping { fields }
    }

    fn full_mapping() -> ColumnMapping {
        mapping_for(
            &CanonicalField::ALL
                .iter()
                .enumerate()
                .map(|(i, &f)| (f, i, 1.0))
                .collect::<Vec<_>>(),
        )
    }

    fn healthy_record(row: usize) -> MaintenanceRecord {
        let mut record = MaintenanceRecord::empty(row);
        record.component = Some("Pump A-101".to_string());
        record.priority = Some(Priority::High);
        record.maint_action = Some("Replace seal".to_string());
        record.cost_estimate = Some(BigDecimal::from(1500));
        record.start_date = Some(date(2024, 1, 10));
        record.end_date = Some(date(2024, 1, 20));
        record.confidence_score = 0.9;
        record
    }

    fn detector() -> AnomalyDetector {
        AnomalyDetector::new(&ConversionConfig::default())
    }

    fn empty_table() -> RawTable {
        RawTable::new(Vec::new(), vec![Vec::new()])
    }

    #[test]
    fn healthy_record_raises_nothing() {
        let anomalies = detector().detect(&[healthy_record(1)], &empty_table(), &full_mapping());
        assert!(anomalies.is_empty(), "unexpected: {:?}", anomalies);
    }

    #[test]
    fn date_inversion_is_high_severity_exactly_once() {
        let mut record = healthy_record(1);
        record.start_date = Some(date(2024, 5, 1));
        record.end_date = Some(date(2024, 4, 1));

        let anomalies = detector().detect(&[record], &empty_table(), &full_mapping());
        let inversions: Vec<_> = anomalies
            .iter()
            .filter(|a| a.anomaly_type == AnomalyType::DateInconsistency)
            .collect();
        assert_eq!(inversions.len(), 1);
        assert_eq!(inversions[0].severity, Severity::High);
        assert_eq!(inversions[0].row, Some(1));
    }

    #[test]
    fn equal_dates_are_not_inverted() {
        let mut record = healthy_record(1);
        record.start_date = Some(date(2024, 5, 1));
        record.end_date = Some(date(2024, 5, 1));
        let anomalies = detector().detect(&[record], &empty_table(), &full_mapping());
        assert!(anomalies
            .iter()
            .all(|a| a.anomaly_type != AnomalyType::DateInconsistency));
    }

    #[test]
    fn cost_above_ceiling_is_one_medium_anomaly() {
        let mut record = healthy_record(1);
        record.cost_estimate = Some(BigDecimal::from_str("15000000").unwrap());

        let anomalies = detector().detect(&[record], &empty_table(), &full_mapping());
        let extremes: Vec<_> = anomalies
            .iter()
            .filter(|a| a.anomaly_type == AnomalyType::ExtremeValue)
            .collect();
        assert_eq!(extremes.len(), 1);
        assert_eq!(extremes[0].severity, Severity::Medium);
    }

    #[test]
    fn negative_cost_is_flagged_medium() {
        let mut record = healthy_record(1);
        record.cost_estimate = Some(BigDecimal::from(-50));
        let anomalies = detector().detect(&[record], &empty_table(), &full_mapping());
        assert!(anomalies.iter().any(|a| {
            a.anomaly_type == AnomalyType::ExtremeValue && a.severity == Severity::Medium
        }));
    }

    #[test]
    fn zero_cost_with_action_is_low_severity() {
        let mut record = healthy_record(1);
        record.cost_estimate = Some(BigDecimal::zero());

        let anomalies = detector().detect(&[record], &empty_table(), &full_mapping());
        let extremes: Vec<_> = anomalies
            .iter()
            .filter(|a| a.anomaly_type == AnomalyType::ExtremeValue)
            .collect();
        assert_eq!(extremes.len(), 1);
        assert_eq!(extremes[0].severity, Severity::Low);
    }

    #[test]
    fn zero_cost_without_action_passes() {
        let mut record = healthy_record(1);
        record.cost_estimate = Some(BigDecimal::zero());
        record.maint_action = None;
        let anomalies = detector().detect(&[record], &empty_table(), &full_mapping());
        assert!(anomalies
            .iter()
            .all(|a| a.anomaly_type != AnomalyType::ExtremeValue));
    }

    #[test]
    fn missing_component_and_dates_are_medium() {
        let mut record = healthy_record(2);
        record.component = None;
        record.start_date = None;
        record.end_date = None;

        let anomalies = detector().detect(&[record], &empty_table(), &full_mapping());
        let missing: Vec<_> = anomalies
            .iter()
            .filter(|a| a.anomaly_type == AnomalyType::MissingField)
            .collect();
        assert_eq!(missing.len(), 2);
        assert!(missing.iter().all(|a| a.severity == Severity::Medium));
    }

    #[test]
    fn unmapped_critical_field_is_document_level_and_first() {
        let mapping = mapping_for(&[(CanonicalField::Component, 0, 1.0)]);
        let mut record = healthy_record(1);
        record.confidence_score = 0.9;

        let anomalies = detector().detect(&[record], &empty_table(), &mapping);
        let unmapped: Vec<_> = anomalies
            .iter()
            .filter(|a| a.anomaly_type == AnomalyType::UnmappedColumn)
            .collect();
        // priority, cost_estimate, start_date, end_date are critical by default
        assert_eq!(unmapped.len(), 4);
        assert!(unmapped
            .iter()
            .all(|a| a.row.is_none() && a.severity == Severity::High));
        // document-level anomalies precede all row-level ones
        let first_row_level = anomalies.iter().position(|a| a.row.is_some());
        let last_doc_level = anomalies.iter().rposition(|a| a.row.is_none());
        if let (Some(first), Some(last)) = (first_row_level, last_doc_level) {
            assert!(last < first);
        }
    }

    #[test]
    fn parse_failure_raises_low_severity_with_value() {
        let table = RawTable::new(
            vec!["cost".to_string()],
            vec![vec![RawCell::Text("TBD".into())]],
        );
        let mapping = mapping_for(&[(CanonicalField::CostEstimate, 0, 1.0)]);
        let mut record = healthy_record(1);
        record.cost_estimate = None;

        let anomalies = detector().detect(&[record], &table, &mapping);
        let parse: Vec<_> = anomalies
            .iter()
            .filter(|a| a.anomaly_type == AnomalyType::ParseError)
            .collect();
        assert_eq!(parse.len(), 1);
        assert_eq!(parse[0].severity, Severity::Low);
        assert_eq!(parse[0].field_value.as_deref(), Some("TBD"));
    }

    #[test]
    fn null_like_cells_raise_no_parse_error() {
        let table = RawTable::new(
            vec!["cost".to_string()],
            vec![vec![RawCell::Text("n/a".into())]],
        );
        let mapping = mapping_for(&[(CanonicalField::CostEstimate, 0, 1.0)]);
        let mut record = healthy_record(1);
        record.cost_estimate = None;

        let anomalies = detector().detect(&[record], &table, &mapping);
        assert!(anomalies
            .iter()
            .all(|a| a.anomaly_type != AnomalyType::ParseError));
    }

    #[test]
    fn low_confidence_names_the_weakest_field() {
        let mapping = mapping_for(&[
            (CanonicalField::Component, 0, 0.9),
            (CanonicalField::CostEstimate, 1, 0.6),
        ]);
        let table = RawTable::new(
            vec!["comp".to_string(), "cost".to_string()],
            vec![vec![
                RawCell::Text("Pump".into()),
                RawCell::Text("100".into()),
            ]],
        );
        let mut record = healthy_record(1);
        record.confidence_score = 0.19; // (0.9 + 0.6) / 8

        let anomalies = detector().detect(&[record], &table, &mapping);
        let low: Vec<_> = anomalies
            .iter()
            .filter(|a| a.anomaly_type == AnomalyType::LowConfidence)
            .collect();
        assert_eq!(low.len(), 1);
        // system is unmapped and contributes 0, making it the weakest
        assert_eq!(low[0].field_name.as_deref(), Some("system"));
    }
}
