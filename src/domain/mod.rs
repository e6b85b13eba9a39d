use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The canonical schema fields legacy spreadsheet headers are mapped onto.
///
/// Declaration order is load-bearing: it is the iteration order for mapping,
/// record projection and anomaly emission, which keeps conversion output
/// stable across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Component,
    System,
    Priority,
    MaintAction,
    CostEstimate,
    StartDate,
    EndDate,
    Notes,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 8] = [
        CanonicalField::Component,
        CanonicalField::System,
        CanonicalField::Priority,
        CanonicalField::MaintAction,
        CanonicalField::CostEstimate,
        CanonicalField::StartDate,
        CanonicalField::EndDate,
        CanonicalField::Notes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Component => "component",
            CanonicalField::System => "system",
            CanonicalField::Priority => "priority",
            CanonicalField::MaintAction => "maint_action",
            CanonicalField::CostEstimate => "cost_estimate",
            CanonicalField::StartDate => "start_date",
            CanonicalField::EndDate => "end_date",
            CanonicalField::Notes => "notes",
        }
    }

    pub fn from_str(name: &str) -> Option<CanonicalField> {
        CanonicalField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == name)
    }

    /// The value shape a cell mapped to this field normalizes into.
    pub fn kind(&self) -> FieldKind {
        match self {
            CanonicalField::Priority => FieldKind::Priority,
            CanonicalField::CostEstimate => FieldKind::Cost,
            CanonicalField::StartDate | CanonicalField::EndDate => FieldKind::Date,
            _ => FieldKind::Text,
        }
    }
}

/// Target type family for per-cell normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Priority,
    Cost,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// Workflow status of a maintenance record. Conversion always produces
/// `Open`; later transitions happen on the status board, outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RecordStatus {
    #[default]
    Open,
    InProgress,
    AwaitingParts,
    Complete,
}

/// A normalized maintenance record produced from one legacy sheet row.
///
/// Every source row yields exactly one record, however malformed; fields that
/// could not be mapped or parsed are simply `None` and the problems show up
/// as [`Anomaly`] values instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    /// 1-based data row in the source sheet (header row excluded).
    pub row: usize,
    pub component: Option<String>,
    pub system: Option<String>,
    pub priority: Option<Priority>,
    pub maint_action: Option<String>,
    pub cost_estimate: Option<BigDecimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub summary_notes: Option<String>,
    pub status: RecordStatus,
    /// 0.0..=1.0, mean of per-field mapping scores weighted by parse success.
    pub confidence_score: f64,
}

impl MaintenanceRecord {
    pub fn empty(row: usize) -> Self {
        Self {
            row,
            component: None,
            system: None,
            priority: None,
            maint_action: None,
            cost_estimate: None,
            start_date: None,
            end_date: None,
            summary_notes: None,
            status: RecordStatus::Open,
            confidence_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    MissingField,
    DateInconsistency,
    ExtremeValue,
    ParseError,
    LowConfidence,
    UnmappedColumn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

/// A flagged data-quality issue attached to one record or to the document as
/// a whole. Anomalies annotate, they never reject: the offending record is
/// still part of the conversion result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    /// Source data row the issue belongs to; `None` for document-level
    /// issues such as an unmapped critical column.
    pub row: Option<usize>,
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub description: String,
    pub field_name: Option<String>,
    pub field_value: Option<String>,
    pub suggested_fix: Option<String>,
}
