use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};

use crate::domain::{MaintenanceRecord, Priority, Severity};
use crate::pipeline::processing::convert::ConversionOutcome;

/// Render a conversion summary as a Markdown document.
///
/// The timestamp is supplied by the caller so rendering stays deterministic;
/// everything else comes straight from the outcome.
pub fn render_markdown(
    source: &str,
    generated_at: DateTime<Utc>,
    outcome: &ConversionOutcome,
) -> String {
    let mut lines: Vec<String> = vec![
        "# Legacy Conversion Report".to_string(),
        String::new(),
        format!("**Document:** {}", source),
        format!(
            "**Generated:** {}",
            generated_at.format("%Y-%m-%d %H:%M UTC")
        ),
        format!("**Total Records:** {}", outcome.records.len()),
        format!(
            "**Fields Mapped:** {} of {}",
            outcome.mapped_count,
            outcome.column_mapping.fields.len()
        ),
        format!("**Anomalies:** {}", outcome.issue_count),
        String::new(),
        "---".to_string(),
        String::new(),
    ];

    // Column mapping
    lines.push("## Column Mapping".to_string());
    lines.push(String::new());
    lines.push("| Canonical Field | Source Column | Score |".to_string());
    lines.push("|-----------------|---------------|-------|".to_string());
    for field_mapping in &outcome.column_mapping.fields {
        match &field_mapping.matched {
            Some(matched) => lines.push(format!(
                "| {} | {} | {:.2} |",
                field_mapping.field.as_str(),
                matched.header,
                matched.score
            )),
            None => lines.push(format!(
                "| {} | *unmapped* | - |",
                field_mapping.field.as_str()
            )),
        }
    }
    lines.push(String::new());

    // Priority breakdown with costs
    lines.push("## Priority Breakdown".to_string());
    lines.push(String::new());
    lines.push("| Priority | Count | Estimated Cost |".to_string());
    lines.push("|----------|-------|----------------|".to_string());
    for priority in [Priority::High, Priority::Medium, Priority::Low] {
        let bucket: Vec<&MaintenanceRecord> = outcome
            .records
            .iter()
            .filter(|r| r.priority == Some(priority))
            .collect();
        lines.push(format!(
            "| {} | {} | ${} |",
            priority.as_str(),
            bucket.len(),
            sum_costs(&bucket)
        ));
    }
    let unassigned: Vec<&MaintenanceRecord> = outcome
        .records
        .iter()
        .filter(|r| r.priority.is_none())
        .collect();
    if !unassigned.is_empty() {
        lines.push(format!(
            "| unassigned | {} | ${} |",
            unassigned.len(),
            sum_costs(&unassigned)
        ));
    }
    let all: Vec<&MaintenanceRecord> = outcome.records.iter().collect();
    lines.push(format!(
        "| **Total** | **{}** | **${}** |",
        all.len(),
        sum_costs(&all)
    ));
    lines.push(String::new());

    // Anomalies grouped by severity
    lines.push("## Anomalies".to_string());
    lines.push(String::new());
    if outcome.anomalies.is_empty() {
        lines.push("No data-quality issues detected.".to_string());
        lines.push(String::new());
    } else {
        for severity in [Severity::High, Severity::Medium, Severity::Low] {
            let group: Vec<_> = outcome
                .anomalies
                .iter()
                .filter(|a| a.severity == severity)
                .collect();
            if group.is_empty() {
                continue;
            }
            lines.push(format!("### {} Severity", capitalize(severity.as_str())));
            lines.push(String::new());
            for anomaly in group {
                let location = match anomaly.row {
                    Some(row) => format!("row {}", row),
                    None => "document".to_string(),
                };
                lines.push(format!("- [{}] {}", location, anomaly.description));
            }
            lines.push(String::new());
        }
    }

    lines.push("---".to_string());
    lines.push(String::new());
    lines.push(
        "*All flagged anomalies should be reviewed by qualified personnel before \
         the converted records are published.*"
            .to_string(),
    );

    lines.join("\n")
}

fn sum_costs(records: &[&MaintenanceRecord]) -> BigDecimal {
    records
        .iter()
        .filter_map(|r| r.cost_estimate.clone())
        .fold(BigDecimal::zero(), |acc, c| acc + c)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
