use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::CanonicalField;

/// Built-in synonym lists for the canonical fields, in canonical order.
/// Legacy MSC-style sheets label the same column a dozen different ways;
/// these lists cover the spellings seen in the field so far.
static DEFAULT_VOCABULARY: Lazy<Vocabulary> = Lazy::new(|| {
    let entries = vec![
        (
            CanonicalField::Component,
            &["component", "comp", "part", "item", "equipment", "equip", "asset"][..],
        ),
        (
            CanonicalField::System,
            &["system", "sys", "subsystem", "category"][..],
        ),
        (
            CanonicalField::Priority,
            &["priority", "prio", "pri", "urgency", "urg", "importance"][..],
        ),
        (
            CanonicalField::MaintAction,
            &["action", "maintenance", "maint", "work", "repair", "task", "description"][..],
        ),
        (
            CanonicalField::CostEstimate,
            &["cost", "cost$", "est cost", "estimate", "price", "amount", "budget", "expense"][..],
        ),
        (
            CanonicalField::StartDate,
            &["start", "start date", "begin", "started", "initiate", "open date"][..],
        ),
        (
            CanonicalField::EndDate,
            &["end", "end date", "complete", "finish", "closed", "due", "target"][..],
        ),
        (
            CanonicalField::Notes,
            &["notes", "remarks", "comments", "details", "info", "additional"][..],
        ),
    ];

    Vocabulary {
        entries: entries
            .into_iter()
            .map(|(field, synonyms)| VocabEntry {
                field,
                synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
            })
            .collect(),
    }
});

#[derive(Debug, Clone)]
struct VocabEntry {
    field: CanonicalField,
    synonyms: Vec<String>,
}

/// The synonym table the mapper scores headers against. Always iterated in
/// canonical field order so mapping output is deterministic.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    entries: Vec<VocabEntry>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        DEFAULT_VOCABULARY.clone()
    }
}

impl Vocabulary {
    /// Replace one field's synonym list entirely.
    pub fn replace(&mut self, field: CanonicalField, synonyms: Vec<String>) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.field == field) {
            entry.synonyms = synonyms;
        }
    }

    pub fn synonyms(&self, field: CanonicalField) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.synonyms.as_slice())
    }
}

/// A header accepted for a canonical field, with the score it achieved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMatch {
    pub header: String,
    pub column: usize,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    pub field: CanonicalField,
    pub matched: Option<ColumnMatch>,
}

/// The per-document mapping from canonical fields to source headers,
/// built once and reused for every row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub fields: Vec<FieldMapping>,
}

impl ColumnMapping {
    pub fn get(&self, field: CanonicalField) -> Option<&ColumnMatch> {
        self.fields
            .iter()
            .find(|m| m.field == field)
            .and_then(|m| m.matched.as_ref())
    }

    /// Mapping score for a field; unmapped fields score 0.
    pub fn score(&self, field: CanonicalField) -> f64 {
        self.get(field).map(|m| m.score).unwrap_or(0.0)
    }

    pub fn mapped_count(&self) -> usize {
        self.fields.iter().filter(|m| m.matched.is_some()).count()
    }

    pub fn unmapped_fields(&self) -> Vec<CanonicalField> {
        self.fields
            .iter()
            .filter(|m| m.matched.is_none())
            .map(|m| m.field)
            .collect()
    }
}

/// Maps arbitrary legacy header strings onto canonical fields by fuzzy
/// scoring against a synonym vocabulary.
pub struct ColumnMapper {
    vocabulary: Vocabulary,
    threshold: f64,
}

#[derive(Debug)]
struct Candidate {
    field_order: usize,
    field: CanonicalField,
    column: usize,
    score: f64,
}

impl ColumnMapper {
    pub fn new(vocabulary: Vocabulary, threshold: f64) -> Self {
        Self {
            vocabulary,
            threshold,
        }
    }

    /// Produce the best header match per canonical field.
    ///
    /// Candidates at or above the threshold are ranked by score, then by
    /// column position (leftmost wins a tie), then by canonical field order,
    /// and claimed greedily: a header belongs to at most one field and a
    /// field takes at most one header.
    pub fn map_columns(&self, headers: &[String]) -> ColumnMapping {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

        let mut candidates = Vec::new();
        for (field_order, entry) in self.vocabulary.entries.iter().enumerate() {
            for (column, header) in normalized.iter().enumerate() {
                let score = entry
                    .synonyms
                    .iter()
                    .map(|synonym| match_score(&normalize_header(synonym), header))
                    .fold(0.0_f64, f64::max);
                if score >= self.threshold {
                    candidates.push(Candidate {
                        field_order,
                        field: entry.field,
                        column,
                        score,
                    });
                }
            }
        }

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.column.cmp(&b.column))
                .then(a.field_order.cmp(&b.field_order))
        });

        let mut claimed_columns = vec![false; headers.len()];
        let mut fields: Vec<FieldMapping> = self
            .vocabulary
            .entries
            .iter()
            .map(|entry| FieldMapping {
                field: entry.field,
                matched: None,
            })
            .collect();

        for candidate in candidates {
            if claimed_columns[candidate.column]
                || fields[candidate.field_order].matched.is_some()
            {
                continue;
            }
            claimed_columns[candidate.column] = true;
            debug!(
                "mapped '{}' -> {} (score {:.2})",
                headers[candidate.column],
                candidate.field.as_str(),
                candidate.score
            );
            fields[candidate.field_order].matched = Some(ColumnMatch {
                header: headers[candidate.column].clone(),
                column: candidate.column,
                score: candidate.score,
            });
        }

        ColumnMapping { fields }
    }
}

/// Lowercase, turn punctuation into spaces, collapse runs of whitespace.
fn normalize_header(raw: &str) -> String {
    let lowered: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Score one normalized synonym against one normalized header.
///
/// Exact match scores 1.0, substring containment 0.8 (requiring at least
/// three characters on the contained side, so stray abbreviations don't
/// latch onto longer words), and token overlap scores proportionally.
fn match_score(synonym: &str, header: &str) -> f64 {
    if synonym.is_empty() || header.is_empty() {
        return 0.0;
    }
    if synonym == header {
        return 1.0;
    }

    let mut score: f64 = 0.0;
    let contained = if header.contains(synonym) {
        Some(synonym.len())
    } else if synonym.contains(header) {
        Some(header.len())
    } else {
        None
    };
    if matches!(contained, Some(len) if len >= 3) {
        score = 0.8;
    }

    let header_tokens: Vec<&str> = header.split(' ').collect();
    let synonym_tokens: Vec<&str> = synonym.split(' ').collect();
    if header_tokens.len() > 1 || synonym_tokens.len() > 1 {
        let overlap = header_tokens
            .iter()
            .filter(|t| synonym_tokens.contains(t))
            .count();
        let ratio = overlap as f64 / header_tokens.len().max(synonym_tokens.len()) as f64;
        score = score.max(ratio);
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> ColumnMapper {
        ColumnMapper::new(Vocabulary::default(), 0.5)
    }

    fn headers(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|h| h.to_string()).collect()
    }

    #[test]
    fn maps_abbreviated_legacy_headers() {
        let mapping = mapper().map_columns(&headers(&["EQUIP", "COST$", "URG"]));

        let component = mapping.get(CanonicalField::Component).unwrap();
        assert_eq!(component.header, "EQUIP");
        assert!(component.score >= 0.8);

        let cost = mapping.get(CanonicalField::CostEstimate).unwrap();
        assert_eq!(cost.header, "COST$");
        assert!(cost.score >= 0.8);

        let priority = mapping.get(CanonicalField::Priority).unwrap();
        assert_eq!(priority.header, "URG");
        assert!(priority.score >= 0.8);

        assert_eq!(mapping.mapped_count(), 3);
    }

    #[test]
    fn normalization_strips_punctuation_and_case() {
        assert_eq!(normalize_header("  Est_Cost ($) "), "est cost");
        assert_eq!(normalize_header("COST$"), "cost");
    }

    #[test]
    fn exact_beats_containment_beats_overlap() {
        assert_eq!(match_score("cost", "cost"), 1.0);
        assert_eq!(match_score("cost", "est cost usd"), 0.8);
        let overlap = match_score("est cost", "est cost usd");
        assert!(overlap >= 0.8); // containment branch wins here
        let partial = match_score("open date", "open date extra");
        assert!(partial > 0.5 && partial <= 1.0);
    }

    #[test]
    fn short_abbreviations_do_not_latch_by_containment() {
        // "pri" is only 3 chars and does appear in "price"; the cost field
        // claims "price" first at score 1.0, so priority must not steal it.
        let mapping = mapper().map_columns(&headers(&["price", "urgency"]));
        assert_eq!(
            mapping.get(CanonicalField::CostEstimate).unwrap().header,
            "price"
        );
        assert_eq!(
            mapping.get(CanonicalField::Priority).unwrap().header,
            "urgency"
        );
    }

    #[test]
    fn leftmost_header_wins_score_ties() {
        // Both headers normalize to an exact synonym of start_date.
        let mapping = mapper().map_columns(&headers(&["start", "begin"]));
        let matched = mapping.get(CanonicalField::StartDate).unwrap();
        assert_eq!(matched.column, 0);
    }

    #[test]
    fn a_header_is_claimed_at_most_once() {
        // "maintenance" is a synonym for maint_action only, but "work" could
        // not double-claim it even if scores tied; count distinct columns.
        let mapping = mapper().map_columns(&headers(&["component", "comp"]));
        let mut columns: Vec<usize> = mapping
            .fields
            .iter()
            .filter_map(|f| f.matched.as_ref().map(|m| m.column))
            .collect();
        columns.sort_unstable();
        columns.dedup();
        assert_eq!(
            columns.len(),
            mapping.mapped_count(),
            "two fields claimed the same column"
        );
    }

    #[test]
    fn below_threshold_headers_stay_unmapped() {
        let mapping = mapper().map_columns(&headers(&["zzz", "qqq"]));
        assert_eq!(mapping.mapped_count(), 0);
        assert_eq!(mapping.unmapped_fields().len(), CanonicalField::ALL.len());
    }

    #[test]
    fn custom_vocabulary_is_honored() {
        let mut vocabulary = Vocabulary::default();
        vocabulary.replace(CanonicalField::Component, vec!["widget".into()]);
        let mapper = ColumnMapper::new(vocabulary, 0.5);

        let mapping = mapper.map_columns(&headers(&["widget", "equip"]));
        let component = mapping.get(CanonicalField::Component).unwrap();
        assert_eq!(component.header, "widget");
    }

    #[test]
    fn scores_are_reported_per_field() {
        let mapping = mapper().map_columns(&headers(&["equipment", "est cost usd"]));
        assert_eq!(mapping.score(CanonicalField::Component), 1.0);
        let cost_score = mapping.score(CanonicalField::CostEstimate);
        assert!(cost_score >= 0.5 && cost_score < 1.0);
        assert_eq!(mapping.score(CanonicalField::Notes), 0.0);
    }
}
