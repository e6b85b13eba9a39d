use anyhow::Result;
use tracing::info;

use crate::app::ports::ConversionOutputPort;
use crate::config::ConversionConfig;
use crate::pipeline::ingestion::table::RawTable;
use crate::pipeline::processing::convert::{ConversionOutcome, LegacyConverter};

/// Use case for converting one legacy sheet and streaming the results to an
/// output port.
pub struct ConvertUseCase {
    converter: LegacyConverter,
    output: Box<dyn ConversionOutputPort>,
}

impl ConvertUseCase {
    pub fn new(converter: LegacyConverter, output: Box<dyn ConversionOutputPort>) -> Self {
        Self { converter, output }
    }

    /// Create a use case with default thresholds and vocabulary.
    pub fn with_default_config(output: Box<dyn ConversionOutputPort>) -> Self {
        Self {
            converter: LegacyConverter::new(&ConversionConfig::default()),
            output,
        }
    }

    /// Convert a table and write every record and anomaly to the output.
    pub async fn convert_table(&self, source: &str, table: &RawTable) -> Result<ConversionOutcome> {
        let outcome = self.converter.convert(table)?;

        info!(
            source,
            records = outcome.records.len(),
            anomalies = outcome.issue_count,
            "conversion finished, writing output"
        );

        for record in &outcome.records {
            self.output.write_record(record).await?;
        }
        for anomaly in &outcome.anomalies {
            self.output.write_anomaly(anomaly).await?;
        }

        Ok(outcome)
    }
}
