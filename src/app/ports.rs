use async_trait::async_trait;

use crate::domain::{Anomaly, MaintenanceRecord};

/// Sink for conversion results. The persistence layer implements this;
/// tests substitute an in-memory mock.
#[async_trait]
pub trait ConversionOutputPort: Send + Sync {
    async fn write_record(&self, record: &MaintenanceRecord) -> anyhow::Result<()>;
    async fn write_anomaly(&self, anomaly: &Anomaly) -> anyhow::Result<()>;
}
