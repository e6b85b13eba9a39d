use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::anyhow;
use tracing::info;

use crate::app::ports::ConversionOutputPort;
use crate::domain::{Anomaly, MaintenanceRecord};

/// File-based implementation of ConversionOutputPort.
/// Writes records and anomalies as NDJSON to two files in an output
/// directory.
pub struct FileConversionOutputAdapter {
    records_file: Mutex<BufWriter<File>>,
    anomalies_file: Mutex<BufWriter<File>>,
    pub records_path: PathBuf,
    pub anomalies_path: PathBuf,
}

impl FileConversionOutputAdapter {
    pub fn new(output_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(output_dir)?;

        let records_path = output_dir.join("records.ndjson");
        let anomalies_path = output_dir.join("anomalies.ndjson");

        info!("Creating conversion output files:");
        info!("  Records: {}", records_path.display());
        info!("  Anomalies: {}", anomalies_path.display());

        let records_file = BufWriter::new(open_truncated(&records_path)?);
        let anomalies_file = BufWriter::new(open_truncated(&anomalies_path)?);

        Ok(Self {
            records_file: Mutex::new(records_file),
            anomalies_file: Mutex::new(anomalies_file),
            records_path,
            anomalies_path,
        })
    }

    fn write_line(file: &Mutex<BufWriter<File>>, line: &str) -> anyhow::Result<()> {
        let mut writer = file.lock().map_err(|_| anyhow!("output writer poisoned"))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

fn open_truncated(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

#[async_trait::async_trait]
impl ConversionOutputPort for FileConversionOutputAdapter {
    async fn write_record(&self, record: &MaintenanceRecord) -> anyhow::Result<()> {
        let line = serde_json::to_string(record)?;
        Self::write_line(&self.records_file, &line)
    }

    async fn write_anomaly(&self, anomaly: &Anomaly) -> anyhow::Result<()> {
        let line = serde_json::to_string(anomaly)?;
        Self::write_line(&self.anomalies_file, &line)
    }
}
