//! CsvCountLog - append-only device/count log

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use contracts::{ContractError, CountSink};
use csv::Writer;
use tracing::{debug, instrument};

/// Append-only CSV sink with two columns: `device_id,count`
///
/// The header is written exactly once, when the file is created (or found
/// empty); reopening an existing log appends rows under the original
/// header. Timestamps and descriptions are deliberately absent - the log
/// records device identity and count, nothing else.
pub struct CsvCountLog {
    name: String,
    path: PathBuf,
    writer: Writer<std::fs::File>,
}

impl CsvCountLog {
    /// Open (creating if needed) the log at `path`.
    #[instrument(name = "csv_count_log_open", skip(name, path), fields(path = %path.as_ref().display()))]
    pub fn open(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let name = name.into();
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer
                .write_record(["device_id", "count"])
                .map_err(|e| ContractError::sink_write(&name, e.to_string()))?;
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&name, e.to_string()))?;
            debug!(sink = %name, "log created, header written");
        }

        Ok(Self { name, path, writer })
    }

    /// Path the log writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CountSink for CsvCountLog {
    fn name(&self) -> &str {
        &self.name
    }

    async fn append(&mut self, device_id: &str, count: u32) -> Result<(), ContractError> {
        self.writer
            .write_record([device_id, &count.to_string()])
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        // flush per row so readers (and crash recovery) see whole lines
        self.writer
            .flush()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        self.writer
            .flush()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush().await
    }
}
