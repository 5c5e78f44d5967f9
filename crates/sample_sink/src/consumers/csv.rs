//! CsvConsumer - persists samples as CSV lines.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{Result, SampleConsumer, StreamDescriptor, TimedSample};
use tracing::{debug, instrument};

/// Consumer that appends `timestamp,v0,v1,...` rows to a CSV file
///
/// The header row comes from the descriptor's resolved channel labels.
pub struct CsvConsumer {
    name: String,
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CsvConsumer {
    /// Create the output file and write its header
    pub fn create(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        descriptor: &StreamDescriptor,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(
            writer,
            "timestamp,{}",
            descriptor.resolved_labels().join(",")
        )?;

        Ok(Self {
            name: name.into(),
            path,
            writer,
        })
    }

    fn append_row(&mut self, sample: &TimedSample) -> std::io::Result<()> {
        write!(self.writer, "{}", sample.timestamp)?;
        for value in &sample.sample.values {
            write!(self.writer, ",{value}")?;
        }
        writeln!(self.writer)
    }
}

impl SampleConsumer for CsvConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "csv_consumer_write", level = "trace", skip(self, sample), fields(consumer = %self.name))]
    async fn write(&mut self, sample: &TimedSample) -> Result<()> {
        self.append_row(sample)?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    #[instrument(name = "csv_consumer_close", skip(self))]
    async fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        debug!(consumer = %self.name, path = %self.path.display(), "csv capture closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use contracts::Sample;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn test_csv_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.csv");
        let descriptor = StreamDescriptor {
            channel_labels: vec!["C3".into(), "C4".into()],
            ..StreamDescriptor::new("s", "EEG", 2, 100.0)
        };

        let mut consumer = CsvConsumer::create("capture", &path, &descriptor).unwrap();
        consumer
            .write(&TimedSample {
                sample: Sample::from(vec![1.5, -0.5]),
                timestamp: 0.25,
            })
            .await
            .unwrap();
        consumer
            .write(&TimedSample {
                sample: Sample::from(vec![2.0, 3.0]),
                timestamp: 0.5,
            })
            .await
            .unwrap();
        consumer.close().await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines[0], "timestamp,C3,C4");
        assert_eq!(lines[1], "0.25,1.5,-0.5");
        assert_eq!(lines[2], "0.5,2,3");
        assert_eq!(lines.len(), 3);
    }

    #[tokio::test]
    async fn test_short_label_list_gets_generated_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.csv");
        let descriptor = StreamDescriptor {
            channel_labels: vec!["C3".into()],
            ..StreamDescriptor::new("s", "EEG", 3, 100.0)
        };

        let consumer = CsvConsumer::create("capture", &path, &descriptor).unwrap();
        drop(consumer);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("timestamp,C3,Chan-2,Chan-3"));
    }
}
