//! Corpus output: one file of lines, or one file per sample.

use std::fs::{self, File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::FuzzError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Every sample appended as one line of a single file.
    #[default]
    File,
    /// Every sample in its own `test_NNNNNN.txt`.
    Directory,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::File => "file",
            OutputFormat::Directory => "directory",
        }
    }
}

enum Sink {
    File(LineWriter<File>),
    Directory(PathBuf),
}

pub struct CorpusWriter {
    sink: Sink,
    written: usize,
}

impl CorpusWriter {
    /// Prepare the destination: a fresh (truncated) file, or an existing or
    /// newly created directory.
    pub fn create(path: &Path, format: OutputFormat) -> Result<Self> {
        let sink = match format {
            OutputFormat::Directory => {
                fs::create_dir_all(path)
                    .with_context(|| format!("create output directory {}", path.display()))?;
                Sink::Directory(path.to_path_buf())
            }
            OutputFormat::File => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("create directory {}", parent.display()))?;
                }
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(path)
                    .with_context(|| format!("open output file {}", path.display()))?;
                Sink::File(LineWriter::new(file))
            }
        };
        Ok(Self { sink, written: 0 })
    }

    /// Write one sample line (a trailing newline is added).
    pub fn write(&mut self, line: &str) -> Result<(), FuzzError> {
        let index = self.written;
        let result = match &mut self.sink {
            Sink::File(writer) => writeln!(writer, "{line}"),
            Sink::Directory(dir) => {
                fs::write(dir.join(sample_file_name(index)), format!("{line}\n"))
            }
        };
        result.map_err(|source| FuzzError::Output { index, source })?;
        self.written += 1;
        Ok(())
    }

    /// Flush and report how many samples were written.
    pub fn finish(mut self) -> Result<usize, FuzzError> {
        if let Sink::File(writer) = &mut self.sink {
            writer.flush().map_err(|source| FuzzError::Output {
                index: self.written,
                source,
            })?;
        }
        Ok(self.written)
    }
}

pub fn sample_file_name(index: usize) -> String {
    format!("test_{index:06}.txt")
}
