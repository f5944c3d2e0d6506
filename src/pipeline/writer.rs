//! Writer thread (§4.7): owns every output stream, draining the mailbox
//! until every worker's sender has been dropped, with split-file rotation
//! for `--split_by_file_number`/`--split_by_lines` (§6).

use crate::args::Config;
use crate::io::writer::{create_writer, split_path};
use crate::io::OutputStream;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;

/// One serialized record (already FASTQ-formatted), tagged with the stream
/// it belongs to — the mailbox message handed from workers to the writer
/// thread (§4.7, §4.8 step 4).
pub enum OutputMessage {
    Read1(Vec<u8>),
    Read2(Vec<u8>),
    Merged(Vec<u8>),
    Failed(Vec<u8>),
}

/// How a single output stream rotates across split files, if at all.
enum SplitMode {
    None,
    ByLines { file_lines: usize },
    ByFileNumber { file_number: usize },
}

struct RotatingStream {
    base_path: PathBuf,
    compress_level: u32,
    prefix_digits: usize,
    mode: SplitMode,
    writer: Option<OutputStream>,
    file_index: usize,
    lines_in_file: usize,
    records_written: usize,
}

impl RotatingStream {
    fn open(base_path: PathBuf, compress_level: u32, prefix_digits: usize, mode: SplitMode) -> std::io::Result<Self> {
        let first_path = match &mode {
            SplitMode::None => base_path.clone(),
            SplitMode::ByLines { .. } | SplitMode::ByFileNumber { .. } => split_path(&base_path, 0, prefix_digits),
        };
        Ok(Self {
            writer: Some(create_writer(Some(&first_path), compress_level)?),
            base_path,
            compress_level,
            prefix_digits,
            mode,
            file_index: 0,
            lines_in_file: 0,
            records_written: 0,
        })
    }

    fn rotate_to(&mut self, index: usize) -> std::io::Result<()> {
        if index == self.file_index && self.writer.is_some() {
            return Ok(());
        }
        if let Some(writer) = &mut self.writer {
            std::io::Write::flush(writer)?;
        }
        let path = split_path(&self.base_path, index, self.prefix_digits);
        self.writer = Some(create_writer(Some(&path), self.compress_level)?);
        self.file_index = index;
        self.lines_in_file = 0;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        match self.mode {
            SplitMode::None => {}
            SplitMode::ByLines { file_lines } => {
                if self.lines_in_file >= file_lines {
                    self.rotate_to(self.file_index + 1)?;
                }
                self.lines_in_file += bytes.iter().filter(|&&b| b == b'\n').count();
            }
            SplitMode::ByFileNumber { file_number } => {
                let target = self.records_written % file_number.max(1);
                self.rotate_to(target)?;
            }
        }
        self.records_written += 1;
        std::io::Write::write_all(self.writer.as_mut().expect("stream always open"), bytes)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Some(writer) = &mut self.writer {
            std::io::Write::flush(writer)?;
        }
        Ok(())
    }
}

/// The output streams and split-file state for one run, built from
/// [`Config`] and spawned as the sole writer thread.
pub struct WriterSet {
    out1: Option<PathBuf>,
    out2: Option<PathBuf>,
    merged_out: Option<PathBuf>,
    compress_level: u32,
    split_prefix_digits: usize,
    mode: SplitModeKind,
    split_by_lines_n: usize,
    split_by_file_number_n: usize,
}

/// Which split strategy (if any) applies to every active stream.
#[derive(Clone, Copy)]
enum SplitModeKind {
    None,
    ByLines,
    ByFileNumber,
}

impl WriterSet {
    pub fn open(config: &Config) -> std::io::Result<Self> {
        let mode = if config.split_by_lines {
            SplitModeKind::ByLines
        } else if config.split_by_file_number {
            SplitModeKind::ByFileNumber
        } else {
            SplitModeKind::None
        };
        Ok(Self {
            out1: config.out1.clone(),
            out2: config.out2.clone(),
            merged_out: config.merged_out.clone(),
            compress_level: config.compress_level,
            split_prefix_digits: config.split_prefix_digits,
            mode,
            split_by_lines_n: config.file_lines,
            split_by_file_number_n: config.file_number,
        })
    }

    fn build_mode(&self) -> SplitMode {
        match self.mode {
            SplitModeKind::None => SplitMode::None,
            SplitModeKind::ByLines => SplitMode::ByLines { file_lines: self.split_by_lines_n },
            SplitModeKind::ByFileNumber => SplitMode::ByFileNumber { file_number: self.split_by_file_number_n },
        }
    }

    /// Spawns the writer thread. It owns every output stream exclusively
    /// and runs until `rx`'s senders are all dropped, i.e. every worker has
    /// finished (§4.8 step 6).
    pub fn spawn(self, rx: Receiver<OutputMessage>, _config: &Config) -> WriterHandle {
        let out1 = self.out1.clone();
        let out2 = self.out2.clone();
        let merged_out = self.merged_out.clone();
        let compress_level = self.compress_level;
        let prefix_digits = self.split_prefix_digits;
        let mode1 = self.build_mode();
        let mode2 = self.build_mode();

        let handle = std::thread::spawn(move || -> std::io::Result<()> {
            let mut read1 = match out1 {
                Some(path) => Some(RotatingStream::open(path, compress_level, prefix_digits, mode1)?),
                None => None,
            };
            let mut read2 = match out2 {
                Some(path) => Some(RotatingStream::open(path, compress_level, prefix_digits, mode2)?),
                None => None,
            };
            let mut merged = match merged_out {
                Some(path) => Some(create_writer(Some(&path), compress_level)?),
                None => None,
            };

            for message in rx {
                match message {
                    OutputMessage::Read1(bytes) => {
                        if let Some(stream) = &mut read1 {
                            stream.write(&bytes)?;
                        }
                    }
                    OutputMessage::Read2(bytes) => {
                        if let Some(stream) = &mut read2 {
                            stream.write(&bytes)?;
                        }
                    }
                    OutputMessage::Merged(bytes) => {
                        if let Some(writer) = &mut merged {
                            std::io::Write::write_all(writer, &bytes)?;
                        }
                    }
                    // Filtered-out reads have no dedicated CLI output target
                    // (no `--failed_out` flag); they're simply not written.
                    OutputMessage::Failed(_) => {}
                }
            }

            if let Some(stream) = &mut read1 {
                stream.flush()?;
            }
            if let Some(stream) = &mut read2 {
                stream.flush()?;
            }
            if let Some(writer) = &mut merged {
                std::io::Write::flush(writer)?;
            }
            Ok(())
        });

        WriterHandle { handle: Some(handle) }
    }
}

/// A handle to the spawned writer thread; joining surfaces any I/O error
/// encountered while draining the mailbox.
pub struct WriterHandle {
    handle: Option<std::thread::JoinHandle<std::io::Result<()>>>,
}

impl WriterHandle {
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => eprintln!("writer thread error: {e}"),
                Err(_) => eprintln!("writer thread panicked"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsplit_stream_reuses_the_same_file() {
        let dir = std::env::temp_dir().join(format!("fqprep-writer-test-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        let base = dir.join("out.fastq");
        let mut stream = RotatingStream::open(base.clone(), 1, 4, SplitMode::None).unwrap();
        stream.write(b"@a\nACGT\n+\nIIII\n").unwrap();
        stream.flush().unwrap();
        assert!(base.exists());
        let _ = std::fs::remove_file(&base);
        let _ = std::fs::remove_dir(&dir);
    }
}
