//! FASTQ tokenizer (§4.1): four-line records, byte-offset tracking, PE and
//! interleaved single-file PE support.

use super::{open_input_stream, InputStream};
use crate::errors::FastqError;
use crate::model::{Read, ReadPair};
use std::io::BufRead;
use std::path::Path;

/// A single-stream FASTQ reader that tracks the byte offset of each record
/// it yields, for the evaluator's size-estimation probes.
pub struct FastqReader {
    inner: std::io::BufReader<InputStream>,
    line_buf: String,
    offset: u64,
    first_record_offset: Option<u64>,
    total_size_hint: u64,
}

impl FastqReader {
    /// Opens `path`, auto-detecting plaintext vs. gzip (§4.1).
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let total_size_hint = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        Ok(Self {
            inner: std::io::BufReader::new(open_input_stream(path)?),
            line_buf: String::new(),
            offset: 0,
            first_record_offset: None,
            total_size_hint,
        })
    }

    #[must_use]
    pub fn current_offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub fn total_size_hint(&self) -> u64 {
        self.total_size_hint
    }

    #[must_use]
    pub fn first_record_offset(&self) -> Option<u64> {
        self.first_record_offset
    }

    fn read_line(&mut self) -> std::io::Result<Option<String>> {
        self.line_buf.clear();
        let n = self.inner.read_line(&mut self.line_buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.offset += n as u64;
        let line = self.line_buf.trim_end_matches(['\n', '\r']).to_string();
        Ok(Some(line))
    }

    /// Reads one four-line record, or `None` at clean end of stream.
    ///
    /// # Errors
    /// Returns [`FastqError::MalformedRecord`] if the `@`/`+` markers are
    /// missing, or [`FastqError::UnequalLengths`] if sequence and quality
    /// lengths differ.
    pub fn next_record(&mut self) -> Result<Option<Read>, FastqError> {
        let record_offset = self.offset;
        let Some(header) = self.read_line()? else {
            return Ok(None);
        };
        if self.first_record_offset.is_none() {
            self.first_record_offset = Some(record_offset);
        }
        if !header.starts_with('@') {
            return Err(FastqError::MalformedRecord {
                offset: record_offset,
                reason: "header line does not start with '@'",
            });
        }
        let (name, comment) = match header.split_once(char::is_whitespace) {
            Some((name, comment)) => (name.to_string(), Some(comment.to_string())),
            None => (header, None),
        };

        let seq_line = self.read_line()?.ok_or(FastqError::MalformedRecord {
            offset: record_offset,
            reason: "truncated record: missing sequence line",
        })?;

        let plus_line = self.read_line()?.ok_or(FastqError::MalformedRecord {
            offset: record_offset,
            reason: "truncated record: missing '+' line",
        })?;
        if !plus_line.starts_with('+') {
            return Err(FastqError::MalformedRecord {
                offset: record_offset,
                reason: "third line does not start with '+'",
            });
        }

        let qual_line = self.read_line()?.ok_or(FastqError::MalformedRecord {
            offset: record_offset,
            reason: "truncated record: missing quality line",
        })?;

        if seq_line.len() != qual_line.len() {
            return Err(FastqError::UnequalLengths {
                offset: record_offset,
                seq_len: seq_line.len(),
                qual_len: qual_line.len(),
            });
        }

        Ok(Some(Read::new(name, seq_line.into_bytes(), qual_line.into_bytes(), comment)))
    }
}

/// Wraps one or two underlying readers to yield synchronized [`ReadPair`]s,
/// a single reader in interleaved mode where consecutive records form a
/// pair, or a single reader in single-end mode where the "right" mate is
/// just the left record reused (§4.1). The pipeline tracks single-end mode
/// separately via `Config::in2`/`interleaved_in` and skips mate-pair-only
/// steps for it.
pub enum PairedReader {
    TwoFiles(FastqReader, FastqReader),
    Interleaved(FastqReader),
    SingleEnd(FastqReader),
}

impl PairedReader {
    /// The R1 (or sole, for interleaved/single-end) stream's current byte
    /// offset, for the evaluator's record-count extrapolation (§4.3).
    #[must_use]
    pub fn r1_offset(&self) -> u64 {
        match self {
            PairedReader::TwoFiles(r1, _) => r1.current_offset(),
            PairedReader::Interleaved(r) | PairedReader::SingleEnd(r) => r.current_offset(),
        }
    }

    /// The R1 stream's total file size, used as the extrapolation base.
    #[must_use]
    pub fn r1_total_size_hint(&self) -> u64 {
        match self {
            PairedReader::TwoFiles(r1, _) => r1.total_size_hint(),
            PairedReader::Interleaved(r) | PairedReader::SingleEnd(r) => r.total_size_hint(),
        }
    }

    pub fn next_pair(&mut self) -> Result<Option<ReadPair>, FastqError> {
        match self {
            PairedReader::TwoFiles(r1, r2) => match (r1.next_record()?, r2.next_record()?) {
                (Some(left), Some(right)) => Ok(Some(ReadPair::new(left, right))),
                (None, None) => Ok(None),
                _ => Err(FastqError::MalformedRecord {
                    offset: r1.current_offset(),
                    reason: "paired input streams have mismatched record counts",
                }),
            },
            PairedReader::Interleaved(r) => match (r.next_record()?, r.next_record()?) {
                (Some(left), Some(right)) => Ok(Some(ReadPair::new(left, right))),
                (None, None) => Ok(None),
                _ => Err(FastqError::MalformedRecord {
                    offset: r.current_offset(),
                    reason: "interleaved input has an odd number of records",
                }),
            },
            PairedReader::SingleEnd(r) => match r.next_record()? {
                Some(left) => {
                    let right = left.clone();
                    Ok(Some(ReadPair::new(left, right)))
                }
                None => Ok(None),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    struct TempFastq(std::path::PathBuf);

    impl Drop for TempFastq {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    fn write_temp_fastq(contents: &str) -> TempFastq {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!("fqprep-test-{}-{n}.fastq", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        TempFastq(path)
    }

    #[test]
    fn parses_well_formed_records_with_comment() {
        let file = write_temp_fastq("@read1 comment here\nACGT\n+\nIIII\n@read2\nTTTT\n+\nIIII\n");
        let mut reader = FastqReader::open(&file.0).unwrap();
        let r1 = reader.next_record().unwrap().unwrap();
        assert_eq!(r1.name, "@read1");
        assert_eq!(r1.comment.as_deref(), Some("comment here"));
        assert_eq!(r1.sequence, b"ACGT");

        let r2 = reader.next_record().unwrap().unwrap();
        assert_eq!(r2.name, "@read2");
        assert!(r2.comment.is_none());

        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn rejects_missing_plus_marker() {
        let file = write_temp_fastq("@read1\nACGT\nNOTPLUS\nIIII\n");
        let mut reader = FastqReader::open(&file.0).unwrap();
        let err = reader.next_record().unwrap_err();
        assert!(matches!(err, FastqError::MalformedRecord { .. }));
    }

    #[test]
    fn rejects_unequal_sequence_and_quality_lengths() {
        let file = write_temp_fastq("@read1\nACGTACGT\n+\nIII\n");
        let mut reader = FastqReader::open(&file.0).unwrap();
        let err = reader.next_record().unwrap_err();
        assert!(matches!(err, FastqError::UnequalLengths { .. }));
    }
}
