//! FASTQ output writers (§4.7, §6): plaintext/gzip/stdout, paired output
//! streams, and split-file naming. Grounded on the teacher's
//! `WriteFileZipStdout`/`create_writer` pair (`src/io/mod.rs`,
//! `src/io/writers.rs`).

use super::{open_output_stream, OutputStream};
use std::path::{Path, PathBuf};

/// Creates a single output stream for `path` (or stdout if `None`),
/// compressing when the path ends in `.gz`.
pub fn create_writer(path: Option<&Path>, compress_level: u32) -> std::io::Result<OutputStream> {
    open_output_stream(path, compress_level)
}

/// Appends a zero-padded numeric suffix before a path's extension, for
/// `--split_by_file_number`/`--split_by_lines` (§6).
#[must_use]
pub fn split_path(base: &Path, index: usize, digits: usize) -> PathBuf {
    let suffix = format!("{index:0digits$}");
    let file_name = base.file_name().and_then(|s| s.to_str()).unwrap_or("out");

    let (stem, gz_suffix) = match file_name.strip_suffix(".gz") {
        Some(rest) => (rest, ".gz"),
        None => (file_name, ""),
    };

    let new_name = match stem.rsplit_once('.') {
        Some((name, ext)) => format!("{name}.{suffix}.{ext}{gz_suffix}"),
        None => format!("{stem}.{suffix}{gz_suffix}"),
    };

    match base.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(new_name),
        _ => PathBuf::from(new_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_path_inserts_zero_padded_suffix() {
        let base = Path::new("out/reads.fastq.gz");
        let path = split_path(base, 3, 4);
        assert_eq!(path, Path::new("out/reads.0003.fastq.gz"));
    }

    #[test]
    fn split_path_without_extension() {
        let base = Path::new("reads");
        let path = split_path(base, 1, 2);
        assert_eq!(path, Path::new("reads.01"));
    }
}
