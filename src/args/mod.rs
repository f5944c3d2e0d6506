//! CLI surface and config validation (§6). A single binary, no subcommands,
//! in contrast to the teacher's `Commands` enum: every flag is parsed into
//! one [`Cli`] and validated once into an immutable [`Config`].

use crate::errors::ConfigError;
use crate::trim::UmiLocation;
use clap::{CommandFactory, Parser};
use std::path::{Path, PathBuf};

/// Raw command-line surface (§6). Validation into [`Config`] happens in
/// [`parse_and_validate`]; until then, fields are exactly what the user
/// typed.
#[derive(Parser, Debug)]
#[command(author, version, about = "A high-throughput FASTQ preprocessor", long_about = None)]
pub struct Cli {
    #[arg(long)]
    pub in1: PathBuf,
    /// Required unless `--merged_out` is given (§6); enforced in
    /// [`validate`] rather than via clap's `required` so a merge-only run
    /// (`--merged_out` with no split read1 output) stays valid.
    #[arg(long)]
    pub out1: Option<PathBuf>,
    #[arg(long)]
    pub in2: Option<PathBuf>,
    #[arg(long)]
    pub out2: Option<PathBuf>,

    #[arg(long)]
    pub merge: bool,
    #[arg(long)]
    pub merged_out: Option<PathBuf>,
    #[arg(long)]
    pub discard_unmerged: bool,

    #[arg(long)]
    pub phred64: bool,
    #[arg(long, default_value_t = 4)]
    pub compress_level: u32,
    #[arg(long)]
    pub interleaved_in: bool,
    #[arg(long)]
    pub notoverwrite: bool,
    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long)]
    pub enable_adapter_trimming: bool,
    #[arg(long)]
    pub adapter_seqr1: Option<String>,
    #[arg(long)]
    pub adapter_seqr2: Option<String>,
    #[arg(long)]
    pub detect_pe_adapter: bool,

    #[arg(long, default_value_t = 0)]
    pub trim_front1: usize,
    #[arg(long, default_value_t = 0)]
    pub trim_tail1: usize,
    #[arg(long, default_value_t = 0)]
    pub trim_front2: usize,
    #[arg(long, default_value_t = 0)]
    pub trim_tail2: usize,
    #[arg(long, default_value_t = 0)]
    pub max_len1: usize,
    #[arg(long, default_value_t = 0)]
    pub max_len2: usize,

    #[arg(short = 'g', long)]
    pub enable_polyg_trim: bool,
    #[arg(long, default_value_t = 10)]
    pub polyg_min_len: usize,
    #[arg(short = 'x', long)]
    pub enable_polyx_trim: bool,
    #[arg(long, default_value_t = 10)]
    pub polyx_min_len: usize,
    #[arg(long, default_value = "G")]
    pub polyx_chars: String,

    #[arg(long)]
    pub cut_front: bool,
    #[arg(long)]
    pub cut_tail: bool,
    #[arg(long)]
    pub cut_right: bool,
    #[arg(long, default_value_t = 4)]
    pub cut_window_size: usize,
    #[arg(long, default_value_t = 20)]
    pub cut_mean_quality: u8,

    #[arg(long)]
    pub enable_quality_filtering: bool,
    #[arg(long, default_value_t = 15)]
    pub qualified_quality_phred: u8,
    #[arg(long, default_value_t = 40)]
    pub unqualified_base_limit: usize,
    #[arg(long, default_value_t = 5)]
    pub n_base_limit: usize,

    #[arg(long)]
    pub enable_length_filter: bool,
    #[arg(long, default_value_t = 15)]
    pub minimum_length: usize,
    #[arg(long, default_value_t = 1000)]
    pub maximum_length: usize,

    #[arg(long)]
    pub enable_lowcomplexity_filter: bool,
    #[arg(long, default_value_t = 0.3)]
    pub minimum_complexity: f64,

    #[arg(long)]
    pub filter_by_index: bool,
    #[arg(long)]
    pub filter_index1: Option<PathBuf>,
    #[arg(long)]
    pub filter_index2: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    pub filter_index_threshold: usize,

    #[arg(long)]
    pub enable_base_correction: bool,
    #[arg(long, default_value_t = 30)]
    pub overlap_len_required: usize,
    #[arg(long, default_value_t = 5)]
    pub overlap_diff_limit: usize,

    #[arg(long)]
    pub enable_umi_processing: bool,
    #[arg(long, default_value_t = 1)]
    pub umi_loc: u8,
    #[arg(long, default_value_t = 0)]
    pub umi_len: usize,
    #[arg(long, default_value = "")]
    pub umi_prefix: String,
    #[arg(long, default_value_t = 0)]
    pub umi_skip: usize,

    #[arg(long)]
    pub enable_overrepana: bool,
    #[arg(long, default_value_t = 10_000)]
    pub overrepana_sampling: usize,

    #[arg(long)]
    pub json: Option<PathBuf>,
    #[arg(long)]
    pub html: Option<PathBuf>,
    #[arg(long, default_value = "fqprep report")]
    pub title: String,

    #[arg(long, default_value_t = 1)]
    pub thread: usize,

    #[arg(long)]
    pub split_by_file_number: bool,
    #[arg(long, default_value_t = 1)]
    pub file_number: usize,
    #[arg(long)]
    pub split_by_lines: bool,
    #[arg(long, default_value_t = 0)]
    pub file_lines: usize,
    #[arg(long, default_value_t = 4)]
    pub split_prefix_digits: usize,
}

/// Validated, immutable snapshot of every CLI flag (§3 `Config`). Built once
/// by [`parse_and_validate`], shared read-only across threads via `Arc`.
#[derive(Debug, Clone)]
pub struct Config {
    pub in1: PathBuf,
    pub out1: Option<PathBuf>,
    pub in2: Option<PathBuf>,
    pub out2: Option<PathBuf>,

    pub merge: bool,
    pub merged_out: Option<PathBuf>,
    pub discard_unmerged: bool,

    pub phred64: bool,
    pub compress_level: u32,
    pub interleaved_in: bool,
    pub notoverwrite: bool,
    pub verbose: bool,

    pub enable_adapter_trimming: bool,
    pub adapter_seqr1: Option<Vec<u8>>,
    pub adapter_seqr2: Option<Vec<u8>>,
    pub detect_pe_adapter: bool,

    pub trim_front1: usize,
    pub trim_tail1: usize,
    pub trim_front2: usize,
    pub trim_tail2: usize,
    pub max_len1: usize,
    pub max_len2: usize,

    pub enable_polyg_trim: bool,
    pub polyg_min_len: usize,
    pub enable_polyx_trim: bool,
    pub polyx_min_len: usize,
    pub polyx_chars: Vec<u8>,

    pub cut_front: bool,
    pub cut_tail: bool,
    pub cut_right: bool,
    pub cut_window_size: usize,
    pub cut_mean_quality: f64,

    pub filter_thresholds: crate::trim::FilterThresholds,

    pub enable_base_correction: bool,
    pub overlap_len_required: usize,
    pub overlap_diff_limit: usize,

    pub enable_umi_processing: bool,
    pub umi_loc: UmiLocation,
    pub umi_len: usize,
    pub umi_prefix: String,
    pub umi_skip: usize,

    pub enable_overrepana: bool,
    pub overrepana_sampling: usize,

    pub json: Option<PathBuf>,
    pub html: Option<PathBuf>,
    pub title: String,

    pub thread: usize,

    pub split_by_file_number: bool,
    pub file_number: usize,
    pub split_by_lines: bool,
    pub file_lines: usize,
    pub split_prefix_digits: usize,
}

/// Aborts clap with a custom parsing error, mirroring the teacher's
/// `abort_clap` helper but without a subcommand to route to.
fn abort_clap(kind: clap::error::ErrorKind, message: impl std::fmt::Display) -> ! {
    Cli::command().error(kind, message).exit()
}

fn check_range<T: PartialOrd + std::fmt::Display>(flag: &'static str, value: T, min: T, max: T) -> Result<(), ConfigError> {
    if value < min || value > max {
        Err(ConfigError::InvalidRange {
            flag,
            value: value.to_string(),
        })
    } else {
        Ok(())
    }
}

fn require_file(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ConfigError::MissingFile(path.to_path_buf()))
    }
}

/// Reads a plain-text index-blacklist file: one index sequence per line.
fn load_index_file(path: &Path) -> Result<Vec<u8>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Other(format!("failed to read {}: {e}", path.display())))?;
    let first_line = contents.lines().next().unwrap_or("").trim();
    Ok(first_line.as_bytes().to_vec())
}

/// Parses `std::env::args`, then validates cross-flag invariants into a
/// [`Config`] (§7 "Configuration error"). Invalid flag shapes abort via
/// clap's own error reporting; cross-flag validation failures abort via a
/// single `eprintln!` diagnostic and nonzero exit, per the teacher's
/// convention.
#[must_use]
pub fn parse_and_validate() -> Config {
    let cli = Cli::parse();
    match validate(cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("fqprep: {err}");
            std::process::exit(1);
        }
    }
}

fn validate(cli: Cli) -> Result<Config, ConfigError> {
    if cli.out1.is_none() && cli.merged_out.is_none() {
        abort_clap(
            clap::error::ErrorKind::MissingRequiredArgument,
            "the following required arguments were not provided:\n  --out1 <OUT1> (or --merged_out <MERGED_OUT>)",
        );
    }

    require_file(&cli.in1)?;
    if let Some(in2) = &cli.in2 {
        require_file(in2)?;
    }

    if let Some(out1) = &cli.out1 {
        if cli.notoverwrite && out1.exists() {
            return Err(ConfigError::OutputExists(out1.clone()));
        }
    }

    check_range("--compress_level", cli.compress_level, 1, 9)?;
    check_range("--max_len1", cli.max_len1, 0, 1000)?;
    check_range("--max_len2", cli.max_len2, 0, 1000)?;
    check_range("--umi_loc", cli.umi_loc, 1, 6)?;
    check_range("--thread", cli.thread, 1, 16)?;
    check_range("--split_prefix_digits", cli.split_prefix_digits, 1, 10)?;

    let umi_loc = UmiLocation::from_cli(cli.umi_loc).ok_or(ConfigError::InvalidRange {
        flag: "--umi_loc",
        value: cli.umi_loc.to_string(),
    })?;
    if cli.enable_umi_processing && umi_loc.is_in_read() && cli.umi_len == 0 {
        return Err(ConfigError::UmiLenRequired);
    }

    let polyx_chars = cli.polyx_chars.to_uppercase().into_bytes();
    if !polyx_chars.iter().all(|b| matches!(b, b'A' | b'T' | b'C' | b'G' | b'N')) {
        return Err(ConfigError::InvalidPolyxChars(cli.polyx_chars.clone()));
    }

    let filter_index1 = cli.filter_index1.as_deref().map(load_index_file).transpose()?;
    let filter_index2 = cli.filter_index2.as_deref().map(load_index_file).transpose()?;

    Ok(Config {
        in1: cli.in1,
        out1: cli.out1,
        in2: cli.in2,
        out2: cli.out2,
        merge: cli.merge,
        merged_out: cli.merged_out,
        discard_unmerged: cli.discard_unmerged,
        phred64: cli.phred64,
        compress_level: cli.compress_level,
        interleaved_in: cli.interleaved_in,
        notoverwrite: cli.notoverwrite,
        verbose: cli.verbose,
        enable_adapter_trimming: cli.enable_adapter_trimming,
        adapter_seqr1: cli.adapter_seqr1.map(String::into_bytes),
        adapter_seqr2: cli.adapter_seqr2.map(String::into_bytes),
        detect_pe_adapter: cli.detect_pe_adapter,
        trim_front1: cli.trim_front1,
        trim_tail1: cli.trim_tail1,
        trim_front2: cli.trim_front2,
        trim_tail2: cli.trim_tail2,
        max_len1: cli.max_len1,
        max_len2: cli.max_len2,
        enable_polyg_trim: cli.enable_polyg_trim,
        polyg_min_len: cli.polyg_min_len,
        enable_polyx_trim: cli.enable_polyx_trim,
        polyx_min_len: cli.polyx_min_len,
        polyx_chars,
        cut_front: cli.cut_front,
        cut_tail: cli.cut_tail,
        cut_right: cli.cut_right,
        cut_window_size: cli.cut_window_size,
        cut_mean_quality: f64::from(cli.cut_mean_quality),
        filter_thresholds: crate::trim::FilterThresholds {
            enable_quality_filtering: cli.enable_quality_filtering,
            qualified_quality_phred: cli.qualified_quality_phred,
            unqualified_base_limit: cli.unqualified_base_limit,
            n_base_limit: cli.n_base_limit,
            enable_length_filter: cli.enable_length_filter,
            minimum_length: cli.minimum_length,
            maximum_length: cli.maximum_length,
            enable_lowcomplexity_filter: cli.enable_lowcomplexity_filter,
            minimum_complexity: cli.minimum_complexity,
            filter_by_index: cli.filter_by_index,
            filter_index1,
            filter_index2,
            filter_index_threshold: cli.filter_index_threshold,
        },
        enable_base_correction: cli.enable_base_correction,
        overlap_len_required: cli.overlap_len_required,
        overlap_diff_limit: cli.overlap_diff_limit,
        enable_umi_processing: cli.enable_umi_processing,
        umi_loc,
        umi_len: cli.umi_len,
        umi_prefix: cli.umi_prefix,
        umi_skip: cli.umi_skip,
        enable_overrepana: cli.enable_overrepana,
        overrepana_sampling: cli.overrepana_sampling,
        json: cli.json,
        html: cli.html,
        title: cli.title,
        thread: cli.thread,
        split_by_file_number: cli.split_by_file_number,
        file_number: cli.file_number,
        split_by_lines: cli.split_by_lines,
        file_lines: cli.file_lines,
        split_prefix_digits: cli.split_prefix_digits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_cli(in1: PathBuf) -> Cli {
        Cli {
            in1,
            out1: Some(PathBuf::from("/tmp/fqprep-test-out.fastq")),
            in2: None,
            out2: None,
            merge: false,
            merged_out: None,
            discard_unmerged: false,
            phred64: false,
            compress_level: 4,
            interleaved_in: false,
            notoverwrite: false,
            verbose: false,
            enable_adapter_trimming: false,
            adapter_seqr1: None,
            adapter_seqr2: None,
            detect_pe_adapter: false,
            trim_front1: 0,
            trim_tail1: 0,
            trim_front2: 0,
            trim_tail2: 0,
            max_len1: 0,
            max_len2: 0,
            enable_polyg_trim: false,
            polyg_min_len: 10,
            enable_polyx_trim: false,
            polyx_min_len: 10,
            polyx_chars: "G".into(),
            cut_front: false,
            cut_tail: false,
            cut_right: false,
            cut_window_size: 4,
            cut_mean_quality: 20,
            enable_quality_filtering: false,
            qualified_quality_phred: 15,
            unqualified_base_limit: 40,
            n_base_limit: 5,
            enable_length_filter: false,
            minimum_length: 15,
            maximum_length: 1000,
            enable_lowcomplexity_filter: false,
            minimum_complexity: 0.3,
            filter_by_index: false,
            filter_index1: None,
            filter_index2: None,
            filter_index_threshold: 0,
            enable_base_correction: false,
            overlap_len_required: 30,
            overlap_diff_limit: 5,
            enable_umi_processing: false,
            umi_loc: 1,
            umi_len: 0,
            umi_prefix: String::new(),
            umi_skip: 0,
            enable_overrepana: false,
            overrepana_sampling: 10_000,
            json: None,
            html: None,
            title: "t".into(),
            thread: 1,
            split_by_file_number: false,
            file_number: 1,
            split_by_lines: false,
            file_lines: 0,
            split_prefix_digits: 4,
        }
    }

    #[test]
    fn rejects_missing_input_file() {
        let cli = minimal_cli(PathBuf::from("/nonexistent/path/does/not/exist.fastq"));
        let err = validate(cli).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }

    #[test]
    fn rejects_umi_len_zero_when_in_read() {
        let mut cli = minimal_cli(PathBuf::from(file!()));
        cli.enable_umi_processing = true;
        cli.umi_loc = 3; // Read1
        cli.umi_len = 0;
        let err = validate(cli).unwrap_err();
        assert!(matches!(err, ConfigError::UmiLenRequired));
    }

    #[test]
    fn rejects_invalid_polyx_chars() {
        let mut cli = minimal_cli(PathBuf::from(file!()));
        cli.polyx_chars = "Z".into();
        let err = validate(cli).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPolyxChars(_)));
    }

    #[test]
    fn accepts_minimal_valid_config() {
        let cli = minimal_cli(PathBuf::from(file!()));
        assert!(validate(cli).is_ok());
    }
}
