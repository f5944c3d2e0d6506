//! JSON reporter (§4.9): serializes the merged summary with `serde_json`,
//! the documented enrichment over the teacher's own text-only reports.

use crate::args::Config;
use crate::pipeline::RunSummary;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct StreamReport {
    reads: u64,
    total_bases: u64,
    gc_content: f64,
    mean_quality_by_cycle: Vec<f64>,
    base_composition_by_cycle: Vec<BaseComposition>,
    overrepresented_kmers: Vec<KmerCount>,
}

#[derive(Serialize)]
struct BaseComposition {
    a: u64,
    t: u64,
    c: u64,
    g: u64,
    n: u64,
}

#[derive(Serialize)]
struct KmerCount {
    sequence: String,
    count: u64,
}

#[derive(Serialize)]
struct OverrepresentedSeqReport {
    sequence: String,
    count: u64,
}

#[derive(Serialize)]
struct AdapterReport {
    detected_sequence: Option<String>,
    illumina_adapter: bool,
}

#[derive(Serialize)]
struct EvaluatorReport {
    estimated_read_length: usize,
    estimated_record_count: Option<u64>,
    record_count_exact: Option<bool>,
    two_color_system: bool,
    adapter_r1: AdapterReport,
    adapter_r2: AdapterReport,
    overrepresented_r1: Vec<OverrepresentedSeqReport>,
    overrepresented_r2: Vec<OverrepresentedSeqReport>,
}

#[derive(Serialize)]
struct FilterCountsReport {
    pass: u64,
    low_quality: u64,
    too_short: u64,
    too_long: u64,
    too_many_n: u64,
    low_complexity: u64,
    index_match: u64,
}

#[derive(Serialize)]
struct Report<'a> {
    title: &'a str,
    pairs_in: u64,
    pairs_out: u64,
    filter_counts: FilterCountsReport,
    duplication_rate: f64,
    gc_content: f64,
    insert_size_histogram: Vec<u64>,
    evaluator: EvaluatorReport,
    read1_before_filtering: StreamReport,
    read2_before_filtering: Option<StreamReport>,
    read1_after_filtering: StreamReport,
    read2_after_filtering: Option<StreamReport>,
}

fn to_stream_report(stats: &crate::stats::Statistics) -> StreamReport {
    StreamReport {
        reads: stats.reads_counted(),
        total_bases: stats.total_bases(),
        gc_content: stats.gc_curve(),
        mean_quality_by_cycle: stats.quality_curve(),
        base_composition_by_cycle: stats
            .base_curve()
            .into_iter()
            .map(|(a, t, c, g, n)| BaseComposition { a, t, c, g, n })
            .collect(),
        overrepresented_kmers: stats
            .overrepresented_kmers(20)
            .into_iter()
            .map(|(seq, count)| KmerCount {
                sequence: String::from_utf8_lossy(&seq).into_owned(),
                count,
            })
            .collect(),
    }
}

fn to_adapter_report(estimate: &crate::evaluator::AdapterEstimate) -> AdapterReport {
    AdapterReport {
        detected_sequence: estimate.detected_adapter_seq.as_deref().map(|s| String::from_utf8_lossy(s).into_owned()),
        illumina_adapter: estimate.illumina_adapter,
    }
}

fn to_overrep_report(seqs: &[crate::evaluator::OverrepresentedSeq]) -> Vec<OverrepresentedSeqReport> {
    seqs.iter()
        .map(|s| OverrepresentedSeqReport {
            sequence: String::from_utf8_lossy(&s.sequence).into_owned(),
            count: s.count,
        })
        .collect()
}

/// Writes the JSON report to `path`.
pub fn write(path: &Path, config: &Config, summary: &RunSummary) -> std::io::Result<()> {
    let paired = config.interleaved_in || config.in2.is_some();

    let report = Report {
        title: &config.title,
        pairs_in: summary.pairs_in,
        pairs_out: summary.pairs_out,
        filter_counts: FilterCountsReport {
            pass: summary.filter_counts.get(crate::trim::FilterVerdict::Pass),
            low_quality: summary.filter_counts.get(crate::trim::FilterVerdict::LowQuality),
            too_short: summary.filter_counts.get(crate::trim::FilterVerdict::TooShort),
            too_long: summary.filter_counts.get(crate::trim::FilterVerdict::TooLong),
            too_many_n: summary.filter_counts.get(crate::trim::FilterVerdict::TooManyN),
            low_complexity: summary.filter_counts.get(crate::trim::FilterVerdict::LowComplexity),
            index_match: summary.filter_counts.get(crate::trim::FilterVerdict::IndexMatch),
        },
        duplication_rate: summary.duplication.duplication_rate(),
        gc_content: summary.duplication.gc_content(),
        insert_size_histogram: summary.insert_sizes.counts.clone(),
        evaluator: EvaluatorReport {
            estimated_read_length: summary.estimated_read_length,
            estimated_record_count: summary.record_count.map(|c| c.reads_num),
            record_count_exact: summary.record_count.map(|c| c.exact),
            two_color_system: summary.two_color_system,
            adapter_r1: to_adapter_report(&summary.adapter_r1),
            adapter_r2: to_adapter_report(&summary.adapter_r2),
            overrepresented_r1: to_overrep_report(&summary.overrepresented_r1),
            overrepresented_r2: to_overrep_report(&summary.overrepresented_r2),
        },
        read1_before_filtering: to_stream_report(&summary.stats_r1_pre),
        read2_before_filtering: paired.then(|| to_stream_report(&summary.stats_r2_pre)),
        read1_after_filtering: to_stream_report(&summary.stats_r1_post),
        read2_after_filtering: paired.then(|| to_stream_report(&summary.stats_r2_post)),
    };

    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &report).map_err(std::io::Error::other)
}
