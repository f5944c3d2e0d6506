//! Per-pair worker loop (§4.5, §4.8 step 4): pulls packs off the ring, runs
//! the full trim/filter/merge pipeline on every pair, and hands serialized
//! output to the writer mailbox.

use super::{InsertSizeHistogram, WorkerContext, INSERT_SIZE_MAX};
use crate::duplicate::DuplicateEstimator;
use crate::model::read::{Read, ReadPair};
use crate::overlap;
use crate::stats::Statistics;
use crate::trim::{self, pair_verdict, pass_filter, umi, CutMode, FilterVerdict};
use std::sync::mpsc::Sender;

use super::{FilterCounts, StopToken};
use super::writer::OutputMessage;

/// One worker thread's contribution to the run, merged pointwise into
/// [`super::RunSummary`] once all workers have joined (§8 invariant 4).
#[derive(Debug, Clone, Default)]
pub struct ThreadResult {
    pub pairs_out: u64,
    pub filter_counts: FilterCounts,
    pub stats_r1_pre: Statistics,
    pub stats_r2_pre: Statistics,
    pub stats_r1_post: Statistics,
    pub stats_r2_post: Statistics,
    pub insert_sizes: InsertSizeHistogram,
    pub duplication: DuplicateEstimator,
}

impl ThreadResult {
    fn new() -> Self {
        Self {
            stats_r1_pre: Statistics::new(),
            stats_r2_pre: Statistics::new(),
            stats_r1_post: Statistics::new(),
            stats_r2_post: Statistics::new(),
            insert_sizes: InsertSizeHistogram::new(INSERT_SIZE_MAX),
            duplication: DuplicateEstimator::new(),
            ..Default::default()
        }
    }
}

/// Drains packs from `ring` until the producer finishes (or `stop` fires),
/// running every configured stage on each pair in turn.
pub fn run_worker(
    ring: &std::sync::Arc<crate::model::pack::PackRingBuffer>,
    tx: &Sender<OutputMessage>,
    ctx: &WorkerContext,
    stop: &StopToken,
) -> ThreadResult {
    let mut result = ThreadResult::new();

    while let Some(pack) = ring.pop() {
        if stop.is_stopped() {
            break;
        }
        for mut pair in pack.pairs {
            process_pair(&mut pair, ctx, &mut result, tx);
        }
    }

    result
}

fn process_pair(pair: &mut ReadPair, ctx: &WorkerContext, result: &mut ThreadResult, tx: &Sender<OutputMessage>) {
    let config = &ctx.config;
    let paired = ctx.paired;

    pair.left.normalize_bases();
    if paired {
        pair.right.normalize_bases();
    }

    if config.phred64 {
        pair.left.normalize_phred64();
        if paired {
            pair.right.normalize_phred64();
        }
    }

    result.duplication.stat_pair(pair);
    result.stats_r1_pre.add_read(&pair.left);
    if paired {
        result.stats_r2_pre.add_read(&pair.right);
    }

    if config.enable_umi_processing {
        umi::extract_umi(
            &mut pair.left,
            &mut pair.right,
            None,
            None,
            config.umi_loc,
            config.umi_len,
            config.umi_skip,
            &config.umi_prefix,
        );
    }

    force_trim(&mut pair.left, config.trim_front1, config.trim_tail1, config.max_len1);
    if paired {
        force_trim(&mut pair.right, config.trim_front2, config.trim_tail2, config.max_len2);
    }

    if config.enable_polyg_trim {
        let right = paired.then_some(&mut pair.right);
        trim::polyx::poly_x_trim(&mut pair.left, right, b"G", config.polyg_min_len);
    }
    if config.enable_polyx_trim {
        let right = paired.then_some(&mut pair.right);
        trim::polyx::poly_x_trim(&mut pair.left, right, &config.polyx_chars, config.polyx_min_len);
    }

    run_quality_cuts(&mut pair.left, config);
    if paired {
        run_quality_cuts(&mut pair.right, config);
    }

    let overlap_result = if paired {
        Some(overlap::analyze(
            &pair.left.sequence,
            &pair.right.sequence,
            config.overlap_len_required,
            config.overlap_diff_limit,
        ))
    } else {
        None
    };

    if let Some(overlap_result) = &overlap_result {
        let insert = overlap::insert_size(pair.left.len(), pair.right.len(), overlap_result, result.insert_sizes.counts.len() - 1);
        result.insert_sizes.record(insert);

        if config.enable_base_correction && overlap_result.overlapped && overlap_result.offset >= 0 {
            correct_by_overlap(&mut pair.left, &mut pair.right, overlap_result);
        }
    }

    if config.enable_adapter_trimming {
        if let Some(adapter1) = &ctx.adapter_r1 {
            trim::adapter::trim_known_adapter(&mut pair.left, adapter1);
        }
        if paired {
            if let Some(adapter2) = &ctx.adapter_r2 {
                trim::adapter::trim_known_adapter(&mut pair.right, adapter2);
            } else if ctx.adapter_r1.is_none() {
                trim::adapter::trim_by_overlap(&mut pair.left, &mut pair.right, config.overlap_len_required, config.overlap_diff_limit);
            }
        }
    }

    let mut merged: Option<Read> = None;
    if config.merge && paired {
        if let Some(overlap_result) = &overlap_result {
            if let Some((seq, qual)) = overlap::merge(&pair.left.sequence, &pair.left.quality, &pair.right.sequence, &pair.right.quality, overlap_result) {
                merged = Some(Read::new(pair.left.name.clone(), seq, qual, pair.left.comment.clone()));
            }
        }
        if merged.is_none() && config.discard_unmerged {
            result.filter_counts.record(FilterVerdict::TooShort);
            return;
        }
    }

    let verdict = if let Some(merged_read) = &merged {
        result.stats_r1_post.add_read(merged_read);
        pass_filter(merged_read, &config.filter_thresholds)
    } else {
        result.stats_r1_post.add_read(&pair.left);
        let left_verdict = pass_filter(&pair.left, &config.filter_thresholds);
        if paired {
            result.stats_r2_post.add_read(&pair.right);
            let right_verdict = pass_filter(&pair.right, &config.filter_thresholds);
            pair_verdict(left_verdict, right_verdict)
        } else {
            left_verdict
        }
    };

    result.filter_counts.record(verdict);

    if verdict != FilterVerdict::Pass {
        if let Some(merged_read) = merged {
            let mut bytes = Vec::new();
            merged_read.write_fastq(&mut bytes);
            let _ = tx.send(OutputMessage::Failed(bytes));
        } else {
            let mut bytes = Vec::new();
            pair.left.write_fastq(&mut bytes);
            if paired {
                pair.right.write_fastq(&mut bytes);
            }
            let _ = tx.send(OutputMessage::Failed(bytes));
        }
        return;
    }

    result.pairs_out += 1;

    if let Some(merged_read) = merged {
        let mut bytes = Vec::new();
        merged_read.write_fastq(&mut bytes);
        let _ = tx.send(OutputMessage::Merged(bytes));
        return;
    }

    let mut r1_bytes = Vec::new();
    pair.left.write_fastq(&mut r1_bytes);
    let _ = tx.send(OutputMessage::Read1(r1_bytes));

    if paired {
        let mut r2_bytes = Vec::new();
        pair.right.write_fastq(&mut r2_bytes);
        let _ = tx.send(OutputMessage::Read2(r2_bytes));
    }
}

fn force_trim(read: &mut Read, front: usize, tail: usize, max_len: usize) {
    if front > 0 || tail > 0 {
        read.trim_in_place(front, tail);
    }
    if max_len > 0 && read.len() > max_len {
        read.trim_in_place(0, read.len() - max_len);
    }
}

fn run_quality_cuts(read: &mut Read, config: &crate::args::Config) {
    if config.cut_front {
        trim::quality_cut::cut(read, CutMode::Front, config.cut_window_size, config.cut_mean_quality);
    }
    if config.cut_tail {
        trim::quality_cut::cut(read, CutMode::Tail, config.cut_window_size, config.cut_mean_quality);
    }
    if config.cut_right {
        trim::quality_cut::cut(read, CutMode::Right, config.cut_window_size, config.cut_mean_quality);
    }
}

/// Rewrites the overlapping region of both mates with a per-base quality
/// consensus (§4.4b), leaving the non-overlapping flanks untouched.
fn correct_by_overlap(left: &mut Read, right: &mut Read, result: &overlap::OverlapResult) {
    let offset = result.offset as usize;
    let overlap_len = result.overlap_len;
    if offset + overlap_len > left.sequence.len() {
        return;
    }
    let r2rc_seq = overlap::reverse_complement(&right.sequence);
    let r2rc_qual: Vec<u8> = right.quality.iter().rev().copied().collect();
    if overlap_len > r2rc_seq.len() {
        return;
    }

    let (cons_seq, cons_qual) = overlap::consensus_overlap(
        &left.sequence[offset..offset + overlap_len],
        &left.quality[offset..offset + overlap_len],
        &r2rc_seq[..overlap_len],
        &r2rc_qual[..overlap_len],
    );

    left.sequence[offset..offset + overlap_len].copy_from_slice(&cons_seq);
    left.quality[offset..offset + overlap_len].copy_from_slice(&cons_qual);

    // Project the corrected consensus back onto r2's own orientation.
    let cons_rc_seq = overlap::reverse_complement(&cons_seq);
    let cons_rc_qual: Vec<u8> = cons_qual.iter().rev().copied().collect();
    let right_len = right.sequence.len();
    if overlap_len <= right_len {
        right.sequence[right_len - overlap_len..].copy_from_slice(&cons_rc_seq);
        right.quality[right_len - overlap_len..].copy_from_slice(&cons_rc_qual);
    }
}
