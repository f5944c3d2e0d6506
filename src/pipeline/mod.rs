//! Orchestrator (§4.8): owns the reader/worker/writer thread lifecycle,
//! fans in per-thread statistics, and triggers report emission.

pub mod worker;
pub mod writer;

use crate::args::Config;
use crate::duplicate::DuplicateEstimator;
use crate::evaluator::{self, AdapterEstimate, OverrepresentedSeq, PlatformEstimate, RecordCountEstimate};
use crate::io::reader::{FastqReader, PairedReader};
use crate::model::pack::{Pack, PackRingBuffer};
use crate::stats::Statistics;
use crate::trim::FilterVerdict;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

/// Number of records the evaluator samples from the start of the input
/// before the main run begins (§4.3, §4.8 step 3), distinct from `--thread`
/// concurrency: this pass runs single-threaded, on its own file handle.
const EVALUATOR_SAMPLE_CAP: usize = 20_000;

/// Number of read pairs batched into a single [`Pack`] (§3, §4.6).
const PACK_SIZE: usize = 256;
/// Ring buffer capacity, `maxPacksInRepo` (§3 default).
const RING_CAPACITY: usize = 1000;
/// In-memory high-water mark, `maxPacksInMemory` (§3 default).
const MAX_PACKS_IN_MEMORY: usize = 5;

/// Insert-size histogram: entry `i` counts pairs with inferred insert size
/// `i` (§3). Per-thread, merged by pointwise addition at shutdown (§9).
#[derive(Debug, Clone)]
pub struct InsertSizeHistogram {
    pub counts: Vec<u64>,
}

impl InsertSizeHistogram {
    #[must_use]
    pub fn new(insert_size_max: usize) -> Self {
        Self {
            counts: vec![0; insert_size_max + 1],
        }
    }

    pub fn record(&mut self, size: usize) {
        let idx = size.min(self.counts.len() - 1);
        self.counts[idx] += 1;
    }

    pub fn merge(&mut self, other: &InsertSizeHistogram) {
        if self.counts.len() < other.counts.len() {
            self.counts.resize(other.counts.len(), 0);
        }
        for (i, &c) in other.counts.iter().enumerate() {
            self.counts[i] += c;
        }
    }
}

/// Cooperative cancellation flag threaded through the reader and workers
/// (§5, §9 "graceful shutdown").
#[derive(Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Pointwise-mergeable verdict counts (§8 invariant 3: pair conservation).
#[derive(Debug, Clone, Default)]
pub struct FilterCounts {
    counts: HashMap<FilterVerdict, u64>,
}

impl FilterCounts {
    pub fn record(&mut self, verdict: FilterVerdict) {
        *self.counts.entry(verdict).or_insert(0) += 1;
    }

    #[must_use]
    pub fn get(&self, verdict: FilterVerdict) -> u64 {
        *self.counts.get(&verdict).unwrap_or(&0)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn merge(&mut self, other: &FilterCounts) {
        for (&verdict, &count) in &other.counts {
            *self.counts.entry(verdict).or_insert(0) += count;
        }
    }
}

/// The orchestrator's merged, read-only result, consumed by the reporters
/// (§4.9) and nothing else.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub pairs_in: u64,
    pub pairs_out: u64,
    pub filter_counts: FilterCounts,
    pub stats_r1_pre: Statistics,
    pub stats_r2_pre: Statistics,
    pub stats_r1_post: Statistics,
    pub stats_r2_post: Statistics,
    pub insert_sizes: InsertSizeHistogram,
    pub duplication: DuplicateEstimator,
    pub adapter_r1: AdapterEstimate,
    pub adapter_r2: AdapterEstimate,
    pub two_color_system: bool,
    pub estimated_read_length: usize,
    pub record_count: Option<RecordCountEstimate>,
    pub overrepresented_r1: Vec<OverrepresentedSeq>,
    pub overrepresented_r2: Vec<OverrepresentedSeq>,
}

impl RunSummary {
    #[must_use]
    pub fn new(insert_size_max: usize) -> Self {
        Self {
            insert_sizes: InsertSizeHistogram::new(insert_size_max),
            stats_r1_pre: Statistics::new(),
            stats_r2_pre: Statistics::new(),
            stats_r1_post: Statistics::new(),
            stats_r2_post: Statistics::new(),
            duplication: DuplicateEstimator::new(),
            ..Default::default()
        }
    }

    fn merge(&mut self, other: worker::ThreadResult) {
        self.pairs_out += other.pairs_out;
        self.filter_counts.merge(&other.filter_counts);
        self.stats_r1_pre.merge(&other.stats_r1_pre);
        self.stats_r2_pre.merge(&other.stats_r2_pre);
        self.stats_r1_post.merge(&other.stats_r1_post);
        self.stats_r2_post.merge(&other.stats_r2_post);
        self.insert_sizes.merge(&other.insert_sizes);
        self.duplication.merge(&other.duplication);
    }
}

pub(crate) const INSERT_SIZE_MAX: usize = 1000;

/// Bundles the config a worker needs with the adapter sequences resolved
/// once up front by the evaluator sampling pass (§4.3, §4.8 step 3):
/// either the user's `--adapter_seqr1/2`, or what `--detect_pe_adapter`
/// inferred from the input prefix.
pub struct WorkerContext {
    pub config: Arc<Config>,
    pub adapter_r1: Option<Vec<u8>>,
    pub adapter_r2: Option<Vec<u8>>,
    pub paired: bool,
}

/// A bounded prefix of the input, read once up front on its own file handle
/// (§4.3), feeding the five evaluator probes before the main run starts.
struct EvaluatorSample {
    r1_sequences: Vec<Vec<u8>>,
    r2_sequences: Vec<Vec<u8>>,
    record_offsets: Vec<u64>,
    total_bytes: u64,
    reached_eof: bool,
    first_name: String,
}

fn sample_prefix(config: &Config, paired: bool) -> std::io::Result<EvaluatorSample> {
    let mut reader = open_paired_reader(config)?;
    let mut sample = EvaluatorSample {
        r1_sequences: Vec::new(),
        r2_sequences: Vec::new(),
        record_offsets: Vec::new(),
        total_bytes: 0,
        reached_eof: false,
        first_name: String::new(),
    };

    for _ in 0..EVALUATOR_SAMPLE_CAP {
        match reader.next_pair() {
            Ok(Some(pair)) => {
                if sample.first_name.is_empty() {
                    sample.first_name = pair.left.name.clone();
                }
                sample.r1_sequences.push(pair.left.sequence);
                if paired {
                    sample.r2_sequences.push(pair.right.sequence);
                }
                sample.record_offsets.push(reader.r1_offset());
            }
            Ok(None) => {
                sample.reached_eof = true;
                break;
            }
            Err(_) => {
                sample.reached_eof = true;
                break;
            }
        }
    }

    sample.total_bytes = reader.r1_total_size_hint();
    Ok(sample)
}

/// Resolves the adapter(s) workers should trim by known-sequence match: the
/// user's explicit `--adapter_seqr1/2` wins; otherwise, when
/// `--detect_pe_adapter` is set, the evaluator's inference over the sampled
/// prefix supplies it (§4.3, §4.4d).
fn resolve_adapters(config: &Config, sample: &EvaluatorSample, paired: bool) -> (AdapterEstimate, AdapterEstimate) {
    let adapter_r1 = match &config.adapter_seqr1 {
        Some(seq) => AdapterEstimate {
            detected_adapter_seq: Some(seq.clone()),
            illumina_adapter: false,
        },
        None if config.detect_pe_adapter => evaluator::infer_adapter(sample.r1_sequences.iter().map(Vec::as_slice), config.trim_tail1),
        None => AdapterEstimate::default(),
    };
    let adapter_r2 = if !paired {
        AdapterEstimate::default()
    } else {
        match &config.adapter_seqr2 {
            Some(seq) => AdapterEstimate {
                detected_adapter_seq: Some(seq.clone()),
                illumina_adapter: false,
            },
            None if config.detect_pe_adapter => evaluator::infer_adapter(sample.r2_sequences.iter().map(Vec::as_slice), config.trim_tail2),
            None => AdapterEstimate::default(),
        }
    };
    (adapter_r1, adapter_r2)
}

/// Runs the full pipeline to completion (§4.8 steps 1-6): samples the input
/// prefix for the evaluator, opens input/output streams, starts the
/// producer, N worker threads, and the active writer threads, then joins
/// everything and merges per-thread summaries.
pub fn run(config: Arc<Config>, stop: StopToken) -> std::io::Result<RunSummary> {
    let paired = is_paired_end(&config);

    let sample = sample_prefix(&config, paired)?;
    let platform = if sample.first_name.is_empty() {
        PlatformEstimate::default()
    } else {
        evaluator::detect_platform(&sample.first_name)
    };
    let estimated_read_length = evaluator::estimate_read_length(sample.r1_sequences.iter().map(Vec::as_slice));
    let record_count = evaluator::estimate_record_count(sample.record_offsets.iter().copied(), sample.total_bytes, sample.reached_eof);
    let (overrepresented_r1, overrepresented_r2) = if config.enable_overrepana {
        (
            evaluator::find_overrepresented(sample.r1_sequences.iter().map(Vec::as_slice)),
            if paired {
                evaluator::find_overrepresented(sample.r2_sequences.iter().map(Vec::as_slice))
            } else {
                Vec::new()
            },
        )
    } else {
        (Vec::new(), Vec::new())
    };
    let (adapter_r1, adapter_r2) = resolve_adapters(&config, &sample, paired);
    drop(sample);

    let ctx = Arc::new(WorkerContext {
        config: Arc::clone(&config),
        adapter_r1: adapter_r1.detected_adapter_seq.clone(),
        adapter_r2: adapter_r2.detected_adapter_seq.clone(),
        paired,
    });

    let mut reader = open_paired_reader(&config)?;
    let writer_set = writer::WriterSet::open(&config)?;
    let ring = Arc::new(PackRingBuffer::new(RING_CAPACITY, MAX_PACKS_IN_MEMORY));

    let (tx, rx) = mpsc::channel::<writer::OutputMessage>();
    let writer_handle = writer_set.spawn(rx, &config);

    let producer_ring = Arc::clone(&ring);
    let producer_stop = stop.clone();
    let producer = std::thread::spawn(move || -> std::io::Result<u64> {
        let mut pairs_in = 0u64;
        loop {
            if producer_stop.is_stopped() {
                break;
            }
            let mut pack = Pack::with_capacity(PACK_SIZE);
            for _ in 0..PACK_SIZE {
                match reader.next_pair() {
                    Ok(Some(pair)) => {
                        pairs_in += 1;
                        pack.pairs.push(pair);
                    }
                    Ok(None) => break,
                    Err(_) => break,
                }
            }
            let done = pack.count() < PACK_SIZE;
            if pack.count() > 0 {
                producer_ring.push(pack);
            }
            if done {
                break;
            }
        }
        producer_ring.finish_producing();
        Ok(pairs_in)
    });

    let thread_count = config.thread.max(1);
    let mut worker_handles = Vec::with_capacity(thread_count);
    for _ in 0..thread_count {
        let ring = Arc::clone(&ring);
        let tx = tx.clone();
        let ctx = Arc::clone(&ctx);
        let stop = stop.clone();
        worker_handles.push(std::thread::spawn(move || worker::run_worker(&ring, &tx, &ctx, &stop)));
    }
    drop(tx);

    let pairs_in = producer.join().expect("producer thread panicked")?;

    let mut summary = RunSummary::new(INSERT_SIZE_MAX);
    summary.pairs_in = pairs_in;
    for handle in worker_handles {
        let result = handle.join().expect("worker thread panicked");
        summary.merge(result);
    }

    writer_handle.join();

    summary.adapter_r1 = adapter_r1;
    summary.adapter_r2 = adapter_r2;
    summary.two_color_system = platform.two_color_system;
    summary.estimated_read_length = estimated_read_length;
    summary.record_count = Some(record_count);
    summary.overrepresented_r1 = overrepresented_r1;
    summary.overrepresented_r2 = overrepresented_r2;

    Ok(summary)
}

fn open_paired_reader(config: &Config) -> std::io::Result<PairedReader> {
    if config.interleaved_in {
        Ok(PairedReader::Interleaved(FastqReader::open(&config.in1)?))
    } else if let Some(in2) = &config.in2 {
        Ok(PairedReader::TwoFiles(FastqReader::open(&config.in1)?, FastqReader::open(in2)?))
    } else {
        Ok(PairedReader::SingleEnd(FastqReader::open(&config.in1)?))
    }
}

/// True when the run has two genuine mates per pair (paired or interleaved
/// input), as opposed to single-end input where the "right" mate is a
/// duplicate placeholder (§4.1).
#[must_use]
pub(crate) fn is_paired_end(config: &Config) -> bool {
    config.interleaved_in || config.in2.is_some()
}
