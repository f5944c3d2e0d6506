//! Per-stream statistics collector (§2, §8 invariant 4): per-cycle base and
//! quality histograms, a GC curve, and k-mer overrepresentation tracking.
//! Four instances run per thread (pre/post × R1/R2); all merge by pointwise
//! addition.

use crate::model::Read;
use crate::utils::{fast_map, FastMap};

/// Per-cycle counts for one of A/T/C/G/N.
#[derive(Debug, Clone, Default)]
struct BaseCounts {
    a: u64,
    t: u64,
    c: u64,
    g: u64,
    n: u64,
}

impl BaseCounts {
    fn add(&mut self, base: u8) {
        match base {
            b'A' => self.a += 1,
            b'T' => self.t += 1,
            b'C' => self.c += 1,
            b'G' => self.g += 1,
            _ => self.n += 1,
        }
    }

    fn merge(&mut self, other: &BaseCounts) {
        self.a += other.a;
        self.t += other.t;
        self.c += other.c;
        self.g += other.g;
        self.n += other.n;
    }

    fn total(&self) -> u64 {
        self.a + self.t + self.c + self.g + self.n
    }
}

/// Tracks base composition, quality, GC, and k-mer counts across a stream of
/// reads, organized per sequencing cycle (read position).
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    cycle_bases: Vec<BaseCounts>,
    cycle_quality_sum: Vec<u64>,
    cycle_quality_count: Vec<u64>,
    gc_reads: u64,
    gc_sum: f64,
    kmer_counts: FastMap<Vec<u8>, u64>,
    reads_counted: u64,
}

/// k-mer length used for the per-stream overrepresentation tally. Shorter
/// than the evaluator's adapter k-mer since this runs over every processed
/// read, not just the sampling prefix.
const STATS_KMER_LEN: usize = 20;

impl Statistics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            kmer_counts: fast_map(),
            ..Default::default()
        }
    }

    /// Folds one read into the collector. Call once per mate, per processing
    /// stage (pre-trim and post-trim tallies use separate `Statistics`
    /// instances).
    pub fn add_read(&mut self, read: &Read) {
        let len = read.len();
        if self.cycle_bases.len() < len {
            self.cycle_bases.resize_with(len, BaseCounts::default);
            self.cycle_quality_sum.resize(len, 0);
            self.cycle_quality_count.resize(len, 0);
        }

        for (i, (&base, &qual)) in read.sequence.iter().zip(&read.quality).enumerate() {
            self.cycle_bases[i].add(base);
            self.cycle_quality_sum[i] += u64::from(qual.saturating_sub(33));
            self.cycle_quality_count[i] += 1;
        }

        if len > 0 {
            let gc = read.sequence.iter().filter(|&&b| b == b'G' || b == b'C').count();
            self.gc_sum += gc as f64 / len as f64;
            self.gc_reads += 1;
        }

        if len >= STATS_KMER_LEN {
            for window in read.sequence.windows(STATS_KMER_LEN) {
                *self.kmer_counts.entry(window.to_vec()).or_insert(0) += 1;
            }
        }

        self.reads_counted += 1;
    }

    /// Mean GC fraction across all reads seen.
    #[must_use]
    pub fn gc_curve(&self) -> f64 {
        if self.gc_reads == 0 {
            0.0
        } else {
            self.gc_sum / self.gc_reads as f64
        }
    }

    /// Per-cycle mean quality (phred, post phred+33 offset).
    #[must_use]
    pub fn quality_curve(&self) -> Vec<f64> {
        self.cycle_quality_sum
            .iter()
            .zip(&self.cycle_quality_count)
            .map(|(&sum, &count)| if count == 0 { 0.0 } else { sum as f64 / count as f64 })
            .collect()
    }

    /// Per-cycle base composition, as `(a, t, c, g, n)` raw counts.
    #[must_use]
    pub fn base_curve(&self) -> Vec<(u64, u64, u64, u64, u64)> {
        self.cycle_bases.iter().map(|c| (c.a, c.t, c.c, c.g, c.n)).collect()
    }

    #[must_use]
    pub fn reads_counted(&self) -> u64 {
        self.reads_counted
    }

    /// The k-mers seen more than once, most frequent first.
    #[must_use]
    pub fn overrepresented_kmers(&self, top_n: usize) -> Vec<(Vec<u8>, u64)> {
        let mut entries: Vec<(Vec<u8>, u64)> = self.kmer_counts.iter().filter(|&(_, &c)| c > 1).map(|(k, &c)| (k.clone(), c)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(top_n);
        entries
    }

    /// Merges another shard's statistics into this one by pointwise
    /// addition of every counter and union of the k-mer map (§8 invariant 4).
    pub fn merge(&mut self, other: &Statistics) {
        if self.cycle_bases.len() < other.cycle_bases.len() {
            self.cycle_bases.resize_with(other.cycle_bases.len(), BaseCounts::default);
            self.cycle_quality_sum.resize(other.cycle_bases.len(), 0);
            self.cycle_quality_count.resize(other.cycle_bases.len(), 0);
        }
        for (i, counts) in other.cycle_bases.iter().enumerate() {
            self.cycle_bases[i].merge(counts);
        }
        for (i, &sum) in other.cycle_quality_sum.iter().enumerate() {
            self.cycle_quality_sum[i] += sum;
        }
        for (i, &count) in other.cycle_quality_count.iter().enumerate() {
            self.cycle_quality_count[i] += count;
        }

        self.gc_reads += other.gc_reads;
        self.gc_sum += other.gc_sum;
        self.reads_counted += other.reads_counted;

        for (kmer, &count) in &other.kmer_counts {
            *self.kmer_counts.entry(kmer.clone()).or_insert(0) += count;
        }
    }

    #[must_use]
    pub fn total_bases(&self) -> u64 {
        self.cycle_bases.iter().map(BaseCounts::total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(seq: &[u8]) -> Read {
        Read::new("@x".into(), seq.to_vec(), vec![b'I'; seq.len()], None)
    }

    #[test]
    fn merge_matches_single_shard_equivalent() {
        let reads = [
            read(b"ACGTACGTACGTACGTACGTACGT"),
            read(b"GGGGCCCCACGTACGTACGTACGT"),
            read(b"TTTTACGTACGTACGTACGTACGT"),
        ];

        let mut whole = Statistics::new();
        for r in &reads {
            whole.add_read(r);
        }

        let mut shard_a = Statistics::new();
        shard_a.add_read(&reads[0]);
        let mut shard_b = Statistics::new();
        shard_b.add_read(&reads[1]);
        shard_b.add_read(&reads[2]);

        let mut merged = Statistics::new();
        merged.merge(&shard_a);
        merged.merge(&shard_b);

        assert_eq!(merged.reads_counted(), whole.reads_counted());
        assert_eq!(merged.total_bases(), whole.total_bases());
        assert!((merged.gc_curve() - whole.gc_curve()).abs() < 1e-9);
    }

    #[test]
    fn quality_curve_has_one_entry_per_cycle() {
        let mut stats = Statistics::new();
        stats.add_read(&read(b"ACGT"));
        assert_eq!(stats.quality_curve().len(), 4);
    }
}
