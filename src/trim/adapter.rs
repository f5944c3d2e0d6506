//! Adapter trimming (§3, §4.4d): either by locating a known adapter sequence
//! directly, or by detecting 3' read-through via mate overlap analysis.

use crate::model::Read;
use crate::overlap::{self, OverlapResult};

/// Minimum run of matching bases required to call an adapter hit when
/// scanning for a known sequence; short spurious matches are ignored.
const MIN_ADAPTER_MATCH: usize = 4;

/// Searches `read` for the first position at which `adapter` matches with at
/// most one mismatch per 8 bases, requiring at least [`MIN_ADAPTER_MATCH`]
/// overlapping bases with the read's end. Returns the position to trim from,
/// if found.
#[must_use]
fn find_adapter_position(sequence: &[u8], adapter: &[u8]) -> Option<usize> {
    if adapter.is_empty() {
        return None;
    }
    for start in 0..sequence.len() {
        let overlap_len = (sequence.len() - start).min(adapter.len());
        if overlap_len < MIN_ADAPTER_MATCH {
            break;
        }
        let mismatches = sequence[start..start + overlap_len]
            .iter()
            .zip(&adapter[..overlap_len])
            .filter(|(a, b)| a != b)
            .count();
        let allowed = (overlap_len / 8).max(1);
        if mismatches <= allowed {
            return Some(start);
        }
    }
    None
}

/// Trims `read` at the first occurrence of `adapter`, if any. Returns the
/// number of bases removed.
pub fn trim_known_adapter(read: &mut Read, adapter: &[u8]) -> usize {
    match find_adapter_position(&read.sequence, adapter) {
        Some(pos) => {
            let removed = read.len() - pos;
            read.trim_in_place(0, removed);
            removed
        }
        None => 0,
    }
}

/// Detects 3' adapter read-through via mate overlap (§4.4d): when the mates
/// overlap with `offset >= 0` but either read extends past the overlapping
/// region, the extension is adapter sequence and gets trimmed from both
/// mates' 3' ends. Returns `(removed_from_r1, removed_from_r2)`.
pub fn trim_by_overlap(r1: &mut Read, r2: &mut Read, overlap_require: usize, diff_limit: usize) -> (usize, usize) {
    let result = overlap::analyze(&r1.sequence, &r2.sequence, overlap_require, diff_limit);
    if !result.overlapped || result.offset < 0 {
        return (0, 0);
    }
    trim_by_overlap_result(r1, r2, &result)
}

fn trim_by_overlap_result(r1: &mut Read, r2: &mut Read, result: &OverlapResult) -> (usize, usize) {
    let offset = result.offset as usize;
    let r1_keep = offset + result.overlap_len;
    let r2_keep = result.overlap_len;

    let r1_removed = r1.len().saturating_sub(r1_keep);
    let r2_removed = r2.len().saturating_sub(r2_keep);

    if r1_removed > 0 {
        r1.trim_in_place(0, r1_removed);
    }
    if r2_removed > 0 {
        r2.trim_in_place(0, r2_removed);
    }

    (r1_removed, r2_removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_known_adapter_suffix() {
        let mut r = Read::new(
            "@x".into(),
            b"ACGTACGTAGATCGGAAGAGC".to_vec(),
            vec![b'I'; 21],
            None,
        );
        let removed = trim_known_adapter(&mut r, b"AGATCGGAAGAGC");
        assert_eq!(removed, 13);
        assert_eq!(r.sequence, b"ACGTACGT");
        assert_eq!(r.sequence.len(), r.quality.len());
    }

    #[test]
    fn no_match_leaves_read_untouched() {
        let mut r = Read::new("@x".into(), b"ACGTACGTACGT".to_vec(), vec![b'I'; 12], None);
        let removed = trim_known_adapter(&mut r, b"TTTTTTTTTTTT");
        assert_eq!(removed, 0);
        assert_eq!(r.len(), 12);
    }

    #[test]
    fn overlap_readthrough_trims_adapter_tails() {
        // r1 extends 4 bases past the overlap with r2's reverse complement:
        // those trailing bases are adapter contamination.
        let r1_core = b"AAAACCCCGGGG".to_vec();
        let mut r1_seq = r1_core.clone();
        r1_seq.extend_from_slice(b"AGAT"); // adapter read-through
        let r2_core = overlap::reverse_complement(b"CCGGGGTTTT");
        let mut r1 = Read::new("@x".into(), r1_seq.clone(), vec![b'I'; r1_seq.len()], None);
        let mut r2 = Read::new("@x".into(), r2_core.clone(), vec![b'I'; r2_core.len()], None);

        let (removed1, removed2) = trim_by_overlap(&mut r1, &mut r2, 6, 1);
        assert_eq!(removed1, 4);
        assert_eq!(removed2, 0);
        assert_eq!(r1.sequence, r1_core);
        assert_eq!(r1.sequence.len(), r1.quality.len());
    }
}
