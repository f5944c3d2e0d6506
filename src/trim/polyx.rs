//! Poly-X tail trimming (§4.5 `polyXTrim`): removes the longest suffix run of
//! a single configured base, tolerating a bounded mismatch rate.

use crate::model::Read;

/// Cumulative mismatch ceiling for a poly-X run, independent of length.
const MAX_CUMULATIVE_MISMATCH: u32 = 5;

/// Allowed mismatch rate: at most one mismatch per this many bases.
const MISMATCH_WINDOW: usize = 10;

/// Finds the length of the trailing poly-`base` run honoring the mismatch
/// policy: scanning from the 3' end, a position matching `base` resets
/// nothing; a mismatch increments a running counter, and the run is cut as
/// soon as the counter would exceed `MAX_CUMULATIVE_MISMATCH` or exceed one
/// mismatch per `MISMATCH_WINDOW` bases scanned so far.
#[must_use]
fn trailing_run_len(sequence: &[u8], base: u8) -> usize {
    let len = sequence.len();
    let mut mismatches: u32 = 0;
    let mut last_match_from_end = 0usize;

    for scanned in 1..=len {
        let idx = len - scanned;
        let allowed = (scanned / MISMATCH_WINDOW).max(1) as u32;
        if sequence[idx] != base {
            mismatches += 1;
            if mismatches > MAX_CUMULATIVE_MISMATCH || mismatches > allowed {
                break;
            }
        } else {
            last_match_from_end = scanned;
        }
    }

    last_match_from_end
}

/// Trims poly-X tails from both mates in place. `min_len` is the minimum run
/// length (per base) required before any trimming is applied; bases with no
/// configured minimum are skipped. Returns the number of bases removed from
/// (r1, r2).
pub fn poly_x_trim(r1: &mut Read, r2: Option<&mut Read>, bases: &[u8], min_len: usize) -> (usize, usize) {
    let trimmed1 = trim_one(r1, bases, min_len);
    let trimmed2 = r2.map(|r2| trim_one(r2, bases, min_len)).unwrap_or(0);
    (trimmed1, trimmed2)
}

fn trim_one(read: &mut Read, bases: &[u8], min_len: usize) -> usize {
    let mut best_base = None;
    let mut best_run = 0usize;

    for &base in bases {
        let run = trailing_run_len(&read.sequence, base);
        if run > best_run {
            best_run = run;
            best_base = Some(base);
        }
    }

    if best_base.is_some() && best_run >= min_len {
        let keep = read.len() - best_run;
        read.trim_in_place(0, read.len() - keep);
        best_run
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_clean_polyg_tail() {
        let mut r = Read::new("@x".into(), b"ACGTACGTGGGGGGGG".to_vec(), vec![b'I'; 16], None);
        let (n1, _) = poly_x_trim(&mut r, None, b"G", 5);
        assert_eq!(n1, 8);
        assert_eq!(r.sequence, b"ACGTACGT");
        assert_eq!(r.sequence.len(), r.quality.len());
    }

    #[test]
    fn leaves_short_run_untouched() {
        let mut r = Read::new("@x".into(), b"ACGTACGTGGG".to_vec(), vec![b'I'; 11], None);
        let (n1, _) = poly_x_trim(&mut r, None, b"G", 5);
        assert_eq!(n1, 0);
        assert_eq!(r.len(), 11);
    }

    #[test]
    fn tolerates_sparse_mismatches_within_run() {
        // GGGGGGGAGGGG: one mismatch near the middle of an otherwise poly-G
        // run, well under the 1-per-10 and cumulative-5 ceilings.
        let mut r = Read::new("@x".into(), b"ACGTGGGGGGGAGGGG".to_vec(), vec![b'I'; 16], None);
        let (n1, _) = poly_x_trim(&mut r, None, b"G", 5);
        assert!(n1 >= 11);
        assert_eq!(r.sequence.len(), r.quality.len());
    }
}
