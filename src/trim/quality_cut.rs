//! Sliding-window quality cutting (§4.5 `qualityCut`): trims from the front,
//! the tail, or both ends of a read based on a mean-quality threshold over a
//! fixed-size window.

use crate::model::Read;

/// Which end(s) of the read a quality-window cut scans from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutMode {
    /// Advance from the 5' end until the window mean reaches the threshold.
    Front,
    /// Advance from the 3' end symmetrically.
    Tail,
    /// Advance from the 5' end and truncate at the first window whose mean
    /// drops below the threshold.
    Right,
}

#[inline]
fn window_mean(quality: &[u8], phred_offset: u8) -> f64 {
    if quality.is_empty() {
        return 0.0;
    }
    let sum: u32 = quality.iter().map(|&q| u32::from(q.saturating_sub(phred_offset))).sum();
    f64::from(sum) / quality.len() as f64
}

/// Phred ASCII offset for already-normalized (phred+33) quality bytes.
const PHRED33_OFFSET: u8 = 33;

/// Applies a single cut mode to `read` in place, scanning with the given
/// `window_size` and `quality_threshold` (on the raw phred scale, i.e. not
/// offset-encoded).
pub fn cut(read: &mut Read, mode: CutMode, window_size: usize, quality_threshold: f64) {
    if window_size == 0 || read.len() < window_size {
        return;
    }

    match mode {
        CutMode::Front => {
            let mut start = 0usize;
            while start + window_size <= read.len() {
                let mean = window_mean(&read.quality[start..start + window_size], PHRED33_OFFSET);
                if mean >= quality_threshold {
                    break;
                }
                start += 1;
            }
            read.trim_in_place(start, 0);
        }
        CutMode::Tail => {
            let mut tail = 0usize;
            while tail + window_size <= read.len() {
                let end = read.len() - tail;
                let mean = window_mean(&read.quality[end - window_size..end], PHRED33_OFFSET);
                if mean >= quality_threshold {
                    break;
                }
                tail += 1;
            }
            read.trim_in_place(0, tail);
        }
        CutMode::Right => {
            let mut cut_at = read.len();
            let mut start = 0usize;
            while start + window_size <= read.len() {
                let mean = window_mean(&read.quality[start..start + window_size], PHRED33_OFFSET);
                if mean < quality_threshold {
                    cut_at = start;
                    break;
                }
                start += 1;
            }
            let tail = read.len() - cut_at;
            read.trim_in_place(0, tail);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_cut_advances_past_low_quality_window() {
        let mut quality = vec![b'!'; 6]; // phred 0
        quality.extend(vec![b'I'; 10]); // phred 40
        let mut r = Read::new("@x".into(), vec![b'A'; 16], quality, None);
        cut(&mut r, CutMode::Front, 3, 20.0);
        assert!(r.len() <= 10);
        assert_eq!(r.sequence.len(), r.quality.len());
    }

    #[test]
    fn tail_cut_mirrors_front() {
        let mut quality = vec![b'I'; 10];
        quality.extend(vec![b'!'; 6]);
        let mut r = Read::new("@x".into(), vec![b'A'; 16], quality, None);
        cut(&mut r, CutMode::Tail, 3, 20.0);
        assert!(r.len() <= 10);
        assert_eq!(r.sequence.len(), r.quality.len());
    }

    #[test]
    fn right_cut_truncates_at_first_bad_window() {
        let mut quality = vec![b'I'; 8];
        quality.extend(vec![b'!'; 8]);
        let mut r = Read::new("@x".into(), vec![b'A'; 16], quality, None);
        cut(&mut r, CutMode::Right, 4, 20.0);
        assert_eq!(r.len(), 8);
    }

    #[test]
    fn no_op_when_shorter_than_window() {
        let mut r = Read::new("@x".into(), b"ACG".to_vec(), b"III".to_vec(), None);
        cut(&mut r, CutMode::Front, 10, 20.0);
        assert_eq!(r.len(), 3);
    }
}
