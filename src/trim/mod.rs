//! Trimmers and filters (§4.5): force trim, poly-X tail trim, quality-window
//! cut, UMI extraction, and the pass/fail filter verdict.

pub mod adapter;
pub mod filter;
pub mod polyx;
pub mod quality_cut;
pub mod umi;

pub use filter::{pair_verdict, pass_filter, FilterThresholds, FilterVerdict};
pub use quality_cut::CutMode;
pub use umi::UmiLocation;
