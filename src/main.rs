//! CLI entry point: validate flags, run the pipeline, emit reports.

use fqprep::args;
use fqprep::pipeline::{self, StopToken};
use fqprep::report;
use std::sync::Arc;

fn main() {
    let config = Arc::new(args::parse_and_validate());

    if config.verbose {
        eprintln!("fqprep: processing {}", config.in1.display());
    }

    let stop = StopToken::new();
    let summary = match pipeline::run(Arc::clone(&config), stop) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("fqprep: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = report::emit(&config, &summary) {
        eprintln!("fqprep: failed to write report: {e}");
        std::process::exit(1);
    }

    if config.verbose {
        eprintln!(
            "fqprep: {} pairs in, {} pairs out ({:.2}% pass)",
            summary.pairs_in,
            summary.pairs_out,
            if summary.pairs_in == 0 {
                0.0
            } else {
                100.0 * summary.pairs_out as f64 / summary.pairs_in as f64
            }
        );
    }
}
