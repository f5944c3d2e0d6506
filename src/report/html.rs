//! HTML reporter (§4.9): a single self-contained document (inline `<style>`,
//! no external assets), built from `indoc!`-templated blocks in the style of
//! the teacher's own `writedoc!`-based text reports.

use crate::args::Config;
use crate::pipeline::RunSummary;
use crate::trim::FilterVerdict;
use indoc::writedoc;
use std::io::Write;
use std::path::Path;

const SVG_WIDTH: f64 = 600.0;
const SVG_HEIGHT: f64 = 120.0;

/// Renders a per-cycle curve as an inline SVG polyline, scaled to fit the
/// fixed viewport with `max_y` as the normalization ceiling.
fn svg_polyline(values: &[f64], max_y: f64) -> String {
    if values.is_empty() || max_y <= 0.0 {
        return String::new();
    }
    let step = SVG_WIDTH / (values.len().max(2) - 1) as f64;
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let x = i as f64 * step;
            let y = SVG_HEIGHT - (v.min(max_y) / max_y) * SVG_HEIGHT;
            format!("{x:.1},{y:.1}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace('<', "&lt;").replace('>', "&gt;")
}

fn overrep_rows(seqs: &[crate::evaluator::OverrepresentedSeq]) -> String {
    if seqs.is_empty() {
        return "<tr><td colspan=\"2\">none detected</td></tr>".to_string();
    }
    seqs.iter()
        .map(|s| format!("<tr><td><code>{}</code></td><td>{}</td></tr>", escape(&s.sequence), s.count))
        .collect::<Vec<_>>()
        .join("\n")
}

fn adapter_row(estimate: &crate::evaluator::AdapterEstimate) -> String {
    match &estimate.detected_adapter_seq {
        Some(seq) => format!("<code>{}</code>{}", escape(seq), if estimate.illumina_adapter { " (known Illumina adapter)" } else { "" }),
        None => "none detected".to_string(),
    }
}

/// Writes the HTML report to `path`.
pub fn write(path: &Path, config: &Config, summary: &RunSummary) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;

    let quality_r1 = summary.stats_r1_post.quality_curve();
    let quality_polyline = svg_polyline(&quality_r1, 41.0);

    let pass = summary.filter_counts.get(FilterVerdict::Pass);
    let low_quality = summary.filter_counts.get(FilterVerdict::LowQuality);
    let too_short = summary.filter_counts.get(FilterVerdict::TooShort);
    let too_long = summary.filter_counts.get(FilterVerdict::TooLong);
    let too_many_n = summary.filter_counts.get(FilterVerdict::TooManyN);
    let low_complexity = summary.filter_counts.get(FilterVerdict::LowComplexity);
    let index_match = summary.filter_counts.get(FilterVerdict::IndexMatch);

    writedoc!(
        file,
        r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
        <meta charset="utf-8">
        <title>{title}</title>
        <style>
          body {{ font-family: sans-serif; margin: 2rem; color: #222; }}
          h1 {{ font-size: 1.4rem; }}
          h2 {{ font-size: 1.1rem; margin-top: 2rem; }}
          table {{ border-collapse: collapse; margin: 0.5rem 0; }}
          td, th {{ border: 1px solid #ccc; padding: 0.25rem 0.6rem; text-align: left; }}
          code {{ font-family: monospace; font-size: 0.85rem; }}
          .curve {{ background: #fafafa; border: 1px solid #ddd; }}
        </style>
        </head>
        <body>
        <h1>{title}</h1>

        <h2>Pairs</h2>
        <table>
        <tr><th>in</th><td>{pairs_in}</td></tr>
        <tr><th>out</th><td>{pairs_out}</td></tr>
        <tr><th>duplication rate</th><td>{dup_rate:.4}</td></tr>
        <tr><th>GC content</th><td>{gc:.4}</td></tr>
        </table>

        <h2>Filter verdicts</h2>
        <table>
        <tr><th>pass</th><td>{pass}</td></tr>
        <tr><th>low quality</th><td>{low_quality}</td></tr>
        <tr><th>too short</th><td>{too_short}</td></tr>
        <tr><th>too long</th><td>{too_long}</td></tr>
        <tr><th>too many N</th><td>{too_many_n}</td></tr>
        <tr><th>low complexity</th><td>{low_complexity}</td></tr>
        <tr><th>index match</th><td>{index_match}</td></tr>
        </table>

        <h2>Read 1 mean quality by cycle</h2>
        <svg class="curve" width="{svg_w}" height="{svg_h}" viewBox="0 0 {svg_w} {svg_h}">
          <polyline fill="none" stroke="#3366cc" stroke-width="1.5" points="{quality_polyline}" />
        </svg>

        <h2>Evaluator</h2>
        <table>
        <tr><th>estimated read length</th><td>{read_len}</td></tr>
        <tr><th>estimated record count</th><td>{record_count}{exact_note}</td></tr>
        <tr><th>two-color platform</th><td>{two_color}</td></tr>
        <tr><th>adapter (R1)</th><td>{adapter_r1}</td></tr>
        <tr><th>adapter (R2)</th><td>{adapter_r2}</td></tr>
        </table>

        <h2>Overrepresented sequences (R1)</h2>
        <table>
        <tr><th>sequence</th><th>count</th></tr>
        {overrep_r1}
        </table>

        <h2>Overrepresented sequences (R2)</h2>
        <table>
        <tr><th>sequence</th><th>count</th></tr>
        {overrep_r2}
        </table>

        </body>
        </html>
        "#,
        title = config.title,
        pairs_in = summary.pairs_in,
        pairs_out = summary.pairs_out,
        dup_rate = summary.duplication.duplication_rate(),
        gc = summary.duplication.gc_content(),
        pass = pass,
        low_quality = low_quality,
        too_short = too_short,
        too_long = too_long,
        too_many_n = too_many_n,
        low_complexity = low_complexity,
        index_match = index_match,
        svg_w = SVG_WIDTH,
        svg_h = SVG_HEIGHT,
        quality_polyline = quality_polyline,
        read_len = summary.estimated_read_length,
        record_count = summary.record_count.map(|c| c.reads_num).unwrap_or(0),
        exact_note = if summary.record_count.is_some_and(|c| !c.exact) { " (extrapolated)" } else { "" },
        two_color = summary.two_color_system,
        adapter_r1 = adapter_row(&summary.adapter_r1),
        adapter_r2 = adapter_row(&summary.adapter_r2),
        overrep_r1 = overrep_rows(&summary.overrepresented_r1),
        overrep_r2 = overrep_rows(&summary.overrepresented_r2),
    )?;

    file.flush()
}
