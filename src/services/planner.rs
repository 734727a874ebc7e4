use std::io::{self, Write};
use std::path::Path;

use crate::models::{ClipOutcome, ClipRequest, RankedHighlight};

/// Maps the final highlight set to concrete extraction requests: buffers
/// applied, clamped to the stream, one request per highlight in time order.
#[derive(Debug, Clone)]
pub struct ClipPlanner {
    pub pre_buffer: f64,
    pub post_buffer: f64,
}

impl Default for ClipPlanner {
    fn default() -> Self {
        Self {
            pre_buffer: 5.0,
            post_buffer: 10.0,
        }
    }
}

impl ClipPlanner {
    pub fn plan(
        &self,
        final_set: &[RankedHighlight],
        stream_duration: f64,
        output_dir: &Path,
    ) -> Vec<ClipRequest> {
        final_set
            .iter()
            .enumerate()
            .map(|(i, highlight)| ClipRequest {
                start: (highlight.start - self.pre_buffer).max(0.0),
                end: (highlight.end + self.post_buffer).min(stream_duration),
                output_path: output_dir.join(format!("highlight_{:02}.mp4", i + 1)),
            })
            .collect()
    }
}

/// One row per clip: the record downstream editor tooling imports.
pub fn write_report<W: Write>(mut writer: W, outcomes: &[ClipOutcome]) -> io::Result<()> {
    writeln!(writer, "start,end,score,sources,status")?;
    for outcome in outcomes {
        writeln!(
            writer,
            "{:.2},{:.2},{:.3},{},{}",
            outcome.request.start,
            outcome.request.end,
            outcome.highlight.score,
            outcome.highlight.source_breakdown(),
            if outcome.succeeded() { "ok" } else { "failed" },
        )?;
    }
    Ok(())
}

/// `MM:SS` display form used in log lines.
pub fn seconds_to_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
