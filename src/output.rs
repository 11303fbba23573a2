//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects. Diagnostics go through `tracing` to
//! stderr; only results land here.
//!
//! # Output Format
//!
//! ## Transform
//!
//! ```text
//! photo.jpg → thumb.png
//!     1280x720 pad-to-fit, fill #ffffffff
//!     Result: 1280x720, 48213 bytes
//! ```
//!
//! A failure replaces the result line:
//!
//! ```text
//!     Failed: decode (422): Cannot decode image: ...
//! ```
//!
//! ## Batch
//!
//! ```text
//! Processing 3 jobs
//! 001 cat.jpg
//!     Stored: 5f1c...e2.png (300x200)
//! 002 dog.png
//!     Fetch failed: Blob not found: dog.png
//!
//! 1 stored, 1 failed
//! ```

use crate::imaging::{ResultImage, TransformFailure, TransformSpec};
use crate::process::{BatchSummary, JobOutcome, JobReport, ProcessEvent};

/// Zero-padded 1-based position, matching job numbering in batch output.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn failure_line(failure: &TransformFailure) -> String {
    format!(
        "Failed: {} ({}): {}",
        failure.kind,
        failure.kind.status_code(),
        failure.reason
    )
}

fn outcome_line(outcome: &JobOutcome) -> String {
    match outcome {
        JobOutcome::Stored {
            result_reference,
            width,
            height,
        } => format!("Stored: {} ({}x{})", result_reference, width, height),
        JobOutcome::Failed(failure) => failure_line(failure),
        JobOutcome::FetchFailed(reason) => format!("Fetch failed: {}", reason),
        JobOutcome::StoreFailed(reason) => format!("Store failed: {}", reason),
    }
}

// ============================================================================
// Transform
// ============================================================================

pub fn format_transform_output(
    input: &str,
    output: &str,
    spec: &TransformSpec,
    result: &ResultImage,
) -> Vec<String> {
    let mut lines = vec![format!("{} → {}", input, output)];

    let mut request = format!("    {} {}", spec.target, spec.policy);
    if spec.preserve_aspect_ratio {
        request.push_str(", keep aspect");
    }
    request.push_str(&format!(", fill {}", spec.fill_color.to_hex()));
    lines.push(request);

    lines.push(match result {
        ResultImage::Success(image) => format!(
            "    Result: {}x{}, {} bytes",
            image.width,
            image.height,
            image.bytes.len()
        ),
        ResultImage::Failed(failure) => format!("    {}", failure_line(failure)),
    });
    lines
}

pub fn print_transform_output(input: &str, output: &str, spec: &TransformSpec, result: &ResultImage) {
    for line in format_transform_output(input, output, spec, result) {
        println!("{}", line);
    }
}

// ============================================================================
// Batch
// ============================================================================

fn report_lines(index: usize, report: &JobReport) -> Vec<String> {
    vec![
        format!("{} {}", format_index(index + 1), report.source),
        format!("    {}", outcome_line(&report.outcome)),
    ]
}

/// Format a single batch progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::BatchStarted { job_count } => {
            let noun = if *job_count == 1 { "job" } else { "jobs" };
            vec![format!("Processing {} {}", job_count, noun)]
        }
        ProcessEvent::JobFinished { index, report } => report_lines(*index, report),
    }
}

pub fn format_batch_summary(summary: &BatchSummary) -> Vec<String> {
    vec![
        String::new(),
        format!("{} stored, {} failed", summary.succeeded, summary.failed),
    ]
}

pub fn print_batch_summary(summary: &BatchSummary) {
    for line in format_batch_summary(summary) {
        println!("{}", line);
    }
}
