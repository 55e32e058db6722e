//! Console and JSON output formatting

use serde::Serialize;
use soundprint_core::{FileOutcome, FileReport, QueryResult, ScanSummary};

#[derive(Serialize)]
struct QueryOutput<'a> {
    query: &'a str,
    matches: usize,
    results: &'a [QueryResult],
}

/// One ranked result per line
pub fn format_result(result: &QueryResult) -> String {
    format!(
        "[{}]\t{}   {}   ({:.4})",
        result.track_id,
        result.file_path,
        format_duration(result.duration_ms),
        result.similarity
    )
}

/// `m:ss` track length
fn format_duration(duration_ms: i64) -> String {
    let seconds = duration_ms.max(0) / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Print the top `limit` results as plain text
pub fn print_results(results: &[QueryResult], limit: usize) {
    for result in results.iter().take(limit) {
        println!("{}", format_result(result));
    }
}

/// Print the top `limit` results as a JSON object
pub fn print_json_results(query: &str, results: &[QueryResult], limit: usize) {
    let shown = &results[..results.len().min(limit)];
    let output = QueryOutput {
        query,
        matches: results.len(),
        results: shown,
    };

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results: {}", e),
    }
}

/// Status line for one scanned file
pub fn format_file_report(report: &FileReport) -> String {
    let status = match &report.outcome {
        FileOutcome::Added {
            track_id,
            fingerprints,
        } => format!("added as [{}] with {} fingerprints", track_id, fingerprints),
        FileOutcome::Skipped { duration } => {
            format!("skipped ({:.0} s)", duration.as_secs_f64())
        }
        FileOutcome::Failed { reason } => format!("FAILED: {}", reason),
    };
    format!(
        "[{}/{}] {}: {}",
        report.index,
        report.total,
        report.path.display(),
        status
    )
}

pub fn format_summary(summary: &ScanSummary) -> String {
    let mut line = format!(
        "Added {} out of {} new files ({} failed, {} skipped, {} already stored) in {:.1} s",
        summary.added,
        summary.found - summary.already_stored,
        summary.failed,
        summary.skipped,
        summary.already_stored,
        summary.elapsed.as_secs_f64()
    );
    if summary.cancelled {
        line.push_str(", cancelled");
    }
    line
}
