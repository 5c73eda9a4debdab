//! Text output formatting
//!
//! Plain console rendering, used for the progress line printed by the
//! periodic reporter and the summary printed when a run ends.

use crate::config::Config;
use crate::stats::MetricsSnapshot;
use crate::util::time::{format_duration, format_rate};
use crate::worker::runner::RunSummary;
use std::time::Duration;

const BANNER: &str = "═══════════════════════════════════════════════════════════";

/// One-line progress report from a metrics snapshot
///
/// Latency columns show `-` until the first batch has been timed.
pub fn format_report_line(snapshot: &MetricsSnapshot) -> String {
    format!(
        "[{:>6.1}s] docs: {} ({}) | batches: {} | retries: {} | failures: {} | send mean: {} p99: {}",
        snapshot.elapsed.as_secs_f64(),
        format_number(snapshot.docs_sent),
        format_rate(snapshot.docs_sent, snapshot.elapsed, "docs/s"),
        format_number(snapshot.batches_sent),
        snapshot.retries,
        snapshot.failures,
        format_latency(snapshot.send_mean),
        format_latency(snapshot.send_p99),
    )
}

/// Print the effective configuration before a run
pub fn print_configuration(config: &Config) {
    println!("Configuration:");
    println!("  Endpoint:");
    println!("    Type: {}", config.endpoint.endpoint_type);
    println!("    Collection: {}", config.endpoint.collection);
    match config.endpoint.endpoint_type {
        crate::config::EndpointType::Solrcloud => {
            for url in &config.endpoint.solr_urls {
                println!("    Node: {}", url);
            }
        }
        crate::config::EndpointType::Pipeline => {
            println!("    URL: {}", config.endpoint.resolved_pipeline_url());
        }
    }
    println!("    Request timeout: {}s", config.endpoint.request_timeout_secs);

    let workload = &config.workload;
    println!("  Workload:");
    println!("    Workers: {}", workload.workers);
    println!("    Batch size: {}", workload.batch_size);
    println!(
        "    Docs per worker: {} (effective {})",
        workload.docs_per_worker,
        workload.effective_docs_per_worker()
    );
    println!("    Id prefix: {}", workload.id_prefix);
    println!("    Random seed: {}", workload.random_seed);
    println!("    Word list: {}", workload.word_list.display());
    println!("    Commit at end: {}", workload.commit_at_end);

    println!("  Retry: wait {}s, max {} attempts", config.retry.wait_secs, config.retry.max_retries);

    println!("  Fields ({}):", config.fields.len());
    for field in &config.fields {
        match field.words {
            Some(words) => println!("    {:<24} {} (words {})", field.name, field.spec, words),
            None => println!("    {:<24} {}", field.name, field.spec),
        }
    }
}

/// Print the end-of-run summary
pub fn print_summary(summary: &RunSummary) {
    let metrics = &summary.metrics;
    let total = summary.total_docs_sent();

    println!();
    println!("{}", BANNER);
    println!("Load Test Results");
    println!("{}", BANNER);
    println!();

    println!("Duration: {:.2}s", summary.elapsed.as_secs_f64());
    println!();

    println!("Throughput:");
    println!(
        "  Documents: {} ({})",
        format_number(total),
        format_rate(total, summary.elapsed, "docs/s")
    );
    println!(
        "  Batches:   {} ({})",
        format_number(metrics.batches_sent),
        format_rate(metrics.batches_sent, summary.elapsed, "batches/s")
    );
    println!("  Retries:   {}", metrics.retries);
    println!("  Failures:  {}", metrics.failures);
    println!();

    if metrics.send_samples > 0 {
        println!("Send Latency ({} samples):", format_number(metrics.send_samples));
        println!("  mean: {}", format_latency(metrics.send_mean));
        println!("  p50:  {}", format_latency(metrics.send_p50));
        println!("  p99:  {}", format_latency(metrics.send_p99));
        println!("  max:  {}", format_latency(metrics.send_max));
        println!();
    }

    if metrics.construct_samples > 0 {
        println!(
            "Batch Construction: mean {} over {} batches",
            format_latency(metrics.construct_mean),
            format_number(metrics.construct_samples)
        );
        println!();
    }

    println!("Workers:");
    for report in &summary.workers {
        let status = match &report.error {
            None => "ok".to_string(),
            Some(err) => format!("FAILED: {}", err),
        };
        println!(
            "  Thread {:>3}: {} docs in {} batches, {:.2}s, {}",
            report.thread_id,
            format_number(report.docs_sent),
            report.batches_sent,
            report.elapsed.as_secs_f64(),
            status
        );
    }
    println!();

    match (&summary.commit_error, summary.committed) {
        (Some(err), _) => println!("Final commit: FAILED ({})", err),
        (None, true) => println!("Final commit: sent"),
        (None, false) => println!("Final commit: skipped"),
    }

    println!("{}", BANNER);
}

fn format_latency(latency: Option<Duration>) -> String {
    latency.map(format_duration).unwrap_or_else(|| "-".to_string())
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}
