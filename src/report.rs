//! Rendering of a [`BenchReport`] as a text table, CSV, or JSON.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use anyhow::Result;

use crate::bench::{BenchConfig, BenchReport};
use crate::error::{validation_error, MatmulError};

/// Output format of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Csv,
    Json,
}

impl FromStr for ReportFormat {
    type Err = MatmulError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            other => Err(validation_error(format!(
                "invalid format: {other}. Must be one of: text, json, csv"
            ))),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportFormat::Text => "text",
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        })
    }
}

/// Writes `report` to `output` in `format`.
pub fn write_report<W: Write>(
    output: &mut W,
    report: &BenchReport,
    config: &BenchConfig,
    format: ReportFormat,
) -> Result<()> {
    match format {
        ReportFormat::Text => write_text(output, report, config),
        ReportFormat::Csv => write_csv(output, report),
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *output, report)?;
            writeln!(output)?;
            Ok(())
        }
    }
}

/// Header of the fixed `Method, Size, Time(ms), GFLOPS` table.
pub fn table_header() -> String {
    format!(
        "{:<12} {:<10} {:<12} {:<10}\n{:<12} {:<10} {:<12} {:<10}",
        "Method", "Size", "Time(ms)", "GFLOPS", "------", "----", "--------", "------"
    )
}

/// One row of the results table.
pub fn table_row(method: &str, size: usize, time_ms: f64, gflops: f64) -> String {
    format!("{:<12} {:<10} {:<12.2} {:<10.2}", method, size, time_ms, gflops)
}

fn write_text<W: Write>(output: &mut W, report: &BenchReport, config: &BenchConfig) -> Result<()> {
    let system = &report.system;

    writeln!(output, "=== Matrix Multiplication Performance Test ===")?;
    writeln!(output)?;

    writeln!(output, "System Information:")?;
    writeln!(output, "  OS: {} ({})", system.os, system.arch)?;
    writeln!(output, "  Processors: {}", system.logical_cpus)?;
    if !system.simd_features.is_empty() {
        writeln!(output, "  SIMD: {}", system.simd_features.join(", "))?;
    }
    writeln!(output, "  Lane backend: {}", system.lane_backend.name())?;
    writeln!(output, "  Timestamp: {}", report.timestamp.to_rfc3339())?;
    writeln!(output)?;

    writeln!(output, "Configuration:")?;
    writeln!(output, "  Matrix size: {} x {}", report.size, report.size)?;
    writeln!(output, "  Tile size: {}", report.tile_size)?;
    writeln!(output, "  Lane width: {}", report.lane_width)?;
    writeln!(
        output,
        "  Verification: {}",
        if config.verify { "enabled" } else { "disabled" }
    )?;
    writeln!(
        output,
        "  Iterations: {} (+{} warmup)",
        config.iterations, config.warmup_iterations
    )?;
    writeln!(output, "  Seed: {}", report.seed)?;
    writeln!(
        output,
        "  Total operations: {:.2} billion",
        report.total_flops / 1e9
    )?;
    writeln!(output)?;

    writeln!(output, "{}", table_header())?;
    for record in &report.records {
        writeln!(
            output,
            "{}",
            table_row(&record.method, record.size, record.time_ms, record.gflops)
        )?;
    }

    if !report.verifications.is_empty() {
        writeln!(output)?;
        writeln!(output, "Verification (tolerance {:e}):", report.tolerance)?;
        for v in &report.verifications {
            if v.passed {
                writeln!(
                    output,
                    "✓ {} and {} results match (max |diff| {:.3e})",
                    v.reference, v.method, v.max_abs_diff
                )?;
            } else {
                writeln!(
                    output,
                    "✗ {} and {} results differ! ({} elements, max |diff| {:.3e})",
                    v.reference, v.method, v.mismatches, v.max_abs_diff
                )?;
            }
        }
    }

    let speedups = report.speedups();
    if !speedups.is_empty() {
        writeln!(output)?;
        writeln!(output, "Performance Summary:")?;
        for (method, speedup) in speedups {
            writeln!(output, "  {:<12} {:.2}x vs Naive", method, speedup)?;
        }
    }

    Ok(())
}

fn write_csv<W: Write>(output: &mut W, report: &BenchReport) -> Result<()> {
    writeln!(output, "method,size,time_ms,gflops")?;
    for record in &report.records {
        writeln!(
            output,
            "{},{},{:.4},{:.4}",
            record.method, record.size, record.time_ms, record.gflops
        )?;
    }

    if !report.verifications.is_empty() {
        writeln!(output)?;
        writeln!(output, "comparison,passed,max_abs_diff")?;
        for v in &report.verifications {
            writeln!(
                output,
                "{} vs {},{},{:e}",
                v.method, v.reference, v.passed, v.max_abs_diff
            )?;
        }
    }

    Ok(())
}
