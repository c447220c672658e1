use std::path::PathBuf;

use langstore::{DriverOptions, store};
use rayon::prelude::*;
use serde_json::json;

use crate::path_glob::expand_inputs;

struct FileReport {
    path: PathBuf,
    outcome: Result<ParsedSummary, String>,
}

struct ParsedSummary {
    format: String,
    language: String,
    units: usize,
    warnings: Vec<String>,
}

pub fn run(inputs: &[String], strict: bool, json_output: bool) -> Result<(), String> {
    let paths = expand_inputs(inputs)?;

    let reports: Vec<FileReport> = paths
        .par_iter()
        .map(|path| {
            let outcome = store::read_file(path, None, &DriverOptions::new())
                .map(|parsed| ParsedSummary {
                    format: parsed.catalog.meta.format.clone().unwrap_or_default(),
                    language: parsed.catalog.meta.language.clone(),
                    units: parsed.catalog.units.len(),
                    warnings: parsed
                        .report
                        .warnings
                        .iter()
                        .map(|warning| warning.to_string())
                        .collect(),
                })
                .map_err(|e| e.to_string());
            FileReport {
                path: path.clone(),
                outcome,
            }
        })
        .collect();

    let failed = reports
        .iter()
        .filter(|report| report.outcome.is_err())
        .count();
    let with_warnings = reports
        .iter()
        .filter(|report| matches!(&report.outcome, Ok(summary) if !summary.warnings.is_empty()))
        .count();
    let warning_total: usize = reports
        .iter()
        .filter_map(|report| report.outcome.as_ref().ok())
        .map(|summary| summary.warnings.len())
        .sum();

    if json_output {
        print_json(&reports, failed, warning_total)?;
    } else {
        print_text(&reports, failed, with_warnings);
    }

    if failed > 0 {
        return Err(format!(
            "{} of {} files failed to parse",
            failed,
            reports.len()
        ));
    }
    if strict && warning_total > 0 {
        return Err(format!("{} parse warnings in strict mode", warning_total));
    }
    Ok(())
}

fn print_text(reports: &[FileReport], failed: usize, with_warnings: usize) {
    for report in reports {
        match &report.outcome {
            Ok(summary) => {
                let status = if summary.warnings.is_empty() {
                    "OK  "
                } else {
                    "WARN"
                };
                println!(
                    "{} {} ({}, {}, {} units)",
                    status,
                    report.path.display(),
                    summary.format,
                    summary.language,
                    summary.units
                );
                for warning in &summary.warnings {
                    println!("     {}", warning);
                }
            }
            Err(error) => println!("FAIL {}: {}", report.path.display(), error),
        }
    }
    println!(
        "\nChecked {} files: {} ok, {} with warnings, {} failed",
        reports.len(),
        reports.len() - failed - with_warnings,
        with_warnings,
        failed
    );
}

fn print_json(reports: &[FileReport], failed: usize, warning_total: usize) -> Result<(), String> {
    let files: Vec<serde_json::Value> = reports
        .iter()
        .map(|report| match &report.outcome {
            Ok(summary) => json!({
                "path": report.path.display().to_string(),
                "status": if summary.warnings.is_empty() { "ok" } else { "warnings" },
                "format": summary.format,
                "language": summary.language,
                "units": summary.units,
                "warnings": summary.warnings,
            }),
            Err(error) => json!({
                "path": report.path.display().to_string(),
                "status": "error",
                "error": error,
            }),
        })
        .collect();

    let body = json!({
        "summary": {
            "files": reports.len(),
            "failed": failed,
            "warnings": warning_total,
        },
        "files": files,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&body).map_err(|e| e.to_string())?
    );
    Ok(())
}
