use std::collections::BTreeMap;

use langstore::{DriverOptions, State, Unit, store};
use serde_json::json;

use crate::convert::validate_language;
use crate::path_glob::expand_inputs;

const STATES: [State; 5] = [
    State::Empty,
    State::NeedsEditing,
    State::Translated,
    State::Approved,
    State::ReadOnly,
];

#[derive(Default)]
struct FileStats {
    total: usize,
    obsolete: usize,
    by_state: BTreeMap<&'static str, usize>,
    translated: usize,
    denominator: usize,
}

fn accumulate(stats: &mut FileStats, unit: &Unit) {
    stats.total += 1;
    if unit.is_obsolete() {
        stats.obsolete += 1;
        return;
    }
    *stats.by_state.entry(unit.state().as_str()).or_insert(0) += 1;
    if matches!(unit.state(), State::Translated | State::Approved) {
        stats.translated += 1;
    }
    if unit.state() != State::ReadOnly {
        stats.denominator += 1;
    }
}

pub fn run(inputs: &[String], lang: &Option<String>, json_output: bool) -> Result<(), String> {
    let paths = expand_inputs(inputs)?;

    let mut options = DriverOptions::new();
    if let Some(lang) = lang {
        options = options.with_language(validate_language(lang)?);
    }

    let mut per_file = Vec::new();
    for path in &paths {
        let parsed = store::read_file(path, None, &options)
            .map_err(|e| format!("{}: {}", path.display(), e))?;

        let mut stats = FileStats::default();
        for unit in &parsed.catalog.units {
            accumulate(&mut stats, unit);
        }
        per_file.push((path, parsed.catalog.meta, stats));
    }

    if json_output {
        let files: Vec<serde_json::Value> = per_file
            .iter()
            .map(|(path, meta, stats)| {
                json!({
                    "path": path.display().to_string(),
                    "format": meta.format.clone().unwrap_or_default(),
                    "language": meta.language,
                    "units": stats.total,
                    "obsolete": stats.obsolete,
                    "by_state": stats.by_state,
                    "completion_percent": (completion(stats) * 100.0).round() / 100.0,
                })
            })
            .collect();
        let body = json!({
            "summary": {
                "files": per_file.len(),
                "units": per_file.iter().map(|(_, _, s)| s.total).sum::<usize>(),
            },
            "files": files,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&body).map_err(|e| e.to_string())?
        );
        return Ok(());
    }

    println!("=== Stats ===");
    println!("Files: {}", per_file.len());

    for (path, meta, stats) in &per_file {
        println!(
            "\nFile: {} ({}, {})",
            path.display(),
            meta.format.clone().unwrap_or_default(),
            meta.language
        );
        println!("  Units: {} ({} obsolete)", stats.total, stats.obsolete);
        println!("  By state:");
        for state in STATES {
            let count = stats.by_state.get(state.as_str()).copied().unwrap_or(0);
            println!("    {}: {}", state.as_str(), count);
        }
        println!("  Completion: {:.2}%", completion(stats));
    }
    Ok(())
}

fn completion(stats: &FileStats) -> f64 {
    if stats.denominator == 0 {
        100.0
    } else {
        (stats.translated as f64) * 100.0 / (stats.denominator as f64)
    }
}
