use langstore::{DriverOptions, ObsoletePolicy, ReconcileOptions, reconcile, store};
use serde_json::json;

use crate::path_glob::expand_inputs;

#[derive(Debug, Clone)]
pub struct ReconcileArgs {
    pub template: String,
    pub inputs: Vec<String>,
    pub remove_obsolete: bool,
    pub dry_run: bool,
    pub json: bool,
}

pub fn run(args: ReconcileArgs) -> Result<(), String> {
    let template = store::read_file(
        &args.template,
        None,
        &DriverOptions::new().as_template(true),
    )
    .map_err(|e| format!("{}: {}", args.template, e))?;
    for warning in &template.report.warnings {
        eprintln!("warning: {}: {}", args.template, warning);
    }

    let policy = if args.remove_obsolete {
        ObsoletePolicy::Remove
    } else {
        ObsoletePolicy::Keep
    };
    let options = ReconcileOptions::new().with_obsolete_policy(policy);

    let paths = expand_inputs(&args.inputs)?;
    let mut entries = Vec::new();
    for path in &paths {
        let mut parsed = store::read_file(path, None, &DriverOptions::new())
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        let report = reconcile(&template.catalog, &mut parsed.catalog, &options);
        if !args.dry_run {
            store::write_file(&mut parsed.catalog, path, None, &DriverOptions::new())
                .map_err(|e| format!("{}: {}", path.display(), e))?;
        }
        entries.push((path, report));
    }

    if args.json {
        let files: Vec<serde_json::Value> = entries
            .iter()
            .map(|(path, report)| {
                json!({
                    "path": path.display().to_string(),
                    "matched": report.matched_count(),
                    "added": report.added,
                    "obsolete": report.obsolete,
                    "warnings": report.warnings,
                })
            })
            .collect();
        let body = json!({
            "template": args.template,
            "dry_run": args.dry_run,
            "files": files,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&body).map_err(|e| e.to_string())?
        );
        return Ok(());
    }

    for (path, report) in &entries {
        println!(
            "{}: {} matched, {} added, {} obsolete",
            path.display(),
            report.matched_count(),
            report.added_count(),
            report.obsolete_count()
        );
        for warning in &report.warnings {
            println!("  {}", warning);
        }
    }
    if args.dry_run {
        println!("\nDry run, nothing written");
    }
    Ok(())
}
