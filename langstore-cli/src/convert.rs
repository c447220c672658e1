use langstore::{DriverOptions, FormatKind, store};
use unic_langid::LanguageIdentifier;

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub input: String,
    pub output: String,
    pub input_format: Option<String>,
    pub output_format: Option<String>,
    pub lang: Option<String>,
    pub template: bool,
}

pub fn run(options: ConvertOptions) -> Result<(), String> {
    let input_kind = parse_format(options.input_format.as_deref())?;
    let output_kind = parse_format(options.output_format.as_deref())?;

    let mut driver_options = DriverOptions::new().as_template(options.template);
    if let Some(lang) = &options.lang {
        driver_options = driver_options.with_language(validate_language(lang)?);
    }

    let mut parsed = store::read_file(&options.input, input_kind, &driver_options)
        .map_err(|e| format!("{}: {}", options.input, e))?;
    for warning in &parsed.report.warnings {
        eprintln!("warning: {}: {}", options.input, warning);
    }

    store::write_file(
        &mut parsed.catalog,
        &options.output,
        output_kind,
        &driver_options,
    )
    .map_err(|e| format!("{}: {}", options.output, e))?;
    Ok(())
}

pub fn parse_format(name: Option<&str>) -> Result<Option<FormatKind>, String> {
    name.map(|name| name.parse::<FormatKind>().map_err(|e| e.to_string()))
        .transpose()
}

pub fn validate_language(lang: &str) -> Result<String, String> {
    lang.parse::<LanguageIdentifier>()
        .map(|id| id.to_string())
        .map_err(|_| format!("Invalid language code '{}'", lang))
}
