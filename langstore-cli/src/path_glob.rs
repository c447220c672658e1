use std::collections::HashSet;
use std::path::PathBuf;

/// Expands glob patterns in a list of inputs into concrete file paths.
/// Plain paths must exist; patterns must match at least one file.
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>, String> {
    let mut seen = HashSet::new();
    let mut paths = Vec::new();

    for raw in inputs {
        if raw.contains(['*', '?', '[']) {
            let entries = glob::glob(raw)
                .map_err(|e| format!("Invalid glob pattern '{}': {}", raw, e))?;
            let mut matched = false;
            for entry in entries {
                let path = entry.map_err(|e| format!("Cannot read '{}': {}", raw, e))?;
                if path.is_file() {
                    matched = true;
                    if seen.insert(path.clone()) {
                        paths.push(path);
                    }
                }
            }
            if !matched {
                return Err(format!("No files match '{}'", raw));
            }
        } else {
            let path = PathBuf::from(raw);
            if !path.is_file() {
                return Err(format!("No such file: {}", raw));
            }
            if seen.insert(path.clone()) {
                paths.push(path);
            }
        }
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_expands_patterns_and_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.po"), "").unwrap();
        fs::write(dir.path().join("b.po"), "").unwrap();

        let pattern = dir.path().join("*.po").display().to_string();
        let literal = dir.path().join("a.po").display().to_string();

        let paths = expand_inputs(&[pattern, literal]).unwrap();
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let error = expand_inputs(&["definitely-missing.po".to_string()]).unwrap_err();
        assert!(error.contains("No such file"));
    }

    #[test]
    fn test_unmatched_pattern_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir.path().join("*.nothing").display().to_string();
        let error = expand_inputs(&[pattern]).unwrap_err();
        assert!(error.contains("No files match"));
    }
}
