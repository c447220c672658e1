use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

fn langstore() -> Command {
    Command::cargo_bin("langstore").expect("binary builds")
}

const CS_PO: &str = "\
msgid \"\"
msgstr \"\"
\"Language: cs\\n\"

msgid \"Hello\"
msgstr \"Ahoj\"

msgid \"Bye\"
msgstr \"\"
";

#[test]
fn test_convert_android_to_apple_strings() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("strings.xml");
    let output = temp_dir.path().join("cs.strings");

    fs::write(
        &input,
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<resources>\n    <string name=\"greeting\">Ahoj</string>\n</resources>\n",
    )
    .unwrap();

    langstore()
        .args([
            "convert",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--lang",
            "cs",
        ])
        .assert()
        .success();

    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(written, "\"greeting\" = \"Ahoj\";\n");
}

#[test]
fn test_convert_unknown_extension_fails() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("notes.txt");
    fs::write(&input, "hello").unwrap();

    let out = langstore()
        .args([
            "convert",
            "-i",
            input.to_str().unwrap(),
            "-o",
            temp_dir.path().join("out.po").to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Error"));
}

#[test]
fn test_check_flags_malformed_files() {
    let temp_dir = TempDir::new().unwrap();
    let good = temp_dir.path().join("cs.po");
    let bad = temp_dir.path().join("bad.json");
    fs::write(&good, CS_PO).unwrap();
    fs::write(&bad, "{\"truncated\": ").unwrap();

    let out = langstore()
        .args(["check", good.to_str().unwrap(), bad.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(!out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("OK  "));
    assert!(stdout.contains("FAIL"));
    assert!(stdout.contains("1 failed"));
}

#[test]
fn test_check_json_report() {
    let temp_dir = TempDir::new().unwrap();
    let good = temp_dir.path().join("cs.po");
    fs::write(&good, CS_PO).unwrap();

    let out = langstore()
        .args(["check", "--json", good.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("\"failed\": 0"));
    assert!(stdout.contains("\"status\": \"ok\""));
    assert!(stdout.contains("\"language\": \"cs\""));
}

#[test]
fn test_stats_reports_completion() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("cs.po");
    fs::write(&file, CS_PO).unwrap();

    let out = langstore()
        .args(["stats", file.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("translated: 1"));
    assert!(stdout.contains("empty: 1"));
    assert!(stdout.contains("Completion: 50.00%"));
}

#[test]
fn test_reconcile_updates_translation_file() {
    let temp_dir = TempDir::new().unwrap();
    let template = temp_dir.path().join("en.json");
    let translation = temp_dir.path().join("cs.properties");
    fs::write(&template, "{\"a\": \"Apple\", \"b\": \"Banana\"}").unwrap();
    fs::write(&translation, "a=Jablko\n").unwrap();

    let out = langstore()
        .args([
            "reconcile",
            "--template",
            template.to_str().unwrap(),
            translation.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("1 matched, 1 added, 0 obsolete"));

    let written = fs::read_to_string(&translation).unwrap();
    assert_eq!(written, "a=Jablko\nb=\n");
}

#[test]
fn test_reconcile_dry_run_leaves_files_alone() {
    let temp_dir = TempDir::new().unwrap();
    let template = temp_dir.path().join("en.json");
    let translation = temp_dir.path().join("cs.properties");
    fs::write(&template, "{\"a\": \"Apple\", \"b\": \"Banana\"}").unwrap();
    fs::write(&translation, "a=Jablko\n").unwrap();

    let out = langstore()
        .args([
            "reconcile",
            "--dry-run",
            "--template",
            template.to_str().unwrap(),
            translation.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("Dry run"));
    assert_eq!(fs::read_to_string(&translation).unwrap(), "a=Jablko\n");
}

#[test]
fn test_reconcile_json_report() {
    let temp_dir = TempDir::new().unwrap();
    let template = temp_dir.path().join("en.json");
    let translation = temp_dir.path().join("cs.properties");
    fs::write(&template, "{\"a\": \"Apple\"}").unwrap();
    fs::write(&translation, "a=Jablko\nstale=Pryc\n").unwrap();

    let out = langstore()
        .args([
            "reconcile",
            "--json",
            "--dry-run",
            "--template",
            template.to_str().unwrap(),
            translation.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("\"matched\": 1"));
    assert!(stdout.contains("\"obsolete\""));
    assert!(stdout.contains("stale"));
}

#[test]
fn test_completions_generate() {
    let out = langstore().args(["completions", "bash"]).output().unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("langstore"));
}
