use indoc::indoc;
use langstore::{
    Catalog, DriverOptions, FormatKind, Message, ObsoletePolicy, Parsed,
    ReconcileOptions, State, reconcile,
};

fn parse(kind: FormatKind, text: &str, options: &DriverOptions) -> Parsed {
    kind.driver()
        .parse(text.as_bytes(), options)
        .expect("sample parses")
}

fn serialize(kind: FormatKind, catalog: &Catalog, options: &DriverOptions) -> String {
    let bytes = kind.driver().serialize(catalog, options).expect("serializes");
    String::from_utf8(bytes).expect("utf-8 output")
}

const POT: &str = indoc! {r#"
    msgid ""
    msgstr ""
    "Language: en\n"
    "Content-Type: text/plain; charset=UTF-8\n"

    #. Greeting on the landing page
    #: src/main.rs:10
    msgid "Hello"
    msgstr ""

    #. Farewell
    #: src/main.rs:20
    msgid "Bye"
    msgstr ""
"#};

const CS_PO: &str = indoc! {r#"
    msgid ""
    msgstr ""
    "Language: cs\n"
    "Content-Type: text/plain; charset=UTF-8\n"

    #: src/old.rs:1
    msgid "Hello"
    msgstr "Ahoj"

    msgid "Gone"
    msgstr "Pryc"
"#};

#[test]
fn test_pot_reconciles_po_translation() {
    let template = parse(FormatKind::Po, POT, &DriverOptions::new().as_template(true));
    let mut translation = parse(
        FormatKind::Po,
        CS_PO,
        &DriverOptions::new().with_language("cs"),
    );

    let report = reconcile(
        &template.catalog,
        &mut translation.catalog,
        &ReconcileOptions::new(),
    );

    assert_eq!(report.matched_count(), 1);
    assert_eq!(report.added_count(), 1);
    assert_eq!(report.obsolete_count(), 1);
    assert!(report.warnings.is_empty());

    // Hello keeps its translation but takes the template's metadata.
    let hello = &translation.catalog.units[0];
    assert_eq!(hello.source().first(), "Hello");
    assert_eq!(hello.target().first(), "Ahoj");
    assert_eq!(hello.state(), State::Translated);
    assert_eq!(
        hello.notes().developer.as_deref(),
        Some("Greeting on the landing page")
    );
    assert_eq!(hello.locations()[0].file, "src/main.rs");
    assert_eq!(hello.locations()[0].line, Some(10));

    // Bye appears untranslated, in template order.
    let bye = &translation.catalog.units[1];
    assert_eq!(bye.source().first(), "Bye");
    assert!(bye.target().is_blank());
    assert_eq!(bye.state(), State::Empty);
    assert!(!bye.is_obsolete());

    // Gone survives as an obsolete entry.
    let gone = &translation.catalog.units[2];
    assert_eq!(gone.source().first(), "Gone");
    assert!(gone.is_obsolete());

    let text = serialize(
        FormatKind::Po,
        &translation.catalog,
        &DriverOptions::new().with_language("cs"),
    );
    assert!(text.contains("#. Greeting on the landing page"));
    assert!(text.contains("#: src/main.rs:10"));
    assert!(!text.contains("src/old.rs"));
    assert!(text.contains("msgid \"Bye\""));
    assert!(text.contains("#~ msgid \"Gone\""));
    assert!(text.contains("#~ msgstr \"Pryc\""));
}

#[test]
fn test_remove_policy_drops_stale_po_units() {
    let template = parse(FormatKind::Po, POT, &DriverOptions::new().as_template(true));
    let mut translation = parse(
        FormatKind::Po,
        CS_PO,
        &DriverOptions::new().with_language("cs"),
    );

    let report = reconcile(
        &template.catalog,
        &mut translation.catalog,
        &ReconcileOptions::new().with_obsolete_policy(ObsoletePolicy::Remove),
    );

    assert_eq!(report.obsolete, vec![translation_identity_of("Gone")]);
    assert_eq!(translation.catalog.units.len(), 2);

    let text = serialize(
        FormatKind::Po,
        &translation.catalog,
        &DriverOptions::new().with_language("cs"),
    );
    assert!(!text.contains("Gone"));
    assert!(!text.contains("#~"));
}

// The obsolete list reports identities; for gettext catalogs those are
// content hashes, so recompute the expected one the same way.
fn translation_identity_of(source: &str) -> String {
    let unit = langstore::Unit::new(None, Message::singular(source));
    langstore::identity::unit_identity(&unit, langstore::IdentityRule::ContextSource)
}

#[test]
fn test_json_template_reconciles_properties_translation() {
    let template = parse(
        FormatKind::Json,
        r#"{"a": "Apple", "b": "Banana", "c": "Cherry"}"#,
        &DriverOptions::new().with_language("en").as_template(true),
    );
    let mut translation = parse(
        FormatKind::Properties,
        "a=Jablko\nc=Visen\nd=Stare\n",
        &DriverOptions::new().with_language("cs"),
    );

    let report = reconcile(
        &template.catalog,
        &mut translation.catalog,
        &ReconcileOptions::new(),
    );

    assert_eq!(report.matched, vec!["a", "c"]);
    assert_eq!(report.added, vec!["b"]);
    assert_eq!(report.obsolete, vec!["d"]);

    // Sources flow in from the template across formats.
    let a = &translation.catalog.units[0];
    assert_eq!(a.source().first(), "Apple");
    assert_eq!(a.target().first(), "Jablko");

    let order: Vec<Option<&str>> = translation
        .catalog
        .units
        .iter()
        .map(|unit| unit.context())
        .collect();
    assert_eq!(
        order,
        vec![Some("a"), Some("b"), Some("c"), Some("d")]
    );

    // Properties cannot represent obsolete entries, so `d` is dropped on
    // write while `b` appears with an empty value.
    let text = serialize(
        FormatKind::Properties,
        &translation.catalog,
        &DriverOptions::new().with_language("cs"),
    );
    assert_eq!(text, "a=Jablko\nb=\nc=Visen\n");
}

#[test]
fn test_android_template_reconciles_apple_strings() {
    let template = parse(
        FormatKind::AndroidStrings,
        indoc! {r#"
            <?xml version="1.0" encoding="utf-8"?>
            <resources>
                <string name="greeting">Hello</string>
                <string name="farewell">Goodbye</string>
            </resources>
        "#},
        &DriverOptions::new().with_language("en").as_template(true),
    );
    let mut translation = parse(
        FormatKind::AppleStrings,
        "\"greeting\" = \"Ahoj\";\n",
        &DriverOptions::new().with_language("cs"),
    );

    let report = reconcile(
        &template.catalog,
        &mut translation.catalog,
        &ReconcileOptions::new(),
    );

    assert_eq!(report.matched, vec!["greeting"]);
    assert_eq!(report.added, vec!["farewell"]);
    assert!(report.obsolete.is_empty());

    let text = serialize(
        FormatKind::AppleStrings,
        &translation.catalog,
        &DriverOptions::new().with_language("cs"),
    );
    assert_eq!(text, "\"greeting\" = \"Ahoj\";\n\n\"farewell\" = \"\";\n");
}

#[test]
fn test_reconcile_reaches_a_fixed_point() {
    let template = parse(
        FormatKind::Json,
        r#"{"a": "Apple", "b": "Banana"}"#,
        &DriverOptions::new().with_language("en").as_template(true),
    );
    let mut translation = parse(
        FormatKind::Properties,
        "a=Jablko\nx=Stare\n",
        &DriverOptions::new().with_language("cs"),
    );

    let first = reconcile(
        &template.catalog,
        &mut translation.catalog,
        &ReconcileOptions::new(),
    );
    assert!(!first.is_noop());

    let snapshot = translation.catalog.clone();
    let second = reconcile(
        &template.catalog,
        &mut translation.catalog,
        &ReconcileOptions::new(),
    );
    assert!(second.is_noop());
    assert_eq!(translation.catalog, snapshot);
}
