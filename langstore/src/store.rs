//! Path-level convenience over the byte-level core.
//!
//! The driver API works on byte buffers; this module adds reading and
//! writing real files: format inference from the path, language inference
//! from directory and filename conventions, optimistic write-back guarded
//! by the content hash recorded at read time, and JSON snapshots of
//! parsed catalogs.

use std::{fs, path::Path};

use unic_langid::LanguageIdentifier;

use crate::{
    error::Error,
    formats::FormatKind,
    identity,
    traits::{DriverOptions, Parsed, ParseReport},
    types::Catalog,
};

/// Reads and parses one file. The format comes from `kind` or the path;
/// the language comes from the options or the path conventions. Records
/// the source path and content hash for later write-back.
pub fn read_file(
    path: impl AsRef<Path>,
    kind: Option<FormatKind>,
    options: &DriverOptions,
) -> Result<Parsed, Error> {
    let path = path.as_ref();
    let kind = kind
        .or_else(|| FormatKind::infer_from_path(path))
        .ok_or_else(|| Error::UnknownFormat(path.display().to_string()))?;
    let bytes = fs::read(path)?;

    let mut effective = options.clone();
    if effective.language.is_none() {
        effective.language = infer_language_from_path(path);
    }

    let mut parsed = kind.driver().parse(&bytes, &effective)?;
    parsed.catalog.meta.path = Some(path.to_path_buf());
    parsed.catalog.meta.base_hash = Some(identity::content_hash(&bytes));
    parsed.catalog.meta.format = Some(kind.to_string());
    Ok(parsed)
}

/// Serializes a catalog to a file.
///
/// When the destination is the file the catalog was read from, the bytes
/// on disk are re-hashed first and a stale base hash fails with
/// [`Error::Conflict`]; the caller re-reads and retries. On success the
/// catalog's path and base hash move to the written content.
pub fn write_file(
    catalog: &mut Catalog,
    path: impl AsRef<Path>,
    kind: Option<FormatKind>,
    options: &DriverOptions,
) -> Result<(), Error> {
    let path = path.as_ref();
    let kind = kind
        .or_else(|| FormatKind::infer_from_path(path))
        .or_else(|| {
            catalog
                .meta
                .format
                .as_deref()
                .and_then(|name| name.parse().ok())
        })
        .ok_or_else(|| Error::UnknownFormat(path.display().to_string()))?;

    if let (Some(expected), Some(origin)) = (&catalog.meta.base_hash, &catalog.meta.path) {
        if origin.as_path() == path && path.exists() {
            let found = identity::content_hash(&fs::read(path)?);
            if &found != expected {
                return Err(Error::Conflict {
                    path: path.to_path_buf(),
                    expected: expected.clone(),
                    found,
                });
            }
        }
    }

    let bytes = kind.driver().serialize(catalog, options)?;
    fs::write(path, &bytes)?;
    catalog.meta.path = Some(path.to_path_buf());
    catalog.meta.base_hash = Some(identity::content_hash(&bytes));
    catalog.meta.format = Some(kind.to_string());
    Ok(())
}

/// Converts one file to another format, both inferred from their paths.
/// Returns the input's parse report so warnings reach the caller.
pub fn convert(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &DriverOptions,
) -> Result<ParseReport, Error> {
    let output = output.as_ref();
    let mut parsed = read_file(input, None, options)?;
    let kind = FormatKind::infer_from_path(output)
        .ok_or_else(|| Error::UnknownFormat(output.display().to_string()))?;
    write_file(&mut parsed.catalog, output, Some(kind), options)?;
    Ok(parsed.report)
}

/// Infers the translation language from path conventions.
///
/// Checked in order: Android resource qualifiers (`values-cs/`,
/// `values-zh-rCN/`), Apple bundles (`cs.lproj/`), then the file stem
/// (`cs.po`, `pt-BR.yml`, `Resources.cs.resx`, `strings_cs.properties`).
/// Candidates are validated as language identifiers, so `messages.po`
/// and `Base.lproj` infer nothing.
///
/// ```
/// use langstore::store::infer_language_from_path;
///
/// assert_eq!(
///     infer_language_from_path("res/values-cs/strings.xml"),
///     Some("cs".to_string())
/// );
/// assert_eq!(
///     infer_language_from_path("po/cs.po"),
///     Some("cs".to_string())
/// );
/// assert_eq!(infer_language_from_path("messages.properties"), None);
/// ```
pub fn infer_language_from_path(path: impl AsRef<Path>) -> Option<String> {
    let path = path.as_ref();

    for component in path.components().rev() {
        let Some(name) = component.as_os_str().to_str() else {
            continue;
        };
        if let Some(bundle) = name.strip_suffix(".lproj") {
            if let Some(language) = valid_language(bundle) {
                return Some(language);
            }
        }
        if let Some(qualifier) = name.strip_prefix("values-") {
            if let Some(language) = valid_language(&android_qualifier(qualifier)) {
                return Some(language);
            }
        }
    }

    let stem = path.file_stem()?.to_str()?;
    valid_language(stem)
        .or_else(|| stem.rsplit_once('.').and_then(|(_, tail)| valid_language(tail)))
        .or_else(|| stem.rsplit_once('_').and_then(|(_, tail)| valid_language(tail)))
}

/// `zh-rCN` → `zh-CN`: Android region qualifiers carry an `r` prefix.
fn android_qualifier(qualifier: &str) -> String {
    qualifier
        .split('-')
        .enumerate()
        .map(|(index, part)| {
            if index > 0 && part.len() == 3 && part.starts_with('r') {
                &part[1..]
            } else {
                part
            }
        })
        .collect::<Vec<&str>>()
        .join("-")
}

/// Canonical language tag when the candidate is plausibly one. Rejects
/// long primary subtags, so ordinary file stems do not match.
fn valid_language(candidate: &str) -> Option<String> {
    let id: LanguageIdentifier = candidate.parse().ok()?;
    if id.language.as_str().len() > 3 {
        return None;
    }
    Some(id.to_string())
}

/// A collection of parsed catalogs, usually one per language of a
/// component.
#[derive(Debug, Default)]
pub struct Store {
    pub catalogs: Vec<Catalog>,
}

impl Store {
    pub fn new() -> Self {
        Store::default()
    }

    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Catalog> {
        self.catalogs.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Catalog> {
        self.catalogs.iter_mut()
    }

    pub fn add_catalog(&mut self, catalog: Catalog) {
        self.catalogs.push(catalog);
    }

    /// The first catalog for the language, by base subtag.
    pub fn get_by_language(&self, language: &str) -> Option<&Catalog> {
        self.catalogs
            .iter()
            .find(|catalog| catalog.has_language(language))
    }

    pub fn get_mut_by_language(&mut self, language: &str) -> Option<&mut Catalog> {
        self.catalogs
            .iter_mut()
            .find(|catalog| catalog.has_language(language))
    }

    /// Reads one file into the collection and hands back its parse
    /// report.
    pub fn read_file(
        &mut self,
        path: impl AsRef<Path>,
        kind: Option<FormatKind>,
        options: &DriverOptions,
    ) -> Result<ParseReport, Error> {
        let parsed = read_file(path, kind, options)?;
        self.catalogs.push(parsed.catalog);
        Ok(parsed.report)
    }

    /// Writes every catalog back to the path it was read from.
    pub fn write_all(&mut self, options: &DriverOptions) -> Result<(), Error> {
        for catalog in self.catalogs.iter_mut() {
            let path = catalog
                .meta
                .path
                .clone()
                .ok_or_else(|| Error::mismatch("catalog has no source path"))?;
            write_file(catalog, &path, None, options)?;
        }
        Ok(())
    }

    /// Saves all catalogs as one JSON document; each entry carries its
    /// source path and content hash.
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = fs::File::create(path)?;
        serde_json::to_writer(&mut writer, &self.catalogs)?;
        Ok(())
    }

    /// Loads a collection saved by [`Store::save_snapshot`].
    pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Self, Error> {
        let reader = fs::File::open(path)?;
        let catalogs: Vec<Catalog> = serde_json::from_reader(reader)?;
        Ok(Store { catalogs })
    }
}
