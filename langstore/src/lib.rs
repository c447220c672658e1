#![forbid(unsafe_code)]
//! Universal translation file toolkit for Rust.
//!
//! Parses, writes, reconciles, and converts between gettext PO, XLIFF 1.2, Apple `.strings`,
//! Java `.properties`, Android `strings.xml`, JSON, YAML, CSV, .NET RESX, and SubRip files.
//! All processing happens through the unified `Catalog` model.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use langstore::{DriverOptions, Store, convert};
//!
//! // Convert between formats by path
//! convert("po/cs.po", "res/values-cs/strings.xml", &DriverOptions::new())?;
//!
//! // Or work with the unified Catalog model
//! let mut store = Store::new();
//! store.read_file("po/cs.po", None, &DriverOptions::new())?;
//! store.write_all(&DriverOptions::new())?;
//! # Ok::<(), langstore::Error>(())
//! ```
//!
//! # Supported Formats
//!
//! - **gettext PO**: the bilingual lingua franca, with plural forms and fuzzy states
//! - **XLIFF 1.2**: translation interchange files with states and notes
//! - **Apple `.strings`**: traditional iOS/macOS localization files
//! - **Java `.properties`**: escape-heavy key-value files
//! - **Android `strings.xml`**: resources with `<plurals>` support
//! - **JSON / YAML**: nested translation trees, flat or i18next style
//! - **CSV/TSV**: tabular exchange with a configurable column layout
//! - **.NET RESX**: XML resource files with resheader round-trip
//! - **SubRip `.srt`**: subtitle cues keyed by index
//!
//! # Features
//!
//! - ✨ Parse, write, convert, and reconcile ten localization file formats
//! - 🦀 Idiomatic, modular, and ergonomic Rust API
//! - 📦 Designed for CLI tools, CI/CD pipelines, and library integration
//! - 🔄 Unified internal model (`Catalog`) for lossless format-agnostic processing
//! - 📖 Well-documented, robust error handling and extensible codebase

pub mod encoding;
pub mod error;
pub mod flags;
pub mod formats;
pub mod identity;
pub mod plural;
pub mod reconcile;
pub mod store;
pub mod traits;
pub mod types;

// Re-export most used types for easy consumption
pub use crate::{
    error::Error,
    flags::{Flag, Flags},
    formats::FormatKind,
    identity::{DiffReport, IdentityRule, diff_catalogs},
    reconcile::{ObsoletePolicy, ReconcileOptions, ReconcileReport, reconcile},
    store::{Store, convert, infer_language_from_path, read_file, write_file},
    traits::{DriverOptions, FormatDriver, Parsed, ParseReport, Warning},
    types::{Catalog, CatalogMeta, Message, State, Unit},
};
