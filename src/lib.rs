//! # Foundry
//!
//! Building blocks for a multilingual static-site pipeline: markdown pages
//! and translation tables go in, one HTML tree per language comes out.
//! The filesystem is the only data source and the only output.
//!
//! # Architecture
//!
//! ```text
//!            ┌──────────────── with_step("build <lang>") ────────────────┐
//!  i18n/  ──▶│ load_translations ─▶ template_helpers ─▶ load_templates    │
//!  content/ ─▶│ markdown_to_html ─▶ Page ─┐                                 │
//!            │                           └─ for_each_parallel ─▶ render ──┼─▶ write_if_changed ─▶ dist/
//!            └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each piece is usable on its own; [`site::build_site`] composes them.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`fileio`] | Atomic write-if-changed, copy-if-changed, directory creation |
//! | [`step`] | Named, timed steps logged through a replaceable process-wide sink |
//! | [`parallel`] | Bounded fan-out over a batch with panic capture |
//! | [`i18n`] | Translation tables, JSON/YAML loading, printf formatting |
//! | [`templating`] | Template helpers (`t`, `tf`, `hasTranslation`), loading and rendering |
//! | [`markdown`] | Markdown to HTML with heading ids and hard line breaks |
//! | [`config`] | `foundry.toml` loading and validation |
//! | [`site`] | The full pipeline over a [`config::BuildConfig`] |
//! | [`error`] | The crate-wide [`FoundryError`] taxonomy |
//!
//! # Design Decisions
//!
//! ## Write Only What Changed
//!
//! Outputs are compared byte-for-byte with what is already on disk and left
//! alone when equal. A rebuild over unchanged inputs keeps every mtime, so
//! rsync, HTTP caches and file watchers downstream see nothing new. When the
//! content does differ it is staged in a `.foundry-*` file next to the
//! destination and renamed into place: readers see the old bytes or the new
//! bytes, never a prefix.
//!
//! ## Snapshot Helpers
//!
//! Template helpers close over a private copy of the translation table taken
//! when they are built. Pages rendered on different workers all see the same
//! strings, whatever the caller does to its table afterwards.
//!
//! ## Panics Stay Inside the Fan-out
//!
//! A panicking action never unwinds into the caller. The first panic is
//! captured, dispatch stops and the call returns
//! [`FoundryError::ActionPanic`] carrying the panic message.
//!
//! ## Missing Is Not an Error
//!
//! A language without a translation file gets an empty table, and a missing
//! key renders as the key itself. Untranslated strings show up in the page
//! where someone will notice them instead of failing the build.

pub mod config;
pub mod error;
pub mod fileio;
pub mod i18n;
pub mod markdown;
pub mod parallel;
pub mod site;
pub mod step;
pub mod templating;

pub use error::{ErrorKind, FoundryError, Result};
pub use fileio::{WriteOutcome, copy_file_if_changed, ensure_dir, write_if_changed};
pub use i18n::{Translations, load_translations};
pub use parallel::for_each_parallel;
pub use step::{StepSink, set_step_logger, with_step};
pub use templating::{Helpers, TemplateSet, load_templates, render_template, template_helpers};
