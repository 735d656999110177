//! Merge-tag catalogue and autocomplete editing for template text.
//!
//! A merge tag is a placeholder such as `{{ job.customerPO }}` that a template
//! engine fills in later. [`catalogue`] describes the available tags as a
//! tree, [`tags`] walks that tree, and [`suggestion`] with [`popup`] offer the
//! tags while typing.

pub mod app;
pub mod catalogue;
pub mod commands;
pub mod config;
pub mod editor;
pub mod error;
pub mod logger;
pub mod models;
pub mod popup;
pub mod preview;
pub mod suggestion;
pub mod system;
pub mod tags;
pub mod templates;
pub mod ui;

pub use catalogue::{CatalogueKind, compose};
pub use config::Config;
pub use error::{CatalogueError, MtagError, Result};
pub use models::{FlatRule, FlatTag, MergeNode, MergeTags, Rule, Rules, Tag, TagGroup};
pub use tags::{extract_sample_values, flatten, flatten_rules, validate};
