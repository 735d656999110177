//! Output of the non-interactive subcommands.

use std::path::Path;

use crate::error::Result;
use crate::models::MergeTags;
use crate::preview::{parse_template, render_preview, unknown_tags};
use crate::tags::{extract_sample_values, flatten, sample_values_by_token};

/// Exit code of `check` when a template uses tags the catalogue lacks.
pub const UNKNOWN_TAGS_EXIT: u8 = 2;

/// One line per tag: breadcrumbs and name, token, first line of the sample.
pub fn list_lines(merge_tags: &MergeTags) -> Vec<String> {
    flatten(merge_tags, &[])
        .into_iter()
        .map(|tag| {
            let sample = tag.sample.lines().next().unwrap_or("");
            let label = if tag.breadcrumbs.is_empty() {
                tag.name.clone()
            } else {
                format!("{} / {}", tag.breadcrumb_label(), tag.name)
            };
            format!("{label}\t{}\t{sample}", tag.value)
        })
        .collect()
}

pub fn samples_json(merge_tags: &MergeTags) -> Result<String> {
    Ok(serde_json::to_string_pretty(&extract_sample_values(merge_tags))?)
}

pub fn export_json(merge_tags: &MergeTags) -> Result<String> {
    Ok(serde_json::to_string_pretty(merge_tags)?)
}

pub fn preview(body: &str, merge_tags: &MergeTags) -> String {
    render_preview(&parse_template(body), &sample_values_by_token(merge_tags))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckReport {
    pub unknown: Vec<String>,
}

impl CheckReport {
    pub fn exit_code(&self) -> u8 {
        if self.unknown.is_empty() { 0 } else { UNKNOWN_TAGS_EXIT }
    }

    pub fn lines(&self, file: &Path) -> Vec<String> {
        if self.unknown.is_empty() {
            return vec![format!("{}: all tags known", file.display())];
        }
        self.unknown
            .iter()
            .map(|path| format!("{}: unknown tag {{{{ {path} }}}}", file.display()))
            .collect()
    }
}

pub fn check(body: &str, merge_tags: &MergeTags) -> CheckReport {
    let unknown = unknown_tags(&parse_template(body), merge_tags);
    if !unknown.is_empty() {
        tracing::warn!(count = unknown.len(), "template uses unknown tags");
    }
    CheckReport { unknown }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::{CatalogueKind, base_merge_tags, compose};
    use pretty_assertions::assert_eq;

    #[test]
    fn check_flags_unknown_tags() {
        let report = check("{{ job.customerPO }} {{ job.nope }} {{ job.nope }}", &base_merge_tags());
        assert_eq!(report.unknown, vec!["job.nope".to_string()]);
        assert_eq!(report.exit_code(), UNKNOWN_TAGS_EXIT);
        assert_eq!(
            report.lines(Path::new("a.md")),
            vec!["a.md: unknown tag {{ job.nope }}".to_string()]
        );
    }

    #[test]
    fn check_passes_known_template() {
        let report = check("PO {{ job.customerPO }}", &base_merge_tags());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.lines(Path::new("a.md")), vec!["a.md: all tags known".to_string()]);
    }

    #[test]
    fn samples_print_in_catalogue_order() {
        let json = samples_json(&base_merge_tags()).unwrap();
        let account = json.find("\"accountName\"").unwrap();
        let job = json.find("\"customerPO\"").unwrap();
        assert!(account < job);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["customerPO"], "PO-123");
    }

    #[test]
    fn export_reads_back() {
        let merge_tags = compose(&[CatalogueKind::Base, CatalogueKind::Run]);
        let restored: MergeTags = serde_json::from_str(&export_json(&merge_tags).unwrap()).unwrap();
        assert_eq!(restored, merge_tags);
    }

    #[test]
    fn list_shows_breadcrumbs_token_and_sample() {
        let lines = list_lines(&base_merge_tags());
        assert!(lines.contains(&"Job / Customer PO\t{{ job.customerPO }}\tPO-123".to_string()));
    }

    #[test]
    fn preview_fills_samples() {
        assert_eq!(preview("Hi {{ job.customerPO }}", &base_merge_tags()), "Hi PO-123");
    }
}
