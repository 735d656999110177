use std::fs;
use std::path::Path;

use arboard::Clipboard;

use crate::error::{MtagError, Result};
use crate::models::{Template, TemplateDocument};
use crate::templates::{parse_templates, serialize_templates};

const DEFAULT_TEMPLATES: &str = "## Delivery/Booked\nHello {{ customer.name }},\n\nYour order {{ job.customerPO }} is booked for {{ job.dueByStart.dateDMY }}.\n\n## Delivery/Items\n{% for item in job.items %}\n{{ item.qtyOrdered }} x {{ item.product }}\n{% endfor %}\n";

/// Reads the template document, creating it with a starter template first
/// when it does not exist yet.
pub fn load_templates(path: &Path) -> Result<TemplateDocument> {
    ensure_templates_file(path)?;
    let content = fs::read_to_string(path).map_err(|source| MtagError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let document = parse_templates(&content);
    tracing::info!(path = %path.display(), count = document.templates.len(), "loaded templates");
    Ok(document)
}

pub fn save_templates(path: &Path, preamble: &str, templates: &[Template]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serialize_templates(preamble, templates)).map_err(|source| MtagError::WriteFile {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), count = templates.len(), "saved templates");
    Ok(())
}

pub fn ensure_templates_file(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, DEFAULT_TEMPLATES).map_err(|source| MtagError::WriteFile {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "created starter template document");
    Ok(())
}

pub fn set_clipboard(text: &str) -> Result<()> {
    Clipboard::new()
        .and_then(|mut cb| cb.set_text(text.to_string()))
        .map_err(|err| MtagError::Clipboard(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_document_gets_starter_templates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("templates.md");
        let document = load_templates(&path).unwrap();
        assert_eq!(document.templates.len(), 2);
        assert_eq!(document.preamble, "");
        assert!(path.exists());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.md");
        let templates = vec![Template {
            name: "Invoice".to_string(),
            body: "Total {{ job.totalPrice }}".to_string(),
        }];
        save_templates(&path, "", &templates).unwrap();
        assert_eq!(load_templates(&path).unwrap().templates, templates);
    }

    #[test]
    fn save_keeps_notes_above_first_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.md");
        fs::write(&path, "# My notes\nkeep me\n\n## Welcome\nHi\n").unwrap();

        let mut document = load_templates(&path).unwrap();
        document.templates[0].body = "Hi there\n\n".to_string();
        save_templates(&path, &document.preamble, &document.templates).unwrap();

        let saved = fs::read_to_string(&path).unwrap();
        assert_eq!(saved, "# My notes\nkeep me\n\n## Welcome\nHi there\n\n\n");
        assert_eq!(load_templates(&path).unwrap(), document);
    }
}
