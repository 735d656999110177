//! The user's template document: one markdown file where every `## Title`
//! heading starts a template.

use crate::models::{Template, TemplateDocument, TreeItem};

const ESCAPE: char = '\\';

/// Splits a document into its preamble and templates. Body lines that would
/// read as a heading are stored with a leading `\` and unescaped here.
pub fn parse_templates(content: &str) -> TemplateDocument {
    let mut document = TemplateDocument::default();
    let mut current: Option<(String, String)> = None;

    for line in content.split_inclusive('\n') {
        if let Some(title) = parse_heading(line) {
            if let Some((name, body)) = current.take() {
                document.templates.push(finish_section(name, &body, false));
            }
            current = Some((title, String::new()));
            continue;
        }
        match current.as_mut() {
            Some((_, body)) => body.push_str(unescape_line(line)),
            None => document.preamble.push_str(line),
        }
    }

    if let Some((name, body)) = current {
        document.templates.push(finish_section(name, &body, true));
    }
    document
}

/// Writes a document that [`parse_templates`] reads back unchanged.
pub fn serialize_templates(preamble: &str, templates: &[Template]) -> String {
    let mut output = preamble.to_string();
    if !output.is_empty() && !templates.is_empty() && !output.ends_with('\n') {
        output.push('\n');
    }
    for (index, template) in templates.iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }
        output.push_str("## ");
        output.push_str(template.name.trim());
        output.push('\n');
        if !template.body.is_empty() {
            for line in template.body.split_inclusive('\n') {
                if is_heading_like(line) {
                    output.push(ESCAPE);
                }
                output.push_str(line);
            }
            output.push('\n');
        }
    }
    output
}

// A section ends with the last body line's newline, plus one blank separator
// line unless it is the last section.
fn finish_section(name: String, section: &str, last: bool) -> Template {
    let mut body = section.strip_suffix('\n').unwrap_or(section);
    if !last {
        body = body.strip_suffix('\n').unwrap_or(body);
    }
    Template {
        name,
        body: body.to_string(),
    }
}

fn parse_heading(line: &str) -> Option<String> {
    let rest = line.strip_prefix("##")?;
    if !(rest.starts_with(' ') || rest.starts_with('\t')) {
        return None;
    }
    let title = rest.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

fn is_heading_like(line: &str) -> bool {
    parse_heading(line.trim_start_matches(ESCAPE)).is_some()
}

fn unescape_line(line: &str) -> &str {
    match line.strip_prefix(ESCAPE) {
        Some(rest) if is_heading_like(rest) => rest,
        _ => line,
    }
}

pub fn build_tree_items(templates: &[Template]) -> Vec<TreeItem> {
    let mut root = TreeNode::new("");
    for (index, template) in templates.iter().enumerate() {
        let parts: Vec<&str> = template
            .name
            .split('/')
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect();
        root.insert(&parts, index);
    }

    let mut items = Vec::new();
    root.flatten(0, &mut items);
    items
}

#[derive(Clone, Debug)]
struct TreeNode {
    name: String,
    template_index: Option<usize>,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            template_index: None,
            children: Vec::new(),
        }
    }

    fn insert(&mut self, parts: &[&str], template_index: usize) {
        let Some((part, rest)) = parts.split_first() else {
            self.template_index = Some(template_index);
            return;
        };
        match self.children.iter_mut().find(|child| child.name == *part) {
            Some(node) => node.insert(rest, template_index),
            None => {
                let mut node = TreeNode::new(part);
                node.insert(rest, template_index);
                self.children.push(node);
            }
        }
    }

    fn flatten(&self, depth: usize, items: &mut Vec<TreeItem>) {
        for child in &self.children {
            items.push(TreeItem {
                label: child.name.clone(),
                depth,
                template_index: child.template_index,
            });
            child.flatten(depth + 1, items);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOCUMENT: &str = "# My notes\nkeep me\n\n## Delivery/Booked\nYour PO {{ job.customerPO }}\n\n## Delivery/Completed\nDone.\n## Invoice\n";

    fn template(name: &str, body: &str) -> Template {
        Template {
            name: name.to_string(),
            body: body.to_string(),
        }
    }

    fn read_back(templates: &[Template]) -> Vec<Template> {
        parse_templates(&serialize_templates("", templates)).templates
    }

    #[test]
    fn headings_split_templates() {
        let document = parse_templates(DOCUMENT);
        let names: Vec<&str> = document.templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Delivery/Booked", "Delivery/Completed", "Invoice"]);
        assert_eq!(document.templates[0].body, "Your PO {{ job.customerPO }}");
        assert_eq!(document.templates[1].body, "Done.");
        assert_eq!(document.templates[2].body, "");
    }

    #[test]
    fn heading_needs_space() {
        let document = parse_templates("##NoSpace\nbody");
        assert!(document.templates.is_empty());
        assert_eq!(document.preamble, "##NoSpace\nbody");
    }

    #[test]
    fn preamble_is_written_back() {
        let document = parse_templates(DOCUMENT);
        assert_eq!(document.preamble, "# My notes\nkeep me\n\n");
        let written = serialize_templates(&document.preamble, &document.templates);
        assert!(written.starts_with("# My notes\nkeep me\n\n## Delivery/Booked\n"));
        assert_eq!(parse_templates(&written), document);
    }

    #[test]
    fn saved_document_is_unchanged() {
        let written = "intro\n## Welcome\nHi\n\n## Invoice\nTotal\n";
        let document = parse_templates(written);
        assert_eq!(serialize_templates(&document.preamble, &document.templates), written);
    }

    #[test]
    fn heading_lines_in_body_stay_in_template() {
        let templates = vec![
            template("Letter", "## Order summary\nPO {{ job.customerPO }}"),
            template("Escaped", "\\## literal\n\\not a heading"),
        ];
        let written = serialize_templates("", &templates);
        assert!(written.contains("\\## Order summary\n"));
        assert_eq!(read_back(&templates), templates);
    }

    #[test]
    fn trailing_blank_lines_survive() {
        let templates = vec![
            template("First", "Hi\n\n"),
            template("Empty", ""),
            template("Newline", "\n"),
            template("Last", "Bye\n\n"),
        ];
        assert_eq!(read_back(&templates), templates);
    }

    #[test]
    fn folder_tree_from_names() {
        let items = build_tree_items(&parse_templates(DOCUMENT).templates);
        let summary: Vec<(&str, usize, Option<usize>)> = items
            .iter()
            .map(|item| (item.label.as_str(), item.depth, item.template_index))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Delivery", 0, None),
                ("Booked", 1, Some(0)),
                ("Completed", 1, Some(1)),
                ("Invoice", 0, Some(2)),
            ]
        );
    }
}
