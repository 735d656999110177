use std::collections::HashMap;

use crate::models::MergeTags;
use crate::tags::flatten;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Tag { path: String, raw: String },
    Statement { body: String, raw: String },
}

pub fn parse_template(body: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut index = 0;

    while let Some(start) = body[index..].find('{').map(|rel| index + rel) {
        text.push_str(&body[index..start]);
        let rest = &body[start..];
        let parsed = if rest.starts_with("{{") {
            delimited(rest, "{{", "}}").map(|(inner, raw)| Segment::Tag {
                path: inner.to_string(),
                raw: raw.to_string(),
            })
        } else if rest.starts_with("{%") {
            delimited(rest, "{%", "%}").map(|(inner, raw)| Segment::Statement {
                body: inner.to_string(),
                raw: raw.to_string(),
            })
        } else {
            None
        };

        match parsed {
            Some(segment) => {
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                let len = match &segment {
                    Segment::Tag { raw, .. } | Segment::Statement { raw, .. } => raw.len(),
                    Segment::Text(_) => 0,
                };
                segments.push(segment);
                index = start + len;
            }
            None => {
                text.push('{');
                index = start + 1;
            }
        }
    }
    text.push_str(&body[index..]);
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    segments
}

fn delimited<'a>(rest: &'a str, open: &str, close: &str) -> Option<(&'a str, &'a str)> {
    let after = &rest[open.len()..];
    let end = after.find(close)?;
    let inner = after[..end].trim();
    if inner.is_empty() || inner.contains('\n') || inner.contains(['{', '}']) {
        return None;
    }
    Some((inner, &rest[..open.len() + end + close.len()]))
}

/// Renders a template with example values. Tags without a sample stay as
/// written; loop statements are dropped so the loop body shows once.
pub fn render_preview(segments: &[Segment], samples: &HashMap<String, String>) -> String {
    let mut output = String::new();
    for segment in segments {
        match segment {
            Segment::Text(text) => output.push_str(text),
            Segment::Tag { path, raw } => match samples.get(path) {
                Some(sample) => output.push_str(sample),
                None => output.push_str(raw),
            },
            Segment::Statement { body, raw } => {
                if !is_loop_statement(body) {
                    output.push_str(raw);
                }
            }
        }
    }
    output
}

fn is_loop_statement(body: &str) -> bool {
    let keyword = body.split_whitespace().next().unwrap_or("");
    keyword == "for" || keyword == "endfor"
}

/// Tag paths in the template that the catalogue does not know, in order of
/// first appearance.
pub fn unknown_tags(segments: &[Segment], merge_tags: &MergeTags) -> Vec<String> {
    let known: Vec<String> = flatten(merge_tags, &[])
        .iter()
        .filter_map(|tag| tag.path().map(str::to_string))
        .collect();
    let mut unknown: Vec<String> = Vec::new();
    for segment in segments {
        if let Segment::Tag { path, .. } = segment {
            if !known.contains(path) && !unknown.contains(path) {
                unknown.push(path.clone());
            }
        }
    }
    unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::base_merge_tags;
    use crate::tags::sample_values_by_token;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_tags_statements_and_text() {
        let segments = parse_template("PO {{ job.customerPO }}{% endfor %} {x}");
        assert_eq!(
            segments,
            vec![
                Segment::Text("PO ".to_string()),
                Segment::Tag {
                    path: "job.customerPO".to_string(),
                    raw: "{{ job.customerPO }}".to_string(),
                },
                Segment::Statement {
                    body: "endfor".to_string(),
                    raw: "{% endfor %}".to_string(),
                },
                Segment::Text(" {x}".to_string()),
            ]
        );
    }

    #[test]
    fn unterminated_tag_is_text() {
        assert_eq!(
            parse_template("Hi {{ site.name"),
            vec![Segment::Text("Hi {{ site.name".to_string())]
        );
    }

    #[test]
    fn preview_uses_samples_and_unrolls_loops() {
        let template = "PO {{ job.customerPO }}\n{% for item in job.items %}- {{ item.product }}\n{% endfor %}{{ job.nope }}";
        let samples = sample_values_by_token(&base_merge_tags());
        let rendered = render_preview(&parse_template(template), &samples);
        assert_eq!(rendered, "PO PO-123\n- Example Product\n{{ job.nope }}");
    }

    #[test]
    fn other_statements_are_kept() {
        let rendered = render_preview(&parse_template("{% if x %}y"), &HashMap::new());
        assert_eq!(rendered, "{% if x %}y");
    }

    #[test]
    fn reports_unknown_tags_once() {
        let segments = parse_template("{{ a.b }} {{ site.name }} {{ a.b }} {{ c }}");
        assert_eq!(
            unknown_tags(&segments, &base_merge_tags()),
            vec!["a.b".to_string(), "c".to_string()]
        );
    }
}
