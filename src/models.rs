use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A leaf of the merge-tag tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    /// Placeholder token, always shaped `{{ path }}`.
    pub value: String,
    pub sample: String,
}

/// A pair of template statements wrapped around a group's tags, e.g. a loop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub before: String,
    pub after: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagGroup {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Rules>,
    pub merge_tags: MergeTags,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MergeNode {
    Tag(Tag),
    Group(TagGroup),
}

pub type MergeTags = Keyed<MergeNode>;
pub type Rules = Keyed<Rule>;

/// A tag lifted out of the tree together with the names of its enclosing groups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FlatTag {
    pub key: String,
    pub name: String,
    pub value: String,
    pub sample: String,
    pub breadcrumbs: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FlatRule {
    pub key: String,
    pub name: String,
    pub before: String,
    pub after: String,
    pub breadcrumbs: Vec<String>,
}

/// Insertion-ordered string-keyed map. Inserting an existing key replaces the
/// value where it stands, so catalogues can be layered on top of each other.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keyed<V> {
    entries: Vec<(String, V)>,
}

impl<V> Keyed<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<V>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Layers `other` on top of `self`.
    pub fn merge(&mut self, other: Keyed<V>) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }
}

impl<V> Default for Keyed<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, T: Into<V>, V> FromIterator<(K, T)> for Keyed<V> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        let mut keyed: Keyed<V> = Keyed::new();
        for (key, value) in iter {
            keyed.insert(key, value);
        }
        keyed
    }
}

impl<K: Into<String>, T: Into<V>, V> Extend<(K, T)> for Keyed<V> {
    fn extend<I: IntoIterator<Item = (K, T)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<V: Serialize> Serialize for Keyed<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct KeyedVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for KeyedVisitor<V> {
    type Value = Keyed<V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of named entries")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut keyed: Keyed<V> = Keyed::new();
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            keyed.insert(key, value);
        }
        Ok(keyed)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Keyed<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(KeyedVisitor(PhantomData))
    }
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>, sample: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            sample: sample.into(),
        }
    }

    /// The dotted path inside the token, `job.customerPO` for `{{ job.customerPO }}`.
    pub fn path(&self) -> Option<&str> {
        token_path(&self.value)
    }
}

impl TagGroup {
    pub fn new(name: impl Into<String>, merge_tags: MergeTags) -> Self {
        Self {
            name: name.into(),
            rules: None,
            merge_tags,
        }
    }

    pub fn with_rules(mut self, rules: Rules) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn has_rules(&self) -> bool {
        self.rules.as_ref().is_some_and(|rules| !rules.is_empty())
    }
}

impl MergeNode {
    pub fn name(&self) -> &str {
        match self {
            MergeNode::Tag(tag) => &tag.name,
            MergeNode::Group(group) => &group.name,
        }
    }
}

impl From<Tag> for MergeNode {
    fn from(tag: Tag) -> Self {
        MergeNode::Tag(tag)
    }
}

impl From<TagGroup> for MergeNode {
    fn from(group: TagGroup) -> Self {
        MergeNode::Group(group)
    }
}

impl FlatTag {
    pub fn path(&self) -> Option<&str> {
        token_path(&self.value)
    }

    pub fn breadcrumb_label(&self) -> String {
        self.breadcrumbs.join(" / ")
    }
}

pub fn token_path(value: &str) -> Option<&str> {
    delimited(value, "{{", "}}")
}

pub fn statement_body(value: &str) -> Option<&str> {
    delimited(value, "{%", "%}")
}

fn delimited<'a>(value: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let inner = value.strip_prefix(open)?.strip_suffix(close)?;
    let trimmed = inner.trim();
    if trimmed.is_empty() || trimmed.contains(['{', '}']) {
        None
    } else {
        Some(trimmed)
    }
}

/// A template section from the user's template document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub body: String,
}

/// A whole template document. `preamble` is the text before the first
/// heading and is written back unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateDocument {
    pub preamble: String,
    pub templates: Vec<Template>,
}

#[derive(Clone, Debug)]
pub struct TreeItem {
    pub label: String,
    pub depth: usize,
    pub template_index: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_replaces_in_place() {
        let mut keyed: Keyed<u32> = [("a", 1u32), ("b", 2), ("c", 3)].into_iter().collect();
        keyed.insert("b", 20u32);
        keyed.insert("d", 4u32);
        let pairs: Vec<(&str, u32)> = keyed.iter().map(|(k, v)| (k, *v)).collect();
        assert_eq!(pairs, vec![("a", 1), ("b", 20), ("c", 3), ("d", 4)]);
    }

    #[test]
    fn token_path_requires_braces() {
        assert_eq!(token_path("{{ job.customerPO }}"), Some("job.customerPO"));
        assert_eq!(token_path("{{job.customerPO}}"), Some("job.customerPO"));
        assert_eq!(token_path("{{  }}"), None);
        assert_eq!(token_path("job.customerPO"), None);
        assert_eq!(statement_body("{% endfor %}"), Some("endfor"));
    }

    #[test]
    fn nodes_deserialize_by_shape() {
        let json = r#"{
            "po": { "name": "PO", "value": "{{ job.po }}", "sample": "PO-1" },
            "items": {
                "name": "Items",
                "rules": { "itemRepeat": { "name": "Loop", "before": "{% for item in job.items %}", "after": "{% endfor %}" } },
                "mergeTags": { "product": { "name": "Product", "value": "{{ item.product }}", "sample": "Widget" } }
            }
        }"#;
        let tags: MergeTags = serde_json::from_str(json).unwrap();
        assert_eq!(tags.keys().collect::<Vec<_>>(), vec!["po", "items"]);
        assert!(matches!(tags.get("po"), Some(MergeNode::Tag(_))));
        match tags.get("items") {
            Some(MergeNode::Group(group)) => {
                assert!(group.has_rules());
                assert_eq!(group.merge_tags.len(), 1);
            }
            other => panic!("expected group, got {other:?}"),
        }
    }
}
