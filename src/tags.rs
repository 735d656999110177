//! Walkers over the merge-tag tree.

use std::collections::{HashMap, HashSet};

use crate::error::CatalogueError;
use crate::models::{FlatRule, FlatTag, Keyed, MergeNode, MergeTags, statement_body, token_path};

/// Lifts every tag out of the tree, depth first and in insertion order.
/// Each tag carries the names of the groups it sits under.
pub fn flatten(merge_tags: &MergeTags, breadcrumbs: &[String]) -> Vec<FlatTag> {
    let mut tags = Vec::new();
    flatten_into(merge_tags, breadcrumbs, &mut tags);
    tags
}

fn flatten_into(merge_tags: &MergeTags, breadcrumbs: &[String], tags: &mut Vec<FlatTag>) {
    for (key, node) in merge_tags.iter() {
        match node {
            MergeNode::Tag(tag) => tags.push(FlatTag {
                key: key.to_string(),
                name: tag.name.clone(),
                value: tag.value.clone(),
                sample: tag.sample.clone(),
                breadcrumbs: breadcrumbs.to_vec(),
            }),
            MergeNode::Group(group) => {
                let mut path = breadcrumbs.to_vec();
                path.push(group.name.clone());
                flatten_into(&group.merge_tags, &path, tags);
            }
        }
    }
}

/// Every rule of every group, with the breadcrumbs of the group that owns it.
pub fn flatten_rules(merge_tags: &MergeTags) -> Vec<FlatRule> {
    let mut rules = Vec::new();
    flatten_rules_into(merge_tags, &[], &mut rules);
    rules
}

fn flatten_rules_into(merge_tags: &MergeTags, breadcrumbs: &[String], rules: &mut Vec<FlatRule>) {
    for (_, node) in merge_tags.iter() {
        let MergeNode::Group(group) = node else {
            continue;
        };
        let mut path = breadcrumbs.to_vec();
        path.push(group.name.clone());
        if let Some(group_rules) = &group.rules {
            for (key, rule) in group_rules.iter() {
                rules.push(FlatRule {
                    key: key.to_string(),
                    name: rule.name.clone(),
                    before: rule.before.clone(),
                    after: rule.after.clone(),
                    breadcrumbs: path.clone(),
                });
            }
        }
        flatten_rules_into(&group.merge_tags, &path, rules);
    }
}

/// Sample values keyed by each tag's map key, in catalogue order. A later
/// key overwrites an earlier one where it first appeared.
pub fn extract_sample_values(merge_tags: &MergeTags) -> Keyed<String> {
    let mut samples = Keyed::new();
    extract_into(merge_tags, &mut samples);
    samples
}

fn extract_into(merge_tags: &MergeTags, samples: &mut Keyed<String>) {
    for (key, node) in merge_tags.iter() {
        match node {
            MergeNode::Tag(tag) => {
                samples.insert(key, tag.sample.clone());
            }
            MergeNode::Group(group) => extract_into(&group.merge_tags, samples),
        }
    }
}

/// Sample values keyed by token path (`job.customerPO`). The first tag to use
/// a path wins.
pub fn sample_values_by_token(merge_tags: &MergeTags) -> HashMap<String, String> {
    let mut samples = HashMap::new();
    for tag in flatten(merge_tags, &[]) {
        if let Some(path) = tag.path() {
            samples.entry(path.to_string()).or_insert(tag.sample);
        }
    }
    samples
}

pub fn find_by_token(merge_tags: &MergeTags, token: &str) -> Option<FlatTag> {
    let wanted = token_path(token).unwrap_or(token.trim());
    flatten(merge_tags, &[])
        .into_iter()
        .find(|tag| tag.path() == Some(wanted))
}

/// Checks the structural invariants of a tree: well-formed tokens and rule
/// statements, non-empty names, unique tag keys, and unique tokens outside of
/// loop groups.
pub fn validate(merge_tags: &MergeTags) -> Result<(), CatalogueError> {
    let mut keys: HashSet<String> = HashSet::new();
    let mut tokens: HashMap<String, String> = HashMap::new();
    validate_into(merge_tags, false, &mut keys, &mut tokens)
}

fn validate_into(
    merge_tags: &MergeTags,
    in_loop: bool,
    keys: &mut HashSet<String>,
    tokens: &mut HashMap<String, String>,
) -> Result<(), CatalogueError> {
    for (key, node) in merge_tags.iter() {
        if node.name().trim().is_empty() {
            return Err(CatalogueError::EmptyName {
                key: key.to_string(),
            });
        }
        match node {
            MergeNode::Tag(tag) => {
                let Some(path) = tag.path() else {
                    return Err(CatalogueError::MalformedToken {
                        key: key.to_string(),
                        value: tag.value.clone(),
                    });
                };
                if !keys.insert(key.to_string()) {
                    return Err(CatalogueError::DuplicateKey {
                        key: key.to_string(),
                    });
                }
                if in_loop {
                    continue;
                }
                if let Some(first) = tokens.insert(path.to_string(), key.to_string()) {
                    return Err(CatalogueError::DuplicateToken {
                        value: tag.value.clone(),
                        first,
                        second: key.to_string(),
                    });
                }
            }
            MergeNode::Group(group) => {
                if let Some(rules) = &group.rules {
                    for (rule_key, rule) in rules.iter() {
                        for statement in [&rule.before, &rule.after] {
                            if statement_body(statement).is_none() {
                                return Err(CatalogueError::MalformedRule {
                                    key: rule_key.to_string(),
                                    statement: statement.clone(),
                                });
                            }
                        }
                    }
                }
                validate_into(&group.merge_tags, in_loop || group.has_rules(), keys, tokens)?;
            }
        }
    }
    Ok(())
}
