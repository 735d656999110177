//! Autocomplete trigger detection and the start/update/key-down/exit
//! lifecycle that drives a suggestion renderer.

use std::ops::Range;

use crossterm::event::KeyEvent;
use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Matcher, Utf32String};
use ratatui::layout::Rect;

use crate::models::{FlatRule, FlatTag, MergeTags};
use crate::tags::{flatten, flatten_rules};

pub const DEFAULT_TRIGGER: &str = "{{";

/// An open trigger in the text: `range` covers the trigger and the query
/// typed after it, up to the cursor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestionMatch {
    pub range: Range<usize>,
    pub query: String,
}

/// Looks back from `cursor` on the current line for the trigger.
pub fn find_match(text: &str, cursor: usize, trigger: &str) -> Option<SuggestionMatch> {
    if trigger.is_empty() || cursor > text.len() || !text.is_char_boundary(cursor) {
        return None;
    }
    let before = &text[..cursor];
    let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    let line = &before[line_start..];
    let start = line.rfind(trigger)?;
    let query = line[start + trigger.len()..].trim_start();
    if query.contains('}') || query.chars().any(char::is_whitespace) {
        return None;
    }
    Some(SuggestionMatch {
        range: line_start + start..cursor,
        query: query.to_string(),
    })
}

/// Text to put in place of the trigger range, and where the cursor lands
/// relative to the start of that text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Insertion {
    pub text: String,
    pub cursor_offset: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SuggestionItem {
    Tag(FlatTag),
    Rule(FlatRule),
}

impl SuggestionItem {
    pub fn label(&self) -> &str {
        match self {
            SuggestionItem::Tag(tag) => &tag.name,
            SuggestionItem::Rule(rule) => &rule.name,
        }
    }

    pub fn breadcrumbs(&self) -> &[String] {
        match self {
            SuggestionItem::Tag(tag) => &tag.breadcrumbs,
            SuggestionItem::Rule(rule) => &rule.breadcrumbs,
        }
    }

    /// The token or statement shown next to the label.
    pub fn detail(&self) -> &str {
        match self {
            SuggestionItem::Tag(tag) => &tag.value,
            SuggestionItem::Rule(rule) => &rule.before,
        }
    }

    /// A rule opens a block with the cursor on an empty line between the
    /// two statements.
    pub fn insertion(&self) -> Insertion {
        match self {
            SuggestionItem::Tag(tag) => Insertion {
                text: tag.value.clone(),
                cursor_offset: tag.value.len(),
            },
            SuggestionItem::Rule(rule) => Insertion {
                text: format!("{}\n\n{}", rule.before, rule.after),
                cursor_offset: rule.before.len() + 1,
            },
        }
    }

    fn haystacks(&self) -> Vec<String> {
        let mut haystacks = vec![self.label().to_string()];
        let crumbs = self.breadcrumbs();
        if !crumbs.is_empty() {
            haystacks.push(format!("{} / {}", crumbs.join(" / "), self.label()));
        }
        match self {
            SuggestionItem::Tag(tag) => {
                if let Some(path) = tag.path() {
                    haystacks.push(path.to_string());
                }
            }
            SuggestionItem::Rule(rule) => haystacks.push(rule.before.clone()),
        }
        haystacks
    }
}

/// Fuzzy filter over the catalogue's tags and loop rules.
pub struct TagMatcher {
    matcher: Matcher,
    items: Vec<SuggestionItem>,
    limit: usize,
}

impl TagMatcher {
    pub fn new(items: Vec<SuggestionItem>, limit: usize) -> Self {
        Self {
            matcher: Matcher::new(nucleo_matcher::Config::DEFAULT),
            items,
            limit,
        }
    }

    pub fn from_catalogue(merge_tags: &MergeTags, limit: usize) -> Self {
        let mut items: Vec<SuggestionItem> = flatten(merge_tags, &[])
            .into_iter()
            .map(SuggestionItem::Tag)
            .collect();
        items.extend(flatten_rules(merge_tags).into_iter().map(SuggestionItem::Rule));
        Self::new(items, limit)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// An empty query lists items in catalogue order; otherwise items are
    /// ranked by their best score across label, breadcrumb path and token.
    pub fn search(&mut self, query: &str) -> Vec<SuggestionItem> {
        let query = query.trim();
        if query.is_empty() {
            return self.items.iter().take(self.limit).cloned().collect();
        }

        let pattern = Pattern::parse(query, CaseMatching::Smart, Normalization::Smart);
        let mut scored: Vec<(usize, u32)> = self
            .items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| {
                let best = item
                    .haystacks()
                    .iter()
                    .filter_map(|haystack| {
                        let haystack = Utf32String::from(haystack.as_str());
                        pattern.score(haystack.slice(..), &mut self.matcher)
                    })
                    .max()?;
                Some((idx, best))
            })
            .collect();

        // stable sort keeps catalogue order among equal scores
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.truncate(self.limit);
        scored
            .into_iter()
            .map(|(idx, _)| self.items[idx].clone())
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestionProps {
    pub query: String,
    pub range: Range<usize>,
    pub items: Vec<SuggestionItem>,
    /// Screen cell of the trigger. `None` when the cursor is off screen.
    pub client_rect: Option<Rect>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    Ignored,
    Handled,
    Select(SuggestionItem),
}

/// Receives the suggestion lifecycle. Exactly one `on_exit` follows each
/// `on_start`.
pub trait SuggestionRenderer {
    fn on_start(&mut self, props: &SuggestionProps);
    fn on_update(&mut self, props: &SuggestionProps);
    fn on_key_down(&mut self, key: KeyEvent) -> KeyOutcome;
    fn on_exit(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuggestionEvent {
    None,
    Started,
    Updated,
    Exited,
    Restarted,
}

/// Watches the text around the cursor and tells the renderer when a
/// suggestion starts, changes or ends.
pub struct Suggestion<R> {
    trigger: String,
    matcher: TagMatcher,
    renderer: R,
    active: Option<SuggestionMatch>,
}

impl<R: SuggestionRenderer> Suggestion<R> {
    pub fn new(trigger: impl Into<String>, matcher: TagMatcher, renderer: R) -> Self {
        Self {
            trigger: trigger.into(),
            matcher,
            renderer,
            active: None,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn active(&self) -> Option<&SuggestionMatch> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Call after every change to the text or cursor. `anchor` maps the
    /// trigger's range to its screen cell.
    pub fn update<F>(&mut self, text: &str, cursor: usize, anchor: F) -> SuggestionEvent
    where
        F: Fn(&Range<usize>) -> Option<Rect>,
    {
        let next = find_match(text, cursor, &self.trigger);
        let prev = self.active.take();
        let client_rect = next.as_ref().and_then(|found| anchor(&found.range));

        match (prev, next) {
            (None, None) => SuggestionEvent::None,
            (None, Some(next)) => {
                let props = self.props(&next, client_rect);
                tracing::debug!(query = %next.query, "suggestion started");
                self.renderer.on_start(&props);
                self.active = Some(next);
                SuggestionEvent::Started
            }
            (Some(_), None) => {
                tracing::debug!("suggestion exited");
                self.renderer.on_exit();
                SuggestionEvent::Exited
            }
            (Some(prev), Some(next)) => {
                if prev.range.start != next.range.start {
                    tracing::debug!(query = %next.query, "suggestion moved");
                    self.renderer.on_exit();
                    let props = self.props(&next, client_rect);
                    self.renderer.on_start(&props);
                    self.active = Some(next);
                    return SuggestionEvent::Restarted;
                }
                if prev == next {
                    self.active = Some(next);
                    return SuggestionEvent::None;
                }
                let props = self.props(&next, client_rect);
                self.renderer.on_update(&props);
                self.active = Some(next);
                SuggestionEvent::Updated
            }
        }
    }

    pub fn key_down(&mut self, key: KeyEvent) -> KeyOutcome {
        if self.active.is_none() {
            return KeyOutcome::Ignored;
        }
        self.renderer.on_key_down(key)
    }

    /// Ends any active suggestion, e.g. when the editor loses focus.
    pub fn close(&mut self) {
        if self.active.take().is_some() {
            self.renderer.on_exit();
        }
    }

    fn props(&mut self, found: &SuggestionMatch, client_rect: Option<Rect>) -> SuggestionProps {
        SuggestionProps {
            query: found.query.clone(),
            range: found.range.clone(),
            items: self.matcher.search(&found.query),
            client_rect,
        }
    }
}
