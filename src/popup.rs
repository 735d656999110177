//! The suggestion popup: a tooltip anchored to the trigger and the tag list
//! shown inside it.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Rect;

use crate::suggestion::{KeyOutcome, SuggestionItem, SuggestionProps, SuggestionRenderer};

/// A manually triggered tooltip. Once destroyed it never shows again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Popup {
    reference: Rect,
    visible: bool,
    destroyed: bool,
}

impl Popup {
    pub fn new(reference: Rect) -> Self {
        Self {
            reference,
            visible: false,
            destroyed: false,
        }
    }

    pub fn show(&mut self) {
        if !self.destroyed {
            self.visible = true;
        }
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn set_reference(&mut self, reference: Rect) {
        self.reference = reference;
    }

    pub fn destroy(&mut self) {
        self.visible = false;
        self.destroyed = true;
    }

    pub fn is_visible(&self) -> bool {
        self.visible && !self.destroyed
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn reference(&self) -> Rect {
        self.reference
    }

    /// Where a `width` x `height` popup goes inside `bounds`: below the
    /// reference, left edges aligned, flipped above when it does not fit
    /// below. Shrinks to whatever room is left.
    pub fn area(&self, bounds: Rect, width: u16, height: u16) -> Option<Rect> {
        if bounds.width == 0 || bounds.height == 0 || width == 0 || height == 0 {
            return None;
        }
        let width = width.min(bounds.width);
        let x = self
            .reference
            .x
            .clamp(bounds.x, bounds.right().saturating_sub(width));

        let below = self.reference.bottom().max(bounds.y);
        let room_below = bounds.bottom().saturating_sub(below);
        let room_above = self.reference.y.saturating_sub(bounds.y);

        let (y, height) = if room_below >= height {
            (below, height)
        } else if room_above >= height {
            (self.reference.y - height, height)
        } else if room_below >= room_above {
            (below, room_below)
        } else {
            (bounds.y, room_above)
        };
        if height == 0 {
            return None;
        }
        Some(Rect {
            x,
            y,
            width,
            height,
        })
    }
}

/// The list of suggestions with a highlighted row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagList {
    items: Vec<SuggestionItem>,
    query: String,
    selected: usize,
}

impl TagList {
    pub fn new(props: &SuggestionProps) -> Self {
        Self {
            items: props.items.clone(),
            query: props.query.clone(),
            selected: 0,
        }
    }

    pub fn update_props(&mut self, props: &SuggestionProps) {
        self.items = props.items.clone();
        self.query = props.query.clone();
        self.selected = 0;
    }

    pub fn items(&self) -> &[SuggestionItem] {
        &self.items
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn on_key_down(&mut self, key: KeyEvent) -> KeyOutcome {
        match key.code {
            KeyCode::Up => {
                self.up();
                KeyOutcome::Handled
            }
            KeyCode::Down => {
                self.down();
                KeyOutcome::Handled
            }
            KeyCode::Enter | KeyCode::Tab => match self.items.get(self.selected) {
                Some(item) => KeyOutcome::Select(item.clone()),
                None => KeyOutcome::Handled,
            },
            _ => KeyOutcome::Ignored,
        }
    }

    fn up(&mut self) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        self.selected = (self.selected + len - 1) % len;
    }

    fn down(&mut self) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        self.selected = (self.selected + 1) % len;
    }
}

/// Couples a [`TagList`] with a [`Popup`] and maps the suggestion lifecycle
/// onto them.
#[derive(Debug, Default)]
pub struct TagSuggestionRenderer {
    component: Option<TagList>,
    popup: Option<Popup>,
}

impl TagSuggestionRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> Option<&TagList> {
        self.component.as_ref()
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    /// The list to draw, if its popup is currently showing.
    pub fn visible(&self) -> Option<(&TagList, &Popup)> {
        let popup = self.popup.as_ref().filter(|popup| popup.is_visible())?;
        Some((self.component.as_ref()?, popup))
    }
}

impl SuggestionRenderer for TagSuggestionRenderer {
    fn on_start(&mut self, props: &SuggestionProps) {
        self.component = Some(TagList::new(props));

        let Some(rect) = props.client_rect else {
            tracing::debug!("no anchor for suggestion popup");
            return;
        };

        let mut popup = Popup::new(rect);
        popup.show();
        self.popup = Some(popup);
    }

    fn on_update(&mut self, props: &SuggestionProps) {
        if let Some(component) = self.component.as_mut() {
            component.update_props(props);
        }

        let Some(rect) = props.client_rect else {
            return;
        };

        if let Some(popup) = self.popup.as_mut() {
            popup.set_reference(rect);
        }
    }

    fn on_key_down(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.code == KeyCode::Esc {
            if let Some(popup) = self.popup.as_mut() {
                popup.hide();
            }
            return KeyOutcome::Handled;
        }

        match self.component.as_mut() {
            Some(component) => component.on_key_down(key),
            None => KeyOutcome::Ignored,
        }
    }

    fn on_exit(&mut self) {
        if let Some(popup) = self.popup.as_mut() {
            popup.destroy();
        }
        self.popup = None;
        self.component = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FlatTag;
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;

    fn item(name: &str) -> SuggestionItem {
        SuggestionItem::Tag(FlatTag {
            key: name.to_lowercase(),
            name: name.to_string(),
            value: format!("{{{{ job.{} }}}}", name.to_lowercase()),
            sample: String::new(),
            breadcrumbs: vec!["Job".to_string()],
        })
    }

    fn props(names: &[&str], rect: Option<Rect>) -> SuggestionProps {
        SuggestionProps {
            query: String::new(),
            range: 0..2,
            items: names.iter().map(|name| item(name)).collect(),
            client_rect: rect,
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    const ANCHOR: Rect = Rect {
        x: 4,
        y: 2,
        width: 1,
        height: 1,
    };

    #[test]
    fn list_wraps_and_selects() {
        let mut list = TagList::new(&props(&["A", "B", "C"], None));
        assert_eq!(list.on_key_down(key(KeyCode::Up)), KeyOutcome::Handled);
        assert_eq!(list.selected(), 2);
        list.on_key_down(key(KeyCode::Down));
        list.on_key_down(key(KeyCode::Down));
        assert_eq!(list.selected(), 1);
        assert_eq!(list.on_key_down(key(KeyCode::Enter)), KeyOutcome::Select(item("B")));
        assert_eq!(list.on_key_down(key(KeyCode::Char('x'))), KeyOutcome::Ignored);
    }

    #[test]
    fn update_resets_selection() {
        let mut list = TagList::new(&props(&["A", "B"], None));
        list.on_key_down(key(KeyCode::Down));
        let narrowed = SuggestionProps {
            query: "c".to_string(),
            ..props(&["C"], None)
        };
        list.update_props(&narrowed);
        assert_eq!(list.selected(), 0);
        assert_eq!(list.items().len(), 1);
        assert_eq!(list.query(), "c");
    }

    #[test]
    fn empty_list_consumes_enter() {
        let mut list = TagList::new(&props(&[], None));
        list.on_key_down(key(KeyCode::Down));
        assert_eq!(list.on_key_down(key(KeyCode::Enter)), KeyOutcome::Handled);
    }

    #[test]
    fn start_without_rect_creates_no_popup() {
        let mut renderer = TagSuggestionRenderer::new();
        renderer.on_start(&props(&["A"], None));
        assert!(renderer.popup().is_none());
        assert!(renderer.list().is_some());

        renderer.on_update(&props(&["A", "B"], Some(ANCHOR)));
        assert!(renderer.popup().is_none());
        assert_eq!(renderer.on_key_down(key(KeyCode::Esc)), KeyOutcome::Handled);
        renderer.on_exit();
        assert!(renderer.list().is_none());
    }

    #[test]
    fn escape_hides_and_exit_destroys() {
        let mut renderer = TagSuggestionRenderer::new();
        renderer.on_start(&props(&["A"], Some(ANCHOR)));
        assert!(renderer.visible().is_some());

        let moved = Rect { x: 9, ..ANCHOR };
        renderer.on_update(&props(&["A"], Some(moved)));
        assert_eq!(renderer.popup().map(Popup::reference), Some(moved));

        assert_eq!(renderer.on_key_down(key(KeyCode::Esc)), KeyOutcome::Handled);
        assert!(renderer.visible().is_none());
        assert!(renderer.list().is_some());

        renderer.on_exit();
        assert!(renderer.popup().is_none());
        assert!(renderer.list().is_none());
    }

    #[test]
    fn destroyed_popup_stays_hidden() {
        let mut popup = Popup::new(ANCHOR);
        popup.show();
        popup.destroy();
        popup.show();
        assert!(!popup.is_visible());
        assert!(popup.is_destroyed());
    }

    #[test]
    fn area_opens_below_then_flips() {
        let bounds = Rect::new(0, 0, 40, 10);
        let popup = Popup::new(ANCHOR);
        assert_eq!(popup.area(bounds, 20, 5), Some(Rect::new(4, 3, 20, 5)));

        let low = Popup::new(Rect::new(30, 8, 1, 1));
        assert_eq!(low.area(bounds, 20, 5), Some(Rect::new(20, 3, 20, 5)));
    }

    #[test]
    fn area_shrinks_to_room() {
        let bounds = Rect::new(0, 0, 40, 6);
        let popup = Popup::new(Rect::new(0, 2, 1, 1));
        assert_eq!(popup.area(bounds, 10, 8), Some(Rect::new(0, 3, 10, 3)));
    }
}
