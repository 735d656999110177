use std::collections::HashMap;
use std::ops::Range;
use std::path::PathBuf;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;

use crate::config::Config;
use crate::editor::TextBuffer;
use crate::models::{MergeTags, Template, TemplateDocument, TreeItem};
use crate::popup::TagSuggestionRenderer;
use crate::preview::{parse_template, render_preview};
use crate::suggestion::{KeyOutcome, Suggestion, TagMatcher};
use crate::system::{load_templates, save_templates, set_clipboard};
use crate::tags::sample_values_by_token;
use crate::templates::build_tree_items;

const DOUBLE_CLICK_MS: u128 = 400;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    List,
    Editor,
    Error,
}

#[derive(Clone, Debug)]
pub struct StatusMessage {
    pub text: String,
    pub since: Instant,
}

pub struct EditorState {
    pub template_index: usize,
    pub buffer: TextBuffer,
    pub suggestion: Suggestion<TagSuggestionRenderer>,
    /// Where the text was last drawn, used to anchor the popup.
    pub text_area: Rect,
    pub scroll: usize,
    pub dirty: bool,
    pub status: Option<StatusMessage>,
}

pub struct App {
    pub templates: Vec<Template>,
    pub tree_items: Vec<TreeItem>,
    pub list_state: ListState,
    pub list_scroll: usize,
    pub view: View,
    pub editor: Option<EditorState>,
    pub error_message: Option<String>,
    pub last_click: Option<(usize, Instant)>,
    pub tree_area: Rect,
    pub should_quit: bool,
    pub list_status: Option<StatusMessage>,
    pub merge_tags: MergeTags,
    pub samples: HashMap<String, String>,
    preamble: String,
    templates_path: PathBuf,
    trigger: String,
    max_suggestions: usize,
}

impl App {
    pub fn new(config: &Config, merge_tags: MergeTags, templates_path: PathBuf) -> Self {
        let samples = sample_values_by_token(&merge_tags);
        let mut app = Self {
            templates: Vec::new(),
            tree_items: Vec::new(),
            list_state: ListState::default(),
            list_scroll: 0,
            view: View::List,
            editor: None,
            error_message: None,
            last_click: None,
            tree_area: Rect::default(),
            should_quit: false,
            list_status: None,
            merge_tags,
            samples,
            preamble: String::new(),
            templates_path,
            trigger: config.trigger.clone(),
            max_suggestions: config.max_suggestions,
        };
        match load_templates(&app.templates_path) {
            Ok(document) => app.set_document(document),
            Err(err) => {
                tracing::error!(error = %err, "failed to load templates");
                app.view = View::Error;
                app.error_message = Some(err.to_string());
            }
        }
        app
    }

    fn set_document(&mut self, document: TemplateDocument) {
        self.tree_items = build_tree_items(&document.templates);
        self.templates = document.templates;
        self.preamble = document.preamble;
        let mut list_state = ListState::default();
        if !self.tree_items.is_empty() {
            list_state.select(Some(0));
        }
        self.list_state = list_state;
        self.list_scroll = 0;
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        match self.view {
            View::List => self.on_key_list(key),
            View::Editor => self.on_key_editor(key),
            View::Error => self.on_key_error(key),
        }
    }

    pub fn on_mouse(&mut self, mouse: MouseEvent) {
        match self.view {
            View::List => self.on_mouse_list(mouse),
            View::Editor => {}
            View::Error => {}
        }
    }

    fn on_key_error(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    fn on_key_list(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.move_list(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_list(-1),
            KeyCode::Enter => self.open_selected_template(),
            KeyCode::Char('n') => self.new_template(),
            _ => {}
        }
    }

    fn on_mouse_list(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        if let Some(index) = self.index_from_mouse(mouse) {
            self.list_state.select(Some(index));
            let now = Instant::now();
            if let Some((last_index, last_time)) = self.last_click {
                if last_index == index && last_time.elapsed().as_millis() <= DOUBLE_CLICK_MS {
                    self.open_selected_template();
                }
            }
            self.last_click = Some((index, now));
        }
    }

    fn on_key_editor(&mut self, key: KeyEvent) {
        let editor = match self.editor.as_mut() {
            Some(editor) => editor,
            None => return,
        };

        if editor.suggestion.renderer().visible().is_some() {
            match editor.suggestion.key_down(key) {
                KeyOutcome::Select(item) => {
                    let insertion = item.insertion();
                    tracing::debug!(item = %item.label(), "inserting suggestion");
                    editor.accept(&insertion.text, insertion.cursor_offset);
                    return;
                }
                KeyOutcome::Handled => return,
                KeyOutcome::Ignored => {}
            }
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                self.close_editor();
                return;
            }
            KeyCode::Char('s') if ctrl => {
                self.save_editor();
                return;
            }
            KeyCode::Char('c') if ctrl => {
                self.copy_rendered();
                return;
            }
            KeyCode::Char('y') if ctrl => {
                self.copy_raw();
                return;
            }
            KeyCode::Char(ch) if !ctrl => editor.edit(|buffer| buffer.insert_char(ch)),
            KeyCode::Enter => editor.edit(TextBuffer::newline),
            KeyCode::Tab => editor.edit(|buffer| buffer.insert_str("    ")),
            KeyCode::Backspace => editor.edit(TextBuffer::backspace),
            KeyCode::Delete => editor.edit(TextBuffer::delete),
            KeyCode::Left => editor.navigate(TextBuffer::move_left),
            KeyCode::Right => editor.navigate(TextBuffer::move_right),
            KeyCode::Up => editor.navigate(TextBuffer::move_up),
            KeyCode::Down => editor.navigate(TextBuffer::move_down),
            KeyCode::Home => editor.navigate(TextBuffer::move_home),
            KeyCode::End => editor.navigate(TextBuffer::move_end),
            _ => {}
        }
    }

    fn move_list(&mut self, delta: isize) {
        let len = self.tree_items.len();
        if len == 0 {
            return;
        }
        let current = self.list_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, (len - 1) as isize) as usize;
        self.list_state.select(Some(next));
    }

    fn open_selected_template(&mut self) {
        let index = match self.list_state.selected() {
            Some(index) => index,
            None => return,
        };
        let template_index = match self.tree_items.get(index).and_then(|item| item.template_index) {
            Some(template_index) => template_index,
            None => return,
        };
        self.open_template(template_index);
    }

    fn open_template(&mut self, template_index: usize) {
        let template = match self.templates.get(template_index) {
            Some(template) => template,
            None => return,
        };
        tracing::debug!(name = %template.name, "opening template");
        let matcher = TagMatcher::from_catalogue(&self.merge_tags, self.max_suggestions);
        let suggestion = Suggestion::new(self.trigger.clone(), matcher, TagSuggestionRenderer::new());
        let mut buffer = TextBuffer::new(template.body.clone());
        buffer.set_cursor(0);
        self.editor = Some(EditorState {
            template_index,
            buffer,
            suggestion,
            text_area: Rect::default(),
            scroll: 0,
            dirty: false,
            status: None,
        });
        self.view = View::Editor;
    }

    fn new_template(&mut self) {
        let mut counter = 1;
        let name = loop {
            let candidate = format!("New/Template {counter}");
            if !self.templates.iter().any(|template| template.name == candidate) {
                break candidate;
            }
            counter += 1;
        };
        self.templates.push(Template {
            name,
            body: String::new(),
        });
        self.tree_items = build_tree_items(&self.templates);
        let index = self.templates.len() - 1;
        if let Some(row) = self
            .tree_items
            .iter()
            .position(|item| item.template_index == Some(index))
        {
            self.list_state.select(Some(row));
        }
        self.open_template(index);
        if let Some(editor) = self.editor.as_mut() {
            editor.dirty = true;
        }
    }

    fn close_editor(&mut self) {
        let dirty = self.editor.as_ref().is_some_and(|editor| editor.dirty);
        if dirty {
            self.save_editor();
        }
        if let Some(editor) = self.editor.as_mut() {
            editor.suggestion.close();
        }
        self.editor = None;
        self.view = View::List;
    }

    fn save_editor(&mut self) {
        let editor = match self.editor.as_mut() {
            Some(editor) => editor,
            None => return,
        };
        if let Some(template) = self.templates.get_mut(editor.template_index) {
            template.body = editor.buffer.text().to_string();
        }
        match save_templates(&self.templates_path, &self.preamble, &self.templates) {
            Ok(()) => {
                editor.dirty = false;
                editor.set_status("Saved");
                self.set_list_status("Saved");
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to save templates");
                editor.set_status(&format!("Save failed: {err}"));
                self.set_list_status(&format!("Save failed: {err}"));
            }
        }
    }

    pub fn rendered_preview(&self) -> Option<String> {
        let editor = self.editor.as_ref()?;
        let segments = parse_template(editor.buffer.text());
        Some(render_preview(&segments, &self.samples))
    }

    fn copy_rendered(&mut self) {
        let rendered = match self.rendered_preview() {
            Some(rendered) => rendered,
            None => return,
        };
        self.copy_text(&rendered);
    }

    fn copy_raw(&mut self) {
        let raw = match self.editor.as_ref() {
            Some(editor) => editor.buffer.text().to_string(),
            None => return,
        };
        self.copy_text(&raw);
    }

    fn copy_text(&mut self, text: &str) {
        let result = set_clipboard(text);
        let editor = match self.editor.as_mut() {
            Some(editor) => editor,
            None => return,
        };
        match result {
            Ok(()) => editor.set_status("Copied"),
            Err(err) => {
                tracing::warn!(error = %err, "clipboard copy failed");
                editor.set_status(&err.to_string());
            }
        }
    }

    fn set_list_status(&mut self, text: &str) {
        self.list_status = Some(StatusMessage {
            text: text.to_string(),
            since: Instant::now(),
        });
    }

    fn index_from_mouse(&self, mouse: MouseEvent) -> Option<usize> {
        let area = self.tree_area;
        if area.width == 0 || area.height == 0 {
            return None;
        }
        if mouse.column < area.x
            || mouse.column >= area.x + area.width
            || mouse.row < area.y
            || mouse.row >= area.y + area.height
        {
            return None;
        }
        let row_offset = (mouse.row - area.y) as usize;
        let index = self.list_scroll + row_offset;
        if index >= self.tree_items.len() {
            return None;
        }
        Some(index)
    }
}

impl EditorState {
    fn edit(&mut self, change: impl FnOnce(&mut TextBuffer)) {
        change(&mut self.buffer);
        self.dirty = true;
        self.refresh_suggestion();
    }

    fn navigate(&mut self, movement: impl FnOnce(&mut TextBuffer)) {
        movement(&mut self.buffer);
        self.refresh_suggestion();
    }

    /// Replaces the open trigger with the chosen tag or rule.
    fn accept(&mut self, text: &str, cursor_offset: usize) {
        let range = match self.suggestion.active() {
            Some(found) => found.range.clone(),
            None => return,
        };
        if self.buffer.replace_range(range, text, cursor_offset) {
            self.dirty = true;
        }
        self.refresh_suggestion();
    }

    /// Scrolls so the cursor row is inside `text_area`.
    pub fn scroll_to_cursor(&mut self) {
        let (row, _) = self.buffer.cursor_position();
        let total_rows = self.buffer.text().split('\n').count();
        self.scroll = ensure_visible(self.scroll, row, total_rows, self.text_area.height as usize);
    }

    pub fn refresh_suggestion(&mut self) {
        self.scroll_to_cursor();
        let buffer = &self.buffer;
        let area = self.text_area;
        let scroll = self.scroll;
        self.suggestion
            .update(buffer.text(), buffer.cursor(), |range| anchor_rect(buffer, area, scroll, range));
    }

    fn set_status(&mut self, text: &str) {
        self.status = Some(StatusMessage {
            text: text.to_string(),
            since: Instant::now(),
        });
    }
}

pub(crate) fn ensure_visible(current_scroll: usize, selected: usize, total: usize, view_height: usize) -> usize {
    if total == 0 || view_height == 0 {
        return 0;
    }
    let mut scroll = current_scroll.min(total.saturating_sub(1));
    if selected < scroll {
        scroll = selected;
    } else if selected >= scroll + view_height {
        scroll = selected + 1 - view_height;
    }
    scroll
}

/// Screen cell of the trigger's first character, if it is on screen.
fn anchor_rect(buffer: &TextBuffer, area: Rect, scroll: usize, range: &Range<usize>) -> Option<Rect> {
    if area.width == 0 || area.height == 0 {
        return None;
    }
    let (row, column) = buffer.position_of(range.start);
    let row = row.checked_sub(scroll)?;
    if row >= area.height as usize || column >= area.width as usize {
        return None;
    }
    Some(Rect {
        x: area.x + column as u16,
        y: area.y + row as u16,
        width: 1,
        height: 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_follows_selection() {
        assert_eq!(ensure_visible(0, 7, 20, 5), 3);
        assert_eq!(ensure_visible(6, 2, 20, 5), 2);
        assert_eq!(ensure_visible(3, 4, 20, 5), 3);
        assert_eq!(ensure_visible(3, 4, 20, 0), 0);
    }

    #[test]
    fn anchor_follows_scroll() {
        let buffer = TextBuffer::new("a\nb\n  {{");
        let area = Rect::new(10, 5, 20, 2);
        let range = 6..8;
        assert_eq!(anchor_rect(&buffer, area, 1, &range), Some(Rect::new(12, 6, 1, 1)));
        assert_eq!(anchor_rect(&buffer, area, 0, &range), None);
        assert_eq!(anchor_rect(&buffer, Rect::default(), 0, &range), None);
    }
}
