use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::{App, EditorState, StatusMessage, View, ensure_visible};
use crate::models::TreeItem;
use crate::popup::{Popup, TagList};

const STATUS_DURATION_MS: u128 = 1500;
const ICON_FOLDER: &str = "";
const ICON_TEMPLATE: &str = "󰈙";
const SELECTED_MARKER: &str = " ";
const UNSELECTED_MARKER: &str = "  ";
const TREE_BRANCH: &str = "├─ ";
const TREE_LAST: &str = "└─ ";
const TREE_PIPE: &str = "│  ";
const TREE_EMPTY: &str = "   ";
const POPUP_MAX_WIDTH: u16 = 64;

pub fn render_app(frame: &mut Frame, app: &mut App) {
    match app.view {
        View::List => render_list(frame, app),
        View::Editor => render_editor(frame, app),
        View::Error => render_error(frame, app),
    }
}

fn render_error(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    let message = app
        .error_message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());
    let block = Block::bordered().title("Error");
    let paragraph = Paragraph::new(message)
        .block(block)
        .style(Style::new().fg(Color::Red))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_list(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(1)])
        .split(area);

    let list_area = layout[0];
    let help_area = layout[1];

    let title = format!("Templates ({})", app.templates.len());
    let block = Block::bordered().title(title);
    let inner = inner_rect(list_area);
    app.tree_area = inner;

    let view_height = inner.height as usize;
    app.list_scroll = ensure_visible(
        app.list_scroll,
        app.list_state.selected().unwrap_or(0),
        app.tree_items.len(),
        view_height,
    );

    let start = app.list_scroll;
    let end = (start + view_height).min(app.tree_items.len());
    let tree_lines = build_tree_lines(&app.tree_items);
    let visible = &tree_lines[start..end];
    let selected = app.list_state.selected().unwrap_or(0);

    let items: Vec<ListItem> = visible
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let marker = if start + idx == selected {
                SELECTED_MARKER
            } else {
                UNSELECTED_MARKER
            };
            ListItem::new(format!("{marker}{line}"))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::new().bg(Color::Blue).fg(Color::White))
        .highlight_symbol("");

    let mut state = ListState::default();
    if let Some(selected) = app.list_state.selected() {
        if selected >= start && selected < end {
            state.select(Some(selected - start));
        }
    }
    frame.render_stateful_widget(list, list_area, &mut state);

    let help = with_status(
        "↑↓/j k select  Enter/double-click open  n new  q quit",
        app.list_status.as_ref(),
    );
    let help = Paragraph::new(help).style(Style::new().fg(Color::DarkGray));
    frame.render_widget(help, help_area);
}

fn render_editor(frame: &mut Frame, app: &mut App) {
    let rendered = app.rendered_preview().unwrap_or_default();
    let title = app
        .editor
        .as_ref()
        .and_then(|editor| app.templates.get(editor.template_index))
        .map(|template| template.name.clone())
        .unwrap_or_default();

    let editor = match app.editor.as_mut() {
        Some(editor) => editor,
        None => return,
    };

    let area = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(1)])
        .split(area);

    let content_area = layout[0];
    let status_area = layout[1];

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(content_area);

    let text_area = horizontal[0];
    let preview_area = horizontal[1];

    let marker = if editor.dirty { " *" } else { "" };
    render_text(frame, editor, &format!("{title}{marker}"), text_area);
    render_preview(frame, &rendered, preview_area);

    if let Some((list, popup)) = editor.suggestion.renderer().visible() {
        render_popup(frame, list, popup, content_area);
    }

    let status = with_status(
        "Esc back  Ctrl+S save  Ctrl+C copy preview  Ctrl+Y copy text  ↑↓ Enter pick tag",
        editor.status.as_ref(),
    );
    let status = Paragraph::new(status).style(Style::new().fg(Color::DarkGray));
    frame.render_widget(status, status_area);
}

fn render_text(frame: &mut Frame, editor: &mut EditorState, title: &str, area: Rect) {
    let inner = inner_rect(area);
    editor.text_area = inner;

    editor.scroll_to_cursor();
    let (row, column) = editor.buffer.cursor_position();

    let paragraph = Paragraph::new(editor.buffer.text())
        .block(Block::bordered().title(title))
        .scroll((editor.scroll as u16, 0));
    frame.render_widget(paragraph, area);

    let visible_row = row.saturating_sub(editor.scroll);
    if visible_row < inner.height as usize && column < inner.width as usize {
        frame.set_cursor_position((inner.x + column as u16, inner.y + visible_row as u16));
    }
}

fn render_preview(frame: &mut Frame, rendered: &str, area: Rect) {
    let paragraph = Paragraph::new(rendered)
        .block(Block::bordered().title("Preview"))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_popup(frame: &mut Frame, list: &TagList, popup: &Popup, bounds: Rect) {
    let rows: Vec<Line> = if list.items().is_empty() {
        vec![Line::from(Span::styled(
            format!("No tags match \"{}\"", list.query()),
            Style::new().fg(Color::DarkGray),
        ))]
    } else {
        list.items()
            .iter()
            .map(|item| {
                let crumbs = item.breadcrumbs().join(" / ");
                Line::from(vec![
                    Span::raw(item.label().to_string()),
                    Span::raw("  "),
                    Span::styled(crumbs, Style::new().fg(Color::DarkGray)),
                ])
            })
            .collect()
    };

    let content_width = rows.iter().map(Line::width).max().unwrap_or(0) as u16;
    let title = list
        .items()
        .get(list.selected())
        .map(|item| item.detail().to_string())
        .unwrap_or_default();
    let width = content_width
        .max(title.chars().count() as u16)
        .saturating_add(4)
        .min(POPUP_MAX_WIDTH);
    let height = rows.len() as u16 + 2;

    let area = match popup.area(bounds, width, height) {
        Some(area) => area,
        None => return,
    };

    let items: Vec<ListItem> = rows.into_iter().map(ListItem::new).collect();
    let widget = List::new(items)
        .block(Block::bordered().title(title))
        .highlight_style(Style::new().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD));

    let mut state = ListState::default();
    if !list.items().is_empty() {
        state.select(Some(list.selected()));
    }
    frame.render_widget(Clear, area);
    frame.render_stateful_widget(widget, area, &mut state);
}

fn with_status(help: &str, status: Option<&StatusMessage>) -> String {
    let mut line = help.to_string();
    if let Some(message) = status.filter(|msg| msg.since.elapsed().as_millis() <= STATUS_DURATION_MS) {
        line.push_str("  |  ");
        line.push_str(&message.text);
    }
    line
}

fn inner_rect(area: Rect) -> Rect {
    let mut inner = area;
    if inner.width >= 2 {
        inner.x += 1;
        inner.width -= 2;
    }
    if inner.height >= 2 {
        inner.y += 1;
        inner.height -= 2;
    }
    inner
}

fn build_tree_lines(items: &[TreeItem]) -> Vec<String> {
    let mut lines = Vec::with_capacity(items.len());
    let mut branches: Vec<bool> = Vec::new();
    for (index, item) in items.iter().enumerate() {
        branches.truncate(item.depth);
        let is_last = is_last_sibling(items, index);
        let icon = if has_children(items, index) || item.template_index.is_none() {
            ICON_FOLDER
        } else {
            ICON_TEMPLATE
        };

        let mut line = String::new();
        for has_next in &branches {
            line.push_str(if *has_next { TREE_PIPE } else { TREE_EMPTY });
        }
        line.push_str(if is_last { TREE_LAST } else { TREE_BRANCH });
        line.push_str(icon);
        line.push(' ');
        line.push_str(&item.label);
        lines.push(line);

        branches.push(!is_last);
    }
    lines
}

fn is_last_sibling(items: &[TreeItem], index: usize) -> bool {
    let depth = items[index].depth;
    for item in &items[index + 1..] {
        if item.depth <= depth {
            return item.depth < depth;
        }
    }
    true
}

fn has_children(items: &[TreeItem], index: usize) -> bool {
    match items.get(index + 1) {
        Some(next) => next.depth > items[index].depth,
        None => false,
    }
}
