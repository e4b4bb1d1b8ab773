//! Search box, autocomplete dropdown and result list

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Clear, List, ListItem, Paragraph},
    Frame,
};

use super::{marker, panel, render_loading, render_message, Theme};
use crate::app::{App, InputMode};
use crate::models::SearchResult;
use crate::stream::MediaBackend;

pub fn render_search_box<B: MediaBackend>(frame: &mut Frame, area: Rect, app: &App<B>, theme: &Theme) {
    let editing = app.input_mode == InputMode::Editing;

    let text = if editing {
        let (before, after) = app.search.split_at_cursor();
        format!("⌕ {}│{}", before, after)
    } else if app.search.query.is_empty() {
        "⌕ Cari drama... (press /)".to_string()
    } else {
        format!("⌕ {}", app.search.query)
    };

    let style = if editing {
        theme.input().fg(theme.primary)
    } else {
        theme.input()
    };

    let title = if app.autocomplete.is_pending() {
        "SEARCH ⟳"
    } else {
        "SEARCH"
    };

    let search_box = Paragraph::new(text)
        .style(style)
        .block(panel(theme, Some(title.to_string()), editing));
    frame.render_widget(search_box, area);
}

/// Dropdown under the search box while suggestions are available
pub fn render_suggestions<B: MediaBackend>(
    frame: &mut Frame,
    header: Rect,
    content: Rect,
    app: &App<B>,
    theme: &Theme,
) {
    let suggestions = app.autocomplete.suggestions();
    if suggestions.is_empty() {
        return;
    }

    let height = (suggestions.len() as u16 + 2).min(content.height);
    let x = header.x + header.width.min(28);
    let area = Rect {
        x,
        y: content.y,
        width: header.width.saturating_sub(x - header.x).min(60),
        height,
    };

    let items: Vec<ListItem> = suggestions
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let selected = app.search.suggestion == Some(i);
            result_line(s, selected, theme)
        })
        .collect();

    frame.render_widget(Clear, area);
    frame.render_widget(
        List::new(items).block(panel(theme, Some("SUGGESTIONS".into()), true).style(theme.base())),
        area,
    );
}

pub fn render_results<B: MediaBackend>(frame: &mut Frame, area: Rect, app: &App<B>, theme: &Theme) {
    let title = if app.search.submitted.is_empty() {
        "RESULTS".to_string()
    } else {
        format!("RESULTS FOR \"{}\" ({})", app.search.submitted, app.search.results.len())
    };
    let block = panel(theme, Some(title), app.input_mode == InputMode::Normal);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if render_loading(frame, inner, &app.search.loading, theme) {
        return;
    }

    if app.search.results.is_empty() {
        let text = if app.search.submitted.is_empty() {
            "Type / to search for dramas"
        } else {
            "No results found"
        };
        render_message(frame, inner, text, theme.dimmed());
        return;
    }

    let height = inner.height as usize;
    let offset = app.search.list.visible_offset(height);
    let items: Vec<ListItem> = app
        .search
        .results
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(i, r)| result_line(r, i == app.search.list.selected, theme))
        .collect();

    frame.render_widget(List::new(items).style(theme.text()), inner);
}

/// ▸ Title (2024) ★ 8.5
fn result_line<'a>(result: &'a SearchResult, selected: bool, theme: &Theme) -> ListItem<'a> {
    let line = Line::from(vec![
        Span::styled(marker(selected), if selected { theme.accent() } else { theme.dimmed() }),
        Span::styled(
            result.title.as_str(),
            if selected { theme.highlighted() } else { theme.text() },
        ),
        Span::styled(format!(" ({})", result.year), theme.year()),
        Span::raw(" "),
        Span::styled(format!("★ {:.1}", result.rating), theme.rating(result.rating)),
    ]);
    ListItem::new(line)
}
