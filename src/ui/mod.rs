//! Terminal UI components
//!
//! Pure rendering of [`App`] state with ratatui. Keyboard-first navigation
//! throughout; every screen has its keys listed in the status bar.

pub mod browser;
pub mod detail;
pub mod player;
pub mod search;
pub mod theme;

pub use theme::Theme;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, AppState, InputMode, LoadingState};
use crate::stream::MediaBackend;

/// Main render function, dispatches to view-specific renderers
pub fn render<B: MediaBackend>(frame: &mut Frame, app: &App<B>) {
    let area = frame.area();
    let theme = app.theme();

    frame.render_widget(Clear, area);
    frame.render_widget(Block::default().style(theme.base()), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(1),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header(frame, chunks[0], app, &theme);
    render_content(frame, chunks[1], app, &theme);
    render_status_bar(frame, chunks[2], app, &theme);

    if app.input_mode == InputMode::Editing {
        search::render_suggestions(frame, chunks[0], chunks[1], app, &theme);
    }

    if let Some(ref error) = app.error {
        render_error_popup(frame, area, error, &theme);
    }
}

fn render_header<B: MediaBackend>(frame: &mut Frame, area: Rect, app: &App<B>, theme: &Theme) {
    let name = app.site().name.to_uppercase();
    let logo_width = (name.chars().count() as u16 + 4).clamp(12, 28);

    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(logo_width), Constraint::Min(1)])
        .split(area);

    let logo = Paragraph::new(Line::from(Span::styled(
        name,
        theme.title().add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(panel(theme, None, false));
    frame.render_widget(logo, header_chunks[0]);

    search::render_search_box(frame, header_chunks[1], app, theme);
}

fn render_content<B: MediaBackend>(frame: &mut Frame, area: Rect, app: &App<B>, theme: &Theme) {
    match app.state {
        AppState::Home => browser::render_home(frame, area, app, theme),
        AppState::Search => search::render_results(frame, area, app, theme),
        AppState::Detail => detail::render_detail(frame, area, app, theme),
        AppState::Genres => browser::render_genres(frame, area, app, theme),
        AppState::Countries => browser::render_countries(frame, area, app, theme),
        AppState::Listing => browser::render_listing(frame, area, app, theme),
        AppState::Watch => player::render_watch(frame, area, app, theme),
        AppState::History => browser::render_history(frame, area, app, theme),
    }
}

fn key_hints<B: MediaBackend>(app: &App<B>) -> &'static str {
    if app.input_mode == InputMode::Editing {
        return " ↵:search  ↑↓:suggestions  ESC:cancel ";
    }
    match app.state {
        AppState::Home => " ↵:open  TAB:section  g:genres  c:countries  h:history  /:search  t:theme  q:quit ",
        AppState::Search => " ↵:open  /:edit  ESC:back ",
        AppState::Detail => " ↵:play  w:watch  f:favorite  TAB:episodes/related  ESC:back ",
        AppState::Genres | AppState::Countries => " ↵:open  ESC:back ",
        AppState::Listing => " ↵:open  n/p:page  ESC:back ",
        AppState::Watch => " SPC:play  ←→:seek  i/o:skip  ↑↓:vol  m:mute  1-9:server  n/p:episode  e:episodes  ESC:back ",
        AppState::History => " ↵:open  TAB:tab  x:remove  ESC:back ",
    }
}

fn render_status_bar<B: MediaBackend>(frame: &mut Frame, area: Rect, app: &App<B>, theme: &Theme) {
    let mode = match app.input_mode {
        InputMode::Normal => Span::styled(" NORMAL ", theme.highlighted()),
        InputMode::Editing => Span::styled(
            " INSERT ",
            ratatui::style::Style::default()
                .fg(theme.background)
                .bg(theme.accent),
        ),
    };

    let screen = Span::styled(
        format!(" {} ", format!("{:?}", app.state).to_uppercase()),
        theme.dimmed(),
    );

    let status_line = Line::from(vec![
        mode,
        screen,
        Span::raw("│"),
        Span::styled(key_hints(app), theme.dimmed()),
    ]);

    frame.render_widget(Paragraph::new(status_line).style(theme.status_bar()), area);
}

fn render_error_popup(frame: &mut Frame, area: Rect, error: &str, theme: &Theme) {
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 5;

    let popup_area = Rect {
        x: area.x + (area.width.saturating_sub(popup_width)) / 2,
        y: area.y + (area.height.saturating_sub(popup_height)) / 2,
        width: popup_width,
        height: popup_height.min(area.height),
    };

    frame.render_widget(Clear, popup_area);

    let error_block = Paragraph::new(vec![Line::from(""), Line::from(Span::styled(error, theme.error()))])
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(theme.error())
                .title(Span::styled(" ✗ ERROR ", theme.error()))
                .style(theme.base()),
        );

    frame.render_widget(error_block, popup_area);
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Rounded panel with an optional title
pub(crate) fn panel<'a>(theme: &Theme, title: Option<String>, focused: bool) -> Block<'a> {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(if focused {
            theme.border_focused()
        } else {
            theme.border()
        });
    match title {
        Some(title) => block.title(Span::styled(format!(" {} ", title), theme.title())),
        None => block,
    }
}

/// Loading spinner or "not available" message, if the state calls for one
pub(crate) fn render_loading(frame: &mut Frame, area: Rect, loading: &LoadingState, theme: &Theme) -> bool {
    let (text, style) = match loading {
        LoadingState::Loading(msg) => (
            format!("⟳ {}", msg.as_deref().unwrap_or("Loading...")),
            theme.loading(),
        ),
        LoadingState::Error(msg) => (msg.clone(), theme.dimmed()),
        LoadingState::Idle => return false,
    };
    render_message(frame, area, &text, style);
    true
}

/// Centered one-line message
pub(crate) fn render_message(frame: &mut Frame, area: Rect, text: &str, style: ratatui::style::Style) {
    let y = area.y + area.height / 2;
    let line_area = Rect {
        x: area.x,
        y: y.min(area.y + area.height.saturating_sub(1)),
        width: area.width,
        height: 1.min(area.height),
    };
    let para = Paragraph::new(text.to_string())
        .style(style)
        .alignment(Alignment::Center);
    frame.render_widget(para, line_area);
}

/// Selection marker for list rows
pub(crate) fn marker(selected: bool) -> &'static str {
    if selected {
        "▸ "
    } else {
        "  "
    }
}
