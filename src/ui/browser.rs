//! Catalog browsing views
//!
//! Home sections, genre/country indexes, paginated listings and the
//! history screen. Everything here is a list of dramas or of things that
//! lead to one.

use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::{marker, panel, render_loading, render_message, Theme};
use crate::app::{App, HistoryTab, HomeSection, ListState};
use crate::models::{format_relative_time, format_views, truncate, Drama};
use crate::stream::MediaBackend;

// =============================================================================
// Rows
// =============================================================================

/// ▸ 1. Title  2024  ★ 8.5  1.2K views
fn drama_line<'a>(drama: &'a Drama, rank: Option<usize>, selected: bool, theme: &Theme) -> Line<'a> {
    let mut spans = vec![Span::styled(
        marker(selected),
        if selected { theme.accent() } else { theme.dimmed() },
    )];
    if let Some(rank) = rank {
        spans.push(Span::styled(format!("{:>2}. ", rank), theme.accent()));
    }
    spans.extend([
        Span::styled(
            drama.title.as_str(),
            if selected { theme.highlighted() } else { theme.text() },
        ),
        Span::styled(format!("  {}", drama.year), theme.year()),
        Span::styled(format!("  ★ {:.1}", drama.rating), theme.rating(drama.rating)),
        Span::styled(format!("  {} views", format_views(drama.views)), theme.dimmed()),
    ]);
    Line::from(spans)
}

fn render_drama_list(
    frame: &mut Frame,
    area: Rect,
    dramas: &[&Drama],
    list: &ListState,
    ranked: bool,
    theme: &Theme,
) {
    let height = area.height as usize;
    let offset = list.visible_offset(height);
    let items: Vec<ListItem> = dramas
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(i, d)| ListItem::new(drama_line(d, ranked.then_some(i + 1), i == list.selected, theme)))
        .collect();
    frame.render_widget(List::new(items), area);
}

/// Title, metadata and synopsis of a drama
fn render_preview(frame: &mut Frame, area: Rect, drama: &Drama, theme: &Theme) {
    let block = panel(theme, Some("INFO".into()), false);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![
        Line::from(Span::styled(drama.title.as_str(), theme.title())),
        Line::from(vec![
            Span::styled(drama.year.to_string(), theme.year()),
            Span::styled(format!("  {}", drama.status), theme.secondary()),
            Span::styled(format!("  {} eps", drama.total_episodes), theme.dimmed()),
        ]),
    ];
    let genres = drama.genre_names();
    if !genres.is_empty() {
        lines.push(Line::from(Span::styled(genres, theme.dimmed())));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(truncate(&drama.synopsis, 400), theme.text())));

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn tab_line<'a>(titles: &[&'a str], current: usize, theme: &Theme) -> Line<'a> {
    let mut spans = Vec::new();
    for (i, title) in titles.iter().enumerate() {
        let style = if i == current { theme.highlighted() } else { theme.dimmed() };
        spans.push(Span::styled(format!(" {} ", title), style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

// =============================================================================
// Home
// =============================================================================

pub fn render_home<B: MediaBackend>(frame: &mut Frame, area: Rect, app: &App<B>, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let titles: Vec<&str> = HomeSection::ALL.iter().map(|s| s.title()).collect();
    let current = HomeSection::ALL
        .iter()
        .position(|s| *s == app.home.section)
        .unwrap_or(0);
    frame.render_widget(Paragraph::new(tab_line(&titles, current, theme)), chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    let block = panel(theme, Some(app.home.section.title().to_uppercase()), true);
    let inner = block.inner(body[0]);
    frame.render_widget(block, body[0]);

    if render_loading(frame, inner, &app.home.loading, theme) {
        return;
    }

    let dramas = app.home.dramas();
    if dramas.is_empty() {
        render_message(frame, inner, "Nothing here yet", theme.dimmed());
    } else if app.home.section == HomeSection::Latest {
        render_latest(frame, inner, app, theme);
    } else {
        let ranked = matches!(app.home.section, HomeSection::TopToday | HomeSection::TopWeek);
        render_drama_list(frame, inner, &dramas, &app.home.list, ranked, theme);
    }

    if let Some(drama) = app.home.selected_drama() {
        render_preview(frame, body[1], drama, theme);
    }
}

/// Latest updates carry the new episode and when it arrived
fn render_latest<B: MediaBackend>(frame: &mut Frame, area: Rect, app: &App<B>, theme: &Theme) {
    let Some(page) = &app.home.page else {
        return;
    };
    let now = Utc::now();
    let height = area.height as usize;
    let offset = app.home.list.visible_offset(height);

    let items: Vec<ListItem> = page
        .data
        .latest
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(i, update)| {
            let selected = i == app.home.list.selected;
            let line = Line::from(vec![
                Span::styled(marker(selected), if selected { theme.accent() } else { theme.dimmed() }),
                Span::styled(
                    update.drama.title.as_str(),
                    if selected { theme.highlighted() } else { theme.text() },
                ),
                Span::styled(format!("  {}", update.episode.label()), theme.secondary()),
                Span::styled(
                    format!("  {}", format_relative_time(update.updated_at, now)),
                    theme.dimmed(),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    frame.render_widget(List::new(items), area);
}

// =============================================================================
// Genres & Countries
// =============================================================================

pub fn render_genres<B: MediaBackend>(frame: &mut Frame, area: Rect, app: &App<B>, theme: &Theme) {
    let Some(index) = &app.browse.genres else {
        render_loading_panel(frame, area, "BROWSE BY GENRE", theme);
        return;
    };
    let rows: Vec<String> = index
        .genres
        .iter()
        .map(|g| if g.count > 0 { format!("{} ({})", g.name, g.count) } else { g.name.clone() })
        .collect();
    render_simple_list(frame, area, "BROWSE BY GENRE", &rows, &app.browse.genre_list, theme);
}

pub fn render_countries<B: MediaBackend>(frame: &mut Frame, area: Rect, app: &App<B>, theme: &Theme) {
    let Some(index) = &app.browse.countries else {
        render_loading_panel(frame, area, "BROWSE BY COUNTRY", theme);
        return;
    };
    let rows: Vec<String> = index
        .countries
        .iter()
        .map(|c| match &c.flag {
            Some(flag) => format!("{} {}", flag, c.name),
            None => c.name.clone(),
        })
        .collect();
    render_simple_list(frame, area, "BROWSE BY COUNTRY", &rows, &app.browse.country_list, theme);
}

fn render_loading_panel(frame: &mut Frame, area: Rect, title: &str, theme: &Theme) {
    let block = panel(theme, Some(title.to_string()), true);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    render_message(frame, inner, "⟳ Loading...", theme.loading());
}

fn render_simple_list(frame: &mut Frame, area: Rect, title: &str, rows: &[String], list: &ListState, theme: &Theme) {
    let block = panel(theme, Some(title.to_string()), true);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if rows.is_empty() {
        render_message(frame, inner, "Nothing here yet", theme.dimmed());
        return;
    }

    let height = inner.height as usize;
    let offset = list.visible_offset(height);
    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(i, row)| {
            let selected = i == list.selected;
            ListItem::new(Line::from(vec![
                Span::styled(marker(selected), if selected { theme.accent() } else { theme.dimmed() }),
                Span::styled(row.as_str(), if selected { theme.highlighted() } else { theme.text() }),
            ]))
        })
        .collect();
    frame.render_widget(List::new(items), inner);
}

// =============================================================================
// Listing
// =============================================================================

pub fn render_listing<B: MediaBackend>(frame: &mut Frame, area: Rect, app: &App<B>, theme: &Theme) {
    let listing = &app.listing;
    let mut title = format!("{} · PAGE {}", listing.heading.to_uppercase(), listing.page);
    if listing.has_more {
        title.push_str(" · n:next");
    }

    let block = panel(theme, Some(title), true);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if render_loading(frame, inner, &listing.loading, theme) {
        return;
    }

    let dramas: Vec<&Drama> = listing.dramas.iter().collect();
    render_drama_list(frame, inner, &dramas, &listing.list, false, theme);
}

// =============================================================================
// History
// =============================================================================

pub fn render_history<B: MediaBackend>(frame: &mut Frame, area: Rect, app: &App<B>, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let tabs = [HistoryTab::Watched, HistoryTab::Favorites, HistoryTab::Searches];
    let titles: Vec<&str> = tabs.iter().map(|t| t.title()).collect();
    let current = tabs.iter().position(|t| *t == app.history.tab).unwrap_or(0);
    frame.render_widget(Paragraph::new(tab_line(&titles, current, theme)), chunks[0]);

    let store = &app.store;
    let rows: Vec<String> = match app.history.tab {
        HistoryTab::Watched => store
            .watch_history()
            .iter()
            .map(|p| {
                let title = store
                    .current_drama()
                    .filter(|d| d.id == p.drama_id)
                    .map_or(p.drama_id.as_str(), |d| d.title.as_str());
                format!("{} · {} · {:>3}% {}", title, p.episode_id, p.percentage, progress_bar(p.percentage))
            })
            .collect(),
        HistoryTab::Favorites => store.favorites().to_vec(),
        HistoryTab::Searches => store.search_history().to_vec(),
    };

    render_simple_list(frame, chunks[1], &app.history.tab.title().to_uppercase(), &rows, &app.history.list, theme);
}

/// Ten-cell bar for a percentage
fn progress_bar(percentage: u8) -> String {
    let filled = (percentage.min(100) / 10) as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0), "░░░░░░░░░░");
        assert_eq!(progress_bar(45), "████░░░░░░");
        assert_eq!(progress_bar(100), "██████████");
    }
}
