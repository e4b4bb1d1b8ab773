//! Drama detail view: metadata, synopsis, episode list and related dramas

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::{marker, panel, render_loading, render_message, Theme};
use crate::app::{App, DetailFocus, ListState};
use crate::models::{format_duration, format_views, Drama, Episode};
use crate::pages::DramaPage;
use crate::stream::MediaBackend;

pub fn render_detail<B: MediaBackend>(frame: &mut Frame, area: Rect, app: &App<B>, theme: &Theme) {
    let Some(page) = &app.detail.page else {
        let block = panel(theme, Some("DRAMA".into()), true);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        render_loading(frame, inner, &app.detail.loading, theme);
        return;
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let favorite = app.store.is_favorite(&app.detail.slug);
    render_info(frame, columns[0], page, favorite, theme);

    let lists = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(columns[1]);

    render_episodes(
        frame,
        lists[0],
        &page.episodes,
        &app.detail.episodes,
        app.detail.focus == DetailFocus::Episodes,
        theme,
    );
    render_related(
        frame,
        lists[1],
        &page.related,
        &app.detail.related,
        app.detail.focus == DetailFocus::Related,
        theme,
    );
}

fn render_info(frame: &mut Frame, area: Rect, page: &DramaPage, favorite: bool, theme: &Theme) {
    let drama = &page.drama;
    let title = if favorite {
        format!("♥ {}", drama.title)
    } else {
        drama.title.clone()
    };
    let block = panel(theme, Some(title), false);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    if !drama.original_title.is_empty() && drama.original_title != drama.title {
        lines.push(Line::from(Span::styled(drama.original_title.as_str(), theme.dimmed())));
    }
    lines.push(Line::from(vec![
        Span::styled(drama.year.to_string(), theme.year()),
        Span::styled(format!("  {}", drama.status), theme.secondary()),
        Span::styled(format!("  ★ {:.1}", drama.rating), theme.rating(drama.rating)),
        Span::styled(format!("  {} views", format_views(drama.views)), theme.dimmed()),
    ]));
    lines.push(Line::from(vec![
        Span::styled(format!("{} episodes", drama.total_episodes), theme.text()),
        Span::styled(format!("  {}", drama.country.name), theme.dimmed()),
    ]));

    let genres = drama.genre_names();
    if !genres.is_empty() {
        lines.push(Line::from(Span::styled(genres, theme.secondary())));
    }
    if !drama.cast.is_empty() {
        let cast: Vec<&str> = drama.cast.iter().take(5).map(|c| c.name.as_str()).collect();
        lines.push(Line::from(vec![
            Span::styled("Cast: ", theme.dimmed()),
            Span::styled(cast.join(", "), theme.text()),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(drama.synopsis.as_str(), theme.text())));

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn render_episodes(frame: &mut Frame, area: Rect, episodes: &[Episode], list: &ListState, focused: bool, theme: &Theme) {
    let block = panel(theme, Some(format!("EPISODES ({})", episodes.len())), focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if episodes.is_empty() {
        render_message(frame, inner, "No episodes available", theme.dimmed());
        return;
    }

    let height = inner.height as usize;
    let offset = list.visible_offset(height);
    let items: Vec<ListItem> = episodes
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(i, ep)| {
            let selected = focused && i == list.selected;
            let mut spans = vec![
                Span::styled(marker(selected), if selected { theme.accent() } else { theme.dimmed() }),
                Span::styled(ep.display_title(), if selected { theme.highlighted() } else { theme.text() }),
            ];
            if ep.duration > 0 {
                spans.push(Span::styled(
                    format!("  {}", format_duration(ep.duration as f64)),
                    theme.dimmed(),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    frame.render_widget(List::new(items), inner);
}

fn render_related(frame: &mut Frame, area: Rect, related: &[Drama], list: &ListState, focused: bool, theme: &Theme) {
    let block = panel(theme, Some("RELATED".into()), focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if related.is_empty() {
        render_message(frame, inner, "No related dramas", theme.dimmed());
        return;
    }

    let height = inner.height as usize;
    let offset = list.visible_offset(height);
    let items: Vec<ListItem> = related
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(i, d)| {
            let selected = focused && i == list.selected;
            ListItem::new(Line::from(vec![
                Span::styled(marker(selected), if selected { theme.accent() } else { theme.dimmed() }),
                Span::styled(d.title.as_str(), if selected { theme.highlighted() } else { theme.text() }),
                Span::styled(format!("  {}", d.year), theme.year()),
            ]))
        })
        .collect();
    frame.render_widget(List::new(items), inner);
}
