//! Watch screen
//!
//! Shows the playback view-model: transport state, progress and buffer,
//! volume, server selection and the episode sidebar. The picture itself is
//! in the player window.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Gauge, List, ListItem, Paragraph},
    Frame,
};

use super::{marker, panel, render_loading, render_message, Theme};
use crate::app::App;
use crate::pages::WatchView;
use crate::stream::{MediaBackend, PlaybackView, SourceKind};

pub fn render_watch<B: MediaBackend>(frame: &mut Frame, area: Rect, app: &App<B>, theme: &Theme) {
    let sidebar = app.store.is_sidebar_open() && app.watch.view.is_some();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(if sidebar {
            [Constraint::Min(40), Constraint::Length(32)]
        } else {
            [Constraint::Min(40), Constraint::Length(0)]
        })
        .split(area);

    let title = app
        .watch
        .view
        .as_ref()
        .map_or_else(|| "NOW PLAYING".to_string(), |v| format!("▶ {} · {}", v.drama.title, v.episode.label()));
    let block = panel(theme, Some(title), true);
    let inner = block.inner(columns[0]);
    frame.render_widget(block, columns[0]);

    if !render_loading(frame, inner, &app.watch.loading, theme) {
        match (&app.watch.view, &app.watch.playback) {
            (Some(view), Some(playback)) => render_playback(frame, inner, view, playback, theme),
            _ => render_message(frame, inner, "Nothing playing", theme.dimmed()),
        }
    }

    if sidebar {
        if let Some(view) = &app.watch.view {
            render_sidebar(frame, columns[1], app, view, theme);
        }
    }
}

fn render_playback<B: MediaBackend>(
    frame: &mut Frame,
    area: Rect,
    view: &WatchView,
    playback: &PlaybackView<B>,
    theme: &Theme,
) {
    if let Some(error) = playback.error() {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(error, theme.error())),
            Line::from(""),
            Line::from(Span::styled("r: retry   1-9: try another server", theme.dimmed())),
        ];
        frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
        return;
    }

    if playback.source_url().is_none() {
        render_message(frame, area, "No stream available for this episode", theme.dimmed());
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Transport state
            Constraint::Length(1), // Progress
            Constraint::Length(1), // Buffer
            Constraint::Length(1),
            Constraint::Min(1), // Details
        ])
        .split(area);

    let controls = playback.controls();
    let state = if !playback.is_attached() {
        Span::styled("■ Player closed (r to reopen)", theme.dimmed())
    } else if controls.ended {
        Span::styled("■ Ended", theme.warning())
    } else if controls.playing {
        Span::styled("▶ Playing", theme.success())
    } else {
        Span::styled("❚❚ Paused", theme.accent())
    };
    frame.render_widget(
        Paragraph::new(vec![Line::from(state), Line::from("")]).alignment(Alignment::Center),
        rows[0],
    );

    let progress = Gauge::default()
        .gauge_style(theme.progress_bar())
        .ratio((playback.progress_percent() / 100.0).clamp(0.0, 1.0))
        .label(playback.time_display());
    frame.render_widget(progress, rows[1]);

    let buffered = Gauge::default()
        .gauge_style(theme.dimmed())
        .ratio((playback.buffered_percent() / 100.0).clamp(0.0, 1.0))
        .label(format!("buffered {:.0}%", playback.buffered_percent()));
    frame.render_widget(buffered, rows[2]);

    if !controls.visible {
        return;
    }

    let volume = if controls.muted {
        Span::styled("Muted", theme.warning())
    } else {
        Span::styled(format!("Vol {:.0}%", controls.volume * 100.0), theme.text())
    };
    let kind = match playback.source_kind() {
        Some(SourceKind::Adaptive) => "HLS",
        Some(SourceKind::Native) => "Direct",
        None => "-",
    };

    let mut lines = vec![
        Line::from(vec![
            volume,
            Span::styled(
                format!("   Subtitles {}", if controls.subtitles_visible { "on" } else { "off" }),
                theme.dimmed(),
            ),
            Span::styled(
                if controls.fullscreen { "   Fullscreen" } else { "" },
                theme.dimmed(),
            ),
            Span::styled(format!("   {}", kind), theme.secondary()),
        ]),
        Line::from(""),
    ];

    for (i, server) in playback.servers().iter().enumerate() {
        let selected = playback.selected_index() == Some(i);
        lines.push(Line::from(vec![
            Span::styled(format!("[{}] ", i + 1), theme.keybind()),
            Span::styled(server.label(), if selected { theme.highlighted() } else { theme.text() }),
        ]));
    }

    lines.push(Line::from(""));
    let mut nav = Vec::new();
    if let Some(prev) = &view.prev {
        nav.push(Span::styled(format!("◂ p: {}", prev.label()), theme.dimmed()));
        nav.push(Span::raw("   "));
    }
    if let Some(next) = &view.next {
        nav.push(Span::styled(format!("n: {} ▸", next.label()), theme.dimmed()));
    }
    lines.push(Line::from(nav));

    frame.render_widget(Paragraph::new(lines), rows[4]);
}

fn render_sidebar<B: MediaBackend>(frame: &mut Frame, area: Rect, app: &App<B>, view: &WatchView, theme: &Theme) {
    let block = panel(theme, Some(format!("EPISODES ({})", view.episodes.len())), false);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let list = &app.watch.episodes;
    let height = inner.height as usize;
    let offset = list.visible_offset(height);
    let items: Vec<ListItem> = view
        .episodes
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(i, ep)| {
            let selected = i == list.selected;
            let current = ep.id == view.episode.id;
            let style = if selected {
                theme.highlighted()
            } else if current {
                theme.accent()
            } else {
                theme.text()
            };
            let progress = app
                .store
                .watch_progress(&ep.id)
                .map(|p| format!(" {}%", p.percentage))
                .unwrap_or_default();
            ListItem::new(Line::from(vec![
                Span::styled(marker(selected), theme.accent()),
                Span::styled(ep.label(), style),
                Span::styled(progress, theme.dimmed()),
            ]))
        })
        .collect();
    frame.render_widget(List::new(items), inner);
}
