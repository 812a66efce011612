use crate::tui::app::{App, Mode};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, HighlightSpacing, List, ListItem, ListState, Paragraph},
    Frame,
};

const HELP_TEXT: &[(&str, &str)] = &[
    ("type", "filter by name (substring, case-insensitive)"),
    ("a b / a | b / -a", "and / or / not"),
    ("^pre  \"a b\"  re:/x/", "prefix / phrase / regex"),
    ("scope: kind: section: page:", "filter by owner, page kind, section, page"),
    ("top:N", "limit results"),
    ("Up/Down, Ctrl+J/K", "select result"),
    ("Ctrl+L", "toggle literal mode (no query syntax)"),
    ("Tab", "focus locations"),
    ("Enter", "open page in browser"),
    ("F5", "reload index from disk"),
    ("Esc", "clear query, quit when empty"),
];

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Query input
            Constraint::Min(5),    // Results / detail
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    draw_query_input(f, app, chunks[0]);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);
    draw_results_list(f, app, main[0]);
    draw_detail(f, app, main[1]);

    draw_status_bar(f, app, chunks[2]);

    if app.mode == Mode::Help {
        draw_help(f, f.area());
    }
}

fn draw_query_input(f: &mut Frame, app: &App, area: Rect) {
    let title = if app.literal {
        " Literal search (Ctrl+L: query syntax, ?: help, Esc: quit) "
    } else {
        " Search (Tab: locations, F5: reload, ?: help, Esc: quit) "
    };
    let input = Paragraph::new(app.query.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(title));

    f.render_widget(input, area);

    if app.mode == Mode::Search {
        let width = app.query.chars().count() as u16;
        f.set_cursor_position((area.x + width + 1, area.y + 1));
    }
}

fn draw_results_list(f: &mut Frame, app: &App, area: Rect) {
    let Some(table) = app.table() else {
        let msg = if app.is_loading() { "Loading..." } else { "No index loaded" };
        let block = Block::default().borders(Borders::ALL).title(" Results ");
        f.render_widget(Paragraph::new(msg).block(block), area);
        return;
    };

    let items: Vec<ListItem> = app
        .results
        .iter()
        .filter_map(|hit| {
            let record = table.get(hit.index)?;
            let mut spans = match hit.name_span(record) {
                Some((start, end)) => highlight_match(&record.name, start, end),
                None => vec![Span::raw(record.name.as_str())],
            };
            if let Some(section) = record.section() {
                spans.push(Span::styled(
                    format!("  {}", section),
                    Style::default().fg(Color::Blue),
                ));
            }
            if record.is_overloaded() {
                spans.push(Span::styled(
                    format!("  ({})", record.locations.len()),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            Some(ListItem::new(Line::from(spans)))
        })
        .collect();

    let border_style = if app.mode == Mode::Search {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(format!(" Results ({}) ", app.results.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    let mut state = ListState::default().with_selected(Some(app.selected));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_detail(f: &mut Frame, app: &App, area: Rect) {
    let border_style = if app.mode == Mode::Detail {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let Some(record) = app.selected_record() else {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(" Locations ");
        f.render_widget(Paragraph::new("No selection").block(block), area);
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(format!(" Locations ({}) ", record.locations.len()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(inner);

    let header = Paragraph::new(Text::from(vec![
        Line::from(Span::styled(
            record.name.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("key {}", record.key),
            Style::default().fg(Color::DarkGray),
        )),
    ]));
    f.render_widget(header, parts[0]);

    let items: Vec<ListItem> = record
        .locations
        .iter()
        .map(|location| {
            let scope = if location.scope.is_empty() {
                "(global)".to_string()
            } else {
                location.scope.clone()
            };
            ListItem::new(Text::from(vec![
                Line::from(Span::styled(scope, Style::default().fg(Color::Green))),
                Line::from(vec![
                    Span::raw("  "),
                    Span::styled(location.href(), Style::default().fg(Color::Magenta)),
                    Span::styled(
                        format!("  {:?}", location.page_kind()),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]),
            ]))
        })
        .collect();

    // The list scrolls to keep the selected location in view
    let list = List::new(items)
        .highlight_symbol("> ")
        .highlight_spacing(HighlightSpacing::Always)
        .highlight_style(Style::default().fg(Color::Yellow));
    let selected = (app.mode == Mode::Detail).then_some(app.location);
    let mut state = ListState::default().with_selected(selected);
    f.render_stateful_widget(list, parts[1], &mut state);
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let status = Paragraph::new(app.status_message.as_str())
        .style(Style::default().fg(Color::Cyan));

    f.render_widget(status, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let width = area.width.min(72);
    let height = area.height.min(HELP_TEXT.len() as u16 + 4);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    let lines: Vec<Line> = HELP_TEXT
        .iter()
        .map(|(keys, action)| {
            Line::from(vec![
                Span::styled(format!("{:30}", keys), Style::default().fg(Color::Yellow)),
                Span::raw(*action),
            ])
        })
        .collect();

    let help = Paragraph::new(Text::from(lines)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help (any key to close) "),
    );

    f.render_widget(Clear, popup);
    f.render_widget(help, popup);
}

/// Highlight the matched range of a name
fn highlight_match(text: &str, start: usize, end: usize) -> Vec<Span<'_>> {
    let mut spans = Vec::new();

    if start > 0 {
        spans.push(Span::raw(&text[..start]));
    }

    spans.push(Span::styled(
        &text[start..end],
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    ));

    if end < text.len() {
        spans.push(Span::raw(&text[end..]));
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::reader::{LoadOptions, SearchTable};
    use crate::index::types::{Location, SearchRecord};
    use crate::tui::app::Settings;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::path::PathBuf;

    fn overloaded_app() -> App {
        let locations = (0..30)
            .map(|i| {
                Location::from_url(
                    &format!("../class_owner{}.html#a{}", i, i),
                    true,
                    &format!("Owner{}", i),
                )
            })
            .collect();
        let table = SearchTable::from_records(vec![SearchRecord::new("update", "update", locations)]);
        let settings = Settings {
            docs_path: PathBuf::from("."),
            load: LoadOptions::default(),
            merge: false,
            prefix_match: false,
            literal: false,
            browser: "true".to_string(),
        };
        App::with_table(settings, table)
    }

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 16)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_detail_pane_scrolls_to_selected_location() {
        let mut app = overloaded_app();
        app.toggle_detail();
        assert!(render(&app).contains("> Owner0"));

        for _ in 0..25 {
            app.location_next();
        }
        let screen = render(&app);
        assert!(screen.contains("> Owner25"));
        assert!(!screen.contains("Owner0"));
    }

    #[test]
    fn test_highlight_match_splits_name() {
        let spans = highlight_match("renderElement", 6, 13);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].content, "render");
        assert_eq!(spans[1].content, "Element");
    }
}
