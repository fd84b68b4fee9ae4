use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{App, Focus};
use crate::prompt::Tone;
use crate::session::{plain_reply, SessionState};

/// Convert `**bold**` runs to styled spans; everything else is literal.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, keep it literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn border_color(app: &App, pane: Focus) -> Color {
    if app.focus == pane {
        Color::Cyan
    } else {
        Color::DarkGray
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let [header_area, tone_area, input_area, reply_area, audio_area, notice_area, history_area, footer_area] =
        Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(9),
            Constraint::Length(1),
        ])
        .areas(frame.area());

    render_header(app, frame, header_area);
    render_tone_selector(app, frame, tone_area);
    render_input(app, frame, input_area);
    render_reply(app, frame, reply_area);
    render_audio(app, frame, audio_area);
    render_notice(app, frame, notice_area);
    render_history(app, frame, history_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let state_color = match app.state() {
        SessionState::Idle => Color::Green,
        SessionState::AwaitingReply | SessionState::Displaying => Color::Yellow,
        SessionState::Error => Color::Red,
    };

    let title = Line::from(vec![
        Span::styled(format!(" {} ", app.title), Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!(" {} words ", app.session.document().as_str().split(' ').count()),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(format!(" {} ", app.state()), Style::default().fg(state_color).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    frame.render_widget(Paragraph::new(title).style(Style::default().bg(Color::DarkGray)), area);
}

fn render_tone_selector(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for tone in Tone::all() {
        let selected = *tone == app.tone;
        let marker = if selected { "◉ " } else { "○ " };
        let style = if selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!("{marker}{}", tone.display_name()), style));
        spans.push(Span::raw("    "));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app, Focus::Tone)))
        .title(" Choose response tone ");
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app, Focus::Input)))
        .title(" Type your question ");

    let text = if app.input.is_empty() && app.focus != Focus::Input {
        Span::styled("Ask something about the document...", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(app.input.as_str())
    };
    frame.render_widget(Paragraph::new(text).block(block), area);

    if app.focus == Focus::Input {
        // Keep the cursor inside the box on long input
        let inner_width = area.width.saturating_sub(2) as usize;
        let x = area.x + 1 + app.cursor.min(inner_width.saturating_sub(1)) as u16;
        frame.set_cursor_position((x, area.y + 1));
    }
}

fn render_reply(app: &App, frame: &mut Frame, area: Rect) {
    let [plain_area, rendered_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);

    let question_line = app.question.as_ref().map(|q| {
        Line::from(vec![
            Span::styled("You: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(q.clone()),
        ])
    });

    let (plain, rendered): (Text, Text) = match (&app.reply, app.state()) {
        (None, SessionState::AwaitingReply) => {
            // Animated ellipsis: ".", "..", "..."
            let dots = ".".repeat(app.animation_frame as usize + 1);
            let thinking = Line::from(Span::styled(
                format!("Thinking{dots}"),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ));
            (Text::from(thinking.clone()), Text::from(thinking))
        }
        (None, _) => {
            let hint = Line::from(Span::styled(
                "Replies appear here.",
                Style::default().fg(Color::DarkGray),
            ));
            (Text::from(hint.clone()), Text::from(hint))
        }
        (Some(result), _) => {
            let text = result.display_text();
            let plain = Text::from(plain_reply(&text));
            let rendered = Text::from(text.lines().map(parse_markdown_line).collect::<Vec<_>>());
            (plain, rendered)
        }
    };

    let with_question = |body: Text<'static>| {
        let mut lines: Vec<Line> = question_line.iter().cloned().collect();
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.extend(body.lines);
        Text::from(lines)
    };

    let plain_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Reply ({}) ", app.session.gemini_model()));
    frame.render_widget(
        Paragraph::new(with_question(plain)).block(plain_block).wrap(Wrap { trim: false }),
        plain_area,
    );

    let rendered_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Formatted ");
    frame.render_widget(
        Paragraph::new(rendered).block(rendered_block).wrap(Wrap { trim: false }),
        rendered_area,
    );
}

fn render_audio(app: &App, frame: &mut Frame, area: Rect) {
    let line = match &app.audio {
        Some(path) => {
            let status = if app.player.is_playing() { "▶ playing" } else { "■ stopped" };
            Line::from(vec![
                Span::styled(" 🔊 ", Style::default().fg(Color::Yellow)),
                Span::styled(status, Style::default().fg(Color::Green)),
                Span::raw("  "),
                Span::styled(path.display().to_string(), Style::default().fg(Color::DarkGray)),
            ])
        }
        None if !app.session.speech().is_enabled() => Line::from(Span::styled(
            " 🔇 speech output disabled",
            Style::default().fg(Color::DarkGray),
        )),
        None => Line::from(Span::styled(" 🔊 no audio yet", Style::default().fg(Color::DarkGray))),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_notice(app: &App, frame: &mut Frame, area: Rect) {
    if app.notices.is_empty() {
        return;
    }
    let notice = Paragraph::new(format!(" {}", app.notices.join("  ·  ")))
        .style(Style::default().fg(Color::Red));
    frame.render_widget(notice, area);
}

fn render_history(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app, Focus::History)))
        .title(format!(" 📜 Previous interactions ({}) ", app.history.len()));

    if app.history.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No previous records available.",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(["Time", "Prompt", "Response", "Style"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    let rows = app.history.iter().map(|r| {
        Row::new(vec![
            Cell::from(r.time.clone()),
            Cell::from(r.prompt.replace('\n', " ")),
            Cell::from(plain_reply(&r.response).replace('\n', " ")),
            Cell::from(r.style.clone()),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(19),
            Constraint::Percentage(30),
            Constraint::Fill(1),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(Style::default().bg(Color::DarkGray));

    frame.render_stateful_widget(table, area, &mut app.history_state);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = Vec::new();
    // No submit hint while a request is in flight
    if !app.state().is_busy() {
        hints.extend([Span::styled(" Enter ", key_style), Span::styled(" ask ", label_style)]);
    }
    hints.extend([
        Span::styled(" Tab ", key_style),
        Span::styled(" focus ", label_style),
        Span::styled(" F2 ", key_style),
        Span::styled(" tone ", label_style),
    ]);
    match app.focus {
        Focus::Input => hints.extend([
            Span::styled(" Esc ", key_style),
            Span::styled(" leave input ", label_style),
        ]),
        Focus::Tone | Focus::History => {
            if app.focus == Focus::History {
                hints.extend([Span::styled(" j/k ", key_style), Span::styled(" scroll ", label_style)]);
            }
            hints.extend([
                Span::styled(" p ", key_style),
                Span::styled(" play ", label_style),
                Span::styled(" s ", key_style),
                Span::styled(" stop ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
        }
    }

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}
