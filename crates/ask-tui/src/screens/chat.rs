//! Chat screen: transcript, input box and status bar.

use crate::app::App;
use crate::screens::Screen;
use crate::ui::theme::{spinner_frame, Styles};
use crate::ui::widgets::{KeyHint, StatusBar};
use crate::ui::{centered_fixed, chat_layout};
use ask_engine::Role;
use chrono::Local;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

/// Indent of message bodies under their role label.
const CONTENT_INDENT: &str = "  ";

/// The chat screen.
pub struct ChatScreen;

impl Screen for ChatScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let (transcript_area, input_area, status_area) = chat_layout(area);

        render_transcript(app, transcript_area, buf);
        render_input(app, input_area, buf);
        render_status(app, status_area, buf);
    }
}

fn render_transcript(app: &App, area: Rect, buf: &mut Buffer) {
    let block = Block::default()
        .title(" Ask ")
        .title_style(Styles::title())
        .borders(Borders::ALL)
        .border_style(Styles::border())
        .style(Styles::default());

    let inner = block.inner(area);
    block.render(area, buf);

    if app.controller.messages().is_empty() && !app.is_pending() {
        let greeting = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("  Hi! Ask me anything.", Styles::title())),
            Line::from(""),
            Line::from(Span::styled(
                "  Type a question below and press Enter.",
                Styles::dim(),
            )),
            Line::from(Span::styled(
                "  Your conversation is saved between sessions.",
                Styles::dim(),
            )),
        ])
        .style(Styles::default());
        greeting.render(inner, buf);
        return;
    }

    let height = usize::from(inner.height);
    let lines = transcript_lines(app, usize::from(inner.width));
    let offset = app.scroll.layout(lines.len(), height);

    let visible: Vec<Line<'_>> = lines.into_iter().skip(offset).take(height).collect();
    Paragraph::new(visible)
        .style(Styles::default())
        .render(inner, buf);
}

/// Lay out the conversation as display lines, wrapped to `width`.
///
/// Wrapping happens here rather than in the paragraph so the line count
/// used for scrolling matches what is drawn.
fn transcript_lines(app: &App, width: usize) -> Vec<Line<'static>> {
    let text_width = width.saturating_sub(CONTENT_INDENT.len()).max(1);
    let mut lines = Vec::new();

    for msg in app.controller.messages() {
        let label_style = match msg.role {
            Role::User => Styles::user_label(),
            Role::Agent => Styles::agent_label(),
        };
        let body_style = if msg.is_failure() {
            Styles::error()
        } else {
            Styles::default()
        };
        let time = msg.timestamp.with_timezone(&Local).format("%H:%M");

        lines.push(Line::from(vec![
            Span::styled(msg.role.label(), label_style),
            Span::styled(format!("  {time}"), Styles::dim()),
        ]));
        for line in textwrap::wrap(&msg.content, text_width) {
            lines.push(Line::from(Span::styled(
                format!("{CONTENT_INDENT}{line}"),
                body_style,
            )));
        }
        lines.push(Line::from(""));
    }

    if app.is_pending() {
        lines.push(Line::from(vec![
            Span::styled(Role::Agent.label(), Styles::agent_label()),
            Span::styled(
                format!("  {} typing...", spinner_frame(app.tick)),
                Styles::dim(),
            ),
        ]));
    }

    lines
}

fn render_input(app: &App, area: Rect, buf: &mut Buffer) {
    let pending = app.is_pending();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(if pending {
            Styles::border()
        } else {
            Styles::border_active()
        })
        .style(Styles::default());

    let inner = block.inner(area);
    block.render(area, buf);

    let placeholder = if pending {
        "Waiting for the answer..."
    } else {
        "Ask a question"
    };
    app.input_state
        .widget()
        .focused(!pending)
        .placeholder(placeholder)
        .render(inner, buf);
}

fn render_status(app: &App, area: Rect, buf: &mut Buffer) {
    let hints = vec![
        KeyHint::new("Enter", "Send"),
        KeyHint::new("Ctrl+L", "Clear"),
        KeyHint::new("F1", "Help"),
        KeyHint::new("Esc", "Quit"),
    ];

    let right = if let Some(notification) = &app.notification {
        notification.as_str()
    } else if app.is_pending() {
        "Sending..."
    } else {
        app.endpoint
            .split_once("://")
            .map_or(app.endpoint.as_str(), |(_, rest)| rest)
    };

    StatusBar::new("Ask")
        .hints(hints)
        .right(right)
        .render(area, buf);
}

/// Clear history confirmation overlay.
pub struct ClearConfirmScreen;

impl Screen for ClearConfirmScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        ChatScreen.render(app, area, buf);
        render_confirm_overlay(
            " Clear history? ",
            &[
                "This removes every message in the conversation",
                "and the saved history. It cannot be undone.",
            ],
            "Clear",
            area,
            buf,
        );
    }
}

/// Quit confirmation overlay.
pub struct QuitConfirmScreen;

impl Screen for QuitConfirmScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        ChatScreen.render(app, area, buf);
        let body: &[&str] = if app.is_pending() {
            &["Leave ask?", "The answer being waited for will be lost."]
        } else {
            &["Leave ask?", "Your conversation stays saved."]
        };
        render_confirm_overlay(" Quit ", body, "Quit", area, buf);
    }
}

fn render_confirm_overlay(
    title: &str,
    body: &[&str],
    confirm_label: &str,
    area: Rect,
    buf: &mut Buffer,
) {
    let width = 56.min(area.width.saturating_sub(4));
    let height = u16::try_from(body.len() + 6)
        .unwrap_or(u16::MAX)
        .min(area.height.saturating_sub(2));
    let overlay_area = centered_fixed(width, height, area);

    Clear.render(overlay_area, buf);

    let block = Block::default()
        .title(title)
        .title_style(Styles::title())
        .borders(Borders::ALL)
        .border_style(Styles::border_active())
        .style(Styles::default());

    let inner = block.inner(overlay_area);
    block.render(overlay_area, buf);

    let mut lines = vec![Line::from("")];
    for text in body {
        lines.push(Line::from(Span::styled(format!("  {text}"), Styles::default())));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("  ", Styles::default()),
        Span::styled("[Enter/y]", Styles::key_hint()),
        Span::styled(format!(" {confirm_label}   "), Styles::default()),
        Span::styled("[Esc/n]", Styles::key_hint()),
        Span::styled(" Cancel", Styles::default()),
    ]));

    Paragraph::new(lines)
        .style(Styles::default())
        .render(inner, buf);
}
