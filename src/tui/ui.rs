// Drawing the TUI
//
// Layout: title bar, capture panel beside the report panel, a log panel,
// and a one-line footer with key hints for the current state.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use super::app::App;
use super::markdown::render_markdown;
use super::theme::Theme;
use crate::report::ReportView;
use crate::workflow::ScreenState;

pub fn draw(f: &mut Frame, app: &App, theme: &Theme) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Min(8),    // capture + report
            Constraint::Length(7), // logs
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    draw_title(f, rows[0], app, theme);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(38), Constraint::Percentage(62)])
        .split(rows[1]);

    draw_capture_panel(f, columns[0], app, theme);
    draw_report_panel(f, columns[1], app, theme);
    draw_log_panel(f, rows[2], app, theme);
    draw_footer(f, rows[3], app, theme);
}

fn draw_title(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let auth = if app.authenticated {
        Span::styled(" [logged in]", theme.success)
    } else if app.require_auth {
        Span::styled(" [login required]", theme.error)
    } else {
        Span::styled(" [anonymous]", theme.dim)
    };
    let title = Line::from(vec![
        Span::styled(" labelscan ", theme.title),
        Span::styled("- reveal the truth behind every label", theme.dim),
        auth,
    ]);
    f.render_widget(Paragraph::new(title), area);
}

fn draw_capture_panel(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let focused = matches!(app.screen, ScreenState::Idle);
    let block = Block::default()
        .title(" Scan ")
        .borders(Borders::ALL)
        .border_style(if focused {
            theme.border_focused
        } else {
            theme.border
        });

    let mut lines: Vec<Line> = Vec::new();
    match &app.screen {
        ScreenState::Idle => {
            lines.push(Line::from(Span::styled(
                "Scan an ingredient label",
                theme.accent,
            )));
            lines.push(Line::default());
            lines.push(Line::from(vec![
                Span::styled("Image path: ", theme.text),
                Span::styled(app.input.clone(), theme.accent),
                Span::styled("█", theme.accent),
            ]));
        }
        ScreenState::Previewing(img) => {
            lines.extend(image_summary(img, theme));
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                "Ready to analyze",
                theme.success,
            )));
        }
        ScreenState::Submitting(img) => {
            lines.extend(image_summary(img, theme));
            lines.push(Line::default());
            lines.push(Line::from(vec![
                Span::styled(app.spinner(), theme.accent),
                Span::styled(" analyzing...", theme.accent),
            ]));
        }
        ScreenState::Reported(img, _) => {
            lines.extend(image_summary(img, theme));
            lines.push(Line::default());
            lines.push(Line::from(Span::styled("Analysis complete", theme.success)));
        }
        ScreenState::Failed(img, _) => {
            lines.extend(image_summary(img, theme));
            lines.push(Line::default());
            lines.push(Line::from(Span::styled("Analysis failed", theme.error)));
        }
    }

    if let Some(status) = &app.status {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(status.clone(), theme.error)));
    }

    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn image_summary(img: &crate::capture::CapturedImage, theme: &Theme) -> Vec<Line<'static>> {
    vec![
        Line::from(vec![
            Span::styled("File:  ", theme.dim),
            Span::styled(img.preview.display_name.clone(), theme.text),
        ]),
        Line::from(vec![
            Span::styled("Type:  ", theme.dim),
            Span::styled(img.content_type.to_string(), theme.text),
        ]),
        Line::from(vec![
            Span::styled("Size:  ", theme.dim),
            Span::styled(format!("{} KiB", img.bytes.len() / 1024), theme.text),
        ]),
    ]
}

fn draw_report_panel(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let block = Block::default()
        .title(" Report ")
        .borders(Borders::ALL)
        .border_style(theme.border);
    let inner_width = area.width.saturating_sub(2) as usize;

    let lines: Vec<Line> = match &app.report {
        ReportView::Hidden => vec![Line::from(Span::styled(
            "No report yet - select an image and analyze it",
            theme.dim,
        ))],
        ReportView::Spinner => vec![Line::from(vec![
            Span::styled(app.spinner(), theme.accent),
            Span::styled(" waiting for the analysis service...", theme.accent),
        ])],
        ReportView::Rendered(report) => render_markdown(report.text(), inner_width, theme),
        ReportView::Failure(message) => vec![
            Line::from(Span::styled(message.clone(), theme.error)),
            Line::default(),
            Line::from(Span::styled(
                "Press [enter] to retry or [esc] to retake",
                theme.dim,
            )),
        ],
    };

    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .scroll((app.report_scroll, 0)),
        area,
    );
}

fn draw_log_panel(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let block = Block::default()
        .title(" Logs ")
        .borders(Borders::ALL)
        .border_style(theme.border);
    let visible = area.height.saturating_sub(2) as usize;

    let lines: Vec<Line> = app
        .log_buffer
        .recent(visible)
        .into_iter()
        .map(|entry| {
            Line::from(vec![
                Span::styled(entry.timestamp.format("%H:%M:%S ").to_string(), theme.dim),
                Span::styled(
                    format!("{:<5} ", entry.level.as_str()),
                    theme.log_level(entry.level),
                ),
                Span::styled(entry.message, theme.text),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_footer(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let hints = match &app.screen {
        ScreenState::Idle => "[type path] [enter] select  [esc] clear  [ctrl+q] quit",
        ScreenState::Previewing(_) => "[enter] analyze  [esc] retake  [q] quit",
        ScreenState::Submitting(_) => "[esc] cancel  [q] quit",
        ScreenState::Reported(_, _) => "[↑/↓] scroll  [esc] scan another  [q] quit",
        ScreenState::Failed(_, _) => "[enter] retry  [esc] retake  [q] quit",
    };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(format!(" {hints}"), theme.dim))),
        area,
    );
}
