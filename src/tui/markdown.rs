// Markdown rendering for the report panel
//
// Converts the service's markdown report into styled ratatui lines with
// word wrapping. Supports what analysis reports actually contain: headings,
// paragraphs, bold/italic, inline code, fenced code blocks, bullet and
// numbered lists, and rules. Everything else falls through as plain text.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use super::theme::Theme;

/// Render markdown to display lines, wrapped to `width` columns.
pub fn render_markdown(markdown: &str, width: usize, theme: &Theme) -> Vec<Line<'static>> {
    let width = width.max(10);
    let mut r = Renderer::new(width, theme);

    let options = Options::ENABLE_STRIKETHROUGH;
    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                r.flush();
                r.heading = Some(heading_depth(level));
            }
            Event::End(TagEnd::Heading(_)) => {
                r.flush();
                r.blank();
                r.heading = None;
            }
            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                r.flush();
                if r.list_stack.is_empty() {
                    r.blank();
                }
            }
            Event::Start(Tag::Strong) => r.bold = true,
            Event::End(TagEnd::Strong) => r.bold = false,
            Event::Start(Tag::Emphasis) => r.italic = true,
            Event::End(TagEnd::Emphasis) => r.italic = false,
            Event::Start(Tag::List(start)) => {
                r.flush();
                r.list_stack.push((start.is_some(), start.unwrap_or(1)));
            }
            Event::End(TagEnd::List(_)) => {
                r.list_stack.pop();
                if r.list_stack.is_empty() {
                    r.blank();
                }
            }
            Event::Start(Tag::Item) => r.begin_item(),
            Event::End(TagEnd::Item) => r.flush(),
            Event::Start(Tag::CodeBlock(_)) => {
                r.flush();
                r.in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                r.in_code_block = false;
                r.blank();
            }
            Event::Start(Tag::BlockQuote) => {
                r.flush();
                r.quote_depth += 1;
            }
            Event::End(TagEnd::BlockQuote) => {
                r.flush();
                r.quote_depth -= 1;
                if r.quote_depth == 0 {
                    r.blank();
                }
            }
            Event::Text(text) => r.text(&text),
            Event::Code(code) => r.word(&format!("`{code}`"), r.theme.code),
            Event::SoftBreak => {}
            Event::HardBreak => r.flush(),
            Event::Rule => {
                r.flush();
                r.rule();
            }
            _ => {}
        }
    }
    r.flush();

    // Drop trailing blank lines left by block spacing.
    while r
        .lines
        .last()
        .is_some_and(|l| l.spans.iter().all(|s| s.content.trim().is_empty()))
    {
        r.lines.pop();
    }
    r.lines
}

fn heading_depth(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

struct Renderer<'t> {
    theme: &'t Theme,
    width: usize,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    current_width: usize,
    bold: bool,
    italic: bool,
    heading: Option<u8>,
    in_code_block: bool,
    quote_depth: usize,
    list_stack: Vec<(bool, u64)>,
}

impl<'t> Renderer<'t> {
    fn new(width: usize, theme: &'t Theme) -> Self {
        Self {
            theme,
            width,
            lines: Vec::new(),
            current: Vec::new(),
            current_width: 0,
            bold: false,
            italic: false,
            heading: None,
            in_code_block: false,
            quote_depth: 0,
            list_stack: Vec::new(),
        }
    }

    fn inline_style(&self) -> Style {
        if self.heading.is_some() {
            return self.theme.heading;
        }
        let mut style = self.theme.text;
        if self.bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic {
            style = style.add_modifier(Modifier::ITALIC);
        }
        style
    }

    fn text(&mut self, text: &str) {
        if self.in_code_block {
            // Code is verbatim: one display line per source line, no wrap.
            self.flush();
            for line in text.lines() {
                self.lines
                    .push(Line::from(Span::styled(line.to_string(), self.theme.code)));
            }
            return;
        }
        let style = self.inline_style();
        for word in text.split_whitespace() {
            self.word(word, style);
        }
    }

    /// Append one word, wrapping when it would overflow the width.
    fn word(&mut self, word: &str, style: Style) {
        if self.current.is_empty() {
            self.prefix();
        }
        let word_width = UnicodeWidthStr::width(word);
        // List markers and quote bars already end in a space; only separate
        // from a preceding word.
        let space = usize::from(
            self.current
                .last()
                .is_some_and(|s| !s.content.ends_with(' ')),
        );
        if self.current_width + space + word_width > self.width && !self.current.is_empty() {
            self.flush_continuation();
            self.prefix();
        } else if space == 1 {
            self.current.push(Span::raw(" "));
            self.current_width += 1;
        }
        self.current.push(Span::styled(word.to_string(), style));
        self.current_width += word_width;
    }

    fn begin_item(&mut self) {
        self.flush();
        let depth = self.list_stack.len().saturating_sub(1);
        let marker = match self.list_stack.last_mut() {
            Some((true, n)) => {
                let marker = format!("{}{}. ", "  ".repeat(depth), n);
                *n += 1;
                marker
            }
            _ => format!("{}• ", "  ".repeat(depth)),
        };
        self.current_width += UnicodeWidthStr::width(marker.as_str());
        self.current.push(Span::styled(marker, self.theme.accent));
    }

    /// Block prefix (quote bars) for a fresh line.
    fn prefix(&mut self) {
        if self.quote_depth > 0 && self.current.is_empty() {
            let marker = "│ ".repeat(self.quote_depth);
            self.current_width += UnicodeWidthStr::width(marker.as_str());
            self.current.push(Span::styled(marker, self.theme.dim));
        }
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            let spans = std::mem::take(&mut self.current);
            self.lines.push(Line::from(spans));
            self.current_width = 0;
        }
    }

    /// Flush mid-paragraph (wrap); wrapped list content hangs under the
    /// marker.
    fn flush_continuation(&mut self) {
        let spans = std::mem::take(&mut self.current);
        self.lines.push(Line::from(spans));
        self.current_width = 0;
        if !self.list_stack.is_empty() {
            let indent = "  ".repeat(self.list_stack.len());
            self.current_width += UnicodeWidthStr::width(indent.as_str());
            self.current.push(Span::raw(indent));
        }
    }

    fn blank(&mut self) {
        if !self.lines.is_empty() {
            self.lines.push(Line::default());
            self.current.clear();
            self.current_width = 0;
        }
    }

    fn rule(&mut self) {
        self.lines.push(Line::from(Span::styled(
            "─".repeat(self.width.min(40)),
            self.theme.dim,
        )));
        self.blank();
    }
}
