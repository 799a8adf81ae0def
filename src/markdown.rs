//! Lightweight markdown: a single-pass parser into a small document tree,
//! rendered once either as HTML or as styled terminal lines.
//!
//! Supported: `**bold**`, `*italic*`, `1.` numbered items, `-`/`*` bullet
//! items, `#`/`##`/`###` headers and blank-line paragraph breaks. Anything
//! else is plain text.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Inline content inside a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Bold(Vec<Inline>),
    Italic(String),
}

/// One line of inline content
pub type InlineLine = Vec<Inline>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: InlineLine },
    /// Consecutive text lines with no blank line between them
    Paragraph(Vec<InlineLine>),
    OrderedList(Vec<InlineLine>),
    BulletList(Vec<InlineLine>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

enum LineKind<'a> {
    Blank,
    Heading(u8, &'a str),
    Ordered(&'a str),
    Bullet(&'a str),
    Text(&'a str),
}

/// Parse markdown text into a document tree
pub fn parse(text: &str) -> Document {
    let mut blocks = Vec::new();
    let mut open: Option<Block> = None;

    for raw in text.lines() {
        match classify(raw) {
            LineKind::Blank => {
                blocks.extend(open.take());
            }
            LineKind::Heading(level, content) => {
                blocks.extend(open.take());
                blocks.push(Block::Heading {
                    level,
                    content: parse_inlines(content),
                });
            }
            LineKind::Ordered(item) => match open.as_mut() {
                Some(Block::OrderedList(items)) => items.push(parse_inlines(item)),
                _ => {
                    blocks.extend(open.take());
                    open = Some(Block::OrderedList(vec![parse_inlines(item)]));
                }
            },
            LineKind::Bullet(item) => match open.as_mut() {
                Some(Block::BulletList(items)) => items.push(parse_inlines(item)),
                _ => {
                    blocks.extend(open.take());
                    open = Some(Block::BulletList(vec![parse_inlines(item)]));
                }
            },
            LineKind::Text(line) => match open.as_mut() {
                Some(Block::Paragraph(lines)) => lines.push(parse_inlines(line)),
                _ => {
                    blocks.extend(open.take());
                    open = Some(Block::Paragraph(vec![parse_inlines(line)]));
                }
            },
        }
    }
    blocks.extend(open);

    Document { blocks }
}

fn classify(line: &str) -> LineKind<'_> {
    let line = line.trim_start();
    if line.is_empty() {
        return LineKind::Blank;
    }

    let hashes = line.chars().take_while(|c| *c == '#').count();
    if (1..=3).contains(&hashes) {
        if let Some(content) = marker_content(&line[hashes..]) {
            return LineKind::Heading(hashes as u8, content);
        }
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix('.') {
            if let Some(content) = marker_content(rest) {
                return LineKind::Ordered(content);
            }
        }
    }

    if let Some(rest) = line.strip_prefix('-').or_else(|| line.strip_prefix('*')) {
        if let Some(content) = marker_content(rest) {
            return LineKind::Bullet(content);
        }
    }

    LineKind::Text(line)
}

/// Text after a line marker; the marker must be followed by whitespace and content
fn marker_content(rest: &str) -> Option<&str> {
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let content = rest.trim();
    (!content.is_empty()).then_some(content)
}

/// Parse bold and italic spans within a single line
pub fn parse_inlines(line: &str) -> InlineLine {
    let mut inlines = Vec::new();
    let mut text = String::new();
    let mut rest = line;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("**") {
            if let Some(end) = after.find("**") {
                flush_text(&mut text, &mut inlines);
                inlines.push(Inline::Bold(parse_inlines(&after[..end])));
                rest = &after[end + 2..];
                continue;
            }
        } else if let Some(after) = rest.strip_prefix('*') {
            if let Some(end) = after.find('*').filter(|end| *end > 0) {
                flush_text(&mut text, &mut inlines);
                inlines.push(Inline::Italic(after[..end].to_string()));
                rest = &after[end + 1..];
                continue;
            }
        }

        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            text.push(ch);
        }
        rest = chars.as_str();
    }
    flush_text(&mut text, &mut inlines);

    inlines
}

fn flush_text(text: &mut String, inlines: &mut InlineLine) {
    if !text.is_empty() {
        inlines.push(Inline::Text(std::mem::take(text)));
    }
}

/// Convert markdown to HTML in one pass
pub fn format_markdown(text: &str) -> String {
    parse(text).to_html()
}

/// Escape text for inclusion in HTML element content
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

impl Document {
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for block in &self.blocks {
            match block {
                Block::Heading { level, content } => {
                    html.push_str(&format!("<h{level}>"));
                    push_inline_html(&mut html, content);
                    html.push_str(&format!("</h{level}>"));
                }
                Block::Paragraph(lines) => {
                    html.push_str("<p>");
                    for (index, line) in lines.iter().enumerate() {
                        if index > 0 {
                            html.push('\n');
                        }
                        push_inline_html(&mut html, line);
                    }
                    html.push_str("</p>");
                }
                Block::OrderedList(items) => push_list_html(&mut html, "ol", items),
                Block::BulletList(items) => push_list_html(&mut html, "ul", items),
            }
        }
        html
    }

    /// Render as terminal lines, with a blank line between blocks
    pub fn to_lines(&self, base: Style) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for (index, block) in self.blocks.iter().enumerate() {
            if index > 0 {
                lines.push(Line::default());
            }
            match block {
                Block::Heading { level, content } => {
                    let style = heading_style(*level, base);
                    let mut spans = vec![Span::styled(format!("{} ", "#".repeat(*level as usize)), style)];
                    push_inline_spans(&mut spans, content, style);
                    lines.push(Line::from(spans));
                }
                Block::Paragraph(text_lines) => {
                    for line in text_lines {
                        let mut spans = Vec::new();
                        push_inline_spans(&mut spans, line, base);
                        lines.push(Line::from(spans));
                    }
                }
                Block::OrderedList(items) => {
                    for (position, item) in items.iter().enumerate() {
                        let mut spans = vec![Span::styled(format!("{}. ", position + 1), base.fg(Color::Cyan))];
                        push_inline_spans(&mut spans, item, base);
                        lines.push(Line::from(spans));
                    }
                }
                Block::BulletList(items) => {
                    for item in items {
                        let mut spans = vec![Span::styled("• ", base.fg(Color::Cyan))];
                        push_inline_spans(&mut spans, item, base);
                        lines.push(Line::from(spans));
                    }
                }
            }
        }
        lines
    }
}

fn push_list_html(html: &mut String, tag: &str, items: &[InlineLine]) {
    html.push_str(&format!("<{tag}>"));
    for item in items {
        html.push_str("<li>");
        push_inline_html(html, item);
        html.push_str("</li>");
    }
    html.push_str(&format!("</{tag}>"));
}

fn push_inline_html(html: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => html.push_str(&escape_html(text)),
            Inline::Bold(inner) => {
                html.push_str("<strong>");
                push_inline_html(html, inner);
                html.push_str("</strong>");
            }
            Inline::Italic(text) => {
                html.push_str("<em>");
                html.push_str(&escape_html(text));
                html.push_str("</em>");
            }
        }
    }
}

fn push_inline_spans(spans: &mut Vec<Span<'static>>, inlines: &[Inline], style: Style) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => spans.push(Span::styled(text.clone(), style)),
            Inline::Bold(inner) => push_inline_spans(spans, inner, style.add_modifier(Modifier::BOLD)),
            Inline::Italic(text) => {
                spans.push(Span::styled(text.clone(), style.add_modifier(Modifier::ITALIC)))
            }
        }
    }
}

fn heading_style(level: u8, base: Style) -> Style {
    let style = base.add_modifier(Modifier::BOLD);
    match level {
        1 => style.fg(Color::Magenta).add_modifier(Modifier::UNDERLINED),
        2 => style.fg(Color::Magenta),
        _ => style.fg(Color::LightMagenta),
    }
}
