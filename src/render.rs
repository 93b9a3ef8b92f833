//! Markdown message rendering for the terminal.
//!
//! `render_message` is a pure function of the message content and sender.
//! Fenced code blocks tagged with a language syntect knows are highlighted;
//! everything else code-like is shown in a flat code style.

use std::sync::OnceLock;

use pulldown_cmark::{CodeBlockKind, Event, LinkType, Options, Parser, Tag, TagEnd};
use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use syntect::{
    easy::HighlightLines,
    highlighting::{FontStyle, Theme, ThemeSet},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

const THEME_NAME: &str = "base16-ocean.dark";
const RULE_WIDTH: usize = 24;

pub const BOT_LABEL: &str = "AI:";
pub const USER_LABEL: &str = "You:";

const CODE_STYLE: Style = Style::new().fg(Color::LightYellow);
const GUTTER_STYLE: Style = Style::new().fg(Color::DarkGray);

struct HighlightAssets {
    syntax_set: SyntaxSet,
    theme: Option<Theme>,
}

fn assets() -> &'static HighlightAssets {
    static ASSETS: OnceLock<HighlightAssets> = OnceLock::new();
    ASSETS.get_or_init(|| {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let mut themes = ThemeSet::load_defaults().themes;
        let theme = themes
            .remove(THEME_NAME)
            .or_else(|| themes.into_values().next());
        HighlightAssets { syntax_set, theme }
    })
}

fn label_style(is_bot: bool) -> Style {
    let color = if is_bot { Color::Yellow } else { Color::Cyan };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Renders one chat message: a sender label followed by its markdown body.
pub fn render_message(content: &str, is_bot: bool) -> Vec<Line<'static>> {
    let alignment = if is_bot { Alignment::Left } else { Alignment::Right };
    let label = if is_bot { BOT_LABEL } else { USER_LABEL };

    let mut lines = vec![Line::from(Span::styled(label, label_style(is_bot)))];
    lines.extend(render_markdown(content, is_bot));

    lines
        .into_iter()
        .map(|line| line.alignment(alignment))
        .collect()
}

/// Renders markdown into terminal lines without the sender label.
pub fn render_markdown(content: &str, is_bot: bool) -> Vec<Line<'static>> {
    let base = if is_bot {
        Style::default()
    } else {
        Style::default().fg(Color::Cyan)
    };

    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut writer = MarkdownWriter::new(base);
    for event in Parser::new_ext(content, options) {
        writer.handle(event);
    }
    writer.finish()
}

struct CodeBlock {
    lang: Option<String>,
    buffer: String,
}

struct ListState {
    next_number: Option<u64>,
}

struct LinkState {
    url: String,
    show_url: bool,
}

struct MarkdownWriter {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    styles: Vec<Style>,
    lists: Vec<ListState>,
    links: Vec<LinkState>,
    quote_depth: usize,
    code_block: Option<CodeBlock>,
    needs_gap: bool,
    item_marker: Option<String>,
}

impl MarkdownWriter {
    fn new(base: Style) -> Self {
        Self {
            lines: Vec::new(),
            current: Vec::new(),
            styles: vec![base],
            lists: Vec::new(),
            links: Vec::new(),
            quote_depth: 0,
            code_block: None,
            needs_gap: false,
            item_marker: None,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, patch: Style) {
        let style = self.style().patch(patch);
        self.styles.push(style);
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn start_block(&mut self) {
        self.flush_line();
        if self.needs_gap && !self.lines.is_empty() {
            self.lines.push(Line::default());
        }
        self.needs_gap = false;
    }

    fn end_block(&mut self) {
        self.flush_line();
        self.needs_gap = true;
    }

    /// Quote bars, list indentation and a pending bullet for the next line.
    fn line_prefix(&mut self) -> Vec<Span<'static>> {
        let mut prefix = Vec::new();
        if self.quote_depth > 0 {
            prefix.push(Span::styled("▏ ".repeat(self.quote_depth), GUTTER_STYLE));
        }
        let depth = self.lists.len();
        if depth > 0 {
            let indent = "  ".repeat(depth - 1);
            match self.item_marker.take() {
                Some(marker) => prefix.push(Span::styled(
                    format!("{indent}{marker}"),
                    Style::default().fg(Color::Magenta),
                )),
                None => prefix.push(Span::raw(format!("{indent}  "))),
            }
        }
        prefix
    }

    fn push_span(&mut self, span: Span<'static>) {
        if self.current.is_empty() {
            let prefix = self.line_prefix();
            self.current.extend(prefix);
        }
        self.current.push(span);
    }

    fn flush_line(&mut self) {
        if self.current.is_empty() {
            if self.item_marker.is_some() {
                // Empty list item: still show its bullet
                let prefix = self.line_prefix();
                self.lines.push(Line::from(prefix));
            }
            return;
        }
        self.lines.push(Line::from(std::mem::take(&mut self.current)));
    }

    fn handle(&mut self, event: Event<'_>) {
        if let Some(block) = self.code_block.as_mut() {
            match &event {
                Event::Text(text) => {
                    block.buffer.push_str(text);
                    return;
                }
                Event::End(TagEnd::CodeBlock) => {}
                _ => return,
            }
        }

        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => {
                let style = self.style();
                self.push_span(Span::styled(text.into_string(), style));
            }
            Event::Code(code) => {
                self.push_span(Span::styled(code.into_string(), CODE_STYLE));
            }
            Event::Html(html) => {
                let style = self.style();
                for part in html.lines() {
                    self.push_span(Span::styled(part.to_string(), style));
                    self.flush_line();
                }
            }
            Event::InlineHtml(html) => {
                let style = self.style();
                self.push_span(Span::styled(html.into_string(), style));
            }
            Event::SoftBreak => {
                let style = self.style();
                self.push_span(Span::styled(" ", style));
            }
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.start_block();
                self.lines
                    .push(Line::styled("─".repeat(RULE_WIDTH), GUTTER_STYLE));
                self.needs_gap = true;
            }
            Event::TaskListMarker(checked) => {
                let mark = if checked { "[x] " } else { "[ ] " };
                self.push_span(Span::styled(mark, GUTTER_STYLE));
            }
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.item_marker.is_none() {
                    self.start_block();
                }
            }
            Tag::Heading { .. } => {
                self.start_block();
                self.push_style(
                    Style::default()
                        .fg(Color::LightCyan)
                        .add_modifier(Modifier::BOLD),
                );
            }
            Tag::BlockQuote { .. } => {
                self.start_block();
                self.quote_depth += 1;
                self.push_style(Style::default().add_modifier(Modifier::ITALIC));
            }
            Tag::CodeBlock(kind) => {
                self.start_block();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string)
                        .filter(|s| !s.is_empty()),
                    CodeBlockKind::Indented => None,
                };
                self.code_block = Some(CodeBlock {
                    lang,
                    buffer: String::new(),
                });
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.start_block();
                } else {
                    self.flush_line();
                }
                self.lists.push(ListState { next_number: start });
            }
            Tag::Item => {
                self.flush_line();
                let marker = match self.lists.last_mut() {
                    Some(ListState { next_number: Some(n) }) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.item_marker = Some(marker);
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link {
                link_type,
                dest_url,
                ..
            } => {
                let show_url = !matches!(link_type, LinkType::Autolink | LinkType::Email)
                    && !dest_url.is_empty();
                self.links.push(LinkState {
                    url: dest_url.into_string(),
                    show_url,
                });
                self.push_style(
                    Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if self.lists.is_empty() {
                    self.end_block();
                } else {
                    self.flush_line();
                }
            }
            TagEnd::Heading { .. } => {
                self.pop_style();
                self.end_block();
            }
            TagEnd::BlockQuote { .. } => {
                self.flush_line();
                self.pop_style();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.needs_gap = true;
            }
            TagEnd::CodeBlock => {
                if let Some(block) = self.code_block.take() {
                    for line in render_code_block(&block.buffer, block.lang.as_deref()) {
                        let mut spans = self.line_prefix();
                        spans.extend(line.spans);
                        self.lines.push(Line::from(spans));
                    }
                }
                self.needs_gap = true;
            }
            TagEnd::List { .. } => {
                self.flush_line();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.needs_gap = true;
                }
            }
            TagEnd::Item => self.flush_line(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(link) = self.links.pop() {
                    if link.show_url {
                        self.push_span(Span::styled(format!(" ({})", link.url), GUTTER_STYLE));
                    }
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush_line();
        self.lines
    }
}

/// Resolves a fence tag to a syntax, if syntect has one for it.
pub fn find_syntax(lang: &str) -> Option<&'static SyntaxReference> {
    let syntax_set = &assets().syntax_set;
    syntax_set
        .find_syntax_by_token(lang)
        .or_else(|| syntax_set.find_syntax_by_extension(lang))
}

fn render_code_block(code: &str, lang: Option<&str>) -> Vec<Line<'static>> {
    let code = code.strip_suffix('\n').unwrap_or(code);
    let highlighted = lang
        .and_then(find_syntax)
        .and_then(|syntax| highlight_lines(code, syntax));

    match highlighted {
        Some(lines) => lines,
        None => code
            .split('\n')
            .map(|line| {
                Line::from(vec![
                    Span::styled("│ ", GUTTER_STYLE),
                    Span::styled(line.replace('\t', "    "), CODE_STYLE),
                ])
            })
            .collect(),
    }
}

fn highlight_lines(code: &str, syntax: &SyntaxReference) -> Option<Vec<Line<'static>>> {
    let assets = assets();
    let theme = assets.theme.as_ref()?;
    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut lines = Vec::new();

    for raw in LinesWithEndings::from(code) {
        let ranges = highlighter.highlight_line(raw, &assets.syntax_set).ok()?;
        let mut spans = vec![Span::styled("│ ", GUTTER_STYLE)];
        for (style, segment) in ranges {
            let segment = segment.trim_end_matches('\n').replace('\t', "    ");
            if segment.is_empty() {
                continue;
            }
            let fg = style.foreground;
            let mut span_style = Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b));
            if style.font_style.contains(FontStyle::BOLD) {
                span_style = span_style.add_modifier(Modifier::BOLD);
            }
            if style.font_style.contains(FontStyle::ITALIC) {
                span_style = span_style.add_modifier(Modifier::ITALIC);
            }
            spans.push(Span::styled(segment, span_style));
        }
        lines.push(Line::from(spans));
    }

    Some(lines)
}
