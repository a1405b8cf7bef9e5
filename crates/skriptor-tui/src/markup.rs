//! Display markup to styled terminal lines.
//!
//! Understands what the core renderer emits (`h1`-`h3`, `pre`/`code`, `br`)
//! plus the common block and inline tags of server-rendered HTML previews.
//! Unknown tags are dropped; their text is kept.

use once_cell::sync::Lazy;
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use regex::Regex;

static TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9]*)([^>]*)>").expect("valid tag pattern"));

static LANGUAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"class\s*=\s*"language-([^"]*)""#).expect("valid class pattern"));

static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]+|#x[0-9A-Fa-f]+|[A-Za-z]+);").expect("valid entity pattern"));

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "header", "footer", "ul", "ol", "table", "tr", "blockquote",
    "h4", "h5", "h6", "hr",
];

pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            let decoded = match name {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ if name.starts_with("#x") => {
                    u32::from_str_radix(&name[2..], 16).ok().and_then(char::from_u32)
                }
                _ if name.starts_with('#') => name[1..].parse().ok().and_then(char::from_u32),
                _ => None,
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

#[derive(Default)]
struct LineBuilder {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    heading: Option<usize>,
    in_code: bool,
    bold: usize,
    italic: usize,
    skip: usize,
    // Set right after a block closes so a following <br> adds no blank line.
    block_closed: bool,
}

impl LineBuilder {
    fn style(&self) -> Style {
        let mut style = Style::default();
        if let Some(level) = self.heading {
            style = style.add_modifier(Modifier::BOLD).fg(match level {
                1 => Color::Magenta,
                2 => Color::Cyan,
                _ => Color::Blue,
            });
            if level == 1 {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
        }
        if self.in_code {
            style = style.fg(Color::Green);
        }
        if self.bold > 0 {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        style
    }

    fn push_text(&mut self, raw: &str) {
        if self.skip > 0 || raw.is_empty() {
            return;
        }

        let text = decode_entities(raw);
        if self.in_code {
            let mut parts = text.split('\n').peekable();
            while let Some(part) = parts.next() {
                if !part.is_empty() {
                    self.current.push(Span::styled(part.to_string(), self.style()));
                }
                if parts.peek().is_some() {
                    self.break_line();
                }
            }
        } else {
            let collapsed = text.replace(['\n', '\r'], " ");
            if self.current.is_empty() && collapsed.trim().is_empty() {
                return;
            }
            self.current.push(Span::styled(collapsed, self.style()));
        }
        self.block_closed = false;
    }

    fn break_line(&mut self) {
        let spans = std::mem::take(&mut self.current);
        self.lines.push(Line::from(spans));
    }

    fn end_block(&mut self) {
        if !self.current.is_empty() {
            self.break_line();
        }
        self.block_closed = true;
    }

    fn tag(&mut self, closing: bool, name: &str, attrs: &str) {
        match (closing, name) {
            (_, "script" | "style") => {
                if closing {
                    self.skip = self.skip.saturating_sub(1);
                } else {
                    self.skip += 1;
                }
            }
            (false, "br") => {
                if self.block_closed && self.current.is_empty() {
                    self.block_closed = false;
                } else {
                    self.break_line();
                }
            }
            (false, "h1" | "h2" | "h3") => {
                self.end_block();
                self.heading = name[1..].parse().ok();
            }
            (true, "h1" | "h2" | "h3") => {
                self.end_block();
                self.heading = None;
            }
            (false, "pre") => {
                self.end_block();
                self.in_code = true;
            }
            (true, "pre") => {
                self.end_block();
                self.in_code = false;
            }
            (false, "code") if self.in_code => {
                if let Some(lang) = LANGUAGE.captures(attrs).map(|c| c[1].to_string()) {
                    if !lang.is_empty() {
                        self.lines.push(Line::from(Span::styled(
                            format!("[{}]", lang),
                            Style::default().fg(Color::DarkGray),
                        )));
                    }
                }
            }
            (false, "li") => {
                self.end_block();
                self.current.push(Span::raw("  • "));
            }
            (true, "li") => self.end_block(),
            (false, "strong" | "b") => self.bold += 1,
            (true, "strong" | "b") => self.bold = self.bold.saturating_sub(1),
            (false, "em" | "i") => self.italic += 1,
            (true, "em" | "i") => self.italic = self.italic.saturating_sub(1),
            (_, tag) if BLOCK_TAGS.contains(&tag) => self.end_block(),
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        if !self.current.is_empty() {
            self.break_line();
        }
        self.lines
    }
}

/// Convert display markup into terminal lines.
pub fn to_lines(markup: &str) -> Vec<Line<'static>> {
    let mut builder = LineBuilder::default();
    let mut last = 0;

    for caps in TAG.captures_iter(markup) {
        let Some(whole) = caps.get(0) else { continue };
        builder.push_text(&markup[last..whole.start()]);

        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        builder.tag(closing, &name, &caps[3]);

        last = whole.end();
    }
    builder.push_text(&markup[last..]);

    builder.finish()
}

/// Plain text of a line, for tests and width calculations.
pub fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}
