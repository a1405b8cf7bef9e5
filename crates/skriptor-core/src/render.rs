//! Lightweight text-to-markup rendering for chat turns and plain-text previews.
//!
//! Three passes over the input: fenced code blocks, then headings outside of
//! those blocks, then every remaining newline becomes `<br>`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```([A-Za-z0-9_+\-]*)\n(.*?)```").expect("valid fence pattern"));

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(#{1,3})[ \t]+(.+)$").expect("valid heading pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRenderer {
    escape: bool,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRenderer {
    /// Escapes markup-significant characters before rewriting.
    pub fn new() -> Self {
        Self { escape: true }
    }

    /// Inserts raw text without escaping. Only for a fully trusted backend.
    pub fn trusted() -> Self {
        Self { escape: false }
    }

    pub fn with_escaping(escape: bool) -> Self {
        Self { escape }
    }

    /// Total over any input; never fails.
    pub fn render(&self, raw: &str) -> String {
        let text = if self.escape {
            escape_markup(raw)
        } else {
            raw.to_string()
        };

        let mut out = String::with_capacity(text.len() + 32);
        let mut last = 0;

        for caps in FENCE.captures_iter(&text) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&render_headings(&text[last..whole.start()]));

            let language = caps.get(1).map_or("", |m| m.as_str());
            let code = caps.get(2).map_or("", |m| m.as_str());
            out.push_str(&format!(
                "<pre><code class=\"language-{}\">{}</code></pre>",
                language, code
            ));

            last = whole.end();
        }
        out.push_str(&render_headings(&text[last..]));

        out.replace('\n', "<br>")
    }
}

fn render_headings(segment: &str) -> String {
    HEADING
        .replace_all(segment, |caps: &Captures| {
            let level = caps[1].len();
            format!("<h{level}>{}</h{level}>", &caps[2])
        })
        .into_owned()
}

pub fn escape_markup(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_then_code_block() {
        let html = TextRenderer::new().render("# Title\n```py\nprint(1)\n```");
        assert_eq!(
            html,
            "<h1>Title</h1><br><pre><code class=\"language-py\">print(1)<br></code></pre>"
        );
    }

    #[test]
    fn test_heading_levels_follow_marker_run() {
        let renderer = TextRenderer::new();
        assert_eq!(renderer.render("## Ziele"), "<h2>Ziele</h2>");
        assert_eq!(renderer.render("### Modul 1"), "<h3>Modul 1</h3>");
    }

    #[test]
    fn test_four_markers_stay_literal() {
        assert_eq!(TextRenderer::new().render("#### Deep"), "#### Deep");
    }

    #[test]
    fn test_marker_without_space_is_not_heading() {
        assert_eq!(TextRenderer::new().render("#hashtag"), "#hashtag");
    }

    #[test]
    fn test_fence_without_language_has_empty_tag() {
        let html = TextRenderer::new().render("```\nls -la\n```");
        assert_eq!(html, "<pre><code class=\"language-\">ls -la<br></code></pre>");
    }

    #[test]
    fn test_fence_matching_is_non_greedy() {
        let html = TextRenderer::new().render("```a\none\n```\nmid\n```b\ntwo\n```");
        assert_eq!(html.matches("<pre>").count(), 2);
        assert!(html.contains("<code class=\"language-a\">one<br></code>"));
        assert!(html.contains("<br>mid<br>"));
        assert!(html.contains("<code class=\"language-b\">two<br></code>"));
    }

    #[test]
    fn test_hash_lines_inside_fence_are_literal() {
        let html = TextRenderer::new().render("```sh\n# comment\n```");
        assert!(html.contains("# comment"));
        assert!(!html.contains("<h1>"));
    }

    #[test]
    fn test_unclosed_fence_is_plain_text() {
        let html = TextRenderer::new().render("```py\nprint(1)");
        assert_eq!(html, "```py<br>print(1)");
    }

    #[test]
    fn test_plain_text_only_gains_breaks() {
        let raw = "Welche Mitarbeitergruppen sollen geschult werden?\nBitte antworten Sie kurz.";
        let html = TextRenderer::new().render(raw);
        assert_eq!(html, raw.replace('\n', "<br>"));
    }

    #[test]
    fn test_escapes_markup_by_default() {
        let html = TextRenderer::new().render("# <script>alert(1)</script>");
        assert_eq!(html, "<h1>&lt;script&gt;alert(1)&lt;/script&gt;</h1>");
    }

    #[test]
    fn test_trusted_renderer_passes_markup_through() {
        let html = TextRenderer::trusted().render("<b>bold</b>\nnext");
        assert_eq!(html, "<b>bold</b><br>next");
    }

    #[test]
    fn test_empty_and_odd_inputs_do_not_fail() {
        let renderer = TextRenderer::new();
        assert_eq!(renderer.render(""), "");
        assert_eq!(renderer.render("```"), "```");
        assert_eq!(renderer.render("#"), "#");
        assert_eq!(renderer.render("\n\n"), "<br><br>");
    }
}
