use crate::images::{resolve_image_src, rewrite_raw_html};
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};
use std::path::Path;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;

const CODE_THEME: &str = "InspiredGitHub";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// The panel shown in place of a document that could not be loaded.
pub fn render_error_panel(path: Option<&str>, message: &str) -> String {
    let mut out = String::from("<div class=\"mdview-error\">");
    if let Some(path) = path {
        out.push_str("<p class=\"mdview-error-path\">");
        out.push_str(&escape_html(path));
        out.push_str("</p>");
    }
    out.push_str("<p class=\"mdview-error-message\">");
    out.push_str(&escape_html(message));
    out.push_str("</p></div>");
    out
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options
}

/// Markdown to HTML with highlighted code blocks. Loading the syntax and
/// theme sets is slow, so one renderer is built per process and shared.
pub struct Renderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }

    /// Highlighted HTML for `code`, or `None` when `language` is unknown.
    pub fn highlight(&self, code: &str, language: &str) -> Option<String> {
        let syntax = self.syntax_set.find_syntax_by_token(language.trim())?;
        let theme = self.theme_set.themes.get(CODE_THEME)?;
        match syntect::html::highlighted_html_for_string(code, &self.syntax_set, syntax, theme) {
            Ok(html) => Some(html),
            Err(e) => {
                log::warn!("highlighting {language} failed: {e}");
                None
            }
        }
    }

    fn code_block(&self, code: &str, language: Option<&str>) -> String {
        if let Some(language) = language.filter(|lang| !lang.is_empty()) {
            if let Some(html) = self.highlight(code, language) {
                return html;
            }
            return format!(
                "<pre><code class=\"language-{}\">{}</code></pre>\n",
                escape_html(language),
                escape_html(code)
            );
        }
        format!("<pre><code>{}</code></pre>\n", escape_html(code))
    }

    /// Render a document. Relative image paths resolve against `base_dir`;
    /// without one they are left for the webview.
    pub fn render(&self, markdown: &str, base_dir: Option<&Path>) -> String {
        let mut events = Vec::new();
        // (language, collected text) while inside a code block
        let mut code: Option<(Option<String>, String)> = None;

        for event in Parser::new_ext(markdown, parser_options()) {
            if let Some((language, text)) = code.as_mut() {
                match event {
                    Event::Text(chunk) => text.push_str(&chunk),
                    Event::End(TagEnd::CodeBlock) => {
                        let html = self.code_block(text, language.as_deref());
                        events.push(Event::Html(CowStr::from(html)));
                        code = None;
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let language = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(str::to_string),
                        CodeBlockKind::Indented => None,
                    };
                    code = Some((language, String::new()));
                }
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => {
                    let resolved = resolve_image_src(&dest_url, base_dir);
                    events.push(Event::Start(Tag::Image {
                        link_type,
                        dest_url: CowStr::from(resolved),
                        title,
                        id,
                    }));
                }
                Event::Html(raw) => {
                    events.push(Event::Html(CowStr::from(rewrite_raw_html(&raw, base_dir))));
                }
                Event::InlineHtml(raw) => {
                    events.push(Event::InlineHtml(CowStr::from(rewrite_raw_html(
                        &raw, base_dir,
                    ))));
                }
                other => events.push(other),
            }
        }

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_error_panel_escapes_path_and_message() {
        let html = render_error_panel(Some("/tmp/<x>.md"), "no such file");
        assert!(html.starts_with("<div class=\"mdview-error\">"));
        assert!(html.contains("/tmp/&lt;x&gt;.md"));
        assert!(html.contains("no such file"));
        assert!(!render_error_panel(None, "boom").contains("mdview-error-path"));
    }

    #[test]
    fn test_renders_gfm_extensions() {
        let renderer = Renderer::new();
        let html = renderer.render(
            "# Title\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n\n- [x] done\n",
            None,
        );
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains("checkbox"));
    }

    #[test]
    fn test_known_language_is_highlighted() {
        let renderer = Renderer::new();
        let html = renderer.render("```rust\nfn main() {}\n```\n", None);
        assert!(html.contains("<pre style="), "{html}");
        assert!(html.contains("main"));
        assert!(!html.contains("language-rust"));
    }

    #[test]
    fn test_unknown_language_is_escaped_plain_block() {
        let renderer = Renderer::new();
        let html = renderer.render("```nosuchlang\n<b>\n```\n", None);
        assert!(html.contains("<pre><code class=\"language-nosuchlang\">&lt;b&gt;\n</code></pre>"));

        let html = renderer.render("    indented <i>\n", None);
        assert!(html.contains("<pre><code>indented &lt;i&gt;\n</code></pre>"));
    }

    #[cfg(unix)]
    #[test]
    fn test_images_resolve_against_base_dir() {
        let renderer = Renderer::new();
        let html = renderer.render(
            "![shot](img/a.png)\n\n<img src=\"b.png\">\n",
            Some(Path::new("/docs")),
        );
        assert!(html.contains("src=\"asset://localhost/%2Fdocs%2Fimg%2Fa.png\""), "{html}");
        assert!(html.contains("src=\"asset://localhost/%2Fdocs%2Fb.png\""), "{html}");
    }

    #[test]
    fn test_images_untouched_without_base_dir() {
        let renderer = Renderer::new();
        let html = renderer.render("![shot](img/a.png)\n", None);
        assert!(html.contains("src=\"img/a.png\""));
    }
}
