//! Syntax highlighting for code blocks.
//!
//! Produces classed HTML: every syntax scope becomes a `siter-` prefixed
//! class, each source line is wrapped in its own span (so stylesheets can
//! number lines and mark highlighted ones), and the whole block is wrapped
//! in a `<div>` carrying the configured container class. Unknown languages
//! fall back to an escaped `<pre>` with no markup.

use crate::config;
use std::collections::HashSet;
use syntect::{
    html::{ClassStyle, line_tokens_to_classed_spans},
    parsing::{ParseState, SCOPE_REPO, Scope, ScopeStack, SyntaxSet},
    util::LinesWithEndings,
};

/// A syntax highlighter over the bundled syntax definitions.
pub struct Highlighter {
    /// The loaded syntax set.
    syntaxes: SyntaxSet,
}

impl Highlighter {
    /// Loads the default syntax definitions.
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
        }
    }

    /// Highlights `code` as `lang`, marking the 1-based `marked_lines`, and
    /// returns an HTML fragment wrapped in a `<div class="{css_class}">`.
    ///
    /// An unrecognized language returns the escaped fallback block instead.
    // Clippy: there is no non-deprecated API for emitting classed spans
    // line by line; each line must close its open scopes and reopen them on
    // the next so lines can live in separate elements.
    #[allow(deprecated)]
    pub fn highlight(
        &self,
        lang: &str,
        code: &str,
        marked_lines: &HashSet<usize>,
        css_class: &str,
    ) -> String {
        let Some(syntax) = self.syntaxes.find_syntax_by_token(lang) else {
            return fallback(code, css_class);
        };

        let class_style = ClassStyle::SpacedPrefixed {
            prefix: config::CODE_CLASS_PREFIX,
        };

        let mut state = ParseState::new(syntax);
        let mut stack = ScopeStack::new();
        let mut out = format!(r#"<div class="{css_class}"><pre>"#);

        for (index, line) in LinesWithEndings::from(code).enumerate() {
            if marked_lines.contains(&(index + 1)) {
                out += r#"<span class="siter-line siter-hl">"#;
            } else {
                out += r#"<span class="siter-line">"#;
            }

            for scope in stack.as_slice() {
                out += r#"<span class=""#;
                scope_to_classes(&mut out, *scope, class_style);
                out += r#"">"#;
            }

            let spans = state.parse_line(line, &self.syntaxes).ok().and_then(|ops| {
                line_tokens_to_classed_spans(line, &ops, class_style, &mut stack).ok()
            });
            match spans {
                Some((html, to_close)) => {
                    out += &html;
                    for _ in 0..stack.len() + to_close.min(0).unsigned_abs() {
                        out += "</span>";
                    }
                }
                None => out += &html_escape::encode_text(line),
            }

            out += "</span>";
        }

        out += "</pre></div>";
        out
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

/// Expands a syntax scope into space-separated class names.
fn scope_to_classes(out: &mut String, scope: Scope, style: ClassStyle) {
    let repo = SCOPE_REPO.lock().unwrap();
    for i in 0..scope.len() {
        let atom = scope.atom_at(i as usize);
        if i != 0 {
            out.push(' ');
        }
        if let ClassStyle::SpacedPrefixed { prefix } = style {
            out.push_str(prefix);
        }
        out.push_str(repo.atom_str(atom));
    }
}

/// The unhighlighted block emitted when no syntax matches.
fn fallback(code: &str, css_class: &str) -> String {
    format!(
        r#"<div class="{css_class}"><pre>{}</pre></div>"#,
        html_escape::encode_text(code)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_falls_back_to_escaped_pre() {
        let hl = Highlighter::new();
        let out = hl.highlight(
            "not-a-language",
            "a < b\nb > c\n",
            &HashSet::new(),
            "siter_code",
        );
        assert_eq!(
            out,
            "<div class=\"siter_code\"><pre>a &lt; b\nb &gt; c\n</pre></div>"
        );
    }

    #[test]
    fn known_language_emits_classed_lines() {
        let hl = Highlighter::new();
        let out = hl.highlight("rust", "let x = 1;\nlet y = 2;\n", &HashSet::new(), "c");
        assert!(out.starts_with("<div class=\"c\"><pre>"));
        assert!(out.ends_with("</pre></div>"));
        assert_eq!(out.matches(r#"<span class="siter-line">"#).count(), 2);
        assert!(out.contains("siter-source"));
    }

    #[test]
    fn marked_lines_get_the_highlight_class() {
        let hl = Highlighter::new();
        let marked = HashSet::from([2]);
        let out = hl.highlight("rust", "let x = 1;\nlet y = 2;\n", &marked, "c");
        assert_eq!(out.matches(r#"<span class="siter-line siter-hl">"#).count(), 1);
    }
}
