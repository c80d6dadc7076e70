//! Markdown rendering.
//!
//! A thin layer over pulldown-cmark that supplies the two extensions page
//! authors rely on: fenced code blocks route through the syntax
//! highlighter, and headings receive slugified anchors with `#` permalinks
//! so a paragraph containing exactly `[TOC]` can be replaced by a table of
//! contents. Everything else is stock CommonMark (plus tables).

use crate::{config, highlight::Highlighter};
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};
use std::collections::HashSet;

/// The Markdown renderer.
pub struct Markdown {
    /// Enabled pulldown-cmark extensions.
    options: Options,
}

impl Markdown {
    /// Creates a renderer with tables and strikethrough enabled.
    pub fn new() -> Self {
        Self {
            options: Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH,
        }
    }

    /// Renders `source` to HTML.
    pub fn render(&self, source: &str, highlighter: &Highlighter) -> String {
        let mut events: Vec<Event<'_>> = Parser::new_ext(source, self.options).collect();
        let toc = anchor_headings(&mut events);
        let events = replace_toc(events, &toc);
        let events = highlight_fences(events, highlighter);

        let mut out = String::with_capacity(source.len() * 2);
        html::push_html(&mut out, events.into_iter());
        out
    }
}

impl Default for Markdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns text into a URL slug: lowercase, spaces to hyphens.
pub fn slug(text: &str) -> String {
    text.to_lowercase().replace(' ', "-")
}

/// One heading recorded for the table of contents.
struct TocEntry {
    /// Heading level, 1-6.
    level: u8,
    /// The anchor id assigned to the heading.
    id: String,
    /// The heading's plain text.
    text: String,
}

/// Assigns anchor ids and permalinks to every heading, returning the
/// entries for the table of contents.
fn anchor_headings(events: &mut Vec<Event<'_>>) -> Vec<TocEntry> {
    let mut toc = Vec::new();
    let mut used = HashSet::new();
    let mut i = 0;

    while i < events.len() {
        let Event::Start(Tag::Heading { level, .. }) = &events[i] else {
            i += 1;
            continue;
        };
        let level = *level as u8;

        let mut text = String::new();
        let mut end = i + 1;
        while end < events.len() {
            match &events[end] {
                Event::End(TagEnd::Heading(_)) => break,
                Event::Text(t) | Event::Code(t) => text.push_str(t),
                _ => {}
            }
            end += 1;
        }

        let id = unique_id(slug(text.trim()), &mut used);
        if let Event::Start(Tag::Heading { id: slot, .. }) = &mut events[i] {
            *slot = Some(CowStr::from(id.clone()));
        }

        let link = format!(
            r##"<a class="headerlink" href="#{id}" title="Permanent link">{}</a>"##,
            config::HEADER_LINK
        );
        events.insert(end, Event::InlineHtml(CowStr::from(link)));

        toc.push(TocEntry {
            level,
            id,
            text: text.trim().to_string(),
        });
        i = end + 2;
    }

    toc
}

/// Makes `base` unique among the ids already handed out.
fn unique_id(base: String, used: &mut HashSet<String>) -> String {
    let base = if base.is_empty() {
        String::from("section")
    } else {
        base
    };
    let mut id = base.clone();
    let mut n = 1;
    while !used.insert(id.clone()) {
        id = format!("{base}-{n}");
        n += 1;
    }
    id
}

/// Replaces paragraphs containing exactly `[TOC]` with the rendered table
/// of contents.
fn replace_toc<'a>(events: Vec<Event<'a>>, toc: &[TocEntry]) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    let mut i = 0;
    while i < events.len() {
        if let [Event::Start(Tag::Paragraph), Event::Text(text), Event::End(TagEnd::Paragraph), ..] =
            &events[i..]
            && text.as_ref() == "[TOC]"
        {
            out.push(Event::Html(CowStr::from(toc_html(toc))));
            i += 3;
        } else {
            out.push(events[i].clone());
            i += 1;
        }
    }
    out
}

/// Renders the table of contents container.
fn toc_html(entries: &[TocEntry]) -> String {
    let mut out = format!(
        r#"<div class="toc"><span class="toctitle">{}</span>"#,
        config::TOC_TITLE
    );
    if let Some(first) = entries.first() {
        let mut pos = 0;
        out += &toc_list(entries, &mut pos, first.level);
    }
    out += "</div>\n";
    out
}

/// Renders one nesting level of the table of contents.
fn toc_list(entries: &[TocEntry], pos: &mut usize, level: u8) -> String {
    let mut out = String::from("<ul>");
    let mut open = false;
    while let Some(entry) = entries.get(*pos) {
        if entry.level < level {
            break;
        }
        if entry.level == level {
            if open {
                out += "</li>";
            }
            out += &format!(
                r##"<li><a href="#{}">{}</a>"##,
                entry.id,
                html_escape::encode_text(&entry.text)
            );
            open = true;
            *pos += 1;
        } else {
            let sub = toc_list(entries, pos, entry.level);
            if !open {
                out += "<li>";
                open = true;
            }
            out += &sub;
        }
    }
    if open {
        out += "</li>";
    }
    out += "</ul>";
    out
}

/// Routes fenced code blocks with a language through the highlighter.
fn highlight_fences<'a>(events: Vec<Event<'a>>, highlighter: &Highlighter) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    let mut iter = events.into_iter();

    while let Some(event) = iter.next() {
        let lang = if let Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) = &event {
            Some(info.split_whitespace().next().unwrap_or_default().to_string())
        } else {
            None
        };
        let Some(lang) = lang else {
            out.push(event);
            continue;
        };

        let mut code = String::new();
        for inner in iter.by_ref() {
            match inner {
                Event::End(TagEnd::CodeBlock) => break,
                Event::Text(text) => code.push_str(&text),
                _ => {}
            }
        }

        if lang.is_empty() {
            // No language on the fence; keep the stock <pre><code> output.
            out.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(
                CowStr::from(""),
            ))));
            out.push(Event::Text(CowStr::from(code)));
            out.push(Event::End(TagEnd::CodeBlock));
        } else {
            out.push(Event::Html(CowStr::from(highlighter.highlight(
                &lang,
                &code,
                &HashSet::new(),
                config::CODE_CSS_CLASS,
            ))));
        }
    }

    out
}
