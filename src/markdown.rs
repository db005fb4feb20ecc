//! Markdown to HTML.
//!
//! CommonMark plus the GitHub extensions pages rely on (tables,
//! strikethrough, task lists). Two rewrites run over the event stream
//! before HTML is emitted:
//!
//! - every soft line break becomes `<br />`, so line breaks in the source
//!   survive into the page;
//! - headings without an explicit `{#id}` get one derived from their text
//!   (`## Getting Started` → `id="getting-started"`). Repeats get `-1`,
//!   `-2`, … appended.
//!
//! Raw HTML in the source is passed through untouched.

use crate::error::Result;
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd, html as md_html};
use std::collections::{HashMap, VecDeque};

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Render markdown `src` to HTML. Invalid UTF-8 is replaced, not rejected.
pub fn markdown_to_html(src: &[u8]) -> Result<Vec<u8>> {
    let text = String::from_utf8_lossy(src);
    let events = Parser::new_ext(&text, options()).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut html = String::with_capacity(text.len() * 3 / 2);
    md_html::push_html(&mut html, HeadingIds::new(events));
    Ok(html.into_bytes())
}

/// Plain text of the first level-one heading, if any.
pub fn extract_title(src: &str) -> Option<String> {
    let mut events = Parser::new_ext(src, options());
    events.find(|e| {
        matches!(
            e,
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            })
        )
    })?;

    let mut title = String::new();
    for event in events {
        match event {
            Event::Text(s) | Event::Code(s) => title.push_str(&s),
            Event::SoftBreak | Event::HardBreak => title.push(' '),
            Event::End(TagEnd::Heading(_)) => break,
            _ => {}
        }
    }
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Heading id for `text`: lowercase alphanumerics and `_` are kept,
/// whitespace and `-` become `-`, everything else is dropped.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if c == '_' {
            slug.push('_');
        } else if c == '-' || c.is_whitespace() {
            slug.push('-');
        }
    }
    if slug.is_empty() {
        slug.push_str("heading");
    }
    slug
}

struct HeadingIds<'a, I: Iterator<Item = Event<'a>>> {
    inner: I,
    pending: VecDeque<Event<'a>>,
    seen: HashMap<String, usize>,
}

impl<'a, I: Iterator<Item = Event<'a>>> HeadingIds<'a, I> {
    fn new(inner: I) -> Self {
        Self {
            inner,
            pending: VecDeque::with_capacity(4),
            seen: HashMap::new(),
        }
    }

    fn unique(&mut self, base: String) -> String {
        match self.seen.get_mut(&base) {
            Some(n) => {
                let id = format!("{base}-{n}");
                *n += 1;
                id
            }
            None => {
                self.seen.insert(base.clone(), 1);
                base
            }
        }
    }
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for HeadingIds<'a, I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Event<'a>> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        match self.inner.next()? {
            Event::Start(Tag::Heading {
                level,
                id: None,
                classes,
                attrs,
            }) => {
                let mut text = String::new();
                for event in self.inner.by_ref() {
                    if let Event::Text(ref s) | Event::Code(ref s) = event {
                        text.push_str(s);
                    }
                    let end = matches!(event, Event::End(TagEnd::Heading(_)));
                    self.pending.push_back(event);
                    if end {
                        break;
                    }
                }

                let id = self.unique(slugify(&text));
                Some(Event::Start(Tag::Heading {
                    level,
                    id: Some(id.into()),
                    classes,
                    attrs,
                }))
            }
            event => Some(event),
        }
    }
}
