//! Markdown-to-ANSI conversion.
//!
//! The renderer treats this as a provided pure function: text goes in,
//! styled terminal text comes out. Inline structure only; the streaming
//! buffer decides *when* to render, this module decides *how*.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::render::palette::PALETTE;

/// Markers whose presence switches a buffer into markdown mode.
///
/// Kept deliberately conservative: plain prose with an apostrophe or a
/// dash must not trip the latch.
const BLOCK_MARKERS: [&str; 2] = ["**", "```"];
const LINE_MARKERS: [&str; 4] = ["# ", "## ", "- ", "* "];

/// Returns true when the text contains markdown formatting markers.
///
/// Callers re-scan the whole accumulated buffer on every append because
/// a marker can straddle a chunk boundary.
pub fn contains_markers(text: &str) -> bool {
    if BLOCK_MARKERS.iter().any(|m| text.contains(m)) {
        return true;
    }
    // Inline code needs a closed pair, not a stray backtick.
    if text.matches('`').count() >= 2 {
        return true;
    }
    text.lines()
        .any(|line| LINE_MARKERS.iter().any(|m| line.trim_start().starts_with(m)))
}

/// Renders markdown to ANSI-styled text.
///
/// Pure and stateless. The trailing-newline run of the input is
/// preserved exactly so incremental flushing never gains or loses blank
/// lines through rendering.
pub fn render(text: &str) -> String {
    let p = PALETTE;
    let mut out = String::with_capacity(text.len() + 16);
    let parser = Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH);

    for event in parser {
        match event {
            Event::Start(Tag::Strong) => out.push_str(p.bold),
            Event::End(TagEnd::Strong) => out.push_str(p.reset),
            Event::Start(Tag::Emphasis) => out.push_str(p.italic),
            Event::End(TagEnd::Emphasis) => out.push_str(p.reset),
            Event::Start(Tag::Heading { .. }) => out.push_str(p.bold),
            Event::End(TagEnd::Heading(_)) => {
                out.push_str(p.reset);
                out.push('\n');
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                out.push_str(p.dim);
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        out.push_str(&lang);
                        out.push('\n');
                    }
                }
            }
            Event::End(TagEnd::CodeBlock) => out.push_str(p.reset),
            Event::Start(Tag::Item) => out.push_str("• "),
            Event::End(TagEnd::Item) => out.push('\n'),
            Event::End(TagEnd::Paragraph) => out.push('\n'),
            Event::Code(code) => {
                out.push_str(p.cyan);
                out.push_str(&code);
                out.push_str(p.reset);
            }
            Event::Text(t) => out.push_str(&t),
            Event::SoftBreak => out.push('\n'),
            Event::HardBreak => out.push('\n'),
            Event::Rule => {
                out.push_str(p.dim);
                out.push_str("────");
                out.push_str(p.reset);
                out.push('\n');
            }
            _ => {}
        }
    }

    // Match the input's trailing newline run so flush boundaries survive.
    let wanted = text.len() - text.trim_end_matches('\n').len();
    let got = out.len() - out.trim_end_matches('\n').len();
    match got.cmp(&wanted) {
        std::cmp::Ordering::Less => {
            for _ in got..wanted {
                out.push('\n');
            }
        }
        std::cmp::Ordering::Greater => {
            out.truncate(out.len() - (got - wanted));
        }
        std::cmp::Ordering::Equal => {}
    }
    out
}
