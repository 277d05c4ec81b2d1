//! Phase-scoped text accumulation with incremental flushing.
//!
//! One buffer lives for one render phase (reasoning trace or final
//! answer). Token deltas are appended as they arrive; flushing walks a
//! cursor forward over boundary matches so already-printed bytes are
//! never re-examined or re-emitted.

use std::io::Write;

use crate::markdown;

/// Accumulates streamed text and flushes it at safe boundaries.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    text: String,
    /// Byte cursor past everything already written to a sink.
    /// Monotonically non-decreasing, never beyond `text.len()`.
    flushed: usize,
    /// Sticky markdown latch. One-way: already-printed plain text is
    /// never retroactively contradicted by a later formatting decision.
    markdown: bool,
    /// A requested post-boundary whitespace eat ran off the end of the
    /// accumulated text; the run continues into the next append.
    eating_ws: bool,
    ends_with_newline: bool,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and re-scans the whole accumulator for formatting
    /// markers; a marker can straddle a chunk boundary, so scanning only
    /// the new text would miss it.
    pub fn append(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        if !self.markdown && markdown::contains_markers(&self.text) {
            self.markdown = true;
        }
    }

    pub fn is_markdown(&self) -> bool {
        self.markdown
    }

    pub fn ends_with_newline(&self) -> bool {
        self.ends_with_newline
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Flushes the unflushed suffix at safe boundaries: every match of
    /// `delimiter` when one is given, otherwise every newline.
    ///
    /// A given delimiter is the *only* boundary. A lone newline is not a
    /// safe point while a longer delimiter may still be forming across
    /// chunk arrivals; flushing there would split the delimiter and make
    /// output depend on how the stream was chopped.
    ///
    /// Trailing whitespace immediately before a delimiter match is never
    /// printed. Whitespace-only segments print nothing but still advance
    /// the cursor and update the newline flag from the source text. With
    /// `eat_leading_ws`, the whitespace run following the boundary is
    /// consumed as well, so a delimiter never renders as more than one
    /// blank line. The run may still be arriving when the boundary
    /// flushes; the eat carries over to later appends until a
    /// non-whitespace character lands.
    ///
    /// Returns whether printed output now ends with a newline; with no
    /// boundary in the unflushed suffix this is a no-op returning the
    /// prior state.
    pub fn flush_segment(
        &mut self,
        sink: &mut dyn Write,
        delimiter: Option<&str>,
        eat_leading_ws: bool,
    ) -> bool {
        self.consume_pending_ws();
        loop {
            let rest = &self.text[self.flushed..];
            let (pos, skip, is_delim) = match delimiter {
                Some(d) => match rest.find(d) {
                    Some(p) => (p, d.len(), true),
                    None => return self.ends_with_newline,
                },
                None => match rest.find('\n') {
                    Some(p) => (p, 1, false),
                    None => return self.ends_with_newline,
                },
            };

            let mut advance = pos + skip;
            if eat_leading_ws {
                let tail = &rest[advance..];
                let remaining = tail.trim_start();
                advance += tail.len() - remaining.len();
                // Run consumed to the end of the text: it may continue
                // in a chunk that has not arrived yet.
                self.eating_ws = remaining.is_empty();
            }

            let segment = if is_delim {
                rest[..pos].trim_end().to_string()
            } else {
                rest[..pos + 1].to_string()
            };

            if !segment.trim().is_empty() {
                if self.markdown {
                    let _ = sink.write_all(markdown::render(&segment).as_bytes());
                } else {
                    let _ = sink.write_all(segment.as_bytes());
                }
            }
            if is_delim {
                if let Some(d) = delimiter {
                    let _ = sink.write_all(d.as_bytes());
                }
            }

            self.flushed += advance;
            self.ends_with_newline = true;

            if self.flushed >= self.text.len() {
                return true;
            }
        }
    }

    /// Unconditionally drains all remaining unflushed text, stripping
    /// leading newlines and skipping output entirely when nothing but
    /// whitespace remains. Resets the buffer to empty afterward.
    pub fn flush_all(&mut self, sink: &mut dyn Write) {
        self.consume_pending_ws();
        let rest = &self.text[self.flushed..];
        let trimmed = rest.trim_start_matches('\n');
        if !trimmed.trim().is_empty() {
            if self.markdown {
                let _ = sink.write_all(markdown::render(trimmed).as_bytes());
            } else {
                let _ = sink.write_all(trimmed.as_bytes());
            }
            self.ends_with_newline = trimmed.ends_with('\n');
        }
        self.text.clear();
        self.flushed = 0;
        self.eating_ws = false;
    }

    /// Advances the cursor over a whitespace run left unfinished by an
    /// earlier eat; the eat stays pending until non-whitespace arrives.
    fn consume_pending_ws(&mut self) {
        if !self.eating_ws {
            return;
        }
        let rest = &self.text[self.flushed..];
        let remaining = rest.trim_start();
        self.flushed += rest.len() - remaining.len();
        if !remaining.is_empty() {
            self.eating_ws = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::palette::PALETTE;

    fn flush_str(buffer: &mut OutputBuffer, delimiter: Option<&str>, eat: bool) -> (String, bool) {
        let mut sink = Vec::new();
        let ends = buffer.flush_segment(&mut sink, delimiter, eat);
        (String::from_utf8(sink).expect("utf8"), ends)
    }

    #[test]
    fn test_flush_idempotent_without_append() {
        let mut buffer = OutputBuffer::new();
        buffer.append("hello\nworld");
        let (out, ends) = flush_str(&mut buffer, None, false);
        assert_eq!(out, "hello\n");
        assert!(ends);

        let (out, ends) = flush_str(&mut buffer, None, false);
        assert_eq!(out, "", "second flush must print nothing");
        assert!(ends, "no-op returns prior newline state");
    }

    #[test]
    fn test_no_boundary_is_noop() {
        let mut buffer = OutputBuffer::new();
        buffer.append("partial line");
        let (out, ends) = flush_str(&mut buffer, None, false);
        assert_eq!(out, "");
        assert!(!ends);
    }

    #[test]
    fn test_delimiter_is_the_only_boundary() {
        let mut buffer = OutputBuffer::new();
        buffer.append("first|second\nthird");
        let (out, _) = flush_str(&mut buffer, Some("|"), false);
        // The newline after "second" is not a boundary in delimiter
        // mode; that text waits for the next delimiter or flush_all.
        assert_eq!(out, "first|");
    }

    #[test]
    fn test_delimiter_straddling_chunks_is_chop_invariant() {
        let mut buffer = OutputBuffer::new();
        buffer.append("para one\n");
        let (out, _) = flush_str(&mut buffer, Some("\n\n"), true);
        assert_eq!(out, "", "half-formed delimiter must not flush");

        buffer.append("\npara two");
        let (out, _) = flush_str(&mut buffer, Some("\n\n"), true);
        assert_eq!(out, "para one\n\n");
    }

    #[test]
    fn test_trailing_whitespace_trimmed_before_delimiter() {
        let mut buffer = OutputBuffer::new();
        buffer.append("para one  \n\nnext");
        let (out, ends) = flush_str(&mut buffer, Some("\n\n"), false);
        assert_eq!(out, "para one\n\n");
        assert!(ends);
    }

    #[test]
    fn test_eat_leading_whitespace_after_boundary() {
        let mut buffer = OutputBuffer::new();
        buffer.append("one\n\n   \n  two");
        let (out, _) = flush_str(&mut buffer, Some("\n\n"), true);
        assert_eq!(out, "one\n\n", "extra blank lines collapse into the delimiter");

        buffer.append(" more\n\ntail");
        let (out, _) = flush_str(&mut buffer, Some("\n\n"), true);
        assert_eq!(out, "two more\n\n");
    }

    #[test]
    fn test_whitespace_eat_straddling_appends_is_chop_invariant() {
        let render = |chunks: &[&str]| {
            let mut buffer = OutputBuffer::new();
            let mut sink = Vec::new();
            for chunk in chunks {
                buffer.append(chunk);
                buffer.flush_segment(&mut sink, Some("\n\n"), true);
            }
            buffer.flush_all(&mut sink);
            String::from_utf8(sink).expect("utf8")
        };

        let whole = render(&["one\n\n\n  two\n\n"]);
        // The whitespace run after the delimiter arrives in a later
        // chunk; the eat must carry over instead of leaking it.
        let chopped = render(&["one\n\n", "\n  two\n\n"]);
        assert_eq!(whole, "one\n\ntwo\n\n");
        assert_eq!(chopped, whole);
        assert!(!chopped.contains("\n\n\n"));
    }

    #[test]
    fn test_whitespace_only_segment_prints_nothing() {
        let mut buffer = OutputBuffer::new();
        buffer.append("   \n");
        let (out, ends) = flush_str(&mut buffer, None, false);
        assert_eq!(out, "");
        assert!(ends, "newline flag still tracks the source text");
    }

    #[test]
    fn test_markdown_latch_is_sticky() {
        let mut buffer = OutputBuffer::new();
        buffer.append("some *");
        assert!(!buffer.is_markdown());
        buffer.append("*bold** text");
        assert!(buffer.is_markdown(), "marker straddling chunks detected");

        buffer.append("\nplain later\n");
        assert!(buffer.is_markdown(), "latch never reverts");

        let (out, _) = flush_str(&mut buffer, None, false);
        assert!(out.contains(PALETTE.bold));
    }

    #[test]
    fn test_flush_all_strips_leading_newlines_and_resets() {
        let mut buffer = OutputBuffer::new();
        buffer.append("\n\ntail without newline");
        let mut sink = Vec::new();
        buffer.flush_all(&mut sink);
        assert_eq!(String::from_utf8(sink).expect("utf8"), "tail without newline");
        assert!(buffer.is_empty());
        assert!(!buffer.ends_with_newline());
    }

    #[test]
    fn test_flush_all_whitespace_only_skips_output() {
        let mut buffer = OutputBuffer::new();
        buffer.append("  \n \n");
        let mut sink = Vec::new();
        buffer.flush_all(&mut sink);
        assert!(sink.is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_flush_all_after_partial_flush() {
        let mut buffer = OutputBuffer::new();
        buffer.append("line one\nline two");
        let (out, _) = flush_str(&mut buffer, None, false);
        assert_eq!(out, "line one\n");

        let mut sink = Vec::new();
        buffer.flush_all(&mut sink);
        assert_eq!(String::from_utf8(sink).expect("utf8"), "line two");
    }
}
