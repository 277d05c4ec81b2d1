//! Pure single-line summaries for tool activity.
//!
//! Everything here is string-in string-out so the rendering decisions
//! stay testable without a terminal.

use std::sync::OnceLock;

use regex::Regex;
use unicode_width::UnicodeWidthChar;

use crate::events::ToolCall;
use crate::render::palette::PALETTE;

/// Display width budget for a summarized tool argument.
const ARG_MAX_WIDTH: usize = 48;

/// Argument keys tried in order when picking the one value worth
/// showing next to a tool name.
const PRIMARY_ARG_KEYS: &[&str] = &["file", "path", "pattern", "query", "command", "url"];

/// Strips any dotted namespace from a tool name: `fs.read` displays
/// as `read`.
pub fn tool_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Picks the single most informative argument value for display.
///
/// Well-known keys win in priority order; otherwise the first value in
/// the (order-preserving) argument map is used. Non-string values are
/// rendered as compact JSON.
pub fn primary_arg(args: &serde_json::Map<String, serde_json::Value>) -> Option<String> {
    let value = PRIMARY_ARG_KEYS
        .iter()
        .find_map(|key| args.get(*key))
        .or_else(|| args.values().next())?;
    let text = match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Some(truncate_with_ellipsis(&text, ARG_MAX_WIDTH))
}

/// One-line call summary: `read(src/main.rs)`, or just `read()` for a
/// call with no arguments.
pub fn call_summary(call: &ToolCall) -> String {
    match primary_arg(&call.args) {
        Some(arg) => format!("{}({arg})", tool_name(&call.name)),
        None => format!("{}()", tool_name(&call.name)),
    }
}

/// Condenses a tool outcome into a short status fragment.
///
/// Recognized shapes are abbreviated (`42 lines` becomes `42L`, diff
/// counts become `+a −r`); anything unrecognized passes through as-is
/// after taking the first line. Errors short-circuit to the outcome
/// text, or a bare `error` when there is none.
pub fn outcome_summary(outcome: &str, is_error: bool) -> String {
    if is_error {
        let first = outcome.lines().next().unwrap_or("").trim();
        return if first.is_empty() { "error".to_string() } else { first.to_string() };
    }

    let first = outcome.lines().next().unwrap_or("").trim();
    if first.is_empty() {
        return "done".to_string();
    }

    if let Some(caps) = line_count_re().captures(first) {
        return format!("{}L", &caps[1]);
    }
    if let Some(caps) = diff_count_re().captures(first) {
        return format!("+{} \u{2212}{}", &caps[1], &caps[2]);
    }
    if let Some(caps) = item_count_re().captures(first) {
        return format!("{} items", &caps[1]);
    }
    if let Some(caps) = match_count_re().captures(first) {
        return format!("{} matches", &caps[1]);
    }

    truncate_with_ellipsis(first, ARG_MAX_WIDTH)
}

/// Colors a unified diff for terminal display, two-space indented:
/// additions green, removals red, hunk headers cyan, context dimmed.
pub fn diff_lines(diff: &str) -> String {
    let mut out = String::new();
    for line in diff.lines() {
        let color = if line.starts_with("+++") || line.starts_with("---") {
            PALETTE.dim
        } else if line.starts_with('+') {
            PALETTE.green
        } else if line.starts_with('-') {
            PALETTE.red
        } else if line.starts_with("@@") {
            PALETTE.cyan
        } else {
            PALETTE.dim
        };
        out.push_str("  ");
        out.push_str(color);
        out.push_str(line);
        out.push_str(PALETTE.reset);
        out.push('\n');
    }
    out
}

fn line_count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+) lines?$").expect("valid regex"))
}

fn diff_count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+) added,? (\d+) removed$").expect("valid regex"))
}

fn item_count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+) items?$").expect("valid regex"))
}

fn match_count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+) match(?:es)?$").expect("valid regex"))
}

/// Truncates to a display-width budget, appending `...` when cut.
/// Width-aware so wide CJK glyphs count double.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    let mut width = 0;
    for (idx, ch) in text.char_indices() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width.saturating_sub(3) {
            // Only cut if the remainder actually overflows the budget.
            let rest_width: usize =
                text[idx..].chars().map(|c| c.width().unwrap_or(0)).sum();
            if width + rest_width > max_width {
                return format!("{}...", &text[..idx]);
            }
            return text.to_string();
        }
        width += ch_width;
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, args: serde_json::Value) -> ToolCall {
        let serde_json::Value::Object(args) = args else {
            panic!("args must be an object");
        };
        ToolCall { name: name.to_string(), args }
    }

    #[test]
    fn test_tool_name_strips_namespace() {
        assert_eq!(tool_name("fs.read"), "read");
        assert_eq!(tool_name("shell.exec.run"), "run");
        assert_eq!(tool_name("ls"), "ls");
    }

    #[test]
    fn test_primary_arg_priority_keys_win() {
        let call = call("search", json!({"limit": 5, "pattern": "fn main"}));
        assert_eq!(primary_arg(&call.args).as_deref(), Some("fn main"));
    }

    #[test]
    fn test_primary_arg_falls_back_to_first_value() {
        let call = call("ls", json!({"dir": ".", "all": true}));
        assert_eq!(primary_arg(&call.args).as_deref(), Some("."));
    }

    #[test]
    fn test_call_summary_shapes() {
        assert_eq!(call_summary(&call("ls", json!({"path": "."}))), "ls(.)");
        assert_eq!(call_summary(&call("fs.read", json!({"file": "a.rs"}))), "read(a.rs)");
        assert_eq!(call_summary(&call("refresh", json!({}))), "refresh()");
    }

    #[test]
    fn test_call_summary_truncates_long_args() {
        let long = "x".repeat(200);
        let summary = call_summary(&call("read", json!({ "file": long })));
        assert!(summary.ends_with("...)"));
        assert!(summary.len() < 60);
    }

    #[test]
    fn test_outcome_summary_recognized_shapes() {
        assert_eq!(outcome_summary("42 lines", false), "42L");
        assert_eq!(outcome_summary("1 line", false), "1L");
        assert_eq!(outcome_summary("3 added, 1 removed", false), "+3 \u{2212}1");
        assert_eq!(outcome_summary("12 items", false), "12 items");
        assert_eq!(outcome_summary("1 item", false), "1 items");
        assert_eq!(outcome_summary("7 matches", false), "7 matches");
        assert_eq!(outcome_summary("1 match", false), "1 matches");
    }

    #[test]
    fn test_outcome_summary_passthrough_and_errors() {
        assert_eq!(outcome_summary("ok", false), "ok");
        assert_eq!(outcome_summary("", false), "done");
        assert_eq!(outcome_summary("no such file", true), "no such file");
        assert_eq!(outcome_summary("", true), "error");
    }

    #[test]
    fn test_outcome_summary_uses_first_line_only() {
        assert_eq!(outcome_summary("42 lines\nplus detail", false), "42L");
    }

    #[test]
    fn test_diff_lines_coloring() {
        let diff = "@@ -1,2 +1,2 @@\n-old\n+new\n ctx";
        let out = diff_lines(diff);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains(PALETTE.cyan));
        assert!(lines[1].contains(PALETTE.red));
        assert!(lines[2].contains(PALETTE.green));
        assert!(lines[3].contains(PALETTE.dim));
        assert!(lines.iter().all(|l| l.starts_with("  ")));
    }

    #[test]
    fn test_truncate_respects_display_width() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        let cut = truncate_with_ellipsis(&"a".repeat(30), 10);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 10);
    }
}
