//! ANSI palette for terminal output.
//!
//! A single immutable palette value; never mutated at runtime. Styling
//! stays out of the formatters so their output is testable as plain text.

/// Style and color escape sequences used by the renderer.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub reset: &'static str,
    pub bold: &'static str,
    pub dim: &'static str,
    pub italic: &'static str,
    pub red: &'static str,
    pub green: &'static str,
    pub yellow: &'static str,
    pub cyan: &'static str,
    pub magenta: &'static str,
}

pub const PALETTE: Palette = Palette {
    reset: "\x1b[0m",
    bold: "\x1b[1m",
    dim: "\x1b[2m",
    italic: "\x1b[3m",
    red: "\x1b[31m",
    green: "\x1b[32m",
    yellow: "\x1b[33m",
    cyan: "\x1b[36m",
    magenta: "\x1b[35m",
};

/// Carriage return plus clear-to-end-of-line, used to overwrite an
/// indicator's animation frame in place.
pub const CLEAR_LINE: &str = "\r\x1b[K";
