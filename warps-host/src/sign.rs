//! Sign text handling: activation markers and colour codes.
//!
//! A warp sign's first line is the configured welcome text prefixed with a
//! colour code. Green means active, red means rejected or deactivated.

/// Section sign that introduces a colour code in rendered text.
pub const COLOR_CHAR: char = '\u{a7}';

/// Alternate colour character players type on signs.
pub const ALT_COLOR_CHAR: char = '&';

/// Colour code prefix of an active warp sign.
pub const GREEN: &str = "\u{a7}a";

/// Colour code prefix of an inactive warp sign.
pub const RED: &str = "\u{a7}c";

const COLOR_CODES: &str = "0123456789AaBbCcDdEeFfKkLlMmNnOoRr";

/// Whether a sign block stands on the ground or hangs on a wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignKind {
    /// Free-standing sign post.
    Standing,
    /// Sign attached to a wall.
    Wall,
}

/// Current contents of a sign block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignState {
    /// Block variant.
    pub kind: SignKind,
    /// The four text lines, colour codes included.
    pub lines: [String; 4],
}

impl SignState {
    /// A sign with the given lines; missing lines are empty.
    #[must_use]
    pub fn new<S: AsRef<str>>(kind: SignKind, lines: &[S]) -> Self {
        let mut text: [String; 4] = Default::default();
        for (slot, line) in text.iter_mut().zip(lines) {
            *slot = line.as_ref().to_string();
        }
        Self { kind, lines: text }
    }

    /// Whether this sign carries the active marker for `welcome_line`.
    #[must_use]
    pub fn is_active_warp(&self, welcome_line: &str) -> bool {
        eq_ignore_case(&self.lines[0], &active_marker(welcome_line))
    }
}

/// First line of an active warp sign.
#[must_use]
pub fn active_marker(welcome_line: &str) -> String {
    format!("{GREEN}{welcome_line}")
}

/// First line of a rejected or deactivated warp sign.
#[must_use]
pub fn inactive_marker(welcome_line: &str) -> String {
    format!("{RED}{welcome_line}")
}

/// Case-insensitive comparison used for every marker check.
#[must_use]
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Replace `alt` followed by a colour code with [`COLOR_CHAR`] and the
/// lower-cased code. Other occurrences of `alt` are kept.
#[must_use]
pub fn translate_color_codes(alt: char, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(&code) if c == alt && COLOR_CODES.contains(code) => {
                out.push(COLOR_CHAR);
                out.push(code.to_ascii_lowercase());
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

/// Translate `&` codes on the three body lines; the marker line is left alone.
pub fn translate_body_lines(lines: &mut [String; 4]) {
    for line in &mut lines[1..] {
        *line = translate_color_codes(ALT_COLOR_CHAR, line);
    }
}
