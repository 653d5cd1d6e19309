//! IRC formatting code handling.
//!
//! Message bodies may carry mIRC-style formatting. Everything that decides
//! what a message *means* (command detection, mention matching) works on the
//! stripped text, so stripping is a pure function with no other state.
//!
//! # IRC Format Codes
//! - 0x02 (^B): Bold
//! - 0x03 (^C): Color, followed by up to two foreground digits and an
//!   optional `,` with up to two background digits
//! - 0x04: Hex color, followed by six hex digits and an optional `,RRGGBB`
//! - 0x0F (^O): Reset
//! - 0x11: Monospace
//! - 0x16 (^V): Reverse
//! - 0x1D: Italic
//! - 0x1E: Strikethrough
//! - 0x1F (^_): Underline
//!
//! The CTCP delimiter (0x01) is not formatting and is left alone.

use std::borrow::Cow;
use std::iter::Peekable;
use std::str::Chars;

/// Formatting codes that stand alone, without parameters.
const TOGGLE_CHARS: &[char] = &['\x02', '\x0F', '\x11', '\x16', '\x1D', '\x1E', '\x1F'];

const COLOR: char = '\x03';
const HEX_COLOR: char = '\x04';

/// Mirc color codes, for building formatted replies.
pub mod color {
    /// Bold toggle.
    pub const BOLD: &str = "\x02";
    /// Color introducer.
    pub const COLOR: &str = "\x03";
    /// Reset all formatting.
    pub const RESET: &str = "\x0F";
}

/// Extension trait for handling formatted IRC strings.
pub trait FormattedStringExt<'a> {
    /// Check if the string contains any IRC formatting codes.
    fn is_formatted(&self) -> bool;

    /// Strip all IRC formatting codes from the string.
    ///
    /// Returns `Cow::Borrowed` if no formatting was present.
    fn strip_formatting(self) -> Cow<'a, str>;
}

impl<'a> FormattedStringExt<'a> for &'a str {
    fn is_formatted(&self) -> bool {
        self.chars().any(is_format_code)
    }

    fn strip_formatting(self) -> Cow<'a, str> {
        if !self.is_formatted() {
            return Cow::Borrowed(self);
        }
        Cow::Owned(Stripper::new(self).collect())
    }
}

/// Remove IRC formatting control codes from `text`.
///
/// ```
/// use firefly_proto::strip_style;
///
/// assert_eq!(strip_style("\x02bold\x02 and \x034,5colored\x03"), "bold and colored");
/// assert_eq!(strip_style("\x0312,text"), ",text");
/// ```
pub fn strip_style(text: &str) -> String {
    text.strip_formatting().into_owned()
}

#[inline]
fn is_format_code(c: char) -> bool {
    c == COLOR || c == HEX_COLOR || TOGGLE_CHARS.contains(&c)
}

/// Iterator yielding only the visible characters of a formatted string.
struct Stripper<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Stripper<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
        }
    }

    /// Consume up to `max` characters matching `pred`, returning how many were taken.
    fn take_while_max(&mut self, max: usize, pred: fn(&char) -> bool) -> usize {
        let mut taken = 0;
        while taken < max && self.chars.next_if(pred).is_some() {
            taken += 1;
        }
        taken
    }

    /// `,` followed by a parameter is part of the code; a bare comma is text.
    fn take_background(&mut self, max: usize, pred: fn(&char) -> bool) {
        let mut lookahead = self.chars.clone();
        if lookahead.next() == Some(',') && lookahead.next().as_ref().is_some_and(pred) {
            self.chars.next();
            self.take_while_max(max, pred);
        }
    }

    fn skip_color(&mut self) {
        if self.take_while_max(2, char::is_ascii_digit) > 0 {
            self.take_background(2, char::is_ascii_digit);
        }
    }

    fn skip_hex_color(&mut self) {
        if self.take_while_max(6, char::is_ascii_hexdigit) == 6 {
            self.take_background(6, char::is_ascii_hexdigit);
        }
    }
}

impl Iterator for Stripper<'_> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        loop {
            match self.chars.next()? {
                COLOR => self.skip_color(),
                HEX_COLOR => self.skip_hex_color(),
                c if TOGGLE_CHARS.contains(&c) => {}
                c => return Some(c),
            }
        }
    }
}
