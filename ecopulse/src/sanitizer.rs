//! Cleans free-text user input before it is embedded in a remote query.

use std::fmt;
use std::ops::Deref;

/// Maximum number of characters kept after cleaning.
pub const MAX_INPUT_CHARS: usize = 100;

const STRIPPED_CHARS: [char; 4] = [';', '\'', '"', '\\'];

/// User input with markup, quoting characters and excess length removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SanitizedText(String);

impl SanitizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Deref for SanitizedText {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SanitizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SanitizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for SanitizedText {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Sanitize raw input. Accepts `&str` or `Option<&str>`; absent and empty
/// input both yield an empty result.
///
/// Tag-like runs are removed first (`<` through the next `>`, or through the
/// end of input when no `>` follows), then `;`, `'`, `"` and `\`, then
/// surrounding whitespace, and finally the result is cut to
/// [`MAX_INPUT_CHARS`] characters.
pub fn sanitize<'a>(text: impl Into<Option<&'a str>>) -> SanitizedText {
    let text = match text.into() {
        Some(text) if !text.is_empty() => text,
        _ => return SanitizedText::default(),
    };

    let untagged = strip_tags(text);
    let filtered: String = untagged.chars().filter(|c| !STRIPPED_CHARS.contains(c)).collect();

    SanitizedText(filtered.trim().chars().take(MAX_INPUT_CHARS).collect())
}

fn strip_tags(text: &str) -> String {
    text.chars()
        .fold((String::with_capacity(text.len()), false), |(mut out, in_tag), c| match c {
            '<' if !in_tag => (out, true),
            '>' if in_tag => (out, false),
            _ if !in_tag => {
                out.push(c);
                (out, in_tag)
            }
            _ => (out, in_tag),
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stray_closing_bracket_is_kept() {
        assert_eq!(strip_tags("a > b"), "a > b");
    }

    #[test]
    fn nested_opening_bracket_stays_inside_tag() {
        // `<a<b>` is one tag: the inner `<` is just another non-`>` char.
        assert_eq!(strip_tags("x<a<b>y"), "xy");
    }
}
