//! Notation normalizer.
//!
//! Cleans a raw math-field string into text the tokenizer can read:
//! presentation-only markup is removed, escaped literals are unescaped and
//! whitespace is collapsed. Mathematical content is never touched, and
//! markup we do not recognize passes through unchanged so the parser can
//! reject it if it really is malformed.

/// Sizing and style directives that carry no mathematical meaning.
const DECORATIVE: &[&str] = &[
    "left",
    "right",
    "big",
    "Big",
    "bigg",
    "Bigg",
    "bigl",
    "bigr",
    "Bigl",
    "Bigr",
    "biggl",
    "biggr",
    "Biggl",
    "Biggr",
    "displaystyle",
    "textstyle",
    "limits",
];

/// Spacing commands, each replaced by a single space.
const SPACING: &[&str] = &[",", ";", ":", "!", " ", "quad", "qquad", "\\"];

/// Escaped literal characters.
const ESCAPES: &[(&str, &str)] = &[("$", "$"), ("%", "%"), ("#", "#"), ("&", "&"), ("_", "_")];

/// Vertical bar spellings, all of which mean absolute value here.
const BARS: &[&str] = &["lvert", "rvert", "vert", "mid"];

/// Wrappers whose braced argument is kept and the wrapper dropped.
const WRAPPERS: &[&str] = &[
    "mathrm",
    "mathit",
    "mathbf",
    "mathsf",
    "boldsymbol",
    "text",
    "textrm",
    "textit",
    "operatorname",
];

/// Normalize a raw math-notation string.
///
/// Pure, infallible and idempotent.
pub fn normalize(raw: &str) -> String {
    let mut stripped = String::with_capacity(raw.len());
    strip_markup(raw, &mut stripped);
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_markup(src: &str, out: &mut String) {
    let mut rest = src;
    while let Some(pos) = rest.find(['\\', '~']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix('~') {
            out.push(' ');
            rest = after;
            continue;
        }

        let (name, after) = split_command(&tail[1..]);
        rest = rewrite_command(name, after, out);
    }
    out.push_str(rest);
}

/// Emit the replacement for `\name` and return the unconsumed remainder.
fn rewrite_command<'a>(name: &str, after: &'a str, out: &mut String) -> &'a str {
    if name.is_empty() {
        out.push('\\');
        return after;
    }

    if DECORATIVE.contains(&name) {
        // `\left.` and `\right.` are invisible delimiters
        return after.strip_prefix('.').unwrap_or(after);
    }

    if SPACING.contains(&name) {
        out.push(' ');
        return after;
    }

    if let Some((_, literal)) = ESCAPES.iter().find(|(escaped, _)| *escaped == name) {
        out.push_str(literal);
        return after;
    }

    if BARS.contains(&name) {
        out.push('|');
        return after;
    }

    if WRAPPERS.contains(&name) {
        let trimmed = after.trim_start();
        if let Some(close) = trimmed.strip_prefix('{').and_then(matching_brace) {
            let inner = &trimmed[1..=close];
            if name == "operatorname" {
                out.push('\\');
                out.push_str(inner.trim());
                out.push(' ');
            } else {
                out.push(' ');
                strip_markup(inner, out);
                out.push(' ');
            }
            return &trimmed[close + 2..];
        }
    }

    out.push('\\');
    out.push_str(name);
    after
}

/// Split the text after a backslash into the command name and the rest.
///
/// A command name is a run of ASCII letters, or else exactly one character.
fn split_command(s: &str) -> (&str, &str) {
    let letters = s
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(s.len());
    if letters > 0 {
        return s.split_at(letters);
    }
    match s.chars().next() {
        Some(c) => s.split_at(c.len_utf8()),
        None => ("", s),
    }
}

/// Byte offset of the `}` closing a group whose `{` was already consumed.
fn matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sizing_directives() {
        assert_eq!(normalize(r"\left(x+1\right)"), "(x+1)");
        assert_eq!(normalize(r"\Bigl[2\Bigr]"), "[2]");
        assert_eq!(normalize(r"\left.x\right|"), "x|");
    }

    #[test]
    fn leaves_similar_commands_alone() {
        assert_eq!(normalize(r"\leftarrow"), r"\leftarrow");
        assert_eq!(normalize(r"\frac{1}{2}"), r"\frac{1}{2}");
        assert_eq!(normalize(r"\sqrt[3]{8}"), r"\sqrt[3]{8}");
    }

    #[test]
    fn unescapes_currency_and_percent() {
        assert_eq!(normalize(r"\$12.50"), "$12.50");
        assert_eq!(normalize(r"15\%"), "15%");
    }

    #[test]
    fn spacing_commands_become_whitespace() {
        assert_eq!(normalize(r"2\,x\;+\quad 1"), "2 x + 1");
        assert_eq!(normalize("  3  \t x  "), "3 x");
        assert_eq!(normalize("a~b"), "a b");
    }

    #[test]
    fn unwraps_presentation_wrappers() {
        assert_eq!(normalize(r"5\mathrm{cm}"), "5 cm");
        assert_eq!(normalize(r"\operatorname{sin}(x)"), r"\sin (x)");
        assert_eq!(normalize(r"\text{ \left( 1 \right) }"), "( 1 )");
    }

    #[test]
    fn operator_name_keeps_its_argument_apart() {
        assert_eq!(normalize(r"\operatorname{cosec}x"), r"\cosec x");
        assert_eq!(normalize(r"\operatorname{sin}\theta"), r"\sin \theta");
    }

    #[test]
    fn bars_become_pipes() {
        assert_eq!(normalize(r"\lvert x \rvert"), "| x |");
    }

    #[test]
    fn unknown_markup_passes_through() {
        assert_eq!(normalize(r"\foo{1}"), r"\foo{1}");
        assert_eq!(normalize(r"\mathrm{unclosed"), r"\mathrm{unclosed");
        assert_eq!(normalize("x\\"), "x\\");
    }

    #[test]
    fn idempotent() {
        for raw in [
            r"\left(\frac{1}{2}\right)",
            r"\$\,5",
            r"\operatorname{ln}\left|x\right|",
            r"\\left",
            "",
        ] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }
}
