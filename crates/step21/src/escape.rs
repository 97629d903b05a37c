//! Part 21 string escaping.
//!
//! STEP string literals are quoted with apostrophes and restricted to
//! printable ASCII; everything else is carried by control directives:
//!
//! - `''` — a literal apostrophe
//! - `\X\41` — one code point in `[0x00, 0xFF]` outside printable ASCII
//! - `\X2\00C5\X0\` — code points in `[0x0100, 0xFFFF]`, 4 hex digits each
//! - `\X4\0001F600\X0\` — code points above `0xFFFF`, 8 hex digits each
//!
//! [`encode_string`] and [`decode_string`] are exact inverses for any
//! string that does not itself spell a directive: backslashes pass through
//! unescaped, so literal text like `\X\41` encodes unchanged and then
//! decodes as the directive it spells. Neither function adds or strips the
//! delimiting apostrophes; that is the formatter's (and lexer's) job.

use std::fmt::Write as _;

use crate::error::StepError;

/// Escape a string for inclusion in a STEP string literal.
///
/// Total: every `char` is a Unicode scalar value, so the four directive
/// planes cover all inputs and nothing is ever dropped.
pub fn encode_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push('\\'),
            _ => {
                let cp = c as u32;
                if (0x20..=0x7E).contains(&cp) {
                    out.push(c);
                } else if cp <= 0xFF {
                    let _ = write!(out, "\\X\\{cp:02X}");
                } else if cp <= 0xFFFF {
                    let _ = write!(out, "\\X2\\{cp:04X}\\X0\\");
                } else {
                    let _ = write!(out, "\\X4\\{cp:08X}\\X0\\");
                }
            }
        }
    }
    out
}

/// Decode the contents of a STEP string literal (without its quotes).
///
/// Inverse of [`encode_string`]: collapses doubled apostrophes and expands
/// `\X\`, `\X2\`, and `\X4\` directives. A backslash that does not open a
/// well-formed directive is kept literally, matching the encoder's
/// backslash passthrough. Fails on a malformed directive (bad hex digits,
/// missing `\X0\` terminator, or a hex value that is not a Unicode scalar
/// value).
pub fn decode_string(text: &str) -> Result<String, StepError> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\'' => {
                // Doubled apostrophes collapse; a lone one is tolerated.
                out.push('\'');
                i += if chars.get(i + 1) == Some(&'\'') { 2 } else { 1 };
            }
            '\\' if chars.get(i + 1) == Some(&'X') => {
                i = decode_directive(&chars, i, &mut out)?;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok(out)
}

/// Decode one `\X...` directive starting at `start`; returns the index just
/// past it.
fn decode_directive(chars: &[char], start: usize, out: &mut String) -> Result<usize, StepError> {
    // chars[start] == '\\', chars[start + 1] == 'X'
    match (chars.get(start + 2), chars.get(start + 3)) {
        (Some('\\'), _) => {
            // \X\hh — exactly two hex digits.
            let cp = hex_value(chars, start + 3, 2)?;
            push_scalar(cp, out)?;
            Ok(start + 5)
        }
        (Some('2'), Some('\\')) => decode_wide(chars, start + 4, 4, out),
        (Some('4'), Some('\\')) => decode_wide(chars, start + 4, 8, out),
        _ => {
            // Not a directive this decoder knows; keep the backslash.
            out.push('\\');
            Ok(start + 1)
        }
    }
}

/// Decode the body of a `\X2\`/`\X4\` directive: one or more fixed-width
/// hex groups terminated by `\X0\`.
fn decode_wide(
    chars: &[char],
    mut i: usize,
    width: usize,
    out: &mut String,
) -> Result<usize, StepError> {
    loop {
        if chars[i..].starts_with(&['\\', 'X', '0', '\\']) {
            return Ok(i + 4);
        }
        let cp = hex_value(chars, i, width)?;
        push_scalar(cp, out)?;
        i += width;
    }
}

fn hex_value(chars: &[char], start: usize, width: usize) -> Result<u32, StepError> {
    let Some(digits) = chars.get(start..start + width) else {
        return Err(StepError::Escape("truncated \\X directive".into()));
    };
    let mut value = 0u32;
    for &d in digits {
        let nibble = d
            .to_digit(16)
            .ok_or_else(|| StepError::Escape(format!("invalid hex digit '{d}' in \\X directive")))?;
        value = value << 4 | nibble;
    }
    Ok(value)
}

fn push_scalar(cp: u32, out: &mut String) -> Result<(), StepError> {
    match char::from_u32(cp) {
        Some(c) => {
            out.push(c);
            Ok(())
        }
        None => Err(StepError::Escape(format!(
            "code point U+{cp:04X} is not a Unicode scalar value"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apostrophe_doubled() {
        assert_eq!(encode_string("O'Brien"), "O''Brien");
        assert_eq!(decode_string("O''Brien").unwrap(), "O'Brien");
    }

    #[test]
    fn test_printable_ascii_passthrough() {
        assert_eq!(encode_string("A"), "A");
        assert_eq!(encode_string("part #42 (rev B)"), "part #42 (rev B)");
    }

    #[test]
    fn test_backslash_passthrough() {
        assert_eq!(encode_string("a\\b"), "a\\b");
        assert_eq!(decode_string("a\\b").unwrap(), "a\\b");
    }

    #[test]
    fn test_control_characters() {
        assert_eq!(encode_string("\t"), "\\X\\09");
        assert_eq!(encode_string("\u{0}"), "\\X\\00");
        assert_eq!(encode_string("a\u{1F}b"), "a\\X\\1Fb");
    }

    #[test]
    fn test_high_latin1() {
        assert_eq!(encode_string("\u{7F}"), "\\X\\7F");
        assert_eq!(encode_string("é"), "\\X\\E9");
        assert_eq!(decode_string("\\X\\E9").unwrap(), "é");
    }

    #[test]
    fn test_bmp_plane() {
        assert_eq!(encode_string("Å is \u{212B}"), "\\X\\C5 is \\X2\\212B\\X0\\");
        assert_eq!(encode_string("€"), "\\X2\\20AC\\X0\\");
        assert_eq!(decode_string("\\X2\\20AC\\X0\\").unwrap(), "€");
    }

    #[test]
    fn test_supplementary_plane() {
        assert_eq!(encode_string("😀"), "\\X4\\0001F600\\X0\\");
        assert_eq!(decode_string("\\X4\\0001F600\\X0\\").unwrap(), "😀");
    }

    #[test]
    fn test_multi_group_directive() {
        // Decoders must accept several groups under one \X2\ header even
        // though the encoder emits one directive per character.
        assert_eq!(decode_string("\\X2\\00C500C9\\X0\\").unwrap(), "ÅÉ");
    }

    #[test]
    fn test_round_trip() {
        for s in [
            "",
            "O'Brien",
            "mixed: é, €, 😀, tab\t, quote'",
            "back\\slash and 'quotes'",
            "\u{1}\u{7F}\u{80}\u{FFFF}\u{10000}",
        ] {
            assert_eq!(decode_string(&encode_string(s)).unwrap(), s, "string {s:?}");
        }
    }

    #[test]
    fn test_directive_shaped_text_decodes_as_directive() {
        // The backslash passthrough means text spelling a directive is not
        // round-trippable; it encodes unchanged and decodes expanded.
        assert_eq!(encode_string("\\X\\41"), "\\X\\41");
        assert_eq!(decode_string("\\X\\41").unwrap(), "A");
    }

    #[test]
    fn test_malformed_directives() {
        assert!(decode_string("\\X\\ZZ").is_err());
        assert!(decode_string("\\X2\\20AC").is_err()); // missing \X0\
        assert!(decode_string("\\X2\\D800\\X0\\").is_err()); // surrogate
        assert!(decode_string("\\X\\4").is_err()); // truncated
    }

    #[test]
    fn test_unknown_directive_kept_literal() {
        // \S\ page escapes are not produced by the encoder; the backslash
        // survives as-is rather than aborting the whole string.
        assert_eq!(decode_string("a\\S\\b").unwrap(), "a\\S\\b");
    }
}
