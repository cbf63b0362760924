//! Input decoding.
//!
//! Log files written by JVM services are mostly UTF-8, but Windows consoles
//! and older appenders write CP949. Some files also carry a byte-order mark,
//! a stray invalid byte, or terminal colour codes from a console appender.
//! The encoding is chosen once per file; a line that is still invalid in that
//! encoding is decoded on its own so that one bad byte never costs more than
//! its line.

use std::borrow::Cow;

use encoding_rs::{Encoding, EUC_KR, UTF_8, WINDOWS_1252};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Tried in order once strict UTF-8 fails. `EUC_KR` decodes the full CP949 range.
const FALLBACKS: &[&Encoding] = &[EUC_KR];

/// One physical line after decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLine {
    /// 1-based physical line number
    pub line_number: usize,
    pub text: String,
    /// True when invalid bytes were replaced with U+FFFD
    pub lossy: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Encoding the file was read as
    pub encoding: &'static Encoding,
    pub lines: Vec<DecodedLine>,
}

/// Split raw file bytes into decoded lines.
///
/// A trailing newline does not produce an extra empty line; `\r\n` endings
/// are accepted.
pub fn decode_lines(bytes: &[u8]) -> Decoded {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let encoding = detect_encoding(bytes);
    if bytes.is_empty() {
        return Decoded {
            encoding,
            lines: Vec::new(),
        };
    }

    let body = bytes.strip_suffix(b"\n").unwrap_or(bytes);

    let lines = body
        .split(|&b| b == b'\n')
        .enumerate()
        .map(|(idx, chunk)| {
            let chunk = chunk.strip_suffix(b"\r").unwrap_or(chunk);
            let cleaned = strip_ansi_codes(chunk);
            let (text, lossy) = match encoding.decode_without_bom_handling_and_without_replacement(&cleaned) {
                Some(text) => (text.into_owned(), false),
                None => (encoding.decode_without_bom_handling(&cleaned).0.into_owned(), true),
            };
            DecodedLine {
                line_number: idx + 1,
                text,
                lossy,
            }
        })
        .collect();

    Decoded { encoding, lines }
}

/// Pick the encoding for a whole file (BOM already removed).
///
/// Strict UTF-8 first, then each fallback that decodes the whole file without
/// error. Failing those, a file whose non-ASCII lines are mostly valid UTF-8
/// stays UTF-8 (stray bytes become U+FFFD per line); otherwise it is read as
/// single-byte Latin text.
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }
    if let Some(encoding) = FALLBACKS
        .iter()
        .copied()
        .find(|e| e.decode_without_bom_handling_and_without_replacement(bytes).is_some())
    {
        return encoding;
    }

    let (mut valid, mut invalid) = (0usize, 0usize);
    for line in bytes.split(|&b| b == b'\n').filter(|l| !l.is_ascii()) {
        if std::str::from_utf8(line).is_ok() {
            valid += 1;
        } else {
            invalid += 1;
        }
    }
    if invalid > valid {
        WINDOWS_1252
    } else {
        UTF_8
    }
}

/// Strip ANSI escape sequences (CSI, OSC and two-byte Fe sequences).
///
/// Returns `Cow::Borrowed` when the input holds no ESC byte.
pub fn strip_ansi_codes(input: &[u8]) -> Cow<'_, [u8]> {
    if !input.contains(&0x1b) {
        return Cow::Borrowed(input);
    }

    let mut output = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        if input[i] != 0x1b {
            output.push(input[i]);
            i += 1;
            continue;
        }

        // Lone trailing ESC
        let Some(&next) = input.get(i + 1) else {
            break;
        };

        match next {
            b'[' => {
                // CSI: parameters until a final byte in 0x40..=0x7E
                i += 2;
                while i < input.len() {
                    let b = input[i];
                    i += 1;
                    if (0x40..=0x7E).contains(&b) {
                        break;
                    }
                }
            }
            b']' => {
                // OSC: terminated by BEL or ESC \
                i += 2;
                while i < input.len() {
                    if input[i] == 0x07 {
                        i += 1;
                        break;
                    }
                    if input[i] == 0x1b && input.get(i + 1) == Some(&b'\\') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            0x40..=0x5F => i += 2,
            _ => {
                output.push(input[i]);
                i += 1;
            }
        }
    }

    Cow::Owned(output)
}
