//! Ascii85 as written by Apple's Open Firmware update scripts.
//!
//! Standard Ascii85 with one twist: besides `z` for four zero bytes, `y`
//! stands for four `0xFF` bytes (conventionally `y` means four spaces).
//!
//! The encoder also mirrors Apple's line filling exactly: a new group is only
//! started when five characters still fit on the line, even if a one-character
//! shortcut would. Re-encoded lines therefore break in the same places as the
//! original file.

/// Four zero bytes.
pub const ZERO_SHORTCUT: u8 = b'z';
/// Four `0xFF` bytes.
pub const ONES_SHORTCUT: u8 = b'y';
/// Lowest digit character (value 0).
pub const FIRST_DIGIT: u8 = b'!';
/// Highest digit character (value 84).
pub const LAST_DIGIT: u8 = b'u';
/// Characters in a full group.
pub const GROUP_CHARS: usize = 5;
/// Bytes in a full group.
pub const GROUP_BYTES: usize = 4;

const POW85: [u32; GROUP_CHARS] = [85 * 85 * 85 * 85, 85 * 85 * 85, 85 * 85, 85, 1];

/// Decoding failure, with the position inside the decoded line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Ascii85Error {
    #[error("character {byte:#04x} at position {position} is outside '!'..='u'")]
    InvalidCharacter { position: usize, byte: u8 },

    #[error("group at position {position} has only {remaining} of 5 characters")]
    TruncatedGroup { position: usize, remaining: usize },

    #[error("line has no payload")]
    EmptyLine,
}

/// Decode one line of Ascii85 text.
pub fn decode(text: &[u8]) -> Result<Vec<u8>, Ascii85Error> {
    let mut output = Vec::with_capacity(text.len() / GROUP_CHARS * GROUP_BYTES);
    let mut pos = 0;

    while pos < text.len() {
        match text[pos] {
            ZERO_SHORTCUT => {
                output.extend_from_slice(&[0x00; GROUP_BYTES]);
                pos += 1;
            }
            ONES_SHORTCUT => {
                output.extend_from_slice(&[0xFF; GROUP_BYTES]);
                pos += 1;
            }
            _ => {
                let remaining = text.len() - pos;
                if remaining < GROUP_CHARS {
                    return Err(Ascii85Error::TruncatedGroup {
                        position: pos,
                        remaining,
                    });
                }

                let mut value = 0u32;
                for (i, &byte) in text[pos..pos + GROUP_CHARS].iter().enumerate() {
                    if !(FIRST_DIGIT..=LAST_DIGIT).contains(&byte) {
                        return Err(Ascii85Error::InvalidCharacter {
                            position: pos + i,
                            byte,
                        });
                    }
                    // Groups above "s8W-!" overflow; Apple's files never contain them.
                    value = value
                        .wrapping_add(POW85[i].wrapping_mul(u32::from(byte - FIRST_DIGIT)));
                }

                output.extend_from_slice(&value.to_be_bytes());
                pos += GROUP_CHARS;
            }
        }
    }

    Ok(output)
}

/// Result of one [`encode`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub text: Vec<u8>,
    /// Source bytes consumed, not counting implicit zero padding of a short
    /// final group.
    pub consumed: usize,
}

/// Encode `data` starting at `offset`, writing at most `max_width` characters.
///
/// With no width limit the rest of `data` is encoded. Resume from
/// `offset + consumed` to continue on the next line.
pub fn encode(data: &[u8], offset: usize, max_width: Option<usize>) -> Encoded {
    let max_width = max_width.unwrap_or(usize::MAX);
    let mut text = Vec::new();
    let mut offset = offset;
    let mut consumed = 0;

    while offset < data.len() && text.len() < max_width {
        if text.len().saturating_add(GROUP_CHARS) > max_width {
            break;
        }

        let take = (data.len() - offset).min(GROUP_BYTES);
        let mut group = [0u8; GROUP_BYTES];
        group[..take].copy_from_slice(&data[offset..offset + take]);
        let mut value = u32::from_be_bytes(group);

        match value {
            0 => text.push(ZERO_SHORTCUT),
            u32::MAX => text.push(ONES_SHORTCUT),
            _ => {
                let mut digits = [0u8; GROUP_CHARS];
                for digit in digits.iter_mut().rev() {
                    *digit = (value % 85) as u8 + FIRST_DIGIT;
                    value /= 85;
                }
                text.extend_from_slice(&digits);
            }
        }

        offset += GROUP_BYTES;
        consumed += take;
    }

    Encoded { text, consumed }
}

/// Encode all of `data` as lines of `prefix`, at most `width` characters of
/// Ascii85, and `terminator`.
///
/// `width` below one full group is raised to five characters.
pub fn encode_lines(data: &[u8], prefix: &[u8], terminator: u8, width: usize) -> Vec<u8> {
    let width = width.max(GROUP_CHARS);
    let mut output = Vec::with_capacity(data.len() / GROUP_BYTES * GROUP_CHARS * 11 / 10);
    let mut offset = 0;

    while offset < data.len() {
        let line = encode(data, offset, Some(width));
        output.extend_from_slice(prefix);
        output.extend_from_slice(&line.text);
        output.push(terminator);
        offset += line.consumed;
    }

    output
}
