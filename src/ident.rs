//! Short, stable identifiers for (area, text) pairs.
//!
//! The id is the last 8 base-36 digits of a djb2-xor hash over
//! `"{area}|{text}"`. Arithmetic is wrapping 32-bit signed over UTF-16 code
//! units, which keeps ids identical to the ones already circulating in shared
//! links. Changing any detail here breaks every deep link ever published.
//!
//! The id space is not collision-free. Two pairs that hash alike alias each
//! other on deep-link resolution; the first one indexed wins.

/// Length of every derived id.
pub const ID_LEN: usize = 8;

const SEED: i32 = 5381;
const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Derive the permalink id for an affirmation.
///
/// Always returns exactly [`ID_LEN`] characters from `[0-9a-z]`.
pub fn derive_id(area: &str, text: &str) -> String {
    let key = format!("{area}|{text}");
    let hash = key.encode_utf16().fold(SEED, |h, unit| {
        h.wrapping_shl(5).wrapping_add(h) ^ i32::from(unit)
    });
    let digits = to_base36(hash as u32);
    let padded = format!("{digits:0>ID_LEN$}");
    padded[padded.len() - ID_LEN..].to_string()
}

fn to_base36(mut n: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
