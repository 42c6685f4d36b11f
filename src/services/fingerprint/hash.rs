//! Polynomial content hashing.
//!
//! A 32-bit polynomial rolling hash rendered as base-36. The hash is used
//! for equality comparison between normalized texts, not for integrity:
//! collisions are possible and acceptable.

/// Base-36 digit alphabet.
const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Computes the 32-bit polynomial hash of a text, as a base-36 string.
///
/// The hash folds each character into a wrapping `i32` accumulator as
/// `h = h * 31 + ch`; the base-36 rendering covers the absolute value.
/// Intended for already-normalized text, but valid on any input.
///
/// # Example
///
/// ```rust
/// use qonduit::services::fingerprint::content_hash;
///
/// let a = content_hash("quantum entanglement");
/// let b = content_hash("quantum entanglement");
/// assert_eq!(a, b);
/// assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
///
/// assert_eq!(content_hash(""), "0");
/// ```
#[must_use]
pub fn content_hash(text: &str) -> String {
    let mut hash: i32 = 0;
    for ch in text.chars() {
        hash = hash.wrapping_mul(31).wrapping_add(ch as i32);
    }
    // unsigned_abs: i32::MIN has no i32 absolute value
    to_base36(hash.unsigned_abs())
}

/// Renders a `u32` in base-36 (lowercase).
fn to_base36(mut value: u32) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::with_capacity(7);
    while value > 0 {
        digits.push(char::from(BASE36_DIGITS[(value % 36) as usize]));
        value /= 36;
    }
    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_same_text_same_hash() {
        assert_eq!(content_hash("qubit"), content_hash("qubit"));
    }

    #[test]
    fn test_different_text_different_hash() {
        assert_ne!(content_hash("qubit"), content_hash("photon"));
    }

    #[test]
    fn test_empty_text_hashes_to_zero() {
        assert_eq!(content_hash(""), "0");
    }

    #[test]
    fn test_output_is_base36() {
        let hash = content_hash("explain quantum teleportation in detail");
        assert!(!hash.is_empty());
        assert!(
            hash.chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
    }

    #[test]
    fn test_order_sensitive() {
        assert_ne!(content_hash("ab"), content_hash("ba"));
    }

    #[test]
    fn test_single_char_is_code_point() {
        // h = 0 * 31 + 'a' = 97 = 2*36 + 25 -> "2p"
        assert_eq!(content_hash("a"), "2p");
    }

    #[test_case(0, "0" ; "zero")]
    #[test_case(35, "z" ; "last single digit")]
    #[test_case(36, "10" ; "first rollover")]
    #[test_case(u32::MAX, "1z141z3" ; "max value")]
    fn test_to_base36_bounds(value: u32, expected: &str) {
        assert_eq!(to_base36(value), expected);
    }

    #[test]
    fn test_long_input_wraps_without_panic() {
        let long = "entanglement ".repeat(10_000);
        let hash = content_hash(&long);
        assert!(!hash.is_empty());
    }
}
