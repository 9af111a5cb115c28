//! Fixed-size, NUL-padded byte strings for shared-memory frames.
//!
//! Identifiers on the bus are `[u8; N]` so frames stay `Copy` and layout-
//! stable across processes.

/// Pack a str into a NUL-padded array, truncating to `N - 1` bytes so the
/// field always carries a terminator for non-Rust readers.
pub fn pack<const N: usize>(s: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let len = s.len().min(N - 1);
    out[..len].copy_from_slice(&s.as_bytes()[..len]);
    out
}

/// Read back up to the first NUL. Invalid UTF-8 yields an empty str rather
/// than garbage identifiers reaching the exchange.
pub fn unpack(bytes: &[u8]) -> &str {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..len]).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_round_trip() {
        let a: [u8; 32] = pack("cid-1");
        assert_eq!(unpack(&a), "cid-1");
    }

    #[test]
    fn truncates_and_keeps_terminator() {
        let a: [u8; 8] = pack("abcdefghij");
        assert_eq!(unpack(&a), "abcdefg");
        assert_eq!(a[7], 0);
    }

    #[test]
    fn empty_is_empty() {
        let a: [u8; 16] = pack("");
        assert_eq!(unpack(&a), "");
    }
}
