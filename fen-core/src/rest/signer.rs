//! Request canonicalization and HMAC-SHA256 signing.
//!
//! The signature is computed over the *raw* (unencoded) query string; the
//! transmitted copy is URL-encoded with the signature appended. Parameter
//! order is insertion order; callers keep it stable when it matters.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Order-preserving request parameters.
#[derive(Debug, Clone, Default)]
pub struct Params {
    entries: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, key: &str, value: impl ToString) -> Self {
        self.entries.push((key.to_string(), value.to_string()));
        self
    }

    pub fn add(&mut self, key: &str, value: impl ToString) {
        self.entries.push((key.to_string(), value.to_string()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `k=v&k=v` with no encoding: the signing input.
    pub fn raw_query(&self) -> String {
        let mut out = String::new();
        for (k, v) in &self.entries {
            if !out.is_empty() {
                out.push('&');
            }
            out.push_str(k);
            out.push('=');
            out.push_str(v);
        }
        out
    }

    /// `k=v&k=v` with percent-encoded keys and values: the transmitted form.
    pub fn encoded_query(&self) -> String {
        let mut out = String::new();
        for (k, v) in &self.entries {
            if !out.is_empty() {
                out.push('&');
            }
            out.push_str(&encode_component(k));
            out.push('=');
            out.push_str(&encode_component(v));
        }
        out
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set. Space is
/// `%20`, never `+`: the exchange decodes query and body identically.
pub fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{:02X}", b));
            }
        }
    }
    out
}

/// Lowercase-hex HMAC-SHA256 of `data` under `secret`.
pub fn hmac_sha256_hex(secret: &str, data: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// The transmitted query/body for a signed request: encoded params plus
/// `&signature=<hex of raw params>`.
pub fn signed_query(params: &Params, secret: &str) -> String {
    let signature = hmac_sha256_hex(secret, &params.raw_query());
    let mut out = params.encoded_query();
    if !out.is_empty() {
        out.push('&');
    }
    out.push_str("signature=");
    out.push_str(&signature);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_preserve_insertion_order() {
        let p = Params::new().push("symbol", "BNBUSDT").push("side", "BUY").push("quantity", "0.1");
        assert_eq!(p.raw_query(), "symbol=BNBUSDT&side=BUY&quantity=0.1");
    }

    #[test]
    fn encoding_leaves_unreserved_untouched() {
        assert_eq!(encode_component("BNBUSDT"), "BNBUSDT");
        assert_eq!(encode_component("0.001"), "0.001");
        assert_eq!(encode_component("a_b-c.d~e"), "a_b-c.d~e");
    }

    #[test]
    fn encoding_escapes_reserved_bytes() {
        assert_eq!(encode_component("a b"), "a%20b");
        assert_eq!(encode_component("a&b=c"), "a%26b%3Dc");
        assert_eq!(encode_component("50%"), "50%25");
    }

    #[test]
    fn hmac_matches_reference_vector() {
        // Binance API documentation example key/payload.
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            hmac_sha256_hex(secret, query),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn hmac_is_lowercase_hex() {
        let sig = hmac_sha256_hex("secret", "a=1&b=2&timestamp=1700000000000");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn signed_query_appends_signature_of_raw_form() {
        let p = Params::new().push("symbol", "BNBUSDT").push("timestamp", 1700000000000u64);
        let q = signed_query(&p, "secret");
        let expected_sig = hmac_sha256_hex("secret", "symbol=BNBUSDT&timestamp=1700000000000");
        assert_eq!(q, format!("symbol=BNBUSDT&timestamp=1700000000000&signature={expected_sig}"));
    }
}
