//! Random identifier generation for authorization codes and access tokens.
use rand::RngCore;

/// Number of random bytes backing a code or token; yields 32 hex characters.
const TOKEN_BYTES: usize = 16;

/// Generate a fresh 32 lowercase-hex-character identifier.
///
/// Used for both authorization codes and access tokens; the two are drawn
/// from the same entropy source and differ only in which store they end up
/// registered with.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_32_lowercase_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn tokens_are_not_trivially_repeated() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
    }
}
