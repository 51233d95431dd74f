//! `X-Line-Signature` verification.
//!
//! LINE signs every webhook body with HMAC-SHA256 keyed by the channel
//! secret and sends the base64 digest in the `X-Line-Signature` header.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

fn keyed_mac(channel_secret: &str) -> Result<HmacSha256, String> {
    HmacSha256::new_from_slice(channel_secret.as_bytes())
        .map_err(|e| format!("invalid HMAC key: {e}"))
}

/// Base64 HMAC-SHA256 of `body` under `channel_secret`.
pub fn sign(channel_secret: &str, body: &[u8]) -> Result<String, String> {
    let mut mac = keyed_mac(channel_secret)?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Check a received signature header against the body, in constant time.
pub fn verify(channel_secret: &str, body: &[u8], signature: Option<&str>) -> Result<(), String> {
    let signature = signature.ok_or_else(|| "missing X-Line-Signature header".to_string())?;

    let expected = STANDARD
        .decode(signature.trim())
        .map_err(|_| "X-Line-Signature is not valid base64".to_string())?;

    let mut mac = keyed_mac(channel_secret)?;
    mac.update(body);

    mac.verify_slice(&expected)
        .map_err(|_| "signature mismatch".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"destination":"Ubot","events":[]}"#;

    #[test]
    fn signed_body_verifies() {
        let sig = sign("secret", BODY).unwrap();
        assert!(verify("secret", BODY, Some(&sig)).is_ok());
    }

    #[test]
    fn wrong_secret_fails() {
        let sig = sign("secret", BODY).unwrap();
        assert_eq!(
            verify("other", BODY, Some(&sig)).unwrap_err(),
            "signature mismatch"
        );
    }

    #[test]
    fn tampered_body_fails() {
        let sig = sign("secret", BODY).unwrap();
        assert!(verify("secret", b"{\"events\":[1]}", Some(&sig)).is_err());
    }

    #[test]
    fn missing_header_fails() {
        assert!(verify("secret", BODY, None).unwrap_err().contains("missing"));
    }

    #[test]
    fn garbage_header_fails() {
        assert!(verify("secret", BODY, Some("%%%"))
            .unwrap_err()
            .contains("base64"));
    }

    #[test]
    fn signature_is_standard_base64_of_32_bytes() {
        let sig = sign("secret", BODY).unwrap();
        assert_eq!(STANDARD.decode(sig).unwrap().len(), 32);
    }

    #[test]
    fn empty_secret_still_produces_a_digest() {
        let sig = sign("", BODY).unwrap();
        assert_eq!(STANDARD.decode(&sig).unwrap().len(), 32);
        assert!(verify("", BODY, Some(&sig)).is_ok());
    }
}
