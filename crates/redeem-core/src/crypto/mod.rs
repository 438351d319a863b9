//! Keyed-hash and checksum primitives used for webhook verification and reward routing.

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

/// Maximum webhook payload size (10MB).
pub const MAX_WEBHOOK_SIZE: usize = 10 * 1024 * 1024;

/// Hash algorithms accepted in the message signature header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    Sha1,
    Sha256,
    /// SHA-384, i.e. SHA-512 truncated to 384 bits with its own IVs.
    Sha384,
    Sha512,
}

impl SignatureAlgorithm {
    pub const ALL: [SignatureAlgorithm; 4] = [
        SignatureAlgorithm::Sha1,
        SignatureAlgorithm::Sha256,
        SignatureAlgorithm::Sha384,
        SignatureAlgorithm::Sha512,
    ];

    /// Parses the algorithm name used as the signature header prefix.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sha1" => Some(SignatureAlgorithm::Sha1),
            "sha256" => Some(SignatureAlgorithm::Sha256),
            "sha384" => Some(SignatureAlgorithm::Sha384),
            "sha512" => Some(SignatureAlgorithm::Sha512),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Sha1 => "sha1",
            SignatureAlgorithm::Sha256 => "sha256",
            SignatureAlgorithm::Sha384 => "sha384",
            SignatureAlgorithm::Sha512 => "sha512",
        }
    }

    /// Computes the keyed hash of `parts`, fed in order with no separators.
    pub fn keyed_digest(&self, key: &[u8], parts: &[&[u8]]) -> Vec<u8> {
        match self {
            SignatureAlgorithm::Sha1 => keyed_digest::<Hmac<Sha1>>(key, parts),
            SignatureAlgorithm::Sha256 => keyed_digest::<Hmac<Sha256>>(key, parts),
            SignatureAlgorithm::Sha384 => keyed_digest::<Hmac<Sha384>>(key, parts),
            SignatureAlgorithm::Sha512 => keyed_digest::<Hmac<Sha512>>(key, parts),
        }
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn keyed_digest<M: Mac + KeyInit>(key: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    let mut mac = <M as KeyInit>::new_from_slice(key).expect("HMAC can take key of any size");
    for part in parts {
        mac.update(part);
    }
    mac.finalize().into_bytes().to_vec()
}

/// Formats a message signature header value (`<algorithm>=<hex>`) over id, timestamp and body.
pub fn sign_message(
    algorithm: SignatureAlgorithm,
    secret: &[u8],
    message_id: &str,
    timestamp: &str,
    body: &[u8],
) -> String {
    let digest = algorithm.keyed_digest(secret, &[message_id.as_bytes(), timestamp.as_bytes(), body]);
    format!("{}={}", algorithm, hex::encode(digest))
}

/// Constant-time equality comparison.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// IEEE CRC-32 of the UTF-8 bytes of `text`.
pub fn checksum(text: &str) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(text.as_bytes());
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_names_roundtrip() {
        for alg in SignatureAlgorithm::ALL {
            assert_eq!(SignatureAlgorithm::from_name(alg.as_str()), Some(alg));
        }
        assert_eq!(SignatureAlgorithm::from_name("md5"), None);
        assert_eq!(SignatureAlgorithm::from_name("SHA256"), None);
    }

    #[test]
    fn test_digest_lengths_match_algorithm() {
        for alg in SignatureAlgorithm::ALL {
            let digest = alg.keyed_digest(b"key", &[b"a", b"b"]);
            let expected = match alg {
                SignatureAlgorithm::Sha1 => 20,
                SignatureAlgorithm::Sha256 => 32,
                SignatureAlgorithm::Sha384 => 48,
                SignatureAlgorithm::Sha512 => 64,
            };
            assert_eq!(digest.len(), expected, "{}", alg);
        }
    }

    #[test]
    fn test_keyed_digest_parts_are_concatenated() {
        let split = SignatureAlgorithm::Sha256.keyed_digest(b"key", &[b"id", b"ts", b"body"]);
        let joined = SignatureAlgorithm::Sha256.keyed_digest(b"key", &[b"idtsbody"]);
        assert_eq!(split, joined);
    }

    #[test]
    fn test_hmac_sha256_known_vector() {
        // RFC 4231 test case 2
        let digest = SignatureAlgorithm::Sha256.keyed_digest(b"Jefe", &[b"what do ya want for nothing?"]);
        assert_eq!(
            hex::encode(digest),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_sign_message_format() {
        let header = sign_message(SignatureAlgorithm::Sha512, b"secret", "id", "ts", b"{}");
        let (alg, hex_digest) = header.split_once('=').unwrap();
        assert_eq!(alg, "sha512");
        assert_eq!(hex::decode(hex_digest).unwrap().len(), 64);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn test_checksum_is_ieee_crc32() {
        assert_eq!(checksum("123456789"), 0xCBF4_3926);
        assert_eq!(checksum(""), 0);
        assert_eq!(checksum("hello"), checksum("hello"));
    }
}
