//! Webhook signature verification.

use secrecy::{ExposeSecret, SecretString};

use crate::crypto::{SignatureAlgorithm, constant_time_eq};

/// Parsed `<algorithm>=<hex-digest>` signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureDescriptor {
    pub algorithm: SignatureAlgorithm,
    pub digest: Vec<u8>,
}

/// Reason a signature header could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureParseError {
    MissingSeparator,
    UnknownAlgorithm(String),
    InvalidHex,
}

impl std::fmt::Display for SignatureParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureParseError::MissingSeparator => write!(f, "malformed signature"),
            SignatureParseError::UnknownAlgorithm(name) => {
                write!(f, "unknown signature algorithm {}", name)
            }
            SignatureParseError::InvalidHex => write!(f, "malformed signature: could not decode hex"),
        }
    }
}

impl std::str::FromStr for SignatureDescriptor {
    type Err = SignatureParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (method, hex_digest) = s.split_once('=').ok_or(SignatureParseError::MissingSeparator)?;
        let algorithm = SignatureAlgorithm::from_name(method)
            .ok_or_else(|| SignatureParseError::UnknownAlgorithm(method.to_string()))?;
        let digest = hex::decode(hex_digest).map_err(|_| SignatureParseError::InvalidHex)?;
        Ok(Self { algorithm, digest })
    }
}

/// The three header values that take part in signature verification.
#[derive(Debug, Clone, Copy)]
pub struct SignedHeaders<'a> {
    pub signature: &'a str,
    pub timestamp: &'a str,
    pub message_id: &'a str,
}

/// Verifier for EventSub message signatures against a set of candidate secrets.
///
/// Any one secret producing a matching keyed hash over
/// `message_id || timestamp || body` authenticates the message.
pub struct EventSubVerifier {
    secrets: Vec<SecretString>,
}

impl EventSubVerifier {
    /// Creates a verifier over the given candidate secrets.
    pub fn new(secrets: Vec<SecretString>) -> Self {
        Self { secrets }
    }

    /// Verifies a message signature.
    ///
    /// Malformed input never errors; it is reported as not authentic.
    pub fn verify(&self, headers: &SignedHeaders<'_>, body: &[u8]) -> bool {
        let descriptor: SignatureDescriptor = match headers.signature.parse() {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("{}", e);
                return false;
            }
        };

        let parts: [&[u8]; 3] = [
            headers.message_id.as_bytes(),
            headers.timestamp.as_bytes(),
            body,
        ];

        self.secrets.iter().any(|secret| {
            let expected = descriptor
                .algorithm
                .keyed_digest(secret.expose_secret().as_bytes(), &parts);
            constant_time_eq(&expected, &descriptor.digest)
        })
    }
}
