use crate::core::{DbcError, DbcResult};
use ed25519_dalek::{Signature, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

/// Public key that release packages are signed with
const TRUST_ANCHOR: [u8; PUBLIC_KEY_LENGTH] = [
    0x87, 0x0f, 0x44, 0x28, 0xa2, 0x30, 0x6e, 0xac, 0x5c, 0xb2, 0x2c, 0x7f, 0xf4, 0x25, 0x46, 0x1c,
    0x99, 0x8f, 0x6d, 0xe8, 0xa7, 0xa8, 0x62, 0x11, 0x5c, 0xa5, 0x58, 0x7c, 0xc2, 0x7c, 0xec, 0xd1,
];

/// Checks detached Ed25519 signatures over driver libraries
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    /// Verifier for the built-in release key
    pub fn new() -> DbcResult<Self> {
        Self::with_trust_anchor(&TRUST_ANCHOR)
    }

    pub fn with_trust_anchor(key: &[u8; PUBLIC_KEY_LENGTH]) -> DbcResult<Self> {
        let key = VerifyingKey::from_bytes(key)
            .map_err(|e| DbcError::Config(format!("Invalid signing key: {}", e)))?;
        Ok(Self { key })
    }

    /// Verify `library` against a signature file's contents.
    ///
    /// The signature may be the raw 64 bytes or their hex encoding.
    pub fn verify(&self, subject: &str, library: &[u8], signature: &[u8]) -> DbcResult<()> {
        let raw = decode_signature(signature)
            .ok_or_else(|| DbcError::SignatureInvalid(format!("{} (malformed signature)", subject)))?;
        let signature = Signature::from_bytes(&raw);

        self.key
            .verify(library, &signature)
            .map_err(|_| DbcError::SignatureInvalid(subject.to_string()))
    }
}

fn decode_signature(data: &[u8]) -> Option<[u8; SIGNATURE_LENGTH]> {
    if data.len() == SIGNATURE_LENGTH {
        return data.try_into().ok();
    }
    let text = std::str::from_utf8(data).ok()?;
    let bytes = hex::decode(text.trim()).ok()?;
    bytes.as_slice().try_into().ok()
}
