//! Identifier signing.
//!
//! The asymmetric primitive sits behind [`HexSigner`]: it takes a private key
//! and a hex message and returns a hex signature. [`PayloadSigner`] feeds it the
//! identifier and turns the result into the raw bytes that get downloaded to
//! the device.
//!
//! [`RsaSha256Signer`] is the primitive the stock bootloaders expect:
//! PKCS#1 v1.5 over SHA-256 of the decoded message bytes.

use crate::error::UnlockError;
use crate::identifier::Identifier;
use bytes::Bytes;
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha2::Sha256;
use tracing::debug;

/// A signing primitive operating on hex-encoded messages.
pub trait HexSigner {
    type Key;

    fn sign_hex(&self, key: &Self::Key, message_hex: &str) -> Result<String, UnlockError>;
}

/// Raw signature bytes, sent verbatim as the download payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Bytes);

impl Signature {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

/// Signs identifiers with a [`HexSigner`] and decodes the result.
#[derive(Debug, Clone, Default)]
pub struct PayloadSigner<S> {
    primitive: S,
}

impl<S: HexSigner> PayloadSigner<S> {
    pub fn new(primitive: S) -> Self {
        Self { primitive }
    }

    pub fn sign(&self, identifier: &Identifier, key: &S::Key) -> Result<Signature, UnlockError> {
        let signature_hex = self.primitive.sign_hex(key, &identifier.to_hex())?;
        let signature = decode_signature(&signature_hex)?;
        debug!(len = signature.len(), "Identifier signed");
        Ok(signature)
    }
}

/// Decode a hex signature two digits at a time, either case.
pub fn decode_signature(signature_hex: &str) -> Result<Signature, UnlockError> {
    if signature_hex.is_empty() {
        return Err(UnlockError::SignatureDecode("empty signature".to_string()));
    }
    if signature_hex.len() % 2 != 0 {
        return Err(UnlockError::SignatureDecode(format!(
            "odd number of hex digits ({})",
            signature_hex.len()
        )));
    }
    let bytes = hex::decode(signature_hex).map_err(|e| UnlockError::SignatureDecode(e.to_string()))?;
    Ok(Signature(Bytes::from(bytes)))
}

/// RSA PKCS#1 v1.5 with SHA-256 (`SHA256withRSA`).
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaSha256Signer;

impl HexSigner for RsaSha256Signer {
    type Key = RsaPrivateKey;

    fn sign_hex(&self, key: &RsaPrivateKey, message_hex: &str) -> Result<String, UnlockError> {
        let message = hex::decode(message_hex).map_err(|e| UnlockError::Signing(format!("message is not hex: {e}")))?;
        let signing_key = SigningKey::<Sha256>::new(key.clone());
        let signature = signing_key
            .try_sign(&message)
            .map_err(|e| UnlockError::Signing(e.to_string()))?;
        Ok(hex::encode(signature.to_bytes()))
    }
}

/// Parse an RSA private key from PEM, PKCS#8 first, then PKCS#1.
pub fn load_private_key(pem: &str) -> Result<RsaPrivateKey, UnlockError> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| UnlockError::Signing(format!("unreadable private key: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1v15::VerifyingKey;
    use rsa::pkcs8::{EncodePrivateKey, LineEnding};
    use rsa::signature::Verifier;

    struct Canned(&'static str);

    impl HexSigner for Canned {
        type Key = ();

        fn sign_hex(&self, _key: &(), message_hex: &str) -> Result<String, UnlockError> {
            assert_eq!(message_hex.len(), 128);
            Ok(self.0.to_string())
        }
    }

    fn identifier() -> Identifier {
        Identifier::from_response("\n\n0123456789abcdef\n").unwrap()
    }

    #[test]
    fn test_decode_is_case_insensitive() {
        let sig = PayloadSigner::new(Canned("DEADbeef")).sign(&identifier(), &()).unwrap();
        assert_eq!(sig.as_bytes(), &[0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_decode_rejects_bad_hex() {
        for bad in ["abc", "zz", ""] {
            assert!(
                matches!(
                    PayloadSigner::new(Canned(bad)).sign(&identifier(), &()),
                    Err(UnlockError::SignatureDecode(_))
                ),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn test_rsa_signature_verifies() {
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let pem = key.to_pkcs8_pem(LineEnding::LF).unwrap();
        let key = load_private_key(&pem).unwrap();

        let id = identifier();
        let sig = PayloadSigner::new(RsaSha256Signer).sign(&id, &key).unwrap();
        assert_eq!(sig.len(), 128);

        let verifying_key = VerifyingKey::<Sha256>::new(key.to_public_key());
        let parsed = rsa::pkcs1v15::Signature::try_from(sig.as_bytes()).unwrap();
        verifying_key.verify(id.as_bytes(), &parsed).unwrap();
    }

    #[test]
    fn test_garbage_key_is_rejected() {
        assert!(matches!(
            load_private_key("-----BEGIN NOTHING-----"),
            Err(UnlockError::Signing(_))
        ));
    }
}
