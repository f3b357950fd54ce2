//! Signature slot handling.
//!
//! The console signs every byte preceding the 128-byte signature. Key
//! material and the signature algorithm live outside this crate behind
//! [`SigningProvider`].

use super::format::{SIGNATURE_PADDING, SIGNATURE_SIZE};
use crate::error::Result;

/// Raw signature block.
pub type Signature = [u8; SIGNATURE_SIZE];

/// External signing capability.
pub trait SigningProvider {
    /// Sign the bytes preceding the signature slot.
    fn sign(&self, data: &[u8]) -> Result<Signature>;

    /// Check `signature` against the signed region.
    fn verify(&self, data: &[u8], signature: &Signature) -> bool;
}

/// Provider without key material: writes an all-zero signature and
/// verifies nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKeySigner;

impl SigningProvider for NoKeySigner {
    fn sign(&self, _data: &[u8]) -> Result<Signature> {
        Ok([0u8; SIGNATURE_SIZE])
    }

    fn verify(&self, _data: &[u8], _signature: &Signature) -> bool {
        false
    }
}

/// Split a signed file into the signed region and its signature.
pub fn signed_region(bytes: &[u8]) -> Option<(&[u8], &Signature)> {
    let tail = SIGNATURE_SIZE + SIGNATURE_PADDING;
    let body_len = bytes.len().checked_sub(tail)?;
    let (body, rest) = bytes.split_at(body_len);
    let signature = rest[..SIGNATURE_SIZE].try_into().ok()?;
    Some((body, signature))
}

/// Verify the signature of a serialized, signed file.
pub fn verify_signature(bytes: &[u8], provider: &dyn SigningProvider) -> bool {
    match signed_region(bytes) {
        Some((body, signature)) => provider.verify(body, signature),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Toy provider: every signature byte is the wrapping sum of the data.
    struct SumSigner;

    impl SigningProvider for SumSigner {
        fn sign(&self, data: &[u8]) -> Result<Signature> {
            let sum = data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
            Ok([sum; SIGNATURE_SIZE])
        }

        fn verify(&self, data: &[u8], signature: &Signature) -> bool {
            self.sign(data).map(|s| &s == signature).unwrap_or(false)
        }
    }

    #[test]
    fn test_no_key_signer() {
        let signer = NoKeySigner;
        assert_eq!(signer.sign(b"abc").unwrap(), [0u8; SIGNATURE_SIZE]);
        assert!(!signer.verify(b"abc", &[0u8; SIGNATURE_SIZE]));
    }

    #[test]
    fn test_signed_region_split() {
        let mut file = vec![1u8, 2, 3];
        file.extend_from_slice(&[9u8; SIGNATURE_SIZE]);
        file.extend_from_slice(&[0u8; SIGNATURE_PADDING]);

        let (body, sig) = signed_region(&file).unwrap();
        assert_eq!(body, &[1, 2, 3]);
        assert_eq!(sig, &[9u8; SIGNATURE_SIZE]);
        assert!(signed_region(&file[..100]).is_none());
    }

    #[test]
    fn test_verify_signature() {
        let body = [10u8, 20, 30];
        let mut file = body.to_vec();
        file.extend_from_slice(&SumSigner.sign(&body).unwrap());
        file.extend_from_slice(&[0u8; SIGNATURE_PADDING]);

        assert!(verify_signature(&file, &SumSigner));
        file[0] ^= 1;
        assert!(!verify_signature(&file, &SumSigner));
        assert!(!verify_signature(&file, &NoKeySigner));
    }
}
