#![expect(clippy::module_name_repetitions)]

use anyhow::{ensure, Result};
use static_assertions::assert_obj_safe;
use types::primitives::{PublicKeyBytes, SignatureBytes, H256};

use crate::{
    error::{Error, SignatureKind},
    signing,
};

/// Verification of aggregate signatures.
///
/// Implementations must be deterministic. Fork choice relies on replays producing the same
/// results.
pub trait Verifier: Send + Sync {
    fn verify_aggregate(
        &self,
        message: H256,
        signature_bytes: SignatureBytes,
        public_keys: &[PublicKeyBytes],
        signature_kind: SignatureKind,
    ) -> Result<()>;

    fn is_null(&self) -> bool {
        false
    }
}

assert_obj_safe!(Verifier);

/// Accepts every signature. Used for blocks whose validity has already been established.
#[derive(Clone, Copy, Default, Debug)]
pub struct NullVerifier;

impl Verifier for NullVerifier {
    #[inline]
    fn verify_aggregate(
        &self,
        _message: H256,
        _signature_bytes: SignatureBytes,
        _public_keys: &[PublicKeyBytes],
        _signature_kind: SignatureKind,
    ) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn is_null(&self) -> bool {
        true
    }
}

/// Accepts signatures produced by [`signing::aggregate_signature`].
#[derive(Clone, Copy, Default, Debug)]
pub struct DigestVerifier;

impl Verifier for DigestVerifier {
    fn verify_aggregate(
        &self,
        message: H256,
        signature_bytes: SignatureBytes,
        public_keys: &[PublicKeyBytes],
        signature_kind: SignatureKind,
    ) -> Result<()> {
        ensure!(!public_keys.is_empty(), Error::NoPublicKeys);

        ensure!(
            signing::aggregate_signature(public_keys, message) == signature_bytes,
            Error::SignatureInvalid(signature_kind),
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_verifier_accepts_matching_signature() -> Result<()> {
        let public_keys = [PublicKeyBytes::repeat_byte(1)];
        let message = H256::repeat_byte(2);
        let signature = signing::aggregate_signature(&public_keys, message);

        DigestVerifier.verify_aggregate(message, signature, &public_keys, SignatureKind::Block)
    }

    #[test]
    fn digest_verifier_rejects_wrong_message() {
        let public_keys = [PublicKeyBytes::repeat_byte(1)];
        let signature = signing::aggregate_signature(&public_keys, H256::repeat_byte(2));

        let error = DigestVerifier
            .verify_aggregate(
                H256::repeat_byte(3),
                signature,
                &public_keys,
                SignatureKind::Attestation,
            )
            .expect_err("signature is for a different message");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::SignatureInvalid(SignatureKind::Attestation)),
        ));
    }

    #[test]
    fn digest_verifier_rejects_empty_public_keys() {
        assert!(DigestVerifier
            .verify_aggregate(
                H256::zero(),
                SignatureBytes::zero(),
                &[],
                SignatureKind::Block,
            )
            .is_err());
    }

    #[test]
    fn null_verifier_accepts_anything() {
        assert!(NullVerifier
            .verify_aggregate(H256::zero(), SignatureBytes::zero(), &[], SignatureKind::Block)
            .is_ok());
        assert!(NullVerifier.is_null());
    }
}
