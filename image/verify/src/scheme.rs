/*++

Licensed under the Apache-2.0 license.

File Name:

   scheme.rs

Abstract:

    Signature mode strategies applied to the encoded message.

--*/

use boot0_error::{BootError, BootResult};
use boot0_image_types::{Digest256, SignatureTemplate};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SignatureMode {
    RsaPssSha256,
    RsaPkcs1v15Sha256,
}

/// Values compared in constant time to decide the verdict.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SchemeTokens {
    /// Hash recovered from the encoded message
    pub recovered: Digest256,

    /// Hash the recovered value must equal
    pub reference: Digest256,
}

/// Decodes an encoded message under one signature mode.
pub trait SignatureScheme: Sync {
    fn mode(&self) -> SignatureMode;

    /// Check the encoding of `em` and return the tokens to compare.
    ///
    /// # Arguments
    ///
    /// * `em` - Encoded message, as long as the modulus
    /// * `digest` - Digest of the signed message
    /// * `template` - Encoding parameters
    /// * `modulus_bits` - Bit length of the modulus
    fn recover(
        &self,
        em: &[u8],
        digest: &Digest256,
        template: &SignatureTemplate,
        modulus_bits: usize,
    ) -> BootResult<SchemeTokens>;
}

/// Strategies installed in a policy.
#[derive(Clone, Copy, Default)]
pub struct SchemeTable<'a> {
    pub rsa_pss_sha256: Option<&'a dyn SignatureScheme>,
    pub rsa_pkcs1v15_sha256: Option<&'a dyn SignatureScheme>,
}

impl<'a> SchemeTable<'a> {
    pub fn select(&self, mode: SignatureMode) -> BootResult<&'a dyn SignatureScheme> {
        let scheme = match mode {
            SignatureMode::RsaPssSha256 => self.rsa_pss_sha256,
            SignatureMode::RsaPkcs1v15Sha256 => self.rsa_pkcs1v15_sha256,
        };
        match scheme {
            Some(scheme) if scheme.mode() == mode => Ok(scheme),
            _ => Err(BootError::CONFIG_ERR_SCHEME_MISSING),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(SignatureMode);

    impl SignatureScheme for Fixed {
        fn mode(&self) -> SignatureMode {
            self.0
        }

        fn recover(
            &self,
            _em: &[u8],
            digest: &Digest256,
            _template: &SignatureTemplate,
            _modulus_bits: usize,
        ) -> BootResult<SchemeTokens> {
            Ok(SchemeTokens {
                recovered: *digest,
                reference: *digest,
            })
        }
    }

    static PSS: Fixed = Fixed(SignatureMode::RsaPssSha256);
    static PKCS1: Fixed = Fixed(SignatureMode::RsaPkcs1v15Sha256);

    #[test]
    fn test_select() {
        let table = SchemeTable {
            rsa_pss_sha256: Some(&PSS),
            rsa_pkcs1v15_sha256: None,
        };
        assert_eq!(
            table.select(SignatureMode::RsaPssSha256).map(|s| s.mode()),
            Ok(SignatureMode::RsaPssSha256)
        );
        assert_eq!(
            table.select(SignatureMode::RsaPkcs1v15Sha256).map(|s| s.mode()),
            Err(BootError::CONFIG_ERR_SCHEME_MISSING)
        );
    }

    #[test]
    fn test_select_rejects_wrong_slot() {
        let table = SchemeTable {
            rsa_pss_sha256: Some(&PKCS1),
            rsa_pkcs1v15_sha256: Some(&PKCS1),
        };
        assert_eq!(
            table.select(SignatureMode::RsaPssSha256).map(|s| s.mode()),
            Err(BootError::CONFIG_ERR_SCHEME_MISSING)
        );
    }
}
