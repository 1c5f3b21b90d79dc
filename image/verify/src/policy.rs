/*++

Licensed under the Apache-2.0 license.

File Name:

   policy.rs

Abstract:

    Immutable verification policy and its decoded flag word.

--*/

use crate::io::IoPair;
use crate::scheme::{SchemeTable, SignatureMode};
use crate::stage7::Stage7Ops;
use crate::stage8::Stage8Ops;
use bitflags::bitflags;
use boot0_error::{BootError, BootResult};
use boot0_image_types::{KeyDescriptor, SignatureTemplate, SHA256_DIGEST_BYTE_SIZE};

bitflags! {
    /// Raw policy flag word. Bits not listed here are ignored.
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
    pub struct PolicyFlags: u32 {
        const STAGE8_ENABLED = 1 << 0;
        const COPY_DIGEST = 1 << 1;
        const RSA_PSS_SHA256 = 1 << 25;
        const RSA_PKCS1_V15 = 1 << 26;
    }
}

/// Signature mode requested by the flag word.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum ModeSelection {
    Pss,
    Pkcs1v15,
    Ambiguous,
    #[default]
    Unspecified,
}

impl ModeSelection {
    pub fn resolve(self) -> BootResult<SignatureMode> {
        match self {
            ModeSelection::Pss => Ok(SignatureMode::RsaPssSha256),
            ModeSelection::Pkcs1v15 => Ok(SignatureMode::RsaPkcs1v15Sha256),
            ModeSelection::Ambiguous => Err(BootError::CONFIG_ERR_MODE_AMBIGUOUS),
            ModeSelection::Unspecified => Err(BootError::CONFIG_ERR_MODE_UNSPECIFIED),
        }
    }
}

/// Policy flags decoded once at construction.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PolicyOptions {
    pub stage8_enabled: bool,
    pub copy_digest: bool,
    pub mode: ModeSelection,
}

impl PolicyOptions {
    pub fn decode(raw: u32) -> Self {
        let flags = PolicyFlags::from_bits_truncate(raw);
        let mode = match (
            flags.contains(PolicyFlags::RSA_PSS_SHA256),
            flags.contains(PolicyFlags::RSA_PKCS1_V15),
        ) {
            (true, false) => ModeSelection::Pss,
            (false, true) => ModeSelection::Pkcs1v15,
            (true, true) => ModeSelection::Ambiguous,
            (false, false) => ModeSelection::Unspecified,
        };
        Self {
            stage8_enabled: flags.contains(PolicyFlags::STAGE8_ENABLED),
            copy_digest: flags.contains(PolicyFlags::COPY_DIGEST),
            mode,
        }
    }
}

impl From<SignatureMode> for PolicyFlags {
    fn from(mode: SignatureMode) -> Self {
        match mode {
            SignatureMode::RsaPssSha256 => PolicyFlags::RSA_PSS_SHA256,
            SignatureMode::RsaPkcs1v15Sha256 => PolicyFlags::RSA_PKCS1_V15,
        }
    }
}

/// Read-only verification configuration.
///
/// Built once and shared by every call; the orchestrator never mutates it.
#[derive(Clone)]
pub struct VerificationPolicy<'a> {
    key: Option<KeyDescriptor<'a>>,
    stage8_ops: Option<&'a dyn Stage8Ops>,
    template: SignatureTemplate,
    stage7_ops: &'a dyn Stage7Ops,
    schemes: SchemeTable<'a>,
    hash_io: Option<IoPair<'a>>,
    expected: &'a [u8],
    options: PolicyOptions,
    token_len: u32,
}

impl<'a> VerificationPolicy<'a> {
    /// Digest-only policy comparing the full SHA-256 length.
    pub fn new(stage7_ops: &'a dyn Stage7Ops) -> Self {
        Self {
            key: None,
            stage8_ops: None,
            template: SignatureTemplate::default(),
            stage7_ops,
            schemes: SchemeTable::default(),
            hash_io: None,
            expected: &[],
            options: PolicyOptions::default(),
            token_len: SHA256_DIGEST_BYTE_SIZE as u32,
        }
    }

    pub fn with_key(mut self, key: KeyDescriptor<'a>) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_stage8_ops(mut self, ops: &'a dyn Stage8Ops) -> Self {
        self.stage8_ops = Some(ops);
        self
    }

    pub fn with_template(mut self, template: SignatureTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_schemes(mut self, schemes: SchemeTable<'a>) -> Self {
        self.schemes = schemes;
        self
    }

    pub fn with_hash_io(mut self, io: IoPair<'a>) -> Self {
        self.hash_io = Some(io);
        self
    }

    /// Expected digest, or the signature when the signature stage is enabled.
    pub fn with_expected(mut self, expected: &'a [u8]) -> Self {
        self.expected = expected;
        self
    }

    pub fn with_flags(mut self, raw: u32) -> Self {
        self.options = PolicyOptions::decode(raw);
        self
    }

    pub fn with_token_len(mut self, token_len: u32) -> Self {
        self.token_len = token_len;
        self
    }

    /// Copy of this policy checking `expected` instead.
    pub fn for_expected<'b>(&self, expected: &'b [u8]) -> VerificationPolicy<'b>
    where
        'a: 'b,
    {
        let policy: VerificationPolicy<'b> = self.clone();
        policy.with_expected(expected)
    }

    pub fn key(&self) -> Option<&KeyDescriptor<'a>> {
        self.key.as_ref()
    }

    pub fn stage8_ops(&self) -> Option<&'a dyn Stage8Ops> {
        self.stage8_ops
    }

    pub fn template(&self) -> &SignatureTemplate {
        &self.template
    }

    pub fn stage7_ops(&self) -> &'a dyn Stage7Ops {
        self.stage7_ops
    }

    pub fn schemes(&self) -> &SchemeTable<'a> {
        &self.schemes
    }

    pub fn hash_io(&self) -> Option<&IoPair<'a>> {
        self.hash_io.as_ref()
    }

    pub fn expected(&self) -> &'a [u8] {
        self.expected
    }

    pub fn options(&self) -> &PolicyOptions {
        &self.options
    }

    pub fn token_len(&self) -> u32 {
        self.token_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_flags() {
        let options = PolicyOptions::decode(0x0200_0003);
        assert!(options.stage8_enabled);
        assert!(options.copy_digest);
        assert_eq!(options.mode, ModeSelection::Pss);

        let options = PolicyOptions::decode(0x0400_0000);
        assert!(!options.stage8_enabled);
        assert_eq!(options.mode, ModeSelection::Pkcs1v15);
    }

    #[test]
    fn test_opaque_bits_ignored() {
        assert_eq!(
            PolicyOptions::decode(0xf9ff_fffc),
            PolicyOptions::default()
        );
    }

    #[test]
    fn test_mode_exclusive() {
        let both = PolicyOptions::decode(0x0600_0001);
        assert_eq!(both.mode, ModeSelection::Ambiguous);
        assert_eq!(both.mode.resolve(), Err(BootError::CONFIG_ERR_MODE_AMBIGUOUS));

        let neither = PolicyOptions::decode(0x0000_0001);
        assert_eq!(
            neither.mode.resolve(),
            Err(BootError::CONFIG_ERR_MODE_UNSPECIFIED)
        );

        assert_eq!(
            ModeSelection::Pkcs1v15.resolve(),
            Ok(SignatureMode::RsaPkcs1v15Sha256)
        );
    }

    #[test]
    fn test_policy_is_sync() {
        fn assert_sync<T: Sync>() {}
        assert_sync::<VerificationPolicy<'static>>();
    }
}
