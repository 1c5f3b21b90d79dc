/*++

Licensed under the Apache-2.0 license.

File Name:

   boot0.rs

Abstract:

    End-to-end boot0 image verification: parse, index, key pinning and the
    verification stages.

--*/

use crate::context::{Reporter, StageHook, VerifyContext};
use crate::index::{build_sig_index, signed_message};
use crate::parser::ImageLayout;
use crate::policy::VerificationPolicy;
use crate::source::{load_image, ImageSource};
use crate::verifier::verify;
use boot0_error::{BootError, BootResult};
use boot0_image_types::{Digest256, LayoutCarrier, LoadEntry, SigIndex, HEADER_DESCRIPTOR_MAX_ENTRIES};
use constant_time_eq::constant_time_eq;

/// Information about a verified image.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifiedImage {
    /// Digest of the signed message, when the policy requests a copy
    pub digest: Option<Digest256>,

    pub sig_index: SigIndex,

    pub total_len: u32,

    pub load_entries: [LoadEntry; HEADER_DESCRIPTOR_MAX_ENTRIES as usize],

    pub load_entry_count: usize,
}

impl VerifiedImage {
    pub fn load_entries(&self) -> &[LoadEntry] {
        &self.load_entries[..self.load_entry_count]
    }
}

/// Optional observers for one verification call.
#[derive(Default)]
pub struct VerifyHooks<'h> {
    pub stage_hook: Option<&'h mut dyn StageHook>,
    pub report: Option<&'h mut dyn Reporter>,
}

/// Boot0 image verifier bound to a policy.
pub struct Boot0Verifier<'p> {
    policy: VerificationPolicy<'p>,
    slot: u32,
}

impl<'p> Boot0Verifier<'p> {
    /// Create a new instance of `Boot0Verifier`
    ///
    /// # Arguments
    ///
    /// * `policy` - Verification policy shared by every image
    pub fn new(policy: VerificationPolicy<'p>) -> Self {
        Self { policy, slot: 0 }
    }

    /// Slot id reported to the stage operations.
    pub fn with_slot(mut self, slot: u32) -> Self {
        self.slot = slot;
        self
    }

    pub fn policy(&self) -> &VerificationPolicy<'p> {
        &self.policy
    }

    /// Load an image from `source` into `buf` and verify it.
    pub fn load_and_verify<S: ImageSource + ?Sized>(
        &self,
        source: &mut S,
        carrier: &LayoutCarrier,
        buf: &mut [u8],
        hooks: VerifyHooks<'_>,
    ) -> BootResult<VerifiedImage> {
        let image = load_image(source, carrier, buf)?;
        self.verify(image, carrier, hooks)
    }

    /// Verify an image already in memory.
    ///
    /// # Arguments
    ///
    /// * `image` - Whole image
    /// * `carrier` - Enclosing layout accounting
    /// * `hooks` - Stage and report observers
    ///
    /// # Returns
    ///
    /// * `VerifiedImage` - Details of the verified image
    pub fn verify(
        &self,
        image: &[u8],
        carrier: &LayoutCarrier,
        hooks: VerifyHooks<'_>,
    ) -> BootResult<VerifiedImage> {
        let layout = ImageLayout::parse(image, carrier)?;
        let sig_index = build_sig_index(&layout)?;
        let key_tag = layout.key_tag()?;
        let sig_tag = layout.signature_tag()?;

        let options = self.policy.options();
        let policy = if options.stage8_enabled {
            // The image must carry the pinned key
            if let Some(pinned) = self.policy.key() {
                let key = key_tag.key();
                if pinned.exponent != key.exponent
                    || pinned.modulus.len() != key.modulus.len()
                    || !constant_time_eq(pinned.modulus, key.modulus)
                {
                    return Err(BootError::VERIFY_ERR_KEY_MISMATCH);
                }
            }
            self.policy.for_expected(&sig_tag.signature)
        } else {
            self.policy.clone()
        };

        let io = signed_message(&layout, &sig_index)?;
        let mut ctx = VerifyContext::new(self.slot, io);
        ctx.stage_hook = hooks.stage_hook.map(|h| h as &mut dyn StageHook);
        ctx.report = hooks.report.map(|r| r as &mut dyn Reporter);

        verify(&policy, &mut ctx).into_result()?;

        let mut verified = VerifiedImage {
            digest: ctx.digest_out,
            sig_index,
            total_len: layout.header().total_len(),
            ..Default::default()
        };
        let entries = layout.descriptor().entries();
        verified.load_entries[..entries.len()].copy_from_slice(entries);
        verified.load_entry_count = entries.len();

        Ok(verified)
    }
}
