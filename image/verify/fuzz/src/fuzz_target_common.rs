// Licensed under the Apache-2.0 license

use boot0_error::BootResult;
use boot0_image_types::*;
use boot0_image_verify::*;

/// Folds the gather list into the digest so every segment is read.
struct FoldStage7;

impl Stage7Ops for FoldStage7 {
    fn prepare(&self, _ctx: &OpContext, _io: &IoPair, _scratch: &mut Stage7Scratch) -> BootResult<()> {
        Ok(())
    }

    fn digest(
        &self,
        _ctx: &OpContext,
        io: &IoPair,
        _scratch: &Stage7Scratch,
        digest: &mut Digest256,
    ) -> BootResult<()> {
        for (i, byte) in io.bytes().enumerate() {
            digest[i % digest.len()] ^= byte;
        }
        Ok(())
    }

    fn finish(&self, _ctx: &OpContext, _io: &IoPair, _scratch: &mut Stage7Scratch) -> BootResult<()> {
        Ok(())
    }
}

pub fn harness(data: &[u8]) {
    let carrier = LayoutCarrier::exact(data.len() as u32);
    let Ok(layout) = ImageLayout::parse(data, &carrier) else {
        return;
    };

    // A parsed image must index and gather without panicking
    let Ok(index) = build_sig_index(&layout) else {
        return;
    };
    let Ok(io) = signed_message(&layout, &index) else {
        return;
    };

    let expected = [0u8; SHA256_DIGEST_BYTE_SIZE];
    let policy = VerificationPolicy::new(&FoldStage7).with_expected(&expected);
    let mut ctx = VerifyContext::new(0, io);
    let _ = verify(&policy, &mut ctx);

    let _ = Boot0Verifier::new(policy).verify(data, &carrier, VerifyHooks::default());
}
