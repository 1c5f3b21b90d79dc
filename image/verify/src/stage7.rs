/*++

Licensed under the Apache-2.0 license.

File Name:

   stage7.rs

Abstract:

    Digest stage: three ordered operations producing a 32-byte digest.

--*/

use crate::context::{op_failed, OpContext};
use crate::io::IoPair;
use boot0_error::{BootError, BootResult};
use boot0_image_types::Digest256;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const STAGE7_SCRATCH_BYTE_SIZE: usize = 64;

/// Working memory shared by the digest operations of one call.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Stage7Scratch {
    pub bytes: [u8; STAGE7_SCRATCH_BYTE_SIZE],
    pub used: usize,
}

impl Default for Stage7Scratch {
    fn default() -> Self {
        Self {
            bytes: [0u8; STAGE7_SCRATCH_BYTE_SIZE],
            used: 0,
        }
    }
}

/// Digest operation set.
///
/// The orchestrator calls `prepare`, `digest` and `finish` exactly once each,
/// in that order, over the same input.
pub trait Stage7Ops: Sync {
    /// Set up `scratch` for `io`
    fn prepare(&self, ctx: &OpContext, io: &IoPair, scratch: &mut Stage7Scratch) -> BootResult<()>;

    /// Produce the digest of `io`
    fn digest(
        &self,
        ctx: &OpContext,
        io: &IoPair,
        scratch: &Stage7Scratch,
        digest: &mut Digest256,
    ) -> BootResult<()>;

    /// Release `scratch`
    fn finish(&self, ctx: &OpContext, io: &IoPair, scratch: &mut Stage7Scratch) -> BootResult<()>;
}

pub(crate) fn run_stage7(ops: &dyn Stage7Ops, ctx: &OpContext, io: &IoPair) -> BootResult<Digest256> {
    let mut scratch = Stage7Scratch::default();
    let mut digest = Digest256::default();

    ops.prepare(ctx, io, &mut scratch)
        .map_err(op_failed("stage7 prepare", BootError::STAGE7_ERR_PREPARE_FAILURE))?;
    ops.digest(ctx, io, &scratch, &mut digest)
        .map_err(op_failed("stage7 digest", BootError::STAGE7_ERR_DIGEST_FAILURE))?;
    ops.finish(ctx, io, &mut scratch)
        .map_err(op_failed("stage7 finish", BootError::STAGE7_ERR_FINISH_FAILURE))?;

    Ok(digest)
}
