/*++

Licensed under the Apache-2.0 license.

File Name:

   stage8.rs

Abstract:

    Keyed signature stage: init, update and finalize with a one-shot
    cleanup on failure.

--*/

use crate::context::{op_failed, OpContext};
use crate::io::IoPair;
use boot0_error::{BootError, BootResult};
use boot0_image_types::{KeyDescriptor, MAX_RSA_BYTE_SIZE};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Flag value the orchestrator places in every [`Stage8Io`].
pub const STAGE8_IO_FLAG_VERIFY: u32 = 1;

/// Inputs of one signature stage invocation.
#[derive(Debug, Copy, Clone)]
pub struct Stage8Io<'a> {
    /// Signature to check
    pub expected: &'a [u8],

    /// Candidate image
    pub image: &'a IoPair<'a>,

    pub flags: u32,

    pub key: KeyDescriptor<'a>,
}

/// Working state owned by a single invocation.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Stage8State {
    pub work: [u8; MAX_RSA_BYTE_SIZE],
    pub work_len: usize,
}

impl Default for Stage8State {
    fn default() -> Self {
        Self {
            work: [0u8; MAX_RSA_BYTE_SIZE],
            work_len: 0,
        }
    }
}

/// Encoded message recovered from the signature.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Stage8Output {
    em: [u8; MAX_RSA_BYTE_SIZE],
    len: usize,
}

impl Default for Stage8Output {
    fn default() -> Self {
        Self {
            em: [0u8; MAX_RSA_BYTE_SIZE],
            len: 0,
        }
    }
}

impl Stage8Output {
    pub fn set(&mut self, em: &[u8]) -> BootResult<()> {
        let dest = self
            .em
            .get_mut(..em.len())
            .ok_or(BootError::VERIFY_ERR_SIGNATURE_LENGTH)?;
        dest.copy_from_slice(em);
        self.len = em.len();
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.em[..self.len]
    }
}

/// Signature operation set.
pub trait Stage8Ops: Sync {
    fn init(&self, ctx: &OpContext, io: &Stage8Io, state: &mut Stage8State) -> BootResult<()>;

    fn update(&self, ctx: &OpContext, io: &Stage8Io, state: &mut Stage8State) -> BootResult<()>;

    /// Write the encoded message to `out`
    fn finalize(
        &self,
        ctx: &OpContext,
        io: &Stage8Io,
        state: &mut Stage8State,
        out: &mut Stage8Output,
    ) -> BootResult<()>;

    /// Called once when `init`, `update` or `finalize` fails.
    fn cleanup(&self, ctx: &OpContext, io: &Stage8Io, state: &mut Stage8State);
}

pub(crate) fn run_stage8(
    ops: &dyn Stage8Ops,
    ctx: &OpContext,
    io: &Stage8Io,
    out: &mut Stage8Output,
) -> BootResult<()> {
    let mut state = Stage8State::default();

    let result = ops
        .init(ctx, io, &mut state)
        .map_err(op_failed("stage8 init", BootError::STAGE8_ERR_INIT_FAILURE))
        .and_then(|_| {
            ops.update(ctx, io, &mut state)
                .map_err(op_failed("stage8 update", BootError::STAGE8_ERR_UPDATE_FAILURE))
        })
        .and_then(|_| {
            ops.finalize(ctx, io, &mut state, out)
                .map_err(op_failed("stage8 finalize", BootError::STAGE8_ERR_FINALIZE_FAILURE))
        });

    if let Err(err) = result {
        log::warn!("signature stage failed: {}", err);
        ops.cleanup(ctx, io, &mut state);
    }

    result
}
