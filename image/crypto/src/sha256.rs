// Licensed under the Apache-2.0 license

use boot0_error::{BootError, BootResult};
use boot0_image_types::Digest256;
use boot0_image_verify::{IoPair, OpContext, Stage7Ops, Stage7Scratch};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

const LEN_RECORD_BYTE_SIZE: usize = 8;

/// SHA-256 digest stage.
#[derive(Debug, Default, Copy, Clone)]
pub struct Sha256Ops;

impl Stage7Ops for Sha256Ops {
    fn prepare(&self, _ctx: &OpContext, io: &IoPair, scratch: &mut Stage7Scratch) -> BootResult<()> {
        scratch.zeroize();
        scratch.bytes[..LEN_RECORD_BYTE_SIZE].copy_from_slice(&(io.len() as u64).to_le_bytes());
        scratch.used = LEN_RECORD_BYTE_SIZE;
        Ok(())
    }

    fn digest(
        &self,
        _ctx: &OpContext,
        io: &IoPair,
        scratch: &Stage7Scratch,
        digest: &mut Digest256,
    ) -> BootResult<()> {
        // The input must be the one prepared for
        let mut len = [0u8; LEN_RECORD_BYTE_SIZE];
        len.copy_from_slice(&scratch.bytes[..LEN_RECORD_BYTE_SIZE]);
        if scratch.used != LEN_RECORD_BYTE_SIZE || u64::from_le_bytes(len) != io.len() as u64 {
            return Err(BootError::STAGE7_ERR_DIGEST_FAILURE);
        }

        let mut hasher = Sha256::new();
        for segment in io.segments() {
            hasher.update(segment);
        }
        digest.copy_from_slice(&hasher.finalize());
        Ok(())
    }

    fn finish(&self, _ctx: &OpContext, _io: &IoPair, scratch: &mut Stage7Scratch) -> BootResult<()> {
        scratch.zeroize();
        Ok(())
    }
}
