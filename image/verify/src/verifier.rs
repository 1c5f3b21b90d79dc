/*++

Licensed under the Apache-2.0 license.

File Name:

   verifier.rs

Abstract:

    Orchestrates the digest and signature stages against a policy.

--*/

use crate::context::{DigestSource, OpContext, Stage, StageEvent, VerifyContext};
use crate::policy::VerificationPolicy;
use crate::stage7::run_stage7;
use crate::stage8::{run_stage8, Stage8Io, Stage8Output, STAGE8_IO_FLAG_VERIFY};
use boot0_error::{BootError, BootResult};
use boot0_image_types::{Digest256, SHA256_DIGEST_BYTE_SIZE};
use constant_time_eq::constant_time_eq;

/// Result of a verification call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Pass,
    Fail(BootError),
}

impl VerifyOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, VerifyOutcome::Pass)
    }

    pub fn into_result(self) -> BootResult<()> {
        match self {
            VerifyOutcome::Pass => Ok(()),
            VerifyOutcome::Fail(err) => Err(err),
        }
    }

    fn code(&self) -> u32 {
        match self {
            VerifyOutcome::Pass => 0,
            VerifyOutcome::Fail(err) => u32::from(*err),
        }
    }
}

impl From<BootResult<()>> for VerifyOutcome {
    fn from(result: BootResult<()>) -> Self {
        match result {
            Ok(()) => VerifyOutcome::Pass,
            Err(err) => VerifyOutcome::Fail(err),
        }
    }
}

/// Verify the context's input against `policy`.
///
/// # Arguments
///
/// * `policy` - Shared verification policy
/// * `ctx` - Per-call state
///
/// # Returns
///
/// * `VerifyOutcome` - `Pass`, or `Fail` with the first error encountered
pub fn verify(policy: &VerificationPolicy, ctx: &mut VerifyContext) -> VerifyOutcome {
    let outcome = VerifyOutcome::from(verify_image_integrity(policy, ctx));
    ctx.emit(Stage::Verdict, outcome.code(), policy.token_len());

    match outcome {
        VerifyOutcome::Pass => log::info!("slot {}: image verified", ctx.slot),
        VerifyOutcome::Fail(err) => log::warn!("slot {}: verification failed: {}", ctx.slot, err),
    }

    outcome
}

fn verify_image_integrity(policy: &VerificationPolicy, ctx: &mut VerifyContext) -> BootResult<()> {
    let options = *policy.options();
    let image = ctx.image.clone();
    let op_ctx = OpContext {
        slot: ctx.slot,
        image: &image,
    };

    // Digest
    let input = match ctx.digest_source {
        DigestSource::Candidate => image.clone(),
        DigestSource::PolicyHashIo => policy
            .hash_io()
            .cloned()
            .ok_or(BootError::CONFIG_ERR_HASH_IO_MISSING)?,
    };

    log::debug!("slot {}: digest over {} bytes", ctx.slot, input.len());
    ctx.notify(Stage::Digest, StageEvent::Enter);
    let digest = run_stage7(policy.stage7_ops(), &op_ctx, &input);
    ctx.notify(Stage::Digest, StageEvent::Exit);
    ctx.emit(Stage::Digest, stage_code(&digest), SHA256_DIGEST_BYTE_SIZE as u32);
    let digest = digest?;

    if options.copy_digest {
        ctx.digest_out = Some(digest);
    }

    if !options.stage8_enabled {
        return verify_digest(policy, &digest);
    }

    // Signature
    let key = *policy
        .key()
        .ok_or(BootError::CONFIG_ERR_KEY_DESCRIPTOR_MISSING)?;
    let ops = policy
        .stage8_ops()
        .ok_or(BootError::CONFIG_ERR_STAGE8_OPS_MISSING)?;
    let io = Stage8Io {
        expected: policy.expected(),
        image: &image,
        flags: STAGE8_IO_FLAG_VERIFY,
        key,
    };

    let mut em = Stage8Output::default();
    ctx.notify(Stage::Signature, StageEvent::Enter);
    let result = run_stage8(ops, &op_ctx, &io, &mut em);
    ctx.notify(Stage::Signature, StageEvent::Exit);
    ctx.emit(Stage::Signature, stage_code(&result), em.as_bytes().len() as u32);
    result?;

    // Mode select
    let mode = options.mode.resolve()?;
    let scheme = policy.schemes().select(mode)?;
    let tokens = scheme.recover(em.as_bytes(), &digest, policy.template(), key.modulus_bits())?;

    compare_tokens(
        &tokens.recovered,
        &tokens.reference,
        policy.token_len(),
        BootError::VERIFY_ERR_SIGNATURE_MISMATCH,
    )
}

/// Compare the digest against the policy's expected buffer.
fn verify_digest(policy: &VerificationPolicy, digest: &Digest256) -> BootResult<()> {
    if policy.token_len() as usize != policy.expected().len() {
        return Err(BootError::CONFIG_ERR_TOKEN_LEN_INVALID);
    }
    compare_tokens(
        digest,
        policy.expected(),
        policy.token_len(),
        BootError::VERIFY_ERR_DIGEST_MISMATCH,
    )
}

fn compare_tokens(observed: &[u8], reference: &[u8], token_len: u32, err: BootError) -> BootResult<()> {
    let len = token_len as usize;
    if len == 0 || len > SHA256_DIGEST_BYTE_SIZE || len > observed.len() || len > reference.len() {
        return Err(BootError::CONFIG_ERR_TOKEN_LEN_INVALID);
    }

    if constant_time_eq(&observed[..len], &reference[..len]) {
        Ok(())
    } else {
        Err(err)
    }
}

fn stage_code<T>(result: &BootResult<T>) -> u32 {
    match result {
        Ok(_) => 0,
        Err(err) => u32::from(*err),
    }
}
