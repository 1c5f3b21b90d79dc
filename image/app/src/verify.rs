/*++

Licensed under the Apache-2.0 license.

File Name:

   verify.rs

Abstract:

    File contains implementation of the boot0 image verification command.

--*/

use anyhow::{bail, Context};
use boot0_image_crypto::{pub_key_from_pem, rsa_schemes, RsaStage8Ops, Sha256Ops};
use boot0_image_types::{SignatureTemplate, SHA256_DIGEST_BYTE_SIZE};
use boot0_image_verify::{
    Boot0Verifier, PolicyFlags, SliceSource, Stage, StageEvent, VerificationPolicy, VerifyHooks,
};
use clap::ArgMatches;
use std::path::PathBuf;

use crate::config;

static SHA256: Sha256Ops = Sha256Ops;
static RSA: RsaStage8Ops = RsaStage8Ops;

/// Run the command
pub(crate) fn run_cmd(args: &ArgMatches) -> anyhow::Result<()> {
    let config_path: &PathBuf = args
        .get_one::<PathBuf>("config")
        .with_context(|| "config arg not specified")?;

    let image_path: &PathBuf = args
        .get_one::<PathBuf>("image")
        .with_context(|| "image arg not specified")?;

    let config = config::load_config(config_path)?;
    let policy_config = &config.policy;

    let mut flags = PolicyFlags::empty();
    if policy_config.copy_digest {
        flags |= PolicyFlags::COPY_DIGEST;
    }

    let public_key = match &policy_config.public_key {
        Some(pem) if policy_config.stage8 => Some(pub_key_from_pem(&config.path(pem))?),
        None if policy_config.stage8 => bail!("stage8 requires policy.public_key"),
        _ => None,
    };

    let expected_digest = match &policy_config.expected_digest {
        Some(digest) => hex::decode(digest).context("Invalid expected_digest")?,
        None if !policy_config.stage8 => {
            bail!("policy.expected_digest is required when stage8 is disabled")
        }
        None => Vec::new(),
    };
    if !policy_config.stage8 && expected_digest.len() > SHA256_DIGEST_BYTE_SIZE {
        bail!("expected_digest is longer than a SHA-256 digest");
    }

    let mut policy = VerificationPolicy::new(&SHA256)
        .with_expected(&expected_digest)
        .with_token_len(policy_config.token_len);
    if let Some(key) = &public_key {
        flags |= PolicyFlags::STAGE8_ENABLED | PolicyFlags::from(policy_config.signature_mode()?);
        policy = policy
            .with_key(key.descriptor())
            .with_stage8_ops(&RSA)
            .with_schemes(rsa_schemes())
            .with_template(SignatureTemplate::sha256(policy_config.salt_len));
    }
    let policy = policy.with_flags(flags.bits());

    let data = std::fs::read(image_path)
        .with_context(|| format!("Failed to read image {}", image_path.display()))?;
    let mut buf = vec![0u8; data.len()];

    let mut hook = |stage: Stage, event: StageEvent| {
        log::debug!("stage {} event {}", stage.id(), event.as_u32());
    };
    let hooks = VerifyHooks {
        stage_hook: Some(&mut hook),
        report: None,
    };

    let verifier = Boot0Verifier::new(policy);
    let verified = verifier
        .load_and_verify(&mut SliceSource::new(&data), &config.carrier, &mut buf, hooks)
        .with_context(|| format!("Verification of {} failed", image_path.display()))?;

    println!("PASS");
    println!("  total length: 0x{:x}", verified.total_len);
    println!("  signed tags:  {}", verified.sig_index.len());
    if let Some(digest) = verified.digest {
        println!("  digest:       {}", hex::encode(digest));
    }

    Ok(())
}
