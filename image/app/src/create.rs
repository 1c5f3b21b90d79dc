/*++

Licensed under the Apache-2.0 license.

File Name:

   create.rs

Abstract:

    File contains implementation of the boot0 image creation command.

--*/

use anyhow::Context;
use boot0_image_crypto::{RsaPadding, RustCrypto};
use boot0_image_gen::*;
use boot0_image_verify::SignatureMode;
use clap::ArgMatches;
use std::path::PathBuf;

use crate::config;

/// Run the command
pub(crate) fn run_cmd(args: &ArgMatches) -> anyhow::Result<()> {
    let config_path: &PathBuf = args
        .get_one::<PathBuf>("config")
        .with_context(|| "config arg not specified")?;

    let payload_path: &PathBuf = args
        .get_one::<PathBuf>("payload")
        .with_context(|| "payload arg not specified")?;

    let out_path: &PathBuf = args
        .get_one::<PathBuf>("out")
        .with_context(|| "out arg not specified")?;

    let config = config::load_config(config_path)?;
    let signing = config
        .signing
        .as_ref()
        .with_context(|| "[signing] section missing from config")?;

    let padding = match config.policy.signature_mode()? {
        SignatureMode::RsaPssSha256 => RsaPadding::Pss,
        SignatureMode::RsaPkcs1v15Sha256 => RsaPadding::Pkcs1v15,
    };
    let crypto = RustCrypto::from_pem_file(&config.path(&signing.private_key), padding)?;

    let payload = std::fs::read(payload_path)
        .with_context(|| format!("Failed to read payload {}", payload_path.display()))?;

    let gen = ImageGenerator::new(crypto);
    let image = gen.generate(&ImageGeneratorConfig::with_payload(payload))?;

    std::fs::write(out_path, &image.bytes)
        .with_context(|| format!("Failed to write image {}", out_path.display()))?;

    log::info!(
        "wrote {} ({} bytes, digest {}..)",
        out_path.display(),
        image.bytes.len(),
        hex::encode(&image.digest[..8])
    );

    Ok(())
}
