/*++

Licensed under the Apache-2.0 license.

File Name:

   rustcrypto.rs

Abstract:

    File contains crypto utilities needed to generate images.

--*/

use std::path::Path;

use anyhow::{anyhow, bail, Context};

use boot0_image_gen::{ImageGeneratorCrypto, ImagePublicKey};
use boot0_image_types::*;

use {
    rsa::pkcs8::{DecodePrivateKey, DecodePublicKey},
    rsa::traits::PublicKeyParts,
    rsa::{Pkcs1v15Sign, Pss, RsaPrivateKey, RsaPublicKey},
    sha2::Sha256,
};

/// Padding used when signing.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum RsaPadding {
    #[default]
    Pss,
    Pkcs1v15,
}

pub struct RustCrypto {
    key: RsaPrivateKey,
    padding: RsaPadding,
    public: ImagePublicKey,
}

impl RustCrypto {
    pub fn new(key: RsaPrivateKey, padding: RsaPadding) -> anyhow::Result<Self> {
        if key.size() != RSA2048_BYTE_SIZE {
            bail!("Only RSA-{RSA2048_KEY_BITS} keys are supported");
        }
        let public = image_public_key(&key.to_public_key())?;
        Ok(Self {
            key,
            padding,
            public,
        })
    }

    /// Create a signer with a fresh random key.
    pub fn generate(padding: RsaPadding) -> anyhow::Result<Self> {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), RSA2048_KEY_BITS as usize)
            .context("Failed to generate RSA key")?;
        Self::new(key, padding)
    }

    pub fn from_pem_file(path: &Path, padding: RsaPadding) -> anyhow::Result<Self> {
        log::debug!("loading {:?} signing key {}", padding, path.display());
        Self::new(priv_key_from_pem(path)?, padding)
    }

    pub fn padding(&self) -> RsaPadding {
        self.padding
    }
}

impl ImageGeneratorCrypto for RustCrypto {
    fn public_key(&self) -> ImagePublicKey {
        self.public
    }

    fn sign(&self, digest: &Digest256) -> anyhow::Result<[u8; RSA2048_BYTE_SIZE]> {
        let signature = match self.padding {
            RsaPadding::Pss => self.key.sign_with_rng(
                &mut rand::thread_rng(),
                Pss::new_with_salt::<Sha256>(SHA256_DIGEST_BYTE_SIZE),
                digest,
            )?,
            RsaPadding::Pkcs1v15 => self.key.sign(Pkcs1v15Sign::new::<Sha256>(), digest)?,
        };
        signature
            .try_into()
            .map_err(|_| anyhow!("Unexpected signature length"))
    }
}

/// Convert an RSA public key to the key tag representation.
pub fn image_public_key(key: &RsaPublicKey) -> anyhow::Result<ImagePublicKey> {
    let n = key.n().to_bytes_be();
    if n.len() > RSA2048_BYTE_SIZE {
        bail!("Modulus exceeds {RSA2048_KEY_BITS} bits");
    }
    let e = key.e().to_bytes_be();
    if e.len() > 4 {
        bail!("Public exponent does not fit in 32 bits");
    }
    let exponent = e.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32);

    let mut modulus = [0u8; RSA2048_BYTE_SIZE];
    modulus[RSA2048_BYTE_SIZE - n.len()..].copy_from_slice(&n);
    Ok(ImagePublicKey { modulus, exponent })
}

pub fn pub_key_from_pem(path: &Path) -> anyhow::Result<ImagePublicKey> {
    let pem = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read public key PEM file {}", path.display()))?;
    let key = RsaPublicKey::from_public_key_pem(&pem)
        .with_context(|| format!("Failed to parse public key {}", path.display()))?;
    image_public_key(&key)
}

pub fn priv_key_from_pem(path: &Path) -> anyhow::Result<RsaPrivateKey> {
    let pem = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read private key PEM file {}", path.display()))?;
    RsaPrivateKey::from_pkcs8_pem(&pem)
        .with_context(|| format!("Failed to parse private key {}", path.display()))
}
