/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains data structures for the Boot0 Image Generator.

--*/

mod generator;

pub use generator::ImageGenerator;

use boot0_image_types::*;
use sha2::{Digest, Sha256};

/// Public key placed in the key tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ImagePublicKey {
    /// Big-endian modulus
    pub modulus: [u8; RSA2048_BYTE_SIZE],

    pub exponent: u32,
}

impl ImagePublicKey {
    pub fn descriptor(&self) -> KeyDescriptor<'_> {
        KeyDescriptor::new(&self.modulus, self.exponent)
    }
}

/// Image Generator Crypto Trait
pub trait ImageGeneratorCrypto {
    /// Calculate SHA-256 digest
    fn sha256_digest(&self, data: &[u8]) -> anyhow::Result<Digest256> {
        Ok(Sha256::digest(data).into())
    }

    /// Key written to the key tag
    fn public_key(&self) -> ImagePublicKey;

    /// Sign the digest of the signed message
    fn sign(&self, digest: &Digest256) -> anyhow::Result<[u8; RSA2048_BYTE_SIZE]>;
}

/// Fixed key and signature. Produces structurally valid images whose
/// signature does not verify.
#[derive(Debug, Clone)]
pub struct StaticSigner {
    pub key: ImagePublicKey,
    pub signature: [u8; RSA2048_BYTE_SIZE],
}

impl Default for StaticSigner {
    fn default() -> Self {
        Self {
            key: ImagePublicKey {
                modulus: [0xc5; RSA2048_BYTE_SIZE],
                exponent: 65537,
            },
            signature: [0x3a; RSA2048_BYTE_SIZE],
        }
    }
}

impl ImageGeneratorCrypto for StaticSigner {
    fn public_key(&self) -> ImagePublicKey {
        self.key
    }

    fn sign(&self, _digest: &Digest256) -> anyhow::Result<[u8; RSA2048_BYTE_SIZE]> {
        Ok(self.signature)
    }
}

/// Image Generator Configuration
#[derive(Debug, Clone)]
pub struct ImageGeneratorConfig {
    pub payload: Vec<u8>,

    /// Payload-relative `(offset, size)` load entries. `None` covers the
    /// whole payload with one entry.
    pub load_entries: Option<Vec<(u32, u32)>>,

    pub layout_tags: usize,

    pub key_tags: usize,

    pub signature_tag: bool,

    pub region_mode: RegionMode,

    pub region_count: u16,
}

impl ImageGeneratorConfig {
    pub fn with_payload(payload: Vec<u8>) -> Self {
        Self {
            payload,
            load_entries: None,
            layout_tags: 1,
            key_tags: 1,
            signature_tag: true,
            region_mode: RegionMode::Ranges,
            region_count: 1,
        }
    }
}

/// Generated image
#[derive(Debug, Clone)]
pub struct Boot0Image {
    pub bytes: Vec<u8>,

    /// SHA-256 of the signed message
    pub digest: Digest256,

    pub trailer_offset: u32,

    pub signature_offset: Option<u32>,
}
