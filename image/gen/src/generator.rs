/*++

Licensed under the Apache-2.0 license.

File Name:

   generator.rs

Abstract:

    Boot0 Image generator

--*/
use anyhow::{bail, Context};
use boot0_image_types::*;
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromZeros, IntoBytes};

use crate::*;

/// Image generator
pub struct ImageGenerator<Crypto: ImageGeneratorCrypto> {
    crypto: Crypto,
}

impl<Crypto: ImageGeneratorCrypto> ImageGenerator<Crypto> {
    /// Create an instance `ImageGenerator`
    pub fn new(crypto: Crypto) -> Self {
        Self { crypto }
    }

    pub fn crypto(&self) -> &Crypto {
        &self.crypto
    }

    /// Generate image
    ///
    /// # Arguments
    ///
    /// * `config` - Image generator configuration
    ///
    /// # Returns
    ///
    /// * `Boot0Image` - Signed boot0 image
    pub fn generate(&self, config: &ImageGeneratorConfig) -> anyhow::Result<Boot0Image> {
        let entries = self.load_entries(config)?;
        if entries.len() > HEADER_DESCRIPTOR_MAX_ENTRIES as usize {
            bail!("At most {HEADER_DESCRIPTOR_MAX_ENTRIES} load entries are supported");
        }
        if config.region_count > config.region_mode.max_count() {
            bail!("Region count {} too large for {:?}", config.region_count, config.region_mode);
        }

        let descriptor_len = DESCRIPTOR_HEADER_BYTE_SIZE + entries.len() * LOAD_ENTRY_BYTE_SIZE;
        let header_end = IMAGE_DESCRIPTOR_BYTE_SIZE + descriptor_len;
        let trailer_offset = u32::try_from(header_end + config.payload.len())
            .context("Payload too large")?;
        let entries: Vec<LoadEntry> = entries
            .iter()
            .map(|(offset, size)| LoadEntry::new(header_end as u32 + offset, *size))
            .collect();

        // Descriptor region
        let mut descriptor = vec![0u8; descriptor_len];
        descriptor[..DESCRIPTOR_HEADER_BYTE_SIZE]
            .copy_from_slice(Self::descriptor_header(entries.len(), trailer_offset).as_bytes());
        descriptor[DESCRIPTOR_HEADER_BYTE_SIZE..].copy_from_slice(entries.as_bytes());

        let mut bytes = Vec::new();
        bytes.extend_from_slice(ImageDescriptor::template().as_bytes());
        bytes.extend_from_slice(&descriptor);
        bytes.extend_from_slice(&config.payload);

        // Signed tags
        for _ in 0..config.layout_tags {
            let tag = self.layout_tag(config, &entries, trailer_offset);
            bytes.extend_from_slice(tag.as_bytes());
        }
        let key = self.crypto.public_key();
        for _ in 0..config.key_tags {
            bytes.extend_from_slice(Self::key_tag(&key).as_bytes());
        }

        let signature_offset = bytes.len() as u32;
        let total_len = u32::try_from(
            bytes.len() + config.signature_tag as usize * SIGNATURE_TAG_BYTE_SIZE,
        )
        .context("Image too large")?;

        let mut header = ImageDescriptor::template();
        header.size_word = U32::new(descriptor_len as u32);
        header.total_len = U32::new(total_len);
        bytes[..IMAGE_DESCRIPTOR_BYTE_SIZE].copy_from_slice(header.as_bytes());

        // Everything before the signature tag is the signed message
        let digest = self.crypto.sha256_digest(&bytes)?;

        if config.signature_tag {
            let signature = self.crypto.sign(&digest)?;
            let mut tag = SignatureTag::new_zeroed();
            tag.header = TagHeader::new(TagKind::Signature);
            tag.sig_len = U32::new(RSA2048_BYTE_SIZE as u32);
            tag.signature = signature;
            bytes.extend_from_slice(tag.as_bytes());
        }

        log::debug!(
            "generated boot0 image: 0x{:x} bytes, trailer at 0x{:x}",
            total_len,
            trailer_offset
        );

        Ok(Boot0Image {
            bytes,
            digest,
            trailer_offset,
            signature_offset: config.signature_tag.then_some(signature_offset),
        })
    }

    fn load_entries(&self, config: &ImageGeneratorConfig) -> anyhow::Result<Vec<(u32, u32)>> {
        match &config.load_entries {
            Some(entries) => Ok(entries.clone()),
            None if config.payload.is_empty() => Ok(Vec::new()),
            None => {
                let size = u32::try_from(config.payload.len()).context("Payload too large")?;
                Ok(vec![(0, size)])
            }
        }
    }

    fn descriptor_header(count: usize, trailer_offset: u32) -> DescriptorHeader {
        DescriptorHeader {
            version: U16::new(DESCRIPTOR_VERSION),
            entry_count: U16::new(count as u16),
            trailer_offset: U32::new(trailer_offset),
        }
    }

    fn layout_tag(
        &self,
        config: &ImageGeneratorConfig,
        entries: &[LoadEntry],
        trailer_offset: u32,
    ) -> LayoutTag {
        let mut tag = LayoutTag::new_zeroed();
        tag.header = TagHeader::new(TagKind::Layout);
        tag.type_word = U32::new(BOOT0_IMAGE_TYPE);

        let header = Self::descriptor_header(entries.len(), trailer_offset);
        tag.descriptor[..DESCRIPTOR_HEADER_BYTE_SIZE].copy_from_slice(header.as_bytes());
        let end = DESCRIPTOR_HEADER_BYTE_SIZE + entries.as_bytes().len();
        tag.descriptor[DESCRIPTOR_HEADER_BYTE_SIZE..end].copy_from_slice(entries.as_bytes());

        tag.region.mode = U16::new(config.region_mode.as_u16());
        tag.region.count = U16::new(config.region_count);
        match config.region_mode {
            RegionMode::Ranges => {
                let ranges = entries
                    .iter()
                    .cycle()
                    .take(config.region_count as usize)
                    .collect::<Vec<_>>();
                for (i, entry) in ranges.into_iter().enumerate() {
                    tag.region.entries[i * 8..i * 8 + 8].copy_from_slice(entry.as_bytes());
                }
            }
            RegionMode::Sectors => {
                for i in 0..config.region_count as usize {
                    tag.region.entries[i] = i as u8;
                }
            }
        }
        tag
    }

    fn key_tag(key: &ImagePublicKey) -> KeyTag {
        let mut tag = KeyTag::new_zeroed();
        tag.header = TagHeader::new(TagKind::Key);
        tag.key_bits = U32::new(RSA2048_KEY_BITS);
        tag.exponent = U32::new(key.exponent);
        tag.modulus = key.modulus;
        tag
    }
}
