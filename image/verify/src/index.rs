/*++

Licensed under the Apache-2.0 license.

File Name:

   index.rs

Abstract:

    Signed-region index built from the trailer tags.

--*/

use crate::io::IoPair;
use crate::parser::ImageLayout;
use boot0_error::{BootError, BootResult};
use boot0_image_types::{SigIndex, SigIndexEntry};

/// Record every signed tag of the trailer.
///
/// # Arguments
///
/// * `layout` - Validated image
///
/// # Returns
///
/// * `SigIndex` - Up to four signed regions in trailer order
/// * `BootError` - A fifth signed tag, or a malformed trailer
pub fn build_sig_index(layout: &ImageLayout) -> BootResult<SigIndex> {
    let mut index = SigIndex::new(layout.trailer_offset());

    for tag in layout.tags() {
        let tag = tag?;
        if !tag.kind().is_signed() {
            continue;
        }

        let entry = SigIndexEntry {
            tag_id: tag.kind().id(),
            offset: tag.offset,
            size: tag.size(),
        };
        if !index.push(entry) {
            log::warn!("signed tag at 0x{:x} exceeds the index", tag.offset);
            return Err(BootError::CAPACITY_ERR_SIG_INDEX_FULL);
        }
    }

    Ok(index)
}

/// Gather list of the signed message: the bytes before the trailer followed
/// by every indexed region.
pub fn signed_message<'a>(layout: &ImageLayout<'a>, index: &SigIndex) -> BootResult<IoPair<'a>> {
    let mut io = IoPair::new(layout.signed_prefix());
    for entry in index.entries() {
        io.push(layout.region(entry.offset, entry.size)?)?;
    }
    Ok(io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boot0_image_gen::{ImageGenerator, ImageGeneratorConfig, StaticSigner};
    use boot0_image_types::*;

    fn image(layout_tags: usize) -> Vec<u8> {
        let config = ImageGeneratorConfig {
            layout_tags,
            ..ImageGeneratorConfig::with_payload(vec![0xa5; 0x20])
        };
        ImageGenerator::new(StaticSigner::default())
            .generate(&config)
            .unwrap()
            .bytes
    }

    #[test]
    fn test_index_records_signed_tags() {
        let bytes = image(1);
        let layout = ImageLayout::parse(&bytes, &LayoutCarrier::default()).unwrap();
        let index = build_sig_index(&layout).unwrap();

        assert_eq!(index.trailer_offset, layout.trailer_offset());
        assert_eq!(index.len(), 2);
        assert_eq!(index.entries()[0].tag_id, TAG_ID_LAYOUT);
        assert_eq!(index.entries()[0].offset, layout.trailer_offset());
        assert_eq!(index.entries()[0].size, LAYOUT_TAG_BYTE_SIZE as u32);
        assert_eq!(index.entries()[1].tag_id, TAG_ID_KEY);
        assert_eq!(
            index.entries()[1].offset,
            layout.trailer_offset() + LAYOUT_TAG_BYTE_SIZE as u32
        );
    }

    #[test]
    fn test_index_at_capacity() {
        let bytes = image(3);
        let layout = ImageLayout::parse(&bytes, &LayoutCarrier::default()).unwrap();
        let index = build_sig_index(&layout).unwrap();
        assert_eq!(index.len(), SIG_INDEX_CAPACITY);
    }

    #[test]
    fn test_index_overflow() {
        let bytes = image(4);
        let layout = ImageLayout::parse(&bytes, &LayoutCarrier::default()).unwrap();
        assert_eq!(
            build_sig_index(&layout),
            Err(BootError::CAPACITY_ERR_SIG_INDEX_FULL)
        );
    }

    #[test]
    fn test_signed_message_is_contiguous_prefix() {
        let bytes = image(2);
        let layout = ImageLayout::parse(&bytes, &LayoutCarrier::default()).unwrap();
        let index = build_sig_index(&layout).unwrap();
        let io = signed_message(&layout, &index).unwrap();

        // Signature tag is last, so the signed message is everything before it
        let sig_offset = layout
            .tags()
            .map(|t| t.unwrap())
            .find(|t| t.kind() == TagKind::Signature)
            .unwrap()
            .offset as usize;
        assert_eq!(io.segments().len(), 1 + index.len());
        assert_eq!(io.bytes().collect::<Vec<_>>(), bytes[..sig_offset].to_vec());
    }
}
