/*++

Licensed under the Apache-2.0 license.

File Name:

   parser.rs

Abstract:

    Structural validation of the boot0 container: fixed header, descriptor
    region, layout carrier and trailer tags.

--*/

use boot0_error::{BootError, BootResult};
use boot0_image_types::*;
use zerocopy::FromBytes;

/// Rule set applied to a descriptor region.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DescriptorVariant {
    /// Region following the fixed header at 0x44
    Header,
    /// Copy embedded in a layout tag
    Embedded,
}

impl DescriptorVariant {
    fn max_entries(self) -> u16 {
        match self {
            Self::Header => HEADER_DESCRIPTOR_MAX_ENTRIES,
            Self::Embedded => EMBEDDED_DESCRIPTOR_MAX_ENTRIES,
        }
    }

    fn max_byte_size(self) -> usize {
        match self {
            Self::Header => HEADER_DESCRIPTOR_MAX_BYTE_SIZE,
            Self::Embedded => EMBEDDED_DESCRIPTOR_BYTE_SIZE,
        }
    }
}

/// Reads the fixed header from the start of `bytes`.
pub fn read_header(bytes: &[u8]) -> BootResult<&ImageDescriptor> {
    ImageDescriptor::ref_from_prefix(bytes)
        .map(|(header, _)| header)
        .map_err(|_| BootError::FORMAT_ERR_HEADER_TRUNCATED)
}

/// Validate the fixed header constants and the size word.
///
/// # Arguments
///
/// * `header` - Fixed image header
///
/// # Returns
///
/// * `()` - Success
/// * `BootError` - The first field that does not match
pub fn validate_header(header: &ImageDescriptor) -> BootResult<()> {
    if header.type_word() != BOOT0_IMAGE_TYPE {
        return Err(BootError::FORMAT_ERR_HEADER_TYPE_MISMATCH);
    }

    if header.magic_a() != BOOT0_MAGIC_A {
        return Err(BootError::FORMAT_ERR_HEADER_MAGIC_A_MISMATCH);
    }

    if header.magic_b() != BOOT0_MAGIC_B {
        return Err(BootError::FORMAT_ERR_HEADER_MAGIC_B_MISMATCH);
    }

    if header.tag_block != BOOT0_TAG_BLOCK {
        return Err(BootError::FORMAT_ERR_HEADER_TAG_BLOCK_MISMATCH);
    }

    // The descriptor region must sit inside the declared image
    let descriptor_len = header.descriptor_len() as usize;
    if descriptor_len < DESCRIPTOR_HEADER_BYTE_SIZE
        || descriptor_len > HEADER_DESCRIPTOR_MAX_BYTE_SIZE
        || header.header_end() > header.total_len()
    {
        return Err(BootError::FORMAT_ERR_HEADER_SIZE_INVALID);
    }

    Ok(())
}

/// Validate a descriptor region under the rules of `variant`.
pub fn validate_trailing_descriptor(bytes: &[u8], variant: DescriptorVariant) -> BootResult<()> {
    Descriptor::parse(bytes, variant).map(|_| ())
}

/// Check the declared image length against the enclosing carrier.
pub fn cross_check_layout(declared_total: u32, carrier: &LayoutCarrier) -> BootResult<()> {
    if (declared_total as usize) < IMAGE_DESCRIPTOR_BYTE_SIZE {
        return Err(BootError::FORMAT_ERR_LAYOUT_TOTAL_MISMATCH);
    }

    if declared_total > carrier.loaded_len {
        return Err(BootError::FORMAT_ERR_LAYOUT_CARRIER_OVERFLOW);
    }

    match carrier.base.checked_add(declared_total) {
        Some(end) if end <= carrier.limit => Ok(()),
        _ => Err(BootError::FORMAT_ERR_LAYOUT_CARRIER_OVERFLOW),
    }
}

/// Validate the region mode block of a layout tag.
pub fn validate_region_block(block: &RegionBlock) -> BootResult<RegionMode> {
    let mode = RegionMode::from_u16(block.mode()).ok_or(BootError::FORMAT_ERR_REGION_MODE_INVALID)?;
    let count = block.count();
    if count > mode.max_count() || count as usize * mode.entry_size() > block.entries.len() {
        return Err(BootError::FORMAT_ERR_REGION_COUNT_INVALID);
    }
    Ok(mode)
}

/// Validate a single tag and return its typed view.
///
/// `bytes` must start at the tag header; bytes past the tag length are
/// ignored.
pub fn validate_tag(bytes: &[u8]) -> BootResult<Tag<'_>> {
    let (header, _) =
        TagHeader::ref_from_prefix(bytes).map_err(|_| BootError::FORMAT_ERR_TAG_TRUNCATED)?;
    let kind = TagKind::from_magic(&header.magic).ok_or(BootError::FORMAT_ERR_TAG_UNKNOWN)?;
    if header.tag_len() as usize != kind.byte_size() {
        return Err(BootError::FORMAT_ERR_TAG_LENGTH_MISMATCH);
    }
    let bytes = bytes
        .get(..kind.byte_size())
        .ok_or(BootError::FORMAT_ERR_TAG_TRUNCATED)?;

    match kind {
        TagKind::Layout => {
            let tag = LayoutTag::ref_from_bytes(bytes).map_err(|_| BootError::FORMAT_ERR_TAG_TRUNCATED)?;
            validate_trailing_descriptor(&tag.descriptor, DescriptorVariant::Embedded)?;
            validate_region_block(&tag.region)?;
            Ok(Tag::Layout(tag))
        }
        TagKind::Key => {
            let tag = KeyTag::ref_from_bytes(bytes).map_err(|_| BootError::FORMAT_ERR_TAG_TRUNCATED)?;
            let exponent = tag.exponent();
            if tag.key_bits() != RSA2048_KEY_BITS
                || exponent < 3
                || exponent & 1 == 0
                || tag.modulus[0] & 0x80 == 0
            {
                return Err(BootError::FORMAT_ERR_KEY_TAG_INVALID);
            }
            Ok(Tag::Key(tag))
        }
        TagKind::Signature => {
            let tag =
                SignatureTag::ref_from_bytes(bytes).map_err(|_| BootError::FORMAT_ERR_TAG_TRUNCATED)?;
            // Not covered by the signature, so only one byte form is accepted
            if tag.sig_len() as usize != RSA2048_BYTE_SIZE
                || tag.header.reserved0.get() != 0
                || tag.header.reserved1.get() != 0
                || tag.reserved.iter().any(|&b| b != 0)
            {
                return Err(BootError::FORMAT_ERR_SIGNATURE_TAG_INVALID);
            }
            Ok(Tag::Signature(tag))
        }
    }
}

/// Parsed descriptor region.
#[derive(Debug, Copy, Clone)]
pub struct Descriptor<'a> {
    header: &'a DescriptorHeader,
    entries: &'a [LoadEntry],
}

impl<'a> Descriptor<'a> {
    pub fn parse(bytes: &'a [u8], variant: DescriptorVariant) -> BootResult<Self> {
        if bytes.len() > variant.max_byte_size() {
            return Err(BootError::FORMAT_ERR_DESCRIPTOR_SIZE);
        }

        let (header, rest) = DescriptorHeader::ref_from_prefix(bytes)
            .map_err(|_| BootError::FORMAT_ERR_DESCRIPTOR_TRUNCATED)?;

        if header.version() != DESCRIPTOR_VERSION {
            return Err(BootError::FORMAT_ERR_DESCRIPTOR_VERSION);
        }

        let count = header.entry_count();
        if count > variant.max_entries() {
            return Err(BootError::FORMAT_ERR_DESCRIPTOR_COUNT);
        }

        let entries_len = count as usize * LOAD_ENTRY_BYTE_SIZE;
        let entries = rest
            .get(..entries_len)
            .ok_or(BootError::FORMAT_ERR_DESCRIPTOR_SIZE)?;
        let entries = <[LoadEntry]>::ref_from_bytes(entries)
            .map_err(|_| BootError::FORMAT_ERR_DESCRIPTOR_SIZE)?;

        if entries.iter().any(|e| e.size() == 0 || e.range().is_none()) {
            return Err(BootError::FORMAT_ERR_DESCRIPTOR_ENTRY_INVALID);
        }

        Ok(Self { header, entries })
    }

    pub fn version(&self) -> u16 {
        self.header.version()
    }

    pub fn trailer_offset(&self) -> u32 {
        self.header.trailer_offset()
    }

    pub fn entries(&self) -> &'a [LoadEntry] {
        self.entries
    }
}

/// Typed view of a validated tag.
#[derive(Debug, Copy, Clone)]
pub enum Tag<'a> {
    Layout(&'a LayoutTag),
    Key(&'a KeyTag),
    Signature(&'a SignatureTag),
}

impl Tag<'_> {
    pub fn kind(&self) -> TagKind {
        match self {
            Tag::Layout(_) => TagKind::Layout,
            Tag::Key(_) => TagKind::Key,
            Tag::Signature(_) => TagKind::Signature,
        }
    }
}

/// A tag together with its offset in the image.
#[derive(Debug, Copy, Clone)]
pub struct TagRef<'a> {
    pub offset: u32,
    pub tag: Tag<'a>,
}

impl TagRef<'_> {
    pub fn kind(&self) -> TagKind {
        self.tag.kind()
    }

    pub fn size(&self) -> u32 {
        self.kind().byte_size() as u32
    }
}

/// Walks the trailer tag by tag. Yields at most one error and then stops.
#[derive(Debug, Clone)]
pub struct TagIter<'a> {
    image: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> TagIter<'a> {
    /// Iterate over the tags of `image` in `[trailer_offset, image.len())`.
    pub fn new(image: &'a [u8], trailer_offset: u32) -> Self {
        Self {
            image,
            pos: trailer_offset as usize,
            failed: false,
        }
    }
}

impl<'a> Iterator for TagIter<'a> {
    type Item = BootResult<TagRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.image.len() {
            return None;
        }

        let offset = self.pos;
        match validate_tag(&self.image[offset..]) {
            Ok(tag) => {
                self.pos += tag.kind().byte_size();
                Some(Ok(TagRef {
                    offset: offset as u32,
                    tag,
                }))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Fully validated boot0 image.
#[derive(Debug, Copy, Clone)]
pub struct ImageLayout<'a> {
    bytes: &'a [u8],
    header: &'a ImageDescriptor,
    descriptor: Descriptor<'a>,
}

impl<'a> ImageLayout<'a> {
    /// Parse and validate an in-memory image.
    ///
    /// # Arguments
    ///
    /// * `bytes` - Whole image, exactly the declared length
    /// * `carrier` - Enclosing layout accounting
    ///
    /// # Returns
    ///
    /// * `ImageLayout` - Validated views into `bytes`
    pub fn parse(bytes: &'a [u8], carrier: &LayoutCarrier) -> BootResult<Self> {
        let header = read_header(bytes)?;
        validate_header(header)?;
        cross_check_layout(header.total_len(), carrier)?;

        if bytes.len() != header.total_len() as usize {
            return Err(BootError::FORMAT_ERR_LAYOUT_TOTAL_MISMATCH);
        }

        let range = header.descriptor_range();
        let descriptor = Descriptor::parse(
            &bytes[range.start as usize..range.end as usize],
            DescriptorVariant::Header,
        )?;

        let trailer_offset = descriptor.trailer_offset();
        if trailer_offset < header.header_end() || trailer_offset > header.total_len() {
            return Err(BootError::FORMAT_ERR_TRAILER_OFFSET_INVALID);
        }

        let payload = header.header_end()..trailer_offset;
        for entry in descriptor.entries() {
            match entry.range() {
                Some(r) if r.start >= payload.start && r.end <= payload.end => {}
                _ => return Err(BootError::FORMAT_ERR_DESCRIPTOR_ENTRY_OUT_OF_BOUNDS),
            }
        }

        let layout = Self {
            bytes,
            header,
            descriptor,
        };

        for tag in layout.tags() {
            tag?;
        }

        log::debug!(
            "boot0 image: total 0x{:x}, trailer at 0x{:x}, {} load entries",
            header.total_len(),
            trailer_offset,
            descriptor.entries().len()
        );

        Ok(layout)
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn header(&self) -> &'a ImageDescriptor {
        self.header
    }

    pub fn descriptor(&self) -> &Descriptor<'a> {
        &self.descriptor
    }

    pub fn trailer_offset(&self) -> u32 {
        self.descriptor.trailer_offset()
    }

    /// Bytes preceding the trailer.
    pub fn signed_prefix(&self) -> &'a [u8] {
        &self.bytes[..self.trailer_offset() as usize]
    }

    pub fn tags(&self) -> TagIter<'a> {
        TagIter::new(self.bytes, self.trailer_offset())
    }

    /// Bytes of a region, bounds checked against the image.
    pub fn region(&self, offset: u32, size: u32) -> BootResult<&'a [u8]> {
        let end = offset
            .checked_add(size)
            .ok_or(BootError::FORMAT_ERR_TAG_TRUNCATED)?;
        self.bytes
            .get(offset as usize..end as usize)
            .ok_or(BootError::FORMAT_ERR_TAG_TRUNCATED)
    }

    /// The single key tag of the image.
    pub fn key_tag(&self) -> BootResult<&'a KeyTag> {
        let mut found = None;
        for tag in self.tags() {
            if let Tag::Key(key) = tag?.tag {
                if found.replace(key).is_some() {
                    return Err(BootError::FORMAT_ERR_KEY_TAG_DUPLICATE);
                }
            }
        }
        found.ok_or(BootError::FORMAT_ERR_KEY_TAG_MISSING)
    }

    /// The single signature tag of the image.
    pub fn signature_tag(&self) -> BootResult<&'a SignatureTag> {
        let mut found = None;
        for tag in self.tags() {
            if let Tag::Signature(sig) = tag?.tag {
                if found.replace(sig).is_some() {
                    return Err(BootError::FORMAT_ERR_SIGNATURE_TAG_DUPLICATE);
                }
            }
        }
        found.ok_or(BootError::FORMAT_ERR_SIGNATURE_TAG_MISSING)
    }
}
