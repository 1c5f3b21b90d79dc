/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains data structures for the boot0 image container.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

use core::ops::Range;

use memoffset::{offset_of, span_of};
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};
use zeroize::Zeroize;

pub const BOOT0_IMAGE_TYPE: u32 = 0x0000_0001;
/// "BRLY" in little-endian byte order.
pub const BOOT0_MAGIC_A: u32 = 0x594C_5242;
/// "T\0V1" in little-endian byte order.
pub const BOOT0_MAGIC_B: u32 = 0x3156_0054;
pub const BOOT0_TAG_BLOCK: [u8; 16] = *b"BOOT0_TAG_BLOCK\0";
pub const BOOT0_SIZE_WORD_REGION_MASK: u32 = 0xffff;
pub const IMAGE_DESCRIPTOR_BYTE_SIZE: usize = core::mem::size_of::<ImageDescriptor>();

pub const DESCRIPTOR_VERSION: u16 = 1;
pub const DESCRIPTOR_HEADER_BYTE_SIZE: usize = core::mem::size_of::<DescriptorHeader>();
pub const LOAD_ENTRY_BYTE_SIZE: usize = core::mem::size_of::<LoadEntry>();
pub const HEADER_DESCRIPTOR_MAX_ENTRIES: u16 = 8;
pub const HEADER_DESCRIPTOR_MAX_BYTE_SIZE: usize = 0x400;
pub const EMBEDDED_DESCRIPTOR_MAX_ENTRIES: u16 = 0x40;
pub const EMBEDDED_DESCRIPTOR_BYTE_SIZE: usize = 0x418;

pub const TAG_HEADER_BYTE_SIZE: usize = core::mem::size_of::<TagHeader>();
pub const TAG_MAGIC_LAYOUT: [u8; 4] = *b"BLYT";
pub const TAG_MAGIC_KEY: [u8; 4] = *b"BKEY";
pub const TAG_MAGIC_SIGNATURE: [u8; 4] = *b"BSIG";
pub const TAG_ID_LAYOUT: u16 = 1;
pub const TAG_ID_KEY: u16 = 3;
pub const TAG_ID_SIGNATURE: u16 = 4;
pub const LAYOUT_TAG_BYTE_SIZE: usize = core::mem::size_of::<LayoutTag>();
pub const KEY_TAG_BYTE_SIZE: usize = core::mem::size_of::<KeyTag>();
pub const SIGNATURE_TAG_BYTE_SIZE: usize = core::mem::size_of::<SignatureTag>();

pub const REGION_BLOCK_BYTE_SIZE: usize = core::mem::size_of::<RegionBlock>();
pub const REGION_BLOCK_ENTRIES_BYTE_SIZE: usize = 0x100;
pub const REGION_MODE_RANGES: u16 = 1;
pub const REGION_MODE_SECTORS: u16 = 2;

pub const RSA2048_KEY_BITS: u32 = 2048;
pub const RSA2048_BYTE_SIZE: usize = 256;
pub const MAX_RSA_BYTE_SIZE: usize = 512;
pub const SHA256_DIGEST_BYTE_SIZE: usize = 32;
pub const SIG_INDEX_CAPACITY: usize = 4;

pub const SIGNATURE_TEMPLATE_BYTE_SIZE: usize = 28;
pub const SIGNATURE_TEMPLATE_PREFIX_MAX: usize = 24;
/// DER DigestInfo prefix for SHA-256 used by PKCS#1 v1.5.
pub const SHA256_DIGEST_INFO_PREFIX: [u8; 19] = [
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05,
    0x00, 0x04, 0x20,
];

pub type Digest256 = [u8; SHA256_DIGEST_BYTE_SIZE];

const _: () = assert!(IMAGE_DESCRIPTOR_BYTE_SIZE == 0x44);
const _: () = assert!(LAYOUT_TAG_BYTE_SIZE == 0x52c);
const _: () = assert!(KEY_TAG_BYTE_SIZE == 0x348);
const _: () = assert!(SIGNATURE_TAG_BYTE_SIZE == 0x13c);
const _: () = assert!(REGION_BLOCK_BYTE_SIZE == 0x104);

/// Fixed header at offset zero of every boot0 image.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Default, Debug, Copy, Clone)]
pub struct ImageDescriptor {
    pub type_word: U32,

    /// Low 16 bits carry the length of the trailing descriptor region
    pub size_word: U32,

    pub magic_a: U32,

    pub magic_b: U32,

    pub reserved: [u8; 0x20],

    pub tag_block: [u8; 16],

    /// Declared length of the whole image
    pub total_len: U32,
}

impl ImageDescriptor {
    pub fn type_word(&self) -> u32 {
        self.type_word.get()
    }

    pub fn magic_a(&self) -> u32 {
        self.magic_a.get()
    }

    pub fn magic_b(&self) -> u32 {
        self.magic_b.get()
    }

    pub fn total_len(&self) -> u32 {
        self.total_len.get()
    }

    /// Length of the descriptor region following the fixed header.
    pub fn descriptor_len(&self) -> u32 {
        self.size_word.get() & BOOT0_SIZE_WORD_REGION_MASK
    }

    /// Offset one past the descriptor region.
    pub fn header_end(&self) -> u32 {
        IMAGE_DESCRIPTOR_BYTE_SIZE as u32 + self.descriptor_len()
    }

    /// Returns `Range<u32>` containing the tag block marker
    pub fn tag_block_range() -> Range<u32> {
        let span = span_of!(ImageDescriptor, tag_block);
        span.start as u32..span.end as u32
    }

    /// Returns `Range<u32>` containing the descriptor region
    pub fn descriptor_range(&self) -> Range<u32> {
        IMAGE_DESCRIPTOR_BYTE_SIZE as u32..self.header_end()
    }

    /// Header populated with the fixed constants and zero lengths.
    pub fn template() -> Self {
        Self {
            type_word: U32::new(BOOT0_IMAGE_TYPE),
            magic_a: U32::new(BOOT0_MAGIC_A),
            magic_b: U32::new(BOOT0_MAGIC_B),
            tag_block: BOOT0_TAG_BLOCK,
            ..Default::default()
        }
    }
}

#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Default, Debug, Copy, Clone)]
pub struct DescriptorHeader {
    pub version: U16,

    pub entry_count: U16,

    /// Offset of the first tag. Unused in embedded descriptors.
    pub trailer_offset: U32,
}

impl DescriptorHeader {
    pub fn version(&self) -> u16 {
        self.version.get()
    }

    pub fn entry_count(&self) -> u16 {
        self.entry_count.get()
    }

    pub fn trailer_offset(&self) -> u32 {
        self.trailer_offset.get()
    }
}

#[repr(C)]
#[derive(
    FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Default, Debug, Copy, Clone, PartialEq, Eq,
)]
pub struct LoadEntry {
    pub offset: U32,
    pub size: U32,
}

impl LoadEntry {
    pub fn new(offset: u32, size: u32) -> Self {
        Self {
            offset: U32::new(offset),
            size: U32::new(size),
        }
    }

    pub fn offset(&self) -> u32 {
        self.offset.get()
    }

    pub fn size(&self) -> u32 {
        self.size.get()
    }

    /// Returns the covered range, or `None` if it wraps.
    pub fn range(&self) -> Option<Range<u32>> {
        let end = self.offset().checked_add(self.size())?;
        Some(self.offset()..end)
    }
}

#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Default, Debug, Copy, Clone)]
pub struct TagHeader {
    pub magic: [u8; 4],

    pub reserved0: U32,

    /// Length of the whole tag including this header
    pub len: U16,

    pub reserved1: U16,
}

impl TagHeader {
    pub fn new(kind: TagKind) -> Self {
        Self {
            magic: kind.magic(),
            len: U16::new(kind.byte_size() as u16),
            ..Default::default()
        }
    }

    pub fn tag_len(&self) -> u16 {
        self.len.get()
    }
}

/// Tag kinds understood by the parser.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TagKind {
    Layout,
    Key,
    Signature,
}

impl TagKind {
    pub fn from_magic(magic: &[u8; 4]) -> Option<Self> {
        match *magic {
            TAG_MAGIC_LAYOUT => Some(Self::Layout),
            TAG_MAGIC_KEY => Some(Self::Key),
            TAG_MAGIC_SIGNATURE => Some(Self::Signature),
            _ => None,
        }
    }

    pub fn magic(self) -> [u8; 4] {
        match self {
            Self::Layout => TAG_MAGIC_LAYOUT,
            Self::Key => TAG_MAGIC_KEY,
            Self::Signature => TAG_MAGIC_SIGNATURE,
        }
    }

    pub fn id(self) -> u16 {
        match self {
            Self::Layout => TAG_ID_LAYOUT,
            Self::Key => TAG_ID_KEY,
            Self::Signature => TAG_ID_SIGNATURE,
        }
    }

    pub fn byte_size(self) -> usize {
        match self {
            Self::Layout => LAYOUT_TAG_BYTE_SIZE,
            Self::Key => KEY_TAG_BYTE_SIZE,
            Self::Signature => SIGNATURE_TAG_BYTE_SIZE,
        }
    }

    /// Whether the tag's bytes are covered by the image signature.
    pub fn is_signed(self) -> bool {
        matches!(self, Self::Layout | Self::Key)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegionMode {
    /// 8-byte (offset, size) entries
    Ranges,
    /// 1-byte sector indices
    Sectors,
}

impl RegionMode {
    pub fn from_u16(val: u16) -> Option<Self> {
        match val {
            REGION_MODE_RANGES => Some(Self::Ranges),
            REGION_MODE_SECTORS => Some(Self::Sectors),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            Self::Ranges => REGION_MODE_RANGES,
            Self::Sectors => REGION_MODE_SECTORS,
        }
    }

    pub fn entry_size(self) -> usize {
        match self {
            Self::Ranges => 8,
            Self::Sectors => 1,
        }
    }

    pub fn max_count(self) -> u16 {
        match self {
            Self::Ranges => 0x1f,
            Self::Sectors => 0xdf,
        }
    }
}

#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Debug, Copy, Clone)]
pub struct RegionBlock {
    pub mode: U16,
    pub count: U16,
    pub entries: [u8; REGION_BLOCK_ENTRIES_BYTE_SIZE],
}

impl RegionBlock {
    pub fn mode(&self) -> u16 {
        self.mode.get()
    }

    pub fn count(&self) -> u16 {
        self.count.get()
    }
}

/// Layout tag carrying an embedded descriptor and a region block.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Debug, Copy, Clone)]
pub struct LayoutTag {
    pub header: TagHeader,

    pub type_word: U32,

    pub descriptor: [u8; EMBEDDED_DESCRIPTOR_BYTE_SIZE],

    pub region: RegionBlock,
}

impl LayoutTag {
    /// Returns `Range<u32>` of the embedded descriptor window within the tag
    pub fn descriptor_range() -> Range<u32> {
        let span = span_of!(LayoutTag, descriptor);
        span.start as u32..span.end as u32
    }

    /// Returns `Range<u32>` of the region block within the tag
    pub fn region_range() -> Range<u32> {
        let span = span_of!(LayoutTag, region);
        span.start as u32..span.end as u32
    }
}

#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Debug, Copy, Clone)]
pub struct KeyTag {
    pub header: TagHeader,

    pub key_bits: U32,

    pub exponent: U32,

    /// Big-endian modulus
    pub modulus: [u8; RSA2048_BYTE_SIZE],

    pub reserved: [u8; 0x234],
}

impl KeyTag {
    pub fn key_bits(&self) -> u32 {
        self.key_bits.get()
    }

    pub fn exponent(&self) -> u32 {
        self.exponent.get()
    }

    pub fn key(&self) -> KeyDescriptor<'_> {
        KeyDescriptor::new(&self.modulus, self.exponent())
    }

    /// Returns `Range<u32>` of the modulus within the tag
    pub fn modulus_range() -> Range<u32> {
        let offset = offset_of!(KeyTag, modulus) as u32;
        offset..offset + RSA2048_BYTE_SIZE as u32
    }
}

#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Debug, Copy, Clone)]
pub struct SignatureTag {
    pub header: TagHeader,

    pub sig_len: U32,

    /// Big-endian signature representative
    pub signature: [u8; RSA2048_BYTE_SIZE],

    pub reserved: [u8; 0x2c],
}

impl SignatureTag {
    pub fn sig_len(&self) -> u32 {
        self.sig_len.get()
    }
}

/// RSA public key borrowed from a key tag or the policy.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KeyDescriptor<'a> {
    /// Big-endian modulus bytes
    pub modulus: &'a [u8],

    pub exponent: u32,
}

impl<'a> KeyDescriptor<'a> {
    pub fn new(modulus: &'a [u8], exponent: u32) -> Self {
        Self { modulus, exponent }
    }

    /// Modulus length in bytes.
    pub fn byte_len(&self) -> usize {
        self.modulus.len()
    }

    /// Bit length of the modulus ignoring leading zero bits.
    pub fn modulus_bits(&self) -> usize {
        match self.modulus.iter().position(|b| *b != 0) {
            Some(idx) => {
                (self.modulus.len() - idx) * 8 - self.modulus[idx].leading_zeros() as usize
            }
            None => 0,
        }
    }
}

/// One signed region recorded by the signature index.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SigIndexEntry {
    pub tag_id: u16,
    pub offset: u32,
    pub size: u32,
}

/// Fixed-capacity record of the signed tags in an image.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SigIndex {
    pub trailer_offset: u32,
    pub entry_count: u32,
    pub entries: [SigIndexEntry; SIG_INDEX_CAPACITY],
}

impl SigIndex {
    pub fn new(trailer_offset: u32) -> Self {
        Self {
            trailer_offset,
            ..Default::default()
        }
    }

    /// Appends an entry. Returns `false` when the index is full.
    pub fn push(&mut self, entry: SigIndexEntry) -> bool {
        match self.entries.get_mut(self.entry_count as usize) {
            Some(slot) => {
                *slot = entry;
                self.entry_count += 1;
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> &[SigIndexEntry] {
        &self.entries[..self.entry_count as usize]
    }

    pub fn len(&self) -> usize {
        self.entry_count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }
}

/// Enclosing layout accounting for a candidate image.
#[cfg_attr(feature = "std", derive(serde_derive::Serialize, serde_derive::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LayoutCarrier {
    /// Offset of the image within the carrier
    pub base: u32,

    /// Bytes available to the image starting at `base`
    pub loaded_len: u32,

    /// End of the carrier
    pub limit: u32,
}

impl Default for LayoutCarrier {
    fn default() -> Self {
        Self {
            base: 0,
            loaded_len: u32::MAX,
            limit: u32::MAX,
        }
    }
}

impl LayoutCarrier {
    /// Carrier holding exactly `len` bytes at offset zero.
    pub fn exact(len: u32) -> Self {
        Self {
            base: 0,
            loaded_len: len,
            limit: len,
        }
    }
}

/// Signature encoding template.
///
/// Byte 0 is the hash length, byte 1 the PSS salt length, byte 2 the number
/// of valid prefix bytes and bytes 4..28 the DigestInfo prefix.
#[repr(C)]
#[derive(
    FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Debug, Copy, Clone, PartialEq, Eq, Zeroize,
)]
pub struct SignatureTemplate {
    pub hash_len: u8,
    pub salt_len: u8,
    pub prefix_len: u8,
    pub reserved: u8,
    pub prefix: [u8; SIGNATURE_TEMPLATE_PREFIX_MAX],
}

const _: () = assert!(core::mem::size_of::<SignatureTemplate>() == SIGNATURE_TEMPLATE_BYTE_SIZE);

impl Default for SignatureTemplate {
    fn default() -> Self {
        Self::sha256(SHA256_DIGEST_BYTE_SIZE as u8)
    }
}

impl SignatureTemplate {
    /// SHA-256 template carrying both the PSS salt length and the PKCS#1
    /// DigestInfo prefix.
    pub fn sha256(salt_len: u8) -> Self {
        let mut prefix = [0u8; SIGNATURE_TEMPLATE_PREFIX_MAX];
        prefix[..SHA256_DIGEST_INFO_PREFIX.len()].copy_from_slice(&SHA256_DIGEST_INFO_PREFIX);
        Self {
            hash_len: SHA256_DIGEST_BYTE_SIZE as u8,
            salt_len,
            prefix_len: SHA256_DIGEST_INFO_PREFIX.len() as u8,
            reserved: 0,
            prefix,
        }
    }

    /// Returns the prefix bytes, or `None` if `prefix_len` is out of range.
    pub fn prefix(&self) -> Option<&[u8]> {
        self.prefix.get(..self.prefix_len as usize)
    }
}
