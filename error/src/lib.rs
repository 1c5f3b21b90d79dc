/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Error codes and result type shared by the boot0 image crates.

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::fmt;
use core::num::{NonZeroU32, TryFromIntError};

/// Boot0 Error Type
///
/// The upper 16 bits of the code select the error category, see [`ErrorKind`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BootError(pub NonZeroU32);

/// Broad classification of a [`BootError`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// Structural violation in the image container.
    Format,
    /// A fixed-capacity table overflowed.
    Capacity,
    /// The policy or verification context is unusable.
    Config,
    /// Cryptographic verification did not succeed.
    Verification,
    /// Code outside of the known categories.
    Other,
}

const CATEGORY_FORMAT: u32 = 0x0001;
const CATEGORY_CAPACITY: u32 = 0x0002;
const CATEGORY_CONFIG: u32 = 0x0003;
const CATEGORY_VERIFY: u32 = 0x0004;
const CATEGORY_STAGE_OP: u32 = 0x0005;

/// Macro to define error constants ensuring uniqueness
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: BootError = BootError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl BootError {
    /// Create an error from a const context. Use `BootError::try_from()` for
    /// runtime values so a zero code cannot panic.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("BootError cannot be 0"),
        }
    }

    define_error_constants![
        (FORMAT_ERR_HEADER_TRUNCATED, 0x0001_0001, "Image shorter than the fixed header"),
        (FORMAT_ERR_HEADER_TYPE_MISMATCH, 0x0001_0002, "Header type word mismatch"),
        (FORMAT_ERR_HEADER_MAGIC_A_MISMATCH, 0x0001_0003, "Header magic A mismatch"),
        (FORMAT_ERR_HEADER_MAGIC_B_MISMATCH, 0x0001_0004, "Header magic B mismatch"),
        (FORMAT_ERR_HEADER_TAG_BLOCK_MISMATCH, 0x0001_0005, "Header tag block mismatch"),
        (FORMAT_ERR_HEADER_SIZE_INVALID, 0x0001_0006, "Header size word out of bounds"),
        (FORMAT_ERR_DESCRIPTOR_TRUNCATED, 0x0001_0007, "Descriptor region too short"),
        (FORMAT_ERR_DESCRIPTOR_VERSION, 0x0001_0008, "Unsupported descriptor version"),
        (FORMAT_ERR_DESCRIPTOR_COUNT, 0x0001_0009, "Descriptor entry count too large"),
        (FORMAT_ERR_DESCRIPTOR_SIZE, 0x0001_000A, "Descriptor region size invalid"),
        (FORMAT_ERR_DESCRIPTOR_ENTRY_INVALID, 0x0001_000B, "Descriptor entry empty or overflowing"),
        (FORMAT_ERR_LAYOUT_TOTAL_MISMATCH, 0x0001_000C, "Declared length differs from image length"),
        (FORMAT_ERR_LAYOUT_CARRIER_OVERFLOW, 0x0001_000D, "Image does not fit the carrier"),
        (FORMAT_ERR_TRAILER_OFFSET_INVALID, 0x0001_000E, "Trailer offset out of bounds"),
        (FORMAT_ERR_TAG_TRUNCATED, 0x0001_000F, "Tag runs past the end of the trailer"),
        (FORMAT_ERR_TAG_UNKNOWN, 0x0001_0010, "Unknown tag magic"),
        (FORMAT_ERR_TAG_LENGTH_MISMATCH, 0x0001_0011, "Tag length differs from its kind"),
        (FORMAT_ERR_REGION_MODE_INVALID, 0x0001_0012, "Unknown region block mode"),
        (FORMAT_ERR_REGION_COUNT_INVALID, 0x0001_0013, "Region block count too large"),
        (FORMAT_ERR_KEY_TAG_INVALID, 0x0001_0014, "Key tag contents invalid"),
        (FORMAT_ERR_SIGNATURE_TAG_INVALID, 0x0001_0015, "Signature tag contents invalid"),
        (FORMAT_ERR_KEY_TAG_MISSING, 0x0001_0016, "Image carries no key tag"),
        (FORMAT_ERR_KEY_TAG_DUPLICATE, 0x0001_0017, "Image carries more than one key tag"),
        (FORMAT_ERR_SIGNATURE_TAG_MISSING, 0x0001_0018, "Image carries no signature tag"),
        (FORMAT_ERR_SIGNATURE_TAG_DUPLICATE, 0x0001_0019, "Image carries more than one signature tag"),
        (FORMAT_ERR_IMAGE_SOURCE_READ, 0x0001_001A, "Image source read failed"),
        (FORMAT_ERR_IMAGE_BUFFER_TOO_SMALL, 0x0001_001B, "Load buffer smaller than the image"),
        (FORMAT_ERR_DESCRIPTOR_ENTRY_OUT_OF_BOUNDS, 0x0001_001C, "Load entry outside the payload"),
        (CAPACITY_ERR_SIG_INDEX_FULL, 0x0002_0001, "Too many signed tags"),
        (CAPACITY_ERR_IO_SEGMENTS_FULL, 0x0002_0002, "Too many gather segments"),
        (CONFIG_ERR_KEY_DESCRIPTOR_MISSING, 0x0003_0001, "Signature stage has no key"),
        (CONFIG_ERR_STAGE8_OPS_MISSING, 0x0003_0002, "Signature stage has no operations"),
        (CONFIG_ERR_MODE_AMBIGUOUS, 0x0003_0003, "Both signature modes requested"),
        (CONFIG_ERR_MODE_UNSPECIFIED, 0x0003_0004, "No signature mode requested"),
        (CONFIG_ERR_SCHEME_MISSING, 0x0003_0005, "Selected signature scheme not installed"),
        (CONFIG_ERR_TOKEN_LEN_INVALID, 0x0003_0006, "Comparison length invalid"),
        (CONFIG_ERR_HASH_IO_MISSING, 0x0003_0007, "Policy hash input requested but absent"),
        (CONFIG_ERR_TEMPLATE_INVALID, 0x0003_0008, "Signature template invalid"),
        (CONFIG_ERR_KEY_DESCRIPTOR_INVALID, 0x0003_0009, "Key descriptor invalid"),
        (VERIFY_ERR_DIGEST_MISMATCH, 0x0004_0001, "Digest does not match"),
        (VERIFY_ERR_SIGNATURE_MISMATCH, 0x0004_0002, "Signature does not match"),
        (VERIFY_ERR_SIGNATURE_ENCODING, 0x0004_0003, "Encoded message malformed"),
        (VERIFY_ERR_SIGNATURE_OUT_OF_RANGE, 0x0004_0004, "Signature not below the modulus"),
        (VERIFY_ERR_SIGNATURE_LENGTH, 0x0004_0005, "Signature length differs from the key"),
        (VERIFY_ERR_KEY_MISMATCH, 0x0004_0006, "Image key differs from the pinned key"),
        (STAGE7_ERR_PREPARE_FAILURE, 0x0005_0001, "Digest prepare operation failed"),
        (STAGE7_ERR_DIGEST_FAILURE, 0x0005_0002, "Digest operation failed"),
        (STAGE7_ERR_FINISH_FAILURE, 0x0005_0003, "Digest finish operation failed"),
        (STAGE8_ERR_INIT_FAILURE, 0x0005_0004, "Signature init operation failed"),
        (STAGE8_ERR_UPDATE_FAILURE, 0x0005_0005, "Signature update operation failed"),
        (STAGE8_ERR_FINALIZE_FAILURE, 0x0005_0006, "Signature finalize operation failed"),
    ];

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self.0.get() >> 16 {
            CATEGORY_FORMAT => ErrorKind::Format,
            CATEGORY_CAPACITY => ErrorKind::Capacity,
            CATEGORY_CONFIG => ErrorKind::Config,
            CATEGORY_VERIFY | CATEGORY_STAGE_OP => ErrorKind::Verification,
            _ => ErrorKind::Other,
        }
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "boot0 error 0x{:08x} ({:?})", self.0.get(), self.kind())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BootError {}

impl From<core::num::NonZeroU32> for crate::BootError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::BootError(val)
    }
}

impl From<BootError> for core::num::NonZeroU32 {
    fn from(val: BootError) -> Self {
        val.0
    }
}

impl From<BootError> for u32 {
    fn from(val: BootError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for BootError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        NonZeroU32::try_from(val).map(BootError)
    }
}

pub type BootResult<T> = Result<T, BootError>;
