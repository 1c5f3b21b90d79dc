/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    Boot0 Image Verification library.

--*/
#![cfg_attr(not(feature = "std"), no_std)]

mod boot0;
mod context;
mod index;
mod io;
mod parser;
mod policy;
mod scheme;
mod source;
mod stage7;
mod stage8;
mod verifier;

pub use boot0::{Boot0Verifier, VerifiedImage, VerifyHooks};
pub use context::{DigestSource, OpContext, Reporter, Stage, StageEvent, StageHook, VerifyContext};
pub use index::{build_sig_index, signed_message};
pub use io::{IoPair, MAX_IO_SEGMENTS};
pub use parser::{
    cross_check_layout, read_header, validate_header, validate_region_block, validate_tag,
    validate_trailing_descriptor, Descriptor, DescriptorVariant, ImageLayout, Tag, TagIter, TagRef,
};
pub use policy::{ModeSelection, PolicyFlags, PolicyOptions, VerificationPolicy};
pub use scheme::{SchemeTable, SchemeTokens, SignatureMode, SignatureScheme};
pub use source::{load_image, ImageSource, SliceSource};
pub use stage7::{Stage7Ops, Stage7Scratch, STAGE7_SCRATCH_BYTE_SIZE};
pub use stage8::{Stage8Io, Stage8Ops, Stage8Output, Stage8State, STAGE8_IO_FLAG_VERIFY};
pub use verifier::{verify, VerifyOutcome};
