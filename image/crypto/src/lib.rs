/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    RustCrypto backends for boot0 image verification and generation.

--*/

mod rsa_ops;
mod rustcrypto;
mod scheme;
mod sha256;

pub use rsa_ops::RsaStage8Ops;
pub use rustcrypto::{image_public_key, priv_key_from_pem, pub_key_from_pem, RsaPadding, RustCrypto};
pub use scheme::{Pkcs1v15Sha256, PssSha256};
pub use sha256::Sha256Ops;

use boot0_image_verify::SchemeTable;

pub static RSA_PSS_SHA256: PssSha256 = PssSha256;
pub static RSA_PKCS1V15_SHA256: Pkcs1v15Sha256 = Pkcs1v15Sha256;

/// Both RSA signature strategies.
pub fn rsa_schemes() -> SchemeTable<'static> {
    SchemeTable {
        rsa_pss_sha256: Some(&RSA_PSS_SHA256),
        rsa_pkcs1v15_sha256: Some(&RSA_PKCS1V15_SHA256),
    }
}
