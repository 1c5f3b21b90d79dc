/*++

Licensed under the Apache-2.0 license.

File Name:

   scheme.rs

Abstract:

    RSA signature encodings over SHA-256.

--*/

use boot0_error::{BootError, BootResult};
use boot0_image_types::{Digest256, SignatureTemplate, MAX_RSA_BYTE_SIZE, SHA256_DIGEST_BYTE_SIZE};
use boot0_image_verify::{SchemeTokens, SignatureMode, SignatureScheme};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

const PSS_TRAILER: u8 = 0xbc;
const PSS_SEPARATOR: u8 = 0x01;
const PKCS1_MIN_PADDING: usize = 8;

fn check_hash_len(template: &SignatureTemplate) -> BootResult<()> {
    if template.hash_len as usize != SHA256_DIGEST_BYTE_SIZE {
        return Err(BootError::CONFIG_ERR_TEMPLATE_INVALID);
    }
    Ok(())
}

/// XOR `mask` with MGF1-SHA256(`seed`).
fn mgf1_xor(seed: &[u8], mask: &mut [u8]) {
    for (counter, chunk) in mask.chunks_mut(SHA256_DIGEST_BYTE_SIZE).enumerate() {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update((counter as u32).to_be_bytes());
        let block = hasher.finalize();
        for (byte, m) in chunk.iter_mut().zip(block.iter()) {
            *byte ^= m;
        }
    }
}

/// RSASSA-PSS with SHA-256 and MGF1-SHA256.
#[derive(Debug, Default, Copy, Clone)]
pub struct PssSha256;

impl SignatureScheme for PssSha256 {
    fn mode(&self) -> SignatureMode {
        SignatureMode::RsaPssSha256
    }

    fn recover(
        &self,
        em: &[u8],
        digest: &Digest256,
        template: &SignatureTemplate,
        modulus_bits: usize,
    ) -> BootResult<SchemeTokens> {
        check_hash_len(template)?;
        let h_len = SHA256_DIGEST_BYTE_SIZE;
        let s_len = template.salt_len as usize;

        let em_bits = modulus_bits
            .checked_sub(1)
            .ok_or(BootError::VERIFY_ERR_SIGNATURE_ENCODING)?;
        let em_len = em_bits.div_ceil(8);
        if em_len > em.len() || em_len > MAX_RSA_BYTE_SIZE {
            return Err(BootError::VERIFY_ERR_SIGNATURE_ENCODING);
        }
        let (lead, em) = em.split_at(em.len() - em_len);
        if lead.iter().any(|&b| b != 0) {
            return Err(BootError::VERIFY_ERR_SIGNATURE_ENCODING);
        }
        if em_len < h_len + s_len + 2 || em[em_len - 1] != PSS_TRAILER {
            return Err(BootError::VERIFY_ERR_SIGNATURE_ENCODING);
        }

        let db_len = em_len - h_len - 1;
        let (masked_db, rest) = em.split_at(db_len);
        let h = &rest[..h_len];

        let top_mask = 0xffu8 >> (8 * em_len - em_bits);
        if masked_db[0] & !top_mask != 0 {
            return Err(BootError::VERIFY_ERR_SIGNATURE_ENCODING);
        }

        let mut db = [0u8; MAX_RSA_BYTE_SIZE];
        let db = &mut db[..db_len];
        db.copy_from_slice(masked_db);
        mgf1_xor(h, db);
        db[0] &= top_mask;

        let ps_len = db_len - s_len - 1;
        let result = if db[..ps_len].iter().any(|&b| b != 0) || db[ps_len] != PSS_SEPARATOR {
            log::debug!("PSS padding check failed (salt length {})", s_len);
            Err(BootError::VERIFY_ERR_SIGNATURE_ENCODING)
        } else {
            let mut hasher = Sha256::new();
            hasher.update([0u8; 8]);
            hasher.update(digest);
            hasher.update(&db[db_len - s_len..]);

            let mut tokens = SchemeTokens::default();
            tokens.recovered.copy_from_slice(h);
            tokens.reference.copy_from_slice(&hasher.finalize());
            Ok(tokens)
        };
        db.zeroize();
        result
    }
}

/// RSASSA-PKCS1-v1_5 with a SHA-256 DigestInfo.
#[derive(Debug, Default, Copy, Clone)]
pub struct Pkcs1v15Sha256;

impl SignatureScheme for Pkcs1v15Sha256 {
    fn mode(&self) -> SignatureMode {
        SignatureMode::RsaPkcs1v15Sha256
    }

    fn recover(
        &self,
        em: &[u8],
        digest: &Digest256,
        template: &SignatureTemplate,
        _modulus_bits: usize,
    ) -> BootResult<SchemeTokens> {
        check_hash_len(template)?;
        let prefix = template
            .prefix()
            .ok_or(BootError::CONFIG_ERR_TEMPLATE_INVALID)?;

        // 00 01 FF..FF 00 || DigestInfo prefix || H
        let t_len = prefix.len() + SHA256_DIGEST_BYTE_SIZE;
        let k = em.len();
        if k < t_len + PKCS1_MIN_PADDING + 3 {
            return Err(BootError::VERIFY_ERR_SIGNATURE_ENCODING);
        }
        let ps_end = k - t_len - 1;
        if em[0] != 0x00
            || em[1] != 0x01
            || em[2..ps_end].iter().any(|&b| b != 0xff)
            || em[ps_end] != 0x00
            || &em[ps_end + 1..k - SHA256_DIGEST_BYTE_SIZE] != prefix
        {
            return Err(BootError::VERIFY_ERR_SIGNATURE_ENCODING);
        }

        let mut tokens = SchemeTokens {
            recovered: Digest256::default(),
            reference: *digest,
        };
        tokens
            .recovered
            .copy_from_slice(&em[k - SHA256_DIGEST_BYTE_SIZE..]);
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::traits::PublicKeyParts;
    use rsa::{BigUint, Pkcs1v15Sign, Pss, RsaPrivateKey};
    use std::sync::OnceLock;

    fn private_key() -> &'static RsaPrivateKey {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap())
    }

    fn encoded_message(signature: &[u8]) -> Vec<u8> {
        let key = private_key();
        let m = BigUint::from_bytes_be(signature)
            .modpow(key.e(), key.n())
            .to_bytes_be();
        let mut em = vec![0u8; key.size() - m.len()];
        em.extend_from_slice(&m);
        em
    }

    fn digest() -> Digest256 {
        Sha256::digest(b"boot0 signed message").into()
    }

    #[test]
    fn test_pss_recover() {
        let digest = digest();
        let signature = private_key()
            .sign_with_rng(
                &mut rand::thread_rng(),
                Pss::new_with_salt::<Sha256>(32),
                &digest,
            )
            .unwrap();
        let em = encoded_message(&signature);

        let tokens = PssSha256
            .recover(&em, &digest, &SignatureTemplate::default(), 2048)
            .unwrap();
        assert_eq!(tokens.recovered, tokens.reference);

        let mut other = digest;
        other[0] ^= 1;
        let tokens = PssSha256
            .recover(&em, &other, &SignatureTemplate::default(), 2048)
            .unwrap();
        assert_ne!(tokens.recovered, tokens.reference);
    }

    #[test]
    fn test_pss_wrong_salt_len() {
        let digest = digest();
        let signature = private_key()
            .sign_with_rng(
                &mut rand::thread_rng(),
                Pss::new_with_salt::<Sha256>(32),
                &digest,
            )
            .unwrap();
        let em = encoded_message(&signature);
        assert_eq!(
            PssSha256.recover(&em, &digest, &SignatureTemplate::sha256(20), 2048),
            Err(BootError::VERIFY_ERR_SIGNATURE_ENCODING)
        );
    }

    #[test]
    fn test_pss_bad_encoding() {
        let mut em = vec![0u8; 256];
        assert_eq!(
            PssSha256.recover(&em, &digest(), &SignatureTemplate::default(), 2048),
            Err(BootError::VERIFY_ERR_SIGNATURE_ENCODING)
        );

        em[255] = PSS_TRAILER;
        em[0] = 0x80;
        assert_eq!(
            PssSha256.recover(&em, &digest(), &SignatureTemplate::default(), 2048),
            Err(BootError::VERIFY_ERR_SIGNATURE_ENCODING)
        );
    }

    #[test]
    fn test_pkcs1v15_recover() {
        let digest = digest();
        let signature = private_key()
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .unwrap();
        let em = encoded_message(&signature);

        let tokens = Pkcs1v15Sha256
            .recover(&em, &digest, &SignatureTemplate::default(), 2048)
            .unwrap();
        assert_eq!(tokens.recovered, digest);
        assert_eq!(tokens.reference, digest);
    }

    #[test]
    fn test_pkcs1v15_bad_padding() {
        let digest = digest();
        let signature = private_key()
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .unwrap();
        let mut em = encoded_message(&signature);
        em[5] = 0xfe;
        assert_eq!(
            Pkcs1v15Sha256.recover(&em, &digest, &SignatureTemplate::default(), 2048),
            Err(BootError::VERIFY_ERR_SIGNATURE_ENCODING)
        );
    }

    #[test]
    fn test_template_invalid() {
        let mut template = SignatureTemplate::default();
        template.prefix_len = 30;
        assert_eq!(
            Pkcs1v15Sha256.recover(&[0u8; 256], &digest(), &template, 2048),
            Err(BootError::CONFIG_ERR_TEMPLATE_INVALID)
        );

        template.hash_len = 48;
        assert_eq!(
            PssSha256.recover(&[0u8; 256], &digest(), &template, 2048),
            Err(BootError::CONFIG_ERR_TEMPLATE_INVALID)
        );
    }
}
