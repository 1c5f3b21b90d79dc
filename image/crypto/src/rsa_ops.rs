// Licensed under the Apache-2.0 license

use boot0_error::{BootError, BootResult};
use boot0_image_types::MAX_RSA_BYTE_SIZE;
use boot0_image_verify::{OpContext, Stage8Io, Stage8Ops, Stage8Output, Stage8State, STAGE8_IO_FLAG_VERIFY};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use zeroize::Zeroize;

/// RSA public-key operation for the signature stage.
///
/// `update` computes `s^e mod n` and `finalize` publishes it as the encoded
/// message for the selected signature scheme.
#[derive(Debug, Default, Copy, Clone)]
pub struct RsaStage8Ops;

impl RsaStage8Ops {
    fn public_key(io: &Stage8Io) -> BootResult<RsaPublicKey> {
        let n = BigUint::from_bytes_be(io.key.modulus);
        let e = BigUint::from(io.key.exponent);
        RsaPublicKey::new(n, e).map_err(|_| BootError::CONFIG_ERR_KEY_DESCRIPTOR_INVALID)
    }
}

impl Stage8Ops for RsaStage8Ops {
    fn init(&self, _ctx: &OpContext, io: &Stage8Io, state: &mut Stage8State) -> BootResult<()> {
        if io.flags != STAGE8_IO_FLAG_VERIFY {
            return Err(BootError::STAGE8_ERR_INIT_FAILURE);
        }

        let k = io.key.byte_len();
        if k == 0 || k > MAX_RSA_BYTE_SIZE || io.key.modulus[0] == 0 {
            return Err(BootError::CONFIG_ERR_KEY_DESCRIPTOR_INVALID);
        }
        if io.expected.len() != k {
            log::debug!("signature is {} bytes, modulus {}", io.expected.len(), k);
            return Err(BootError::VERIFY_ERR_SIGNATURE_LENGTH);
        }
        Self::public_key(io)?;

        state.zeroize();
        Ok(())
    }

    fn update(&self, _ctx: &OpContext, io: &Stage8Io, state: &mut Stage8State) -> BootResult<()> {
        let key = Self::public_key(io)?;
        let s = BigUint::from_bytes_be(io.expected);
        if &s >= key.n() {
            return Err(BootError::VERIFY_ERR_SIGNATURE_OUT_OF_RANGE);
        }

        let mut m = s.modpow(key.e(), key.n()).to_bytes_be();
        let k = key.size();
        let result = match k.checked_sub(m.len()) {
            Some(pad) if k <= state.work.len() => {
                state.work[..pad].fill(0);
                state.work[pad..k].copy_from_slice(&m);
                state.work_len = k;
                Ok(())
            }
            _ => Err(BootError::VERIFY_ERR_SIGNATURE_ENCODING),
        };
        m.zeroize();
        result
    }

    fn finalize(
        &self,
        _ctx: &OpContext,
        _io: &Stage8Io,
        state: &mut Stage8State,
        out: &mut Stage8Output,
    ) -> BootResult<()> {
        out.set(&state.work[..state.work_len])?;
        state.zeroize();
        Ok(())
    }

    fn cleanup(&self, _ctx: &OpContext, _io: &Stage8Io, state: &mut Stage8State) {
        state.zeroize();
    }
}
