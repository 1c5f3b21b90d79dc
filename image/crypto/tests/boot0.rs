// Licensed under the Apache-2.0 license

use std::sync::OnceLock;

use boot0_error::{BootError, ErrorKind};
use boot0_image_crypto::{rsa_schemes, RsaPadding, RsaStage8Ops, RustCrypto, Sha256Ops};
use boot0_image_gen::{
    Boot0Image, ImageGenerator, ImageGeneratorConfig, ImageGeneratorCrypto, ImagePublicKey,
    StaticSigner,
};
use boot0_image_types::LayoutCarrier;
use boot0_image_verify::{
    Boot0Verifier, PolicyFlags, SliceSource, Stage, StageEvent, VerificationPolicy, VerifyHooks,
};

static SHA256: Sha256Ops = Sha256Ops;
static RSA: RsaStage8Ops = RsaStage8Ops;

fn pss_signer() -> &'static RustCrypto {
    static SIGNER: OnceLock<RustCrypto> = OnceLock::new();
    SIGNER.get_or_init(|| RustCrypto::generate(RsaPadding::Pss).unwrap())
}

fn pkcs1_signer() -> &'static RustCrypto {
    static SIGNER: OnceLock<RustCrypto> = OnceLock::new();
    SIGNER.get_or_init(|| RustCrypto::generate(RsaPadding::Pkcs1v15).unwrap())
}

fn generate<C: ImageGeneratorCrypto>(crypto: C, config: &ImageGeneratorConfig) -> Boot0Image {
    ImageGenerator::new(crypto).generate(config).unwrap()
}

fn signed_image(signer: &RustCrypto) -> Boot0Image {
    ImageGenerator::new(Signer(signer))
        .generate(&ImageGeneratorConfig::with_payload(vec![0x5a; 0x80]))
        .unwrap()
}

struct Signer<'a>(&'a RustCrypto);

impl ImageGeneratorCrypto for Signer<'_> {
    fn public_key(&self) -> ImagePublicKey {
        self.0.public_key()
    }

    fn sign(&self, digest: &[u8; 32]) -> anyhow::Result<[u8; 256]> {
        self.0.sign(digest)
    }
}

fn stage8_policy(key: &ImagePublicKey, mode: PolicyFlags) -> VerificationPolicy<'_> {
    VerificationPolicy::new(&SHA256)
        .with_key(key.descriptor())
        .with_stage8_ops(&RSA)
        .with_schemes(rsa_schemes())
        .with_flags((PolicyFlags::STAGE8_ENABLED | mode).bits())
}

fn carrier(image: &Boot0Image) -> LayoutCarrier {
    LayoutCarrier::exact(image.bytes.len() as u32)
}

#[test]
fn test_digest_only_pass() {
    let image = generate(
        StaticSigner::default(),
        &ImageGeneratorConfig::with_payload(vec![1; 0x40]),
    );
    let policy = VerificationPolicy::new(&SHA256).with_expected(&image.digest);
    let verifier = Boot0Verifier::new(policy);

    let verified = verifier
        .verify(&image.bytes, &carrier(&image), VerifyHooks::default())
        .unwrap();
    assert_eq!(verified.total_len as usize, image.bytes.len());
    assert_eq!(verified.sig_index.len(), 2);
    assert_eq!(verified.load_entries().len(), 1);
    assert_eq!(verified.digest, None);
}

#[test]
fn test_digest_only_tampered_payload() {
    let image = generate(
        StaticSigner::default(),
        &ImageGeneratorConfig::with_payload(vec![1; 0x40]),
    );
    let policy = VerificationPolicy::new(&SHA256).with_expected(&image.digest);
    let verifier = Boot0Verifier::new(policy);

    let mut bytes = image.bytes.clone();
    bytes[image.trailer_offset as usize - 1] ^= 0x01;
    assert_eq!(
        verifier.verify(&bytes, &carrier(&image), VerifyHooks::default()),
        Err(BootError::VERIFY_ERR_DIGEST_MISMATCH)
    );
}

#[test]
fn test_copy_digest() {
    let image = generate(
        StaticSigner::default(),
        &ImageGeneratorConfig::with_payload(vec![3; 0x10]),
    );
    let policy = VerificationPolicy::new(&SHA256)
        .with_expected(&image.digest)
        .with_flags(PolicyFlags::COPY_DIGEST.bits());
    let verified = Boot0Verifier::new(policy)
        .verify(&image.bytes, &carrier(&image), VerifyHooks::default())
        .unwrap();
    assert_eq!(verified.digest, Some(image.digest));
}

#[test]
fn test_pss_pass_and_stage_events() {
    let image = signed_image(pss_signer());
    let key = pss_signer().public_key();
    let verifier = Boot0Verifier::new(stage8_policy(&key, PolicyFlags::RSA_PSS_SHA256));

    let mut events = Vec::new();
    let mut hook = |stage: Stage, event: StageEvent| events.push((stage.id(), event.as_u32()));
    let mut reports = Vec::new();
    let mut report = |stage: Stage, _reserved: u32, a: u32, b: u32| reports.push((stage, a, b));

    verifier
        .verify(
            &image.bytes,
            &carrier(&image),
            VerifyHooks {
                stage_hook: Some(&mut hook),
                report: Some(&mut report),
            },
        )
        .unwrap();

    assert_eq!(events, [(7, 1), (7, 0), (8, 1), (8, 0)]);
    let stage8: Vec<_> = events.iter().filter(|(stage, _)| *stage == 8).collect();
    assert_eq!(stage8, [&(8, 1), &(8, 0)]);
    assert_eq!(reports.last().map(|r| (r.0, r.1)), Some((Stage::Verdict, 0)));
}

#[test]
fn test_pss_tampered_signature() {
    let image = signed_image(pss_signer());
    let key = pss_signer().public_key();
    let verifier = Boot0Verifier::new(stage8_policy(&key, PolicyFlags::RSA_PSS_SHA256));

    let mut bytes = image.bytes.clone();
    let signature = image.signature_offset.unwrap() as usize + 0x10;
    bytes[signature + 0x80] ^= 0x40;
    let err = verifier
        .verify(&bytes, &carrier(&image), VerifyHooks::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Verification);
}

#[test]
fn test_pss_unsigned_signature_tag_bytes() {
    let image = signed_image(pss_signer());
    let key = pss_signer().public_key();
    let verifier = Boot0Verifier::new(stage8_policy(&key, PolicyFlags::RSA_PSS_SHA256));
    let tag = image.signature_offset.unwrap() as usize;

    for i in (4..8).chain(10..12).chain(0x110..0x13c) {
        let mut bytes = image.bytes.clone();
        bytes[tag + i] ^= 0xa5;
        assert_eq!(
            verifier
                .verify(&bytes, &carrier(&image), VerifyHooks::default())
                .err(),
            Some(BootError::FORMAT_ERR_SIGNATURE_TAG_INVALID),
            "byte 0x{i:x}"
        );
    }
}

#[test]
fn test_pss_tampered_signed_region() {
    let image = signed_image(pss_signer());
    let key = pss_signer().public_key();
    let verifier = Boot0Verifier::new(stage8_policy(&key, PolicyFlags::RSA_PSS_SHA256));

    let mut bytes = image.bytes.clone();
    bytes[image.trailer_offset as usize - 4] ^= 0xff;
    assert_eq!(
        verifier.verify(&bytes, &carrier(&image), VerifyHooks::default()),
        Err(BootError::VERIFY_ERR_SIGNATURE_MISMATCH)
    );
}

#[test]
fn test_pkcs1v15_pass() {
    let image = signed_image(pkcs1_signer());
    let key = pkcs1_signer().public_key();
    let verifier = Boot0Verifier::new(stage8_policy(&key, PolicyFlags::RSA_PKCS1_V15));
    verifier
        .verify(&image.bytes, &carrier(&image), VerifyHooks::default())
        .unwrap();
}

#[test]
fn test_wrong_mode_rejected() {
    let image = signed_image(pkcs1_signer());
    let key = pkcs1_signer().public_key();
    let verifier = Boot0Verifier::new(stage8_policy(&key, PolicyFlags::RSA_PSS_SHA256));
    let err = verifier
        .verify(&image.bytes, &carrier(&image), VerifyHooks::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Verification);
}

#[test]
fn test_pinned_key_mismatch() {
    let image = signed_image(pss_signer());
    let other = pkcs1_signer().public_key();
    let verifier = Boot0Verifier::new(stage8_policy(&other, PolicyFlags::RSA_PSS_SHA256));
    assert_eq!(
        verifier.verify(&image.bytes, &carrier(&image), VerifyHooks::default()),
        Err(BootError::VERIFY_ERR_KEY_MISMATCH)
    );
}

#[test]
fn test_load_and_verify() {
    let image = signed_image(pss_signer());
    let key = pss_signer().public_key();
    let verifier = Boot0Verifier::new(stage8_policy(&key, PolicyFlags::RSA_PSS_SHA256));

    let mut flash = vec![0xffu8; 0x200];
    flash.extend_from_slice(&image.bytes);
    let carrier = LayoutCarrier {
        base: 0x200,
        loaded_len: image.bytes.len() as u32,
        limit: flash.len() as u32,
    };

    let mut buf = vec![0u8; 0x4000];
    let verified = verifier
        .load_and_verify(
            &mut SliceSource::new(&flash),
            &carrier,
            &mut buf,
            VerifyHooks::default(),
        )
        .unwrap();
    assert_eq!(verified.total_len as usize, image.bytes.len());
}

#[test]
fn test_signed_index_overflow() {
    let config = ImageGeneratorConfig {
        layout_tags: 4,
        ..ImageGeneratorConfig::with_payload(vec![9; 0x20])
    };
    let image = generate(StaticSigner::default(), &config);
    let policy = VerificationPolicy::new(&SHA256).with_expected(&image.digest);
    assert_eq!(
        Boot0Verifier::new(policy).verify(&image.bytes, &carrier(&image), VerifyHooks::default()),
        Err(BootError::CAPACITY_ERR_SIG_INDEX_FULL)
    );
}
