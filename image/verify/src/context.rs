/*++

Licensed under the Apache-2.0 license.

File Name:

   context.rs

Abstract:

    Per-call verification context and observation callbacks.

--*/

use crate::io::IoPair;
use boot0_error::BootError;
use boot0_image_types::Digest256;

/// Pipeline stages visible to hooks and reporters.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    Digest,
    Signature,
    Verdict,
}

impl Stage {
    /// Numeric stage id used by the callback ABI.
    pub fn id(self) -> u32 {
        match self {
            Stage::Digest => 7,
            Stage::Signature => 8,
            Stage::Verdict => 0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StageEvent {
    Exit,
    Enter,
}

impl StageEvent {
    pub fn as_u32(self) -> u32 {
        match self {
            StageEvent::Exit => 0,
            StageEvent::Enter => 1,
        }
    }
}

/// Notified when a stage starts and ends.
pub trait StageHook {
    fn stage(&mut self, stage: Stage, event: StageEvent);
}

impl<F: FnMut(Stage, StageEvent)> StageHook for F {
    fn stage(&mut self, stage: Stage, event: StageEvent) {
        self(stage, event)
    }
}

/// Receives progress words after each stage and for the final verdict.
///
/// For [`Stage::Digest`] and [`Stage::Signature`], `a` is zero on success or
/// the error code, and `b` is the produced length. For [`Stage::Verdict`],
/// `a` is the verdict code and `b` the compare length.
pub trait Reporter {
    fn report(&mut self, stage: Stage, reserved: u32, a: u32, b: u32);
}

impl<F: FnMut(Stage, u32, u32, u32)> Reporter for F {
    fn report(&mut self, stage: Stage, reserved: u32, a: u32, b: u32) {
        self(stage, reserved, a, b)
    }
}

/// Input selected for the digest stage.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum DigestSource {
    /// The candidate image of the context
    #[default]
    Candidate,
    /// The hash input carried by the policy
    PolicyHashIo,
}

/// Mutable state of one verification call.
pub struct VerifyContext<'a> {
    pub slot: u32,

    pub image: IoPair<'a>,

    pub digest_source: DigestSource,

    /// Receives the stage-7 digest when the policy requests a copy
    pub digest_out: Option<Digest256>,

    pub stage_hook: Option<&'a mut dyn StageHook>,

    pub report: Option<&'a mut dyn Reporter>,
}

impl<'a> VerifyContext<'a> {
    pub fn new(slot: u32, image: IoPair<'a>) -> Self {
        Self {
            slot,
            image,
            digest_source: DigestSource::default(),
            digest_out: None,
            stage_hook: None,
            report: None,
        }
    }

    pub fn with_digest_source(mut self, source: DigestSource) -> Self {
        self.digest_source = source;
        self
    }

    pub fn with_stage_hook(mut self, hook: &'a mut dyn StageHook) -> Self {
        self.stage_hook = Some(hook);
        self
    }

    pub fn with_report(mut self, report: &'a mut dyn Reporter) -> Self {
        self.report = Some(report);
        self
    }

    pub(crate) fn notify(&mut self, stage: Stage, event: StageEvent) {
        if let Some(hook) = self.stage_hook.as_deref_mut() {
            hook.stage(stage, event);
        }
    }

    pub(crate) fn emit(&mut self, stage: Stage, a: u32, b: u32) {
        if let Some(report) = self.report.as_deref_mut() {
            report.report(stage, 0, a, b);
        }
    }
}

/// Read-only view of the call handed to stage operations.
#[derive(Debug, Copy, Clone)]
pub struct OpContext<'a> {
    pub slot: u32,
    pub image: &'a IoPair<'a>,
}

/// Replace an op error with the code of the step that failed.
pub(crate) fn op_failed(step: &'static str, code: BootError) -> impl FnOnce(BootError) -> BootError {
    move |err| {
        log::debug!("{} failed: {}", step, err);
        code
    }
}
