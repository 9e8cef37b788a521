// ============================================================
// Layer 5 — Learning-Rate Schedule
// ============================================================
// Word-level models train at a constant rate. Pretrained models
// warm up linearly over the first 10% of optimiser steps, then
// decay linearly to zero at the last step:
//
//   t < w : lr · (t + 1) / w
//   t ≥ w : lr · (T − t) / (T − w)
//
// Both phases are burn LinearLrSchedulers chained back to back.
// burn rejects a zero initial rate, so the ramp starts (and the
// decay ends) at LR_FLOOR; the floor step of the ramp is spent
// at construction so the first rate handed out is lr / w.

use anyhow::{bail, Result};
use burn::{
    lr_scheduler::{
        constant::ConstantLr,
        linear::{LinearLrScheduler, LinearLrSchedulerConfig},
        LrScheduler,
    },
    prelude::Backend,
    LearningRate,
};
use serde::{Deserialize, Serialize};

/// Share of all steps spent warming up.
pub const WARMUP_FRACTION: f64 = 0.1;

/// Stand-in for a zero learning rate at either end of a ramp.
const LR_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScheduleKind {
    Constant,
    WarmupLinearDecay,
}

#[derive(Clone)]
enum Phases {
    Constant(ConstantLr),
    WarmupDecay {
        warmup:      LinearLrScheduler,
        decay:       LinearLrScheduler,
        warmup_left: usize,
    },
}

/// Per-step learning rate of one training run.
#[derive(Clone)]
pub struct IssueLrScheduler {
    kind:        ScheduleKind,
    base_lr:     f64,
    total_steps: usize,
    steps:       usize,
    phases:      Phases,
}

impl IssueLrScheduler {
    pub fn new(kind: ScheduleKind, base_lr: f64, total_steps: usize) -> Result<Self> {
        if kind == ScheduleKind::WarmupLinearDecay && !(base_lr > LR_FLOOR && base_lr <= 1.0) {
            bail!("Warm-up learning rate must be in (0, 1], got {base_lr}");
        }
        Ok(Self::build(kind, base_lr, total_steps))
    }

    fn build(kind: ScheduleKind, base_lr: f64, total_steps: usize) -> Self {
        let phases = match kind {
            ScheduleKind::Constant => Phases::Constant(ConstantLr::from(base_lr)),
            ScheduleKind::WarmupLinearDecay => {
                let warmup_steps = ((total_steps as f64 * WARMUP_FRACTION).ceil() as usize).max(1);
                let decay_steps = total_steps.saturating_sub(warmup_steps).max(1);

                let mut warmup = LinearLrSchedulerConfig::new(LR_FLOOR, base_lr, warmup_steps)
                    .init()
                    .expect("warm-up rate validated in new()");
                warmup.step();
                let decay = LinearLrSchedulerConfig::new(base_lr, LR_FLOOR, decay_steps)
                    .init()
                    .expect("decay rate validated in new()");
                Phases::WarmupDecay { warmup, decay, warmup_left: warmup_steps }
            }
        };
        Self { kind, base_lr, total_steps, steps: 0, phases }
    }

    /// Optimiser steps taken so far.
    pub fn steps(&self) -> usize {
        self.steps
    }
}

impl LrScheduler for IssueLrScheduler {
    type Record<B: Backend> = usize;

    fn step(&mut self) -> LearningRate {
        self.steps += 1;
        match &mut self.phases {
            Phases::Constant(lr) => lr.step(),
            Phases::WarmupDecay { warmup, decay, warmup_left } => {
                if *warmup_left > 0 {
                    *warmup_left -= 1;
                    warmup.step()
                } else {
                    decay.step()
                }
            }
        }
    }

    fn to_record<B: Backend>(&self) -> Self::Record<B> {
        self.steps
    }

    fn load_record<B: Backend>(self, record: Self::Record<B>) -> Self {
        let mut restored = Self::build(self.kind, self.base_lr, self.total_steps);
        for _ in 0..record {
            restored.step();
        }
        restored
    }
}
