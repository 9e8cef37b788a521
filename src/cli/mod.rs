// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Arguments are parsed
// by clap into TrainArgs, echoed, converted into a RunConfig
// and handed to the sweep. Nothing here computes anything.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use burn::backend::{Autodiff, Wgpu};
use clap::Parser;

use crate::application::sweep_use_case::SweepUseCase;
use crate::application::train_use_case::RunConfig;
use commands::TrainArgs;

/// Training runs differentiate through the GPU backend.
type TrainBackend = Autodiff<Wgpu>;

#[derive(Parser, Debug)]
#[command(
    name = "issue-classifier",
    version,
    about = "Train and evaluate GitHub issue classifiers (TextCNN, BiLSTM, RCNN, transformer backbones)."
)]
pub struct Cli {
    #[command(flatten)]
    pub args: TrainArgs,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        println!("args:\n{:#?}", self.args);

        let device = self.args.wgpu_device();
        tracing::info!("Using device {:?}", device);

        let config: RunConfig = self.args.into();
        let ledger = SweepUseCase::<TrainBackend>::new(config, device).execute()?;

        println!("Ledger written to '{}'", ledger.path().display());
        Ok(())
    }
}
