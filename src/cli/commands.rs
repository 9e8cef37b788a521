// ============================================================
// Layer 1 — CLI Arguments
// ============================================================
// One flat argument surface. Flag names keep their underscore
// spelling (`--train_file`, `--base_lr`, ...), so every long
// name is given explicitly.
//
// clap's derive macros generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, PathBuf, ...)
//
// Reference: Rust Book §12 (Building a CLI Program)

use burn::backend::wgpu::WgpuDevice;
use clap::Args;
use std::path::PathBuf;

use crate::application::train_use_case::RunConfig;

/// Training parameters.
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Device to run on: -1 for CPU, 0 for the default adapter, n > 0 for GPU n
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub device: i32,

    /// Model name, or a directory path with --local_model
    #[arg(long, default_value = "textcnn")]
    pub model: String,

    /// Word embeddings for word-level models: glove, word2vec, fasttext, none
    #[arg(long, default_value = "glove")]
    pub embed: String,

    /// Pool the whole output sequence instead of a single token
    #[arg(long)]
    pub sequence: bool,

    /// Freeze the pretrained backbone
    #[arg(long)]
    pub disablefinetune: bool,

    /// Number of repeated trials
    #[arg(long = "train_time", default_value_t = 1)]
    pub train_time: usize,

    /// Treat --model as a local directory
    #[arg(long = "local_model")]
    pub local_model: bool,

    /// Predict the test partition and write the report files
    #[arg(long = "do_predict")]
    pub do_predict: bool,

    /// One file used for train, valid and test
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Training data
    #[arg(long = "train_file", required_unless_present = "file")]
    pub train_file: Option<PathBuf>,

    /// Validation data (defaults to the training data)
    #[arg(long = "valid_file")]
    pub valid_file: Option<PathBuf>,

    /// Test data (defaults to the training data)
    #[arg(long = "test_file")]
    pub test_file: Option<PathBuf>,

    /// Batch size of pretrained models
    #[arg(long = "batch_size", default_value_t = 8)]
    pub batch_size: usize,

    /// Peak learning rate of pretrained models
    #[arg(long = "base_lr", default_value_t = 5e-5)]
    pub base_lr: f64,

    /// Run name used by logs, checkpoints and output files
    #[arg(long, default_value = "trial")]
    pub trial: String,

    #[arg(long = "max_epochs", default_value_t = 30)]
    pub max_epochs: usize,

    /// Stop after this many epochs without a better validation macro-F1
    #[arg(long)]
    pub patience: Option<usize>,

    #[arg(long = "output_dir", default_value = "output")]
    pub output_dir: PathBuf,

    #[arg(long = "ckpt_dir", default_value = "ckpts")]
    pub ckpt_dir: PathBuf,

    #[arg(long = "log_dir", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Directory holding glove.6B/, word2vec/ and fasttext/
    #[arg(long = "embed_dir", default_value = "embed")]
    pub embed_dir: PathBuf,

    /// Seed of the splits, shuffling and random embedding rows
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl TrainArgs {
    /// Compute device named by `--device`.
    pub fn wgpu_device(&self) -> WgpuDevice {
        match usize::try_from(self.device) {
            Ok(0) => WgpuDevice::DefaultDevice,
            Ok(index) => WgpuDevice::DiscreteGpu(index),
            Err(_) => WgpuDevice::Cpu,
        }
    }
}

/// Convert CLI TrainArgs into the application-layer RunConfig.
/// Explicit paths win over --file; valid and test fall back to
/// the training path, which selects the single-file split.
impl From<TrainArgs> for RunConfig {
    fn from(a: TrainArgs) -> Self {
        let train_file = a.train_file.or_else(|| a.file.clone()).unwrap_or_default();
        let valid_file = a.valid_file.or_else(|| a.file.clone()).unwrap_or_else(|| train_file.clone());
        let test_file = a.test_file.or(a.file).unwrap_or_else(|| train_file.clone());

        RunConfig {
            device: a.device,
            model: a.model,
            embed: a.embed,
            sequence: a.sequence,
            disablefinetune: a.disablefinetune,
            train_time: a.train_time,
            local_model: a.local_model,
            do_predict: a.do_predict,
            train_file,
            valid_file,
            test_file,
            batch_size: a.batch_size,
            base_lr: a.base_lr,
            trial: a.trial,
            max_epochs: a.max_epochs,
            patience: a.patience,
            output_dir: a.output_dir,
            ckpt_dir: a.ckpt_dir,
            log_dir: a.log_dir,
            embed_dir: a.embed_dir,
            seed: a.seed,
        }
    }
}
