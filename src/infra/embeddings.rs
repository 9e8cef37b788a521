// ============================================================
// Layer 6 — Pretrained Word Embeddings
// ============================================================
// Reads 300-d text-format vectors (GloVe, word2vec, fastText)
// into an embedding matrix aligned with the word vocabulary:
//
//   row 0 (padding)          → zeros
//   token found in the file  → its vector
//   any other token          → U(-1, 1) · std of found vectors
//
// Lines that do not hold a token plus exactly 300 values
// (fastText / word2vec headers, malformed rows) are skipped.

use anyhow::{Context, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

/// Dimension of every supported vector file.
pub const EMBEDDING_DIM: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingKind {
    Glove,
    Word2Vec,
    FastText,
    None,
    Unknown(String),
}

impl EmbeddingKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "glove" => Self::Glove,
            "word2vec" => Self::Word2Vec,
            "fasttext" => Self::FastText,
            other if other.eq_ignore_ascii_case("none") => Self::None,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Location of the vector file under `embed_dir`.
    pub fn path(&self, embed_dir: &Path) -> Option<PathBuf> {
        let relative = match self {
            Self::Glove => "glove.6B/glove.6B.300d.txt",
            Self::Word2Vec => "word2vec/word2vec-google-news-300.txt",
            Self::FastText => "fasttext/wiki.en.vec",
            Self::None | Self::Unknown(_) => return None,
        };
        Some(embed_dir.join(relative))
    }
}

/// Row-major `[vocab_size, dim]` matrix.
#[derive(Debug, Clone)]
pub struct EmbeddingMatrix {
    pub vocab_size: usize,
    pub dim:        usize,
    pub values:     Vec<f32>,
    /// Vocabulary tokens that had a pretrained vector
    pub found:      usize,
}

/// Resolve `--embed` for a word-level model. `Ok(None)` when no
/// pretrained vectors are requested or the name is not recognised.
pub fn load_for(
    kind:       &EmbeddingKind,
    embed_dir:  &Path,
    vocab:      &HashMap<String, u32>,
    vocab_size: usize,
    seed:       u64,
) -> Result<Option<EmbeddingMatrix>> {
    match kind {
        EmbeddingKind::None => {
            println!("no pretrained embeddings");
            Ok(None)
        }
        EmbeddingKind::Unknown(name) => {
            println!("unknown embeddings");
            tracing::warn!("Unknown embedding '{}', training from scratch", name);
            Ok(None)
        }
        _ => {
            let path = kind.path(embed_dir).context("Embedding kind has no file")?;
            load_matrix(&path, vocab, vocab_size, seed).map(Some)
        }
    }
}

pub fn load_matrix(
    path:       &Path,
    vocab:      &HashMap<String, u32>,
    vocab_size: usize,
    seed:       u64,
) -> Result<EmbeddingMatrix> {
    tracing::info!("Reading pretrained embeddings from '{}'", path.display());
    let file = File::open(path)
        .with_context(|| format!("Cannot open embedding file '{}'", path.display()))?;

    let mut found: HashMap<usize, Vec<f32>> = HashMap::new();
    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("Cannot read '{}'", path.display()))?;
        let mut fields = line.trim_end().split(' ');
        let Some(token) = fields.next() else { continue };
        let Some(&id) = vocab.get(token) else { continue };

        let vector: Vec<f32> = fields.filter_map(|v| v.parse().ok()).collect();
        if vector.len() == EMBEDDING_DIM {
            found.insert(id as usize, vector);
        }
    }

    let std = std_dev(found.values().flatten().copied());
    if found.is_empty() {
        tracing::warn!("No vocabulary token found in '{}'", path.display());
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut values = Vec::with_capacity(vocab_size * EMBEDDING_DIM);
    for id in 0..vocab_size {
        match found.get(&id) {
            Some(vector) => values.extend_from_slice(vector),
            None if id == 0 => values.extend(std::iter::repeat(0.0).take(EMBEDDING_DIM)),
            None => values.extend((0..EMBEDDING_DIM).map(|_| rng.gen_range(-1.0f32..1.0) * std)),
        }
    }

    tracing::info!("Pretrained vectors for {}/{} tokens", found.len(), vocab_size);
    Ok(EmbeddingMatrix { vocab_size, dim: EMBEDDING_DIM, values, found: found.len() })
}

/// Population standard deviation; 1.0 when there is nothing to measure.
fn std_dev(values: impl Iterator<Item = f32>) -> f32 {
    let (mut n, mut sum, mut sum_sq) = (0usize, 0f64, 0f64);
    for v in values {
        n += 1;
        sum += v as f64;
        sum_sq += (v as f64) * (v as f64);
    }
    if n == 0 {
        return 1.0;
    }
    let mean = sum / n as f64;
    ((sum_sq / n as f64 - mean * mean).max(0.0).sqrt()) as f32
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vector_line(token: &str, value: f32) -> String {
        let values = vec![value.to_string(); EMBEDDING_DIM].join(" ");
        format!("{token} {values}")
    }

    fn vocab() -> HashMap<String, u32> {
        [("@@PADDING@@", 0), ("@@UNKNOWN@@", 1), ("crash", 2), ("rare", 3)]
            .into_iter()
            .map(|(t, i)| (t.to_string(), i))
            .collect()
    }

    #[test]
    fn test_parse_and_paths() {
        assert_eq!(EmbeddingKind::parse("None"), EmbeddingKind::None);
        assert_eq!(EmbeddingKind::parse("elmo"), EmbeddingKind::Unknown("elmo".into()));
        assert_eq!(
            EmbeddingKind::Glove.path(Path::new("embed")).unwrap(),
            Path::new("embed/glove.6B/glove.6B.300d.txt")
        );
        assert!(EmbeddingKind::None.path(Path::new("embed")).is_none());
    }

    fn row(m: &EmbeddingMatrix, id: usize) -> &[f32] {
        &m.values[id * m.dim..(id + 1) * m.dim]
    }

    #[test]
    fn test_matrix_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vectors.vec");
        let text = ["2 300".to_string(), vector_line("crash", 0.5), vector_line("other", -0.5)].join("\n");
        std::fs::write(&path, text).unwrap();

        let m = load_matrix(&path, &vocab(), 4, 7).unwrap();
        assert_eq!(m.values.len(), 4 * EMBEDDING_DIM);
        assert_eq!(m.found, 1);
        assert!(row(&m, 0).iter().all(|&v| v == 0.0));
        assert!(row(&m, 2).iter().all(|&v| v == 0.5));
        // found vectors are constant, so std is 0 and fills collapse to zero
        assert!(row(&m, 3).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_random_fill_is_seeded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vectors.txt");
        std::fs::write(&path, "unrelated 1.0\n").unwrap();

        let a = load_matrix(&path, &vocab(), 4, 1).unwrap();
        let b = load_matrix(&path, &vocab(), 4, 1).unwrap();
        assert_eq!(a.found, 0);
        assert_eq!(a.values, b.values);
        assert!(row(&a, 3).iter().all(|v| v.abs() <= 1.0));
        assert!(row(&a, 3).iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_none_and_unknown_skip_loading() {
        let dir = TempDir::new().unwrap();
        assert!(load_for(&EmbeddingKind::None, dir.path(), &vocab(), 4, 0).unwrap().is_none());
        let unknown = EmbeddingKind::Unknown("elmo".into());
        assert!(load_for(&unknown, dir.path(), &vocab(), 4, 0).unwrap().is_none());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_for(&EmbeddingKind::Glove, dir.path(), &vocab(), 4, 0).is_err());
    }
}
