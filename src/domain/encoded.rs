// ============================================================
// Layer 3 — Encoded Text
// ============================================================
// A tokenised issue: token ids, attention mask, and optional
// segment ids, all the same length. Padding is applied here so
// every tokenizer strategy pads the same way.

/// Padding token of the trained word vocabulary (index 0).
pub const WORD_PADDING_TOKEN: &str = "@@PADDING@@";

/// Out-of-vocabulary token of the trained word vocabulary (index 1).
pub const WORD_UNKNOWN_TOKEN: &str = "@@UNKNOWN@@";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingSide {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedText {
    pub input_ids:      Vec<u32>,
    /// 1 = real token, 0 = padding
    pub attention_mask: Vec<u32>,
    /// Present only for families that consume segment ids
    pub type_ids:       Option<Vec<u32>>,
}

impl EncodedText {
    pub fn new(input_ids: Vec<u32>, type_ids: Option<Vec<u32>>) -> Self {
        let attention_mask = vec![1; input_ids.len()];
        Self { input_ids, attention_mask, type_ids }
    }

    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Pad up to `target` tokens. Sequences already at or past the
    /// target are returned unchanged.
    pub fn padded(mut self, target: usize, pad_id: u32, side: PaddingSide) -> Self {
        let missing = target.saturating_sub(self.len());
        if missing == 0 {
            return self;
        }
        match side {
            PaddingSide::Right => {
                self.input_ids.extend(std::iter::repeat(pad_id).take(missing));
                self.attention_mask.extend(std::iter::repeat(0).take(missing));
                if let Some(types) = self.type_ids.as_mut() {
                    types.extend(std::iter::repeat(0).take(missing));
                }
            }
            PaddingSide::Left => {
                self.input_ids.splice(0..0, std::iter::repeat(pad_id).take(missing));
                self.attention_mask.splice(0..0, std::iter::repeat(0).take(missing));
                if let Some(types) = self.type_ids.as_mut() {
                    types.splice(0..0, std::iter::repeat(0).take(missing));
                }
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_right_padding() {
        let e = EncodedText::new(vec![5, 6], Some(vec![0, 0])).padded(4, 9, PaddingSide::Right);
        assert_eq!(e.input_ids, vec![5, 6, 9, 9]);
        assert_eq!(e.attention_mask, vec![1, 1, 0, 0]);
        assert_eq!(e.type_ids, Some(vec![0, 0, 0, 0]));
        assert_eq!(e.attention_mask.iter().filter(|&&m| m == 1).count(), 2);
    }

    #[test]
    fn test_left_padding() {
        let e = EncodedText::new(vec![5, 6], None).padded(3, 0, PaddingSide::Left);
        assert_eq!(e.input_ids, vec![0, 5, 6]);
        assert_eq!(e.attention_mask, vec![0, 1, 1]);
    }

    #[test]
    fn test_no_padding_when_long_enough() {
        let e = EncodedText::new(vec![1, 2, 3], None).padded(2, 0, PaddingSide::Right);
        assert_eq!(e.len(), 3);
    }
}
