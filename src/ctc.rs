//! Greedy CTC decoding (spec §4.G): per-step argmax with an ignore-set
//! mask, duplicate/blank collapse, and a geometric-mean confidence.

use std::collections::HashSet;

use crate::charset::Charset;

/// A decoded sequence: text plus its geometric-mean confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub text: String,
    pub confidence: f32,
}

/// Maps a model class index to its charset character, accounting for
/// the blank offset (spec §4.G character-mapping convention).
fn class_index_to_char(charset: &Charset, index: usize, blank: usize) -> Option<char> {
    if blank == 0 {
        if index == 0 {
            None
        } else {
            charset.chars.get(index - 1).copied()
        }
    } else if index < blank {
        charset.chars.get(index).copied()
    } else if index > blank {
        charset.chars.get(index - 1).copied()
    } else {
        None
    }
}

/// Decodes a `[steps, classes]` logits slice into text and confidence.
pub fn decode(
    logits: &[f32],
    steps: usize,
    classes: usize,
    charset: &Charset,
    blank: usize,
    ignore_set: &HashSet<usize>,
) -> Decoded {
    debug_assert_eq!(logits.len(), steps * classes);

    let mut text = String::new();
    let mut kept_probs: Vec<f32> = Vec::new();
    let mut prev_index: Option<usize> = None;

    for t in 0..steps {
        let row = &logits[t * classes..(t + 1) * classes];

        // First occurrence of the max, matching conventional argmax
        // semantics (not `Iterator::max_by`, which keeps the last tie).
        let best_index = (0..classes)
            .filter(|c| !ignore_set.contains(c))
            .fold(None::<usize>, |acc, c| match acc {
                Some(best) if row[best] >= row[c] => Some(best),
                _ => Some(c),
            })
            .unwrap_or(blank);

        let best_logit = row[best_index];
        let denom: f32 = (0..classes)
            .filter(|c| !ignore_set.contains(c))
            .map(|c| (row[c] - best_logit).exp())
            .sum();
        let p = if denom > 0.0 { 1.0 / denom } else { 0.0 };

        if best_index != blank {
            kept_probs.push(p);
        }

        let emits = best_index != blank
            && Some(best_index) != prev_index
            && !ignore_set.contains(&best_index);
        if emits {
            if let Some(c) = class_index_to_char(charset, best_index, blank) {
                text.push(c);
            }
        }

        prev_index = Some(best_index);
    }

    let confidence = geometric_mean_confidence(&kept_probs);

    Decoded { text, confidence }
}

/// `exp(sum(ln(p_i)) * 2/sqrt(n))`; any `p_i <= 0` or `n == 0` yields 0
/// (spec §4.G confidence formula).
fn geometric_mean_confidence(probs: &[f32]) -> f32 {
    let n = probs.len();
    if n == 0 {
        return 0.0;
    }
    if probs.iter().any(|&p| p <= 0.0) {
        return 0.0;
    }
    let sum_ln: f32 = probs.iter().map(|p| p.ln()).sum();
    (sum_ln * 2.0 / (n as f32).sqrt()).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charset(s: &str) -> Charset {
        Charset::from_chars(s.chars().collect())
    }

    #[test]
    fn all_blank_logits_yield_empty_text_and_zero_confidence() {
        let classes = 4;
        let steps = 3;
        let logits = vec![0.0f32; steps * classes];
        let cs = charset("_abc");
        let decoded = decode(&logits, steps, classes, &cs, 0, &HashSet::new());
        assert_eq!(decoded.text, "");
        assert_eq!(decoded.confidence, 0.0);
    }

    #[test]
    fn monotone_max_on_one_class_yields_single_character() {
        let classes = 4;
        let steps = 5;
        let mut logits = vec![0.0f32; steps * classes];
        for t in 0..steps {
            logits[t * classes + 2] = 10.0;
        }
        let cs = charset("_abc");
        let decoded = decode(&logits, steps, classes, &cs, 0, &HashSet::new());
        assert_eq!(decoded.text, "a"); // class 2 -> charset[1] = 'a'
        assert!(decoded.confidence > 0.0);
    }

    #[test]
    fn golden_scenario_two_classes_two_characters() {
        // classes 0..3, charset "_abc", blank=0.
        // class 2 at steps 0,1 then class 3 at step 2 -> "ab".
        let classes = 4;
        let steps = 3;
        let mut logits = vec![0.0f32; steps * classes];
        logits[0 * classes + 2] = 10.0;
        logits[1 * classes + 2] = 10.0;
        logits[2 * classes + 3] = 10.0;
        let cs = charset("_abc");
        let decoded = decode(&logits, steps, classes, &cs, 0, &HashSet::new());
        assert_eq!(decoded.text, "ab");
        assert!(decoded.confidence > 0.0);
    }

    #[test]
    fn ignore_set_masks_a_class_from_being_emitted() {
        // charset "abc", blank=0 -> class 1='a', class 2='b', class 3='c'.
        // Class 2 ('b') is the top class at t=1,2 but sits in the
        // ignore set; with it masked out, blank (the next best) wins at
        // those steps, so nothing is emitted there.
        let classes = 4;
        let steps = 3;
        let mut logits = vec![0.0f32; steps * classes];
        logits[0 * classes + 1] = 10.0; // 'a' at t=0
        logits[1 * classes] = 5.0; // blank, second best at t=1
        logits[1 * classes + 2] = 10.0; // 'b' at t=1 (ignored)
        logits[2 * classes] = 5.0; // blank, second best at t=2
        logits[2 * classes + 2] = 10.0; // 'b' at t=2 (ignored)
        let cs = charset("abc");
        let mut ignore = HashSet::new();
        ignore.insert(2);
        let decoded = decode(&logits, steps, classes, &cs, 0, &ignore);
        assert_eq!(decoded.text, "a");
    }
}
