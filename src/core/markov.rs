/// Markov chain over name corpora — training, originality filtering, and generation.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::schema::race::Corpus;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkovError {
    #[error("corpus contains no sentences")]
    EmptyCorpus,
    #[error("state size must be at least 1")]
    InvalidStateSize,
    #[error("no corpus sentence starts with '{0}'")]
    NoPrefixMatch(String),
}

/// Special token marking sentence start.
const SENTENCE_START: &str = "___BEGIN__";
/// Special token marking sentence end.
const SENTENCE_END: &str = "___END__";

/// Default chain order used by race configs that do not set one.
pub const DEFAULT_STATE_SIZE: usize = 2;
/// Sentence walks attempted per `generate` call before giving up.
pub const DEFAULT_TRIES: usize = 10;
/// Upper bound on units in a single walk; longer walks are discarded.
const MAX_WALK_LEN: usize = 64;

const MAX_OVERLAP_RATIO: f64 = 0.7;
const MAX_OVERLAP_TOTAL: usize = 15;

type Transitions = FxHashMap<Vec<String>, Vec<(String, u32)>>;

/// A Markov chain trained on whitespace-separated units (syllables or
/// words) of every corpus sentence.
#[derive(Debug, Clone)]
pub struct MarkovModel {
    state_size: usize,
    transitions: Transitions,
    /// Corpus sentences joined by newlines, used to reject verbatim output.
    rejoined: String,
    tries: usize,
}

impl MarkovModel {
    /// Train a model over the corpus with the given chain order.
    pub fn new(corpus: &Corpus, state_size: usize) -> Result<Self, MarkovError> {
        Self::from_sentences(corpus.sentences(), state_size)
    }

    /// Train a model from an iterator of sentences.
    pub fn from_sentences<'a, I>(sentences: I, state_size: usize) -> Result<Self, MarkovError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if state_size == 0 {
            return Err(MarkovError::InvalidStateSize);
        }

        let mut transitions = Transitions::default();
        let mut kept: Vec<String> = Vec::new();

        for sentence in sentences {
            let units: Vec<String> = sentence.split_whitespace().map(str::to_string).collect();
            if units.is_empty() {
                continue;
            }

            let mut padded = vec![SENTENCE_START.to_string(); state_size];
            padded.extend(units.iter().cloned());
            padded.push(SENTENCE_END.to_string());

            for window in padded.windows(state_size + 1) {
                let prefix = window[..state_size].to_vec();
                let next = window[state_size].clone();
                add_transition(&mut transitions, prefix, next);
            }

            kept.push(units.join(" "));
        }

        if kept.is_empty() {
            return Err(MarkovError::EmptyCorpus);
        }

        Ok(MarkovModel {
            state_size,
            transitions,
            rejoined: kept.join("\n"),
            tries: DEFAULT_TRIES,
        })
    }

    /// Override the number of walks attempted per generation call.
    pub fn with_tries(mut self, tries: usize) -> Self {
        self.tries = tries.max(1);
        self
    }

    pub fn state_size(&self) -> usize {
        self.state_size
    }

    /// Generate one novel sentence, or `None` if every walk within the try
    /// budget reproduced the corpus too closely.
    pub fn generate<R: Rng>(&self, rng: &mut R) -> Option<String> {
        let start = self.start_state();
        (0..self.tries).find_map(|_| self.attempt(start.clone(), Vec::new(), rng))
    }

    /// Generate one novel sentence whose units, concatenated, start with
    /// `prefix` (case-insensitive).
    ///
    /// `Err(NoPrefixMatch)` means no corpus sentence can start that way;
    /// `Ok(None)` means matching starts exist but the try budget ran out.
    pub fn generate_starting_with<R: Rng>(
        &self,
        prefix: &str,
        rng: &mut R,
    ) -> Result<Option<String>, MarkovError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Ok(self.generate(rng));
        }

        let needle = prefix.to_lowercase();
        let sentence = self.generate_opening_with(prefix, |unit| prefix_compatible(unit, &needle), rng)?;
        Ok(sentence.filter(|s| {
            s.split_whitespace()
                .collect::<String>()
                .to_lowercase()
                .starts_with(&needle)
        }))
    }

    /// Generate one novel sentence whose first unit satisfies `opens`.
    ///
    /// Only the opening unit is constrained; callers check the finished
    /// text themselves. `prefix` is what a `NoPrefixMatch` reports when no
    /// opening unit qualifies.
    pub fn generate_opening_with<R, F>(
        &self,
        prefix: &str,
        opens: F,
        rng: &mut R,
    ) -> Result<Option<String>, MarkovError>
    where
        R: Rng,
        F: Fn(&str) -> bool,
    {
        let start = self.start_state();
        let openers: Vec<(String, u32)> = self
            .transitions
            .get(&start)
            .map(|options| {
                options
                    .iter()
                    .filter(|(tok, _)| tok != SENTENCE_END && opens(tok))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if openers.is_empty() {
            return Err(MarkovError::NoPrefixMatch(prefix.to_string()));
        }

        for _ in 0..self.tries {
            let Some(first) = sample(&openers, rng) else {
                break;
            };
            let mut state = start.clone();
            state.remove(0);
            state.push(first.clone());
            if let Some(sentence) = self.attempt(state, vec![first], rng) {
                return Ok(Some(sentence));
            }
        }
        Ok(None)
    }

    fn start_state(&self) -> Vec<String> {
        vec![SENTENCE_START.to_string(); self.state_size]
    }

    /// Walk the chain from `state`, then apply the originality test.
    fn attempt<R: Rng>(
        &self,
        mut state: Vec<String>,
        mut units: Vec<String>,
        rng: &mut R,
    ) -> Option<String> {
        loop {
            let next = pick_next(&self.transitions, &state, rng)?;
            if next == SENTENCE_END {
                break;
            }
            if units.len() >= MAX_WALK_LEN {
                return None;
            }
            units.push(next.clone());
            state.remove(0);
            state.push(next);
        }

        if units.is_empty() || !self.is_original(&units) {
            return None;
        }
        Some(units.join(" "))
    }

    /// Reject output where a long enough run of units appears verbatim in
    /// the corpus.
    fn is_original(&self, units: &[String]) -> bool {
        let ratio = (MAX_OVERLAP_RATIO * units.len() as f64).round() as usize;
        let overlap_max = ratio.min(MAX_OVERLAP_TOTAL);
        let overlap_over = overlap_max + 1;
        let gram_count = units.len().saturating_sub(overlap_max).max(1);

        (0..gram_count).all(|i| {
            let end = (i + overlap_over).min(units.len());
            let gram = units[i..end].join(" ");
            !self.rejoined.contains(&gram)
        })
    }
}

/// Whether a unit can open text starting with `needle`: either the unit
/// covers the whole prefix or the prefix continues past it. Case-insensitive.
pub fn prefix_compatible(unit: &str, needle: &str) -> bool {
    let unit = unit.to_lowercase();
    let needle = needle.to_lowercase();
    unit.starts_with(&needle) || needle.starts_with(&unit)
}

/// Pick the next unit from transitions given a state.
fn pick_next<R: Rng>(transitions: &Transitions, state: &[String], rng: &mut R) -> Option<String> {
    let options = transitions.get(state)?;
    sample(options, rng)
}

fn sample<R: Rng>(options: &[(String, u32)], rng: &mut R) -> Option<String> {
    if options.is_empty() {
        return None;
    }
    let weights: Vec<u32> = options.iter().map(|(_, count)| *count).collect();
    let dist = WeightedIndex::new(&weights).ok()?;
    Some(options[dist.sample(rng)].0.clone())
}

/// Add a transition to a transition table, incrementing the count.
fn add_transition(table: &mut Transitions, prefix: Vec<String>, next: String) {
    let entries = table.entry(prefix).or_default();
    if let Some(entry) = entries.iter_mut().find(|(tok, _)| tok == &next) {
        entry.1 += 1;
    } else {
        entries.push((next, 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // The only walk that is not a verbatim corpus line is "ka ri na lo".
    const CORPUS: &[&str] = &["ka ri na", "ri na lo", "ka ri"];

    fn model() -> MarkovModel {
        MarkovModel::from_sentences(CORPUS.iter().copied(), 2).unwrap()
    }

    #[test]
    fn train_creates_transitions() {
        let model = model();
        assert_eq!(model.state_size(), 2);
        let start = model.start_state();
        let openers = &model.transitions[&start];
        assert!(openers.contains(&("ka".to_string(), 2)));
        assert!(openers.contains(&("ri".to_string(), 1)));
    }

    #[test]
    fn generate_produces_novel_sentence() {
        let model = model();
        let mut rng = StdRng::seed_from_u64(42);
        let mut produced = None;
        for _ in 0..20 {
            if let Some(s) = model.generate(&mut rng) {
                produced = Some(s);
                break;
            }
        }
        assert_eq!(produced.as_deref(), Some("ka ri na lo"));
    }

    #[test]
    fn generate_deterministic() {
        let model = model();
        let mut rng1 = StdRng::seed_from_u64(9);
        let mut rng2 = StdRng::seed_from_u64(9);
        for _ in 0..10 {
            assert_eq!(model.generate(&mut rng1), model.generate(&mut rng2));
        }
    }

    #[test]
    fn verbatim_only_corpus_yields_none() {
        let model = MarkovModel::from_sentences(["ae la", "bryn"], 2).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(model.generate(&mut rng), None);
    }

    #[test]
    fn starting_with_matches_first_unit() {
        let model = model();
        let mut rng = StdRng::seed_from_u64(5);
        let mut produced = None;
        for _ in 0..20 {
            if let Some(s) = model.generate_starting_with("K", &mut rng).unwrap() {
                produced = Some(s);
                break;
            }
        }
        assert_eq!(produced.as_deref(), Some("ka ri na lo"));
    }

    #[test]
    fn starting_with_spans_several_units() {
        let model = model();
        let mut rng = StdRng::seed_from_u64(5);
        let produced = (0..20).find_map(|_| model.generate_starting_with("Karin", &mut rng).unwrap());
        assert_eq!(produced.as_deref(), Some("ka ri na lo"));
    }

    #[test]
    fn starting_with_compatible_opener_but_no_full_match() {
        let model = model();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            assert_eq!(model.generate_starting_with("kaz", &mut rng), Ok(None));
        }
    }

    #[test]
    fn prefix_compatibility() {
        assert!(prefix_compatible("ka", "K"));
        assert!(prefix_compatible("ka", "kari"));
        assert!(prefix_compatible("KA", "ka"));
        assert!(!prefix_compatible("ri", "ka"));
        assert!(!prefix_compatible("kal", "kar"));
    }

    #[test]
    fn starting_with_unknown_prefix_is_no_match() {
        let model = model();
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(
            model.generate_starting_with("z", &mut rng),
            Err(MarkovError::NoPrefixMatch("z".to_string()))
        );
    }

    #[test]
    fn empty_corpus_rejected() {
        assert_eq!(
            MarkovModel::from_sentences(["", "   "], 2).unwrap_err(),
            MarkovError::EmptyCorpus
        );
    }

    #[test]
    fn zero_state_size_rejected() {
        assert_eq!(
            MarkovModel::from_sentences(["ka ri"], 0).unwrap_err(),
            MarkovError::InvalidStateSize
        );
    }

    #[test]
    fn newline_corpus_splits_lines() {
        let corpus = Corpus::Lines("ka ri na\nri na lo\n\nka ri\n".to_string());
        let model = MarkovModel::new(&corpus, 2).unwrap();
        assert_eq!(model.rejoined, "ka ri na\nri na lo\nka ri");
    }

    #[test]
    fn originality_rejects_corpus_substrings() {
        let model = model();
        let units = |s: &str| s.split(' ').map(str::to_string).collect::<Vec<_>>();
        assert!(!model.is_original(&units("ri na")));
        assert!(!model.is_original(&units("ka ri na")));
        assert!(model.is_original(&units("ka ri na lo")));
    }
}
