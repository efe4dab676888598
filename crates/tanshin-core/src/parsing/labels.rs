use crate::config::schema::MetricDef;
use crate::model::{CanonicalMetric, UnitClass};
use crate::parsing::text::{compact, split_trailing_bracket};

/// Similarity score between an observed label and a vocabulary label.
///
/// Implementations must return a value in [0.0, 1.0] and be deterministic.
pub trait LabelScorer: Send + Sync {
    fn score(&self, observed: &str, candidate: &str) -> f64;
}

/// Longest-common-subsequence ratio: 2 * LCS / (|a| + |b|), over characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct LcsRatio;

impl LabelScorer for LcsRatio {
    fn score(&self, observed: &str, candidate: &str) -> f64 {
        let a: Vec<char> = observed.chars().collect();
        let b: Vec<char> = candidate.chars().collect();
        if a.is_empty() && b.is_empty() {
            return 1.0;
        }
        2.0 * lcs_len(&a, &b) as f64 / (a.len() + b.len()) as f64
    }
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Contains,
    Fuzzy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelMatch {
    Matched {
        metric: CanonicalMetric,
        unit_class: UnitClass,
        kind: MatchKind,
    },
    NoMatch,
}

impl LabelMatch {
    pub fn metric(&self) -> Option<CanonicalMetric> {
        match self {
            LabelMatch::Matched { metric, .. } => Some(*metric),
            LabelMatch::NoMatch => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    metric: CanonicalMetric,
    unit_class: UnitClass,
    text: String,
    len: usize,
    exclude: Vec<String>,
}

impl Candidate {
    fn excluded_by(&self, observed: &str) -> bool {
        self.exclude.iter().any(|e| observed.contains(e.as_str()))
    }
}

/// Maps free-text row labels onto canonical metrics.
pub struct LabelMatcher {
    candidates: Vec<Candidate>,
    threshold: f64,
    scorer: Box<dyn LabelScorer>,
}

impl LabelMatcher {
    pub fn new(defs: &[MetricDef], threshold: f64) -> Self {
        Self::with_scorer(defs, threshold, Box::new(LcsRatio))
    }

    pub fn with_scorer(defs: &[MetricDef], threshold: f64, scorer: Box<dyn LabelScorer>) -> Self {
        let mut candidates = Vec::new();
        for def in defs {
            let exclude: Vec<String> = def
                .exclude
                .iter()
                .map(|e| normalize_label(e))
                .filter(|e| !e.is_empty())
                .collect();
            for label in std::iter::once(&def.label).chain(def.aliases.iter()) {
                let text = normalize_label(label);
                if text.is_empty() {
                    continue;
                }
                candidates.push(Candidate {
                    metric: def.metric,
                    unit_class: def.unit_class,
                    len: text.chars().count(),
                    text,
                    exclude: exclude.clone(),
                });
            }
        }
        Self {
            candidates,
            threshold,
            scorer,
        }
    }

    /// Match a row label: exact, then containment, then fuzzy. A metric whose
    /// exclusion fragments appear in the label only matches exactly.
    pub fn match_label(&self, text: &str) -> LabelMatch {
        let observed = normalize_label(text);
        if observed.is_empty() {
            return LabelMatch::NoMatch;
        }

        if let Some(c) = self.longest(|c| c.text == observed) {
            return matched(c, MatchKind::Exact);
        }

        if let Some(c) =
            self.longest(|c| observed.contains(c.text.as_str()) && !c.excluded_by(&observed))
        {
            return matched(c, MatchKind::Contains);
        }

        let mut best: Option<(f64, &Candidate)> = None;
        for c in self.candidates.iter().filter(|c| !c.excluded_by(&observed)) {
            let score = self.scorer.score(&observed, &c.text);
            if score < self.threshold {
                continue;
            }
            let better = match best {
                None => true,
                Some((s, b)) => score > s || (score == s && c.len > b.len),
            };
            if better {
                best = Some((score, c));
            }
        }

        match best {
            Some((_, c)) => matched(c, MatchKind::Fuzzy),
            None => LabelMatch::NoMatch,
        }
    }

    /// Longest candidate satisfying `pred`; earlier entries win ties.
    fn longest(&self, pred: impl Fn(&Candidate) -> bool) -> Option<&Candidate> {
        let mut best: Option<&Candidate> = None;
        for c in self.candidates.iter().filter(|c| pred(c)) {
            if best.map_or(true, |b| c.len > b.len) {
                best = Some(c);
            }
        }
        best
    }
}

fn matched(c: &Candidate, kind: MatchKind) -> LabelMatch {
    LabelMatch::Matched {
        metric: c.metric,
        unit_class: c.unit_class,
        kind,
    }
}

/// Normalize a label for matching: width-folded, whitespace removed,
/// trailing unit annotation such as "(百万円)" dropped.
pub fn normalize_label(raw: &str) -> String {
    let compacted = compact(raw);
    let (head, _) = split_trailing_bracket(&compacted);
    head.to_string()
}
