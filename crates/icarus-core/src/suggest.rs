//! Work-type suggestion from free-text activity descriptions.
//!
//! The engine only depends on [`WorkTypeSuggester`]. [`KeywordSuggester`] is
//! the bundled heuristic: keyword tables per work type, optionally blended
//! with the work types of similar past sessions.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::category::WorkType;
use crate::record::Session;

const KEYWORD_SHARE: f64 = 0.7;
const HISTORY_SHARE: f64 = 0.3;
const HIGH_CONFIDENCE: f64 = 0.7;
const MEDIUM_CONFIDENCE: f64 = 0.5;
const CORRECTED_BOOST: f64 = 1.2;
const MISTAKEN_PENALTY: f64 = 0.8;

const DEEP_KEYWORDS: &[&str] = &[
    "code", "programming", "develop", "algorithm", "architecture", "design", "write", "draft",
    "create", "build", "implement", "solve", "debug", "analyze", "research", "plan", "strategy",
    "prototype", "experiment", "think", "concentrate", "focus", "problem", "solution", "innovate",
    "invent", "compose", "author", "engineer", "calculate", "model",
];

const SHALLOW_KEYWORDS: &[&str] = &[
    "email", "meeting", "call", "chat", "review", "read", "browse", "organize", "clean",
    "update", "respond", "reply", "check", "schedule", "coordinate", "admin", "paperwork",
    "invoice", "report", "communicate", "discuss", "planning", "organizing", "scan", "skim",
    "quick", "routine", "daily", "check-in", "follow-up", "checking", "scheduling",
    "coordinating", "emailing", "meetings", "calls", "chats", "reviews", "reading", "browsing",
];

const MAINTENANCE_KEYWORDS: &[&str] = &[
    "fix", "patch", "update", "upgrade", "maintain", "cleanup", "refactor", "optimize", "tune",
    "configure", "setup", "install", "backup", "restore", "monitor", "test", "verify", "document",
    "improve", "enhance", "adjust", "correct", "repair", "troubleshoot", "debugging", "polish",
    "finalize", "complete", "finish",
];

/// Work types the keyword tables can suggest, in tie-breaking order.
const SUGGESTABLE: [WorkType; 3] = [WorkType::Deep, WorkType::Shallow, WorkType::Maintenance];

/// How sure a suggester is about its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    fn from_score(score: f64) -> Self {
        if score >= HIGH_CONFIDENCE {
            Self::High
        } else if score >= MEDIUM_CONFIDENCE {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// A suggested work type with its reasoning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub work_type: WorkType,
    pub confidence: Confidence,
    /// Between 0 and 1.
    pub score: f64,
    pub reasons: Vec<String>,
}

/// Suggests a work type for an activity description.
pub trait WorkTypeSuggester {
    fn suggest(&self, text: &str) -> Suggestion;
}

/// Keyword-table suggester that can learn from corrections.
#[derive(Debug, Clone)]
pub struct KeywordSuggester {
    weights: BTreeMap<WorkType, Vec<(&'static str, f64)>>,
    history: Vec<(BTreeSet<String>, WorkType)>,
}

impl Default for KeywordSuggester {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordSuggester {
    pub fn new() -> Self {
        let table = |keywords: &[&'static str]| -> Vec<(&'static str, f64)> {
            keywords.iter().map(|kw| (*kw, 1.0)).collect()
        };
        let weights = BTreeMap::from([
            (WorkType::Deep, table(DEEP_KEYWORDS)),
            (WorkType::Shallow, table(SHALLOW_KEYWORDS)),
            (WorkType::Maintenance, table(MAINTENANCE_KEYWORDS)),
        ]);
        Self {
            weights,
            history: Vec::new(),
        }
    }

    /// Blends future suggestions with the work types of these past sessions.
    #[must_use]
    pub fn with_history<'a>(mut self, sessions: impl IntoIterator<Item = &'a Session>) -> Self {
        self.history = sessions
            .into_iter()
            .map(|s| {
                (
                    words(&s.context.activity_description.to_lowercase()),
                    s.context.work_type,
                )
            })
            .filter(|(words, _)| !words.is_empty())
            .collect();
        self
    }

    /// Re-weights keywords in `text` after the operator replaced `suggested`
    /// with `corrected`.
    pub fn learn(&mut self, suggested: WorkType, corrected: WorkType, text: &str) {
        if suggested == corrected {
            return;
        }
        let text = text.to_lowercase();
        self.scale_matches(corrected, &text, CORRECTED_BOOST);
        self.scale_matches(suggested, &text, MISTAKEN_PENALTY);
    }

    fn scale_matches(&mut self, work_type: WorkType, text: &str, factor: f64) {
        if let Some(table) = self.weights.get_mut(&work_type) {
            for (keyword, weight) in table.iter_mut() {
                if text.contains(*keyword) {
                    *weight *= factor;
                }
            }
        }
    }

    fn matched(&self, work_type: WorkType, text: &str) -> Vec<&'static str> {
        self.weights
            .get(&work_type)
            .map(|table| {
                table
                    .iter()
                    .filter(|(keyword, _)| text.contains(*keyword))
                    .map(|(keyword, _)| *keyword)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn keyword_scores(&self, text: &str) -> [f64; 3] {
        let mut scores = SUGGESTABLE.map(|work_type| {
            self.weights.get(&work_type).map_or(0.0, |table| {
                table
                    .iter()
                    .filter(|(keyword, _)| text.contains(*keyword))
                    .map(|(_, weight)| weight)
                    .sum()
            })
        });
        let total: f64 = scores.iter().sum();
        if total > 0.0 {
            for score in &mut scores {
                *score /= total;
            }
        }
        scores
    }

    #[allow(clippy::cast_precision_loss)]
    fn blend_history(&self, scores: [f64; 3], text: &str) -> [f64; 3] {
        let current = words(text);
        let similar: Vec<WorkType> = self
            .history
            .iter()
            .filter(|(past, _)| !past.is_disjoint(&current))
            .map(|(_, work_type)| *work_type)
            .collect();
        if similar.is_empty() {
            return scores;
        }

        let total = similar.len() as f64;
        let mut blended = scores;
        for (score, work_type) in blended.iter_mut().zip(SUGGESTABLE) {
            let count = similar.iter().filter(|wt| **wt == work_type).count() as f64;
            *score = *score * KEYWORD_SHARE + count / total * HISTORY_SHARE;
        }
        blended
    }
}

impl WorkTypeSuggester for KeywordSuggester {
    #[allow(clippy::cast_possible_truncation)]
    fn suggest(&self, text: &str) -> Suggestion {
        let text = text.to_lowercase();
        let scores = self.blend_history(self.keyword_scores(&text), &text);

        // first highest wins ties
        let mut best = 0;
        for (i, score) in scores.iter().enumerate() {
            if *score > scores[best] {
                best = i;
            }
        }
        let score = scores[best];
        if score <= 0.0 {
            return Suggestion {
                work_type: WorkType::Unknown,
                confidence: Confidence::Low,
                score: 0.0,
                reasons: vec!["No keywords matched".to_string()],
            };
        }
        let work_type = SUGGESTABLE[best];

        let mut reasons = Vec::new();
        let matched = self.matched(work_type, &text);
        if !matched.is_empty() {
            let shown: Vec<&str> = matched.into_iter().take(3).collect();
            reasons.push(format!("Keywords matched: {}", shown.join(", ")));
        }
        reasons.push(format!("Confidence score: {}%", (score * 100.0) as i64));

        let runner_up = (0..scores.len())
            .filter(|i| *i != best)
            .fold(None, |acc: Option<usize>, i| match acc {
                Some(j) if scores[j] >= scores[i] => Some(j),
                _ => Some(i),
            });
        if let Some(next) = runner_up {
            let diff = ((score - scores[next]) * 100.0) as i64;
            if diff > 0 {
                reasons.push(format!("{diff}% higher than {}", SUGGESTABLE[next]));
            }
        }

        Suggestion {
            work_type,
            confidence: Confidence::from_score(score),
            score,
            reasons,
        }
    }
}

fn words(text: &str) -> BTreeSet<String> {
    text.split_whitespace().map(str::to_string).collect()
}
