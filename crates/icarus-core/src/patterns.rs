//! Session-pattern classification ("Session DNA").
//!
//! Each rated session lands in exactly one [`Pattern`]. Rules are checked in
//! a fixed order and the first match wins:
//!
//! 1. Maintenance: the work type is a maintenance type, or the session did
//!    not move the main goal and belongs to an administrative domain.
//! 2. High progress: Overclocked when the session ended with negative affect
//!    (a negative feel tag or a large energy drop), otherwise Clean Win when
//!    focus was high too.
//! 3. High focus without high progress: Grind.
//! 4. Anything else: Drift.
//!
//! Every threshold comes from [`PatternPolicy`], which is loaded from
//! configuration.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::category::{Domain, WorkType};
use crate::record::Session;

/// Named outcome pattern of a rated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pattern {
    #[serde(rename = "Clean Win")]
    CleanWin,
    Overclocked,
    Maintenance,
    Grind,
    Drift,
}

impl Pattern {
    pub const ALL: &'static [Self] = &[
        Self::CleanWin,
        Self::Overclocked,
        Self::Maintenance,
        Self::Grind,
        Self::Drift,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::CleanWin => "Clean Win",
            Self::Overclocked => "Overclocked",
            Self::Maintenance => "Maintenance",
            Self::Grind => "Grind",
            Self::Drift => "Drift",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Thresholds for [`classify`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternPolicy {
    /// Progress rating at or above which a session counts as high progress.
    pub high_progress: u8,
    /// Focus rating at or above which a session counts as high focus.
    pub high_focus: u8,
    /// Minimum focus for a high-progress session to be a Clean Win. Defaults
    /// to the high-focus threshold.
    pub clean_win_min_focus: u8,
    /// Energy delta at or below which a session counts as draining.
    pub drain_threshold: i32,
    /// Feel-tag fragments that mark negative affect (case-insensitive).
    pub negative_feel_tags: Vec<String>,
    /// Work types that are always Maintenance.
    pub maintenance_work_types: Vec<WorkType>,
    /// Domains where a session that does not move the main goal is Maintenance.
    pub maintenance_domains: Vec<Domain>,
}

impl Default for PatternPolicy {
    fn default() -> Self {
        Self {
            high_progress: 4,
            high_focus: 4,
            clean_win_min_focus: 4,
            drain_threshold: -2,
            negative_feel_tags: ["drained", "anxious", "tired", "wired", "frustrated", "stress"]
                .into_iter()
                .map(String::from)
                .collect(),
            maintenance_work_types: vec![WorkType::Maintenance],
            maintenance_domains: vec![Domain::Admin],
        }
    }
}

impl PatternPolicy {
    fn has_negative_affect(&self, session: &Session) -> bool {
        let feel = session
            .after()
            .map(|after| after.feel_tag.to_lowercase())
            .unwrap_or_default();
        let negative_tag = self
            .negative_feel_tags
            .iter()
            .any(|tag| !tag.is_empty() && feel.contains(&tag.to_lowercase()));
        let drained = session
            .energy_delta()
            .is_some_and(|delta| delta <= self.drain_threshold);
        negative_tag || drained
    }
}

/// Classifies one session. Returns `None` for sessions without an outcome.
pub fn classify(session: &Session, policy: &PatternPolicy) -> Option<Pattern> {
    let outcome = session.outcome()?;
    let context = &session.context;

    let maintenance_type = policy.maintenance_work_types.contains(&context.work_type);
    let admin_side_quest =
        !outcome.moves_main_goal && policy.maintenance_domains.contains(&context.domain);
    if maintenance_type || admin_side_quest {
        return Some(Pattern::Maintenance);
    }

    let progress = outcome.progress_rating.get();
    let focus = outcome.focus_quality.get();

    if progress >= policy.high_progress {
        if policy.has_negative_affect(session) {
            return Some(Pattern::Overclocked);
        }
        if focus >= policy.clean_win_min_focus {
            return Some(Pattern::CleanWin);
        }
    }
    if focus >= policy.high_focus {
        return Some(Pattern::Grind);
    }
    Some(Pattern::Drift)
}

/// Counts rated sessions per pattern. Every pattern is present, zero or not.
pub fn pattern_counts<'a>(
    sessions: impl IntoIterator<Item = &'a Session>,
    policy: &PatternPolicy,
) -> BTreeMap<Pattern, u32> {
    let mut counts: BTreeMap<Pattern, u32> = Pattern::ALL.iter().map(|p| (*p, 0)).collect();
    for pattern in sessions.into_iter().filter_map(|s| classify(s, policy)) {
        *counts.entry(pattern).or_insert(0) += 1;
    }
    counts
}
