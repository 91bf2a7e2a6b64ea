//! Energy ledger: which domains give energy and which take it.

use std::collections::BTreeMap;

use crate::category::Domain;
use crate::record::Session;
use crate::summary::Mean;

/// Mean `energy_after - energy_before` per domain over rated sessions.
///
/// Domains without a rated session are absent rather than reported as zero.
pub fn energy_ledger<'a>(sessions: impl IntoIterator<Item = &'a Session>) -> BTreeMap<Domain, f64> {
    let mut deltas: BTreeMap<Domain, Mean> = BTreeMap::new();
    for session in sessions {
        if let Some(delta) = session.energy_delta() {
            deltas
                .entry(session.context.domain)
                .or_default()
                .push(f64::from(delta));
        }
    }
    deltas
        .into_iter()
        .filter_map(|(domain, mean)| mean.value().map(|value| (domain, value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::WorkType;
    use crate::record::fixtures::*;
    use crate::types::Level;

    #[test]
    fn ledger_is_signed_mean_per_domain() {
        let mut draining = rated(at(3, 9, 0), 60, Domain::Admin, WorkType::Shallow, (3, 3, 3));
        draining.end.as_mut().unwrap().after.energy = Level::new(2).unwrap();
        let sessions = vec![
            // +1 each (5 -> 6)
            rated(at(3, 11, 0), 60, Domain::Health, WorkType::Recovery, (3, 3, 3)),
            rated(at(4, 11, 0), 60, Domain::Health, WorkType::Recovery, (3, 3, 3)),
            draining,
            rated(at(4, 14, 0), 60, Domain::Admin, WorkType::Shallow, (3, 3, 3)),
        ];
        let ledger = energy_ledger(&sessions);
        assert_eq!(ledger[&Domain::Health], 1.0);
        // (-3 + 1) / 2
        assert_eq!(ledger[&Domain::Admin], -1.0);
    }

    #[test]
    fn domains_without_rated_sessions_are_absent() {
        let sessions = vec![active(at(3, 9, 0), WorkType::Deep)];
        let ledger = energy_ledger(&sessions);
        assert!(ledger.is_empty());
        assert!(ledger.values().all(|v| v.is_finite()));
    }
}
