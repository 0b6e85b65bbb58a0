//! Stochastic class-transition routing.
//!
//! The table is a pure function of `(stage, damage class)`. Multi-candidate
//! outcomes are resolved with the sequential-trial policy: candidates are
//! evaluated in declared order, each guarded by an independent Bernoulli
//! trial; the first success selects that candidate, and the last-declared
//! candidate is the unconditional fallback. Realized frequencies therefore
//! compound across prior failures; the declared order and per-candidate
//! probabilities are part of the behavioral contract and must not be replaced
//! by a single partitioned draw.

use bodyshop_core::TrialSource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::trace;

use crate::item::{DamageClass, Stage};

/// One routing candidate: a stage guarded by a trial probability.
///
/// The last candidate in a declared list acts as the fallback; its
/// probability is still trialed but a failure falls through to itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub stage: Stage,
    pub probability: f64,
}

impl Candidate {
    pub fn new(stage: Stage, probability: f64) -> Self {
        Self { stage, probability }
    }
}

/// Resolution of one `(stage, damage class)` lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Forward to one of these stages, selected by sequential trials.
    Route(Vec<Candidate>),
    /// Fully repaired; leaves the live set.
    Completed,
    /// Terminal without repair (intake destruction path).
    Destroyed,
    /// Arrived already intact; terminal without repair.
    NoActionNeeded,
}

#[derive(Debug, Error, PartialEq)]
pub enum RoutingError {
    #[error("no routing rule for stage `{stage}` with class `{class}`")]
    MissingRule { stage: Stage, class: DamageClass },

    #[error("empty candidate list for stage `{stage}` with class `{class}`")]
    EmptyCandidates { stage: Stage, class: DamageClass },

    #[error(
        "candidate probability {value} for stage `{stage}` with class `{class}` is outside [0, 1]"
    )]
    InvalidProbability {
        stage: Stage,
        class: DamageClass,
        value: f64,
    },

    #[error("rule for stage `{stage}` with class `{class}` routes back to intake")]
    RoutesToIntake { stage: Stage, class: DamageClass },

    #[error("rule for stage `{stage}` forwards intact items, which have no work left")]
    RoutesIntactOnward { stage: Stage },
}

/// Immutable routing table, validated at construction.
///
/// Validation requires a rule for every lookup the network can perform: the
/// gate consults `(Intake, class)` for all four classes, and a worker at any
/// repair stage consults `(stage, class)` for every post-repair class. A hole
/// in that space is a startup error, never a runtime surprise.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    rules: HashMap<(Stage, DamageClass), Outcome>,
}

impl RoutingTable {
    pub fn new(
        rules: HashMap<(Stage, DamageClass), Outcome>,
    ) -> Result<Self, RoutingError> {
        for (&(stage, class), outcome) in &rules {
            if let Outcome::Route(candidates) = outcome {
                // An intact item has an empty duration stack; forwarding it
                // would hand a worker nothing to repair.
                if class == DamageClass::Intact {
                    return Err(RoutingError::RoutesIntactOnward { stage });
                }
                if candidates.is_empty() {
                    return Err(RoutingError::EmptyCandidates { stage, class });
                }
                for candidate in candidates {
                    if !(0.0..=1.0).contains(&candidate.probability)
                        || candidate.probability.is_nan()
                    {
                        return Err(RoutingError::InvalidProbability {
                            stage,
                            class,
                            value: candidate.probability,
                        });
                    }
                    if candidate.stage == Stage::Intake {
                        return Err(RoutingError::RoutesToIntake { stage, class });
                    }
                }
            }
        }

        // Totality over every consultable (stage, class) pair.
        for class in DamageClass::ALL {
            if !rules.contains_key(&(Stage::Intake, class)) {
                return Err(RoutingError::MissingRule {
                    stage: Stage::Intake,
                    class,
                });
            }
        }
        for stage in Stage::REPAIR_STAGES {
            for class in [DamageClass::Moderate, DamageClass::Light, DamageClass::Intact] {
                if !rules.contains_key(&(stage, class)) {
                    return Err(RoutingError::MissingRule { stage, class });
                }
            }
        }

        Ok(Self { rules })
    }

    /// Look up the outcome for `(stage, class)`.
    ///
    /// # Panics
    ///
    /// Panics on a missing rule; construction validated totality, so a miss
    /// here is an internal defect.
    pub fn resolve(&self, stage: Stage, class: DamageClass) -> &Outcome {
        self.rules
            .get(&(stage, class))
            .unwrap_or_else(|| panic!("validated table has no rule for ({stage}, {class})"))
    }

    /// Sequential-trial candidate selection.
    ///
    /// Evaluates `candidates` in declared order; the first successful trial
    /// selects that candidate, and the final candidate is chosen when every
    /// trial fails.
    pub fn select(candidates: &[Candidate], trials: &mut dyn TrialSource) -> Stage {
        let (last, leading) = candidates
            .split_last()
            .expect("validated candidate list is non-empty");
        for candidate in leading {
            if trials.bernoulli("routing-candidate", candidate.probability) {
                trace!(stage = %candidate.stage, "sequential trial selected candidate");
                return candidate.stage;
            }
        }
        if !trials.bernoulli("routing-candidate", last.probability) {
            trace!(stage = %last.stage, "all trials failed, taking declared fallback");
        }
        last.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bodyshop_core::ForcedTrials;

    fn rule_map() -> HashMap<(Stage, DamageClass), Outcome> {
        let mut rules = HashMap::new();
        rules.insert(
            (Stage::Intake, DamageClass::Severe),
            Outcome::Route(vec![Candidate::new(Stage::Bodywork, 1.0)]),
        );
        rules.insert(
            (Stage::Intake, DamageClass::Moderate),
            Outcome::Route(vec![
                Candidate::new(Stage::Electrical, 0.5),
                Candidate::new(Stage::Bodywork, 1.0),
            ]),
        );
        rules.insert(
            (Stage::Intake, DamageClass::Light),
            Outcome::Route(vec![Candidate::new(Stage::Tires, 1.0)]),
        );
        rules.insert((Stage::Intake, DamageClass::Intact), Outcome::NoActionNeeded);
        for stage in Stage::REPAIR_STAGES {
            rules.insert(
                (stage, DamageClass::Moderate),
                Outcome::Route(vec![Candidate::new(Stage::Electrical, 1.0)]),
            );
            rules.insert(
                (stage, DamageClass::Light),
                Outcome::Route(vec![Candidate::new(Stage::Upholstery, 1.0)]),
            );
            rules.insert((stage, DamageClass::Intact), Outcome::Completed);
        }
        rules
    }

    #[test]
    fn valid_table_builds_and_resolves() {
        let table = RoutingTable::new(rule_map()).unwrap();
        assert_eq!(
            table.resolve(Stage::Bodywork, DamageClass::Intact),
            &Outcome::Completed
        );
        assert_eq!(
            table.resolve(Stage::Intake, DamageClass::Intact),
            &Outcome::NoActionNeeded
        );
    }

    #[test]
    fn missing_rule_fails_fast() {
        let mut rules = rule_map();
        rules.remove(&(Stage::Paint, DamageClass::Light));
        assert_eq!(
            RoutingTable::new(rules).unwrap_err(),
            RoutingError::MissingRule {
                stage: Stage::Paint,
                class: DamageClass::Light
            }
        );
    }

    #[test]
    fn empty_candidates_fail_fast() {
        let mut rules = rule_map();
        rules.insert((Stage::Intake, DamageClass::Light), Outcome::Route(vec![]));
        assert!(matches!(
            RoutingTable::new(rules),
            Err(RoutingError::EmptyCandidates { .. })
        ));
    }

    #[test]
    fn out_of_range_probability_fails_fast() {
        let mut rules = rule_map();
        rules.insert(
            (Stage::Intake, DamageClass::Light),
            Outcome::Route(vec![Candidate::new(Stage::Tires, 1.5)]),
        );
        assert!(matches!(
            RoutingTable::new(rules),
            Err(RoutingError::InvalidProbability { value, .. }) if value == 1.5
        ));
    }

    #[test]
    fn routing_back_to_intake_fails_fast() {
        let mut rules = rule_map();
        rules.insert(
            (Stage::Bodywork, DamageClass::Light),
            Outcome::Route(vec![Candidate::new(Stage::Intake, 1.0)]),
        );
        assert!(matches!(
            RoutingTable::new(rules),
            Err(RoutingError::RoutesToIntake { .. })
        ));
    }

    #[test]
    fn forwarding_intact_items_fails_fast() {
        let mut rules = rule_map();
        rules.insert(
            (Stage::Paint, DamageClass::Intact),
            Outcome::Route(vec![Candidate::new(Stage::Tires, 1.0)]),
        );
        assert_eq!(
            RoutingTable::new(rules).unwrap_err(),
            RoutingError::RoutesIntactOnward { stage: Stage::Paint }
        );
    }

    #[test]
    fn first_successful_trial_wins() {
        let candidates = vec![
            Candidate::new(Stage::Paint, 0.3),
            Candidate::new(Stage::Tires, 0.3),
            Candidate::new(Stage::Upholstery, 1.0),
        ];
        let mut trials = ForcedTrials::new([false, true], false);
        assert_eq!(
            RoutingTable::select(&candidates, &mut trials),
            Stage::Tires
        );
    }

    #[test]
    fn all_failures_take_declared_fallback() {
        let candidates = vec![
            Candidate::new(Stage::Paint, 0.9),
            Candidate::new(Stage::Tires, 0.9),
            Candidate::new(Stage::Upholstery, 0.9),
        ];
        let mut trials = ForcedTrials::never();
        assert_eq!(
            RoutingTable::select(&candidates, &mut trials),
            Stage::Upholstery
        );
    }

    #[test]
    fn trial_order_matches_declaration_order() {
        // A success on the very first trial must pick the first candidate
        // even when later candidates carry higher probabilities.
        let candidates = vec![
            Candidate::new(Stage::Paint, 0.01),
            Candidate::new(Stage::Tires, 0.99),
        ];
        let mut trials = ForcedTrials::new([true], false);
        assert_eq!(
            RoutingTable::select(&candidates, &mut trials),
            Stage::Paint
        );
    }

    #[test]
    fn single_candidate_is_the_fallback() {
        let candidates = vec![Candidate::new(Stage::Bodywork, 0.0)];
        let mut trials = ForcedTrials::never();
        assert_eq!(
            RoutingTable::select(&candidates, &mut trials),
            Stage::Bodywork
        );
    }
}
