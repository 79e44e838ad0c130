use crate::core::consolidate::{consolidate, singletons, ConsolidatedBuyer};
use crate::core::filters::{normalize_status, BuyerEligibilityFilter, FilterConfig};
use crate::models::{Buyer, Candidate, Coordinates, PropertyTarget};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Default cap of the candidate list screen
pub const DEFAULT_CANDIDATE_LIMIT: usize = 50;

/// The two call sites of the matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchVariant {
    /// Narrow list shown next to a property, one row per raw record
    CandidateList { limit: usize },
    /// Mailing recipients, consolidated by email and uncapped
    Distribution,
}

impl Default for MatchVariant {
    fn default() -> Self {
        MatchVariant::CandidateList {
            limit: DEFAULT_CANDIDATE_LIMIT,
        }
    }
}

impl MatchVariant {
    pub fn filter_config(&self) -> FilterConfig {
        match self {
            MatchVariant::CandidateList { .. } => FilterConfig::candidate_list(),
            MatchVariant::Distribution => FilterConfig::distribution(),
        }
    }

    pub fn consolidates(&self) -> bool {
        matches!(self, MatchVariant::Distribution)
    }

    pub fn cap(&self) -> Option<usize> {
        match self {
            MatchVariant::CandidateList { limit } => Some(*limit),
            MatchVariant::Distribution => None,
        }
    }
}

/// Ranked buyers that passed every gate
#[derive(Debug, Clone, Default)]
pub struct CandidateList {
    pub candidates: Vec<Candidate>,
    /// Number of passing buyers before the cap was applied
    pub total: usize,
}

impl CandidateList {
    /// Unique normalized emails in rank order, blanks skipped
    pub fn emails(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.candidates
            .iter()
            .map(|c| c.buyer.normalized_email())
            .filter(|email| !email.is_empty() && seen.insert(email.clone()))
            .collect()
    }
}

/// Pure ranking half of candidate aggregation
///
/// # Pipeline Stages
/// 1. Drop soft-deleted records
/// 2. Consolidate by email (distribution only)
/// 3. Seven-gate eligibility check
/// 4. Sort and cap
#[derive(Debug, Clone)]
pub struct Matcher {
    variant: MatchVariant,
    filter: BuyerEligibilityFilter,
}

impl Matcher {
    pub fn new(variant: MatchVariant, config: FilterConfig) -> Self {
        Self {
            variant,
            filter: BuyerEligibilityFilter::new(config),
        }
    }

    /// Matcher using the preset filter of the variant
    pub fn for_variant(variant: MatchVariant) -> Self {
        Self::new(variant, variant.filter_config())
    }

    pub fn variant(&self) -> MatchVariant {
        self.variant
    }

    pub fn filter_config(&self) -> &FilterConfig {
        self.filter.config()
    }

    /// Evaluate the pool against one property.
    ///
    /// `inquired` maps property numbers to coordinates for the distance
    /// check; pass an empty map when distance matching is off.
    pub fn find_candidates(
        &self,
        pool: &[Buyer],
        target: &PropertyTarget,
        inquired: &HashMap<String, Coordinates>,
    ) -> CandidateList {
        // Stage 1
        let live = pool.iter().filter(|b| !b.is_deleted());

        // Stage 2
        let groups = if self.variant.consolidates() {
            consolidate(live)
        } else {
            singletons(live)
        };
        let evaluated = groups.len();

        // Stage 3
        let mut passed: Vec<(Candidate, Option<char>)> = groups
            .into_iter()
            .filter_map(|group| self.evaluate_group(group, target, inquired))
            .collect();

        // Stage 4
        passed.sort_by(|(a, grade_a), (b, grade_b)| rank_order(a, *grade_a, b, *grade_b));
        let total = passed.len();
        let mut candidates: Vec<Candidate> = passed.into_iter().map(|(c, _)| c).collect();
        if let Some(cap) = self.variant.cap() {
            candidates.truncate(cap);
        }

        tracing::debug!(
            "Property {}: {} of {} buyers passed, returning {}",
            target.property_number,
            total,
            evaluated,
            candidates.len()
        );

        CandidateList { candidates, total }
    }

    fn evaluate_group(
        &self,
        group: ConsolidatedBuyer,
        target: &PropertyTarget,
        inquired: &HashMap<String, Coordinates>,
    ) -> Option<(Candidate, Option<char>)> {
        let mut criteria = group.criteria;
        criteria.inquired_coordinates = criteria
            .inquired_property_numbers
            .iter()
            .filter_map(|n| inquired.get(n).copied())
            .collect();

        let result = self.filter.evaluate(&criteria, target);
        if !result.passed {
            tracing::trace!(
                "Buyer {} excluded at {:?}",
                result.buyer_number,
                result.failed_gate
            );
            return None;
        }

        let grade = grade_of(&criteria.status);
        Some((
            Candidate {
                buyer: group.representative,
                merged_buyer_numbers: group.buyer_numbers.into_iter().collect(),
                matched_zones: result.matched_zones,
                distance_km: result.distance_km,
            },
            grade,
        ))
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::for_variant(MatchVariant::default())
    }
}

/// Confidence grade: first ASCII capital in the normalized status
fn grade_of(status: &str) -> Option<char> {
    normalize_status(status)
        .chars()
        .find(|c| c.is_ascii_uppercase())
}

/// Newest reception first, then better grade, then buyer number.
/// Missing dates and grades sort last.
fn rank_order(a: &Candidate, grade_a: Option<char>, b: &Candidate, grade_b: Option<char>) -> Ordering {
    b.buyer
        .reception_date
        .cmp(&a.buyer.reception_date)
        .then_with(|| (grade_a.is_none(), grade_a).cmp(&(grade_b.is_none(), grade_b)))
        .then_with(|| a.buyer.buyer_number.cmp(&b.buyer.buyer_number))
}
