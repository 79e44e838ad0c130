use crate::core::{distance, price, property_type};
use crate::models::{
    Buyer, BuyerCriteria, Gate, MatchResult, PriceRanges, PropertyKind,
    PropertyTarget, TypePreference, ZoneCode,
};
use std::collections::BTreeSet;

/// Tokens marking an inquiry that came from another broker
pub const BROKER_TOKENS: &[&str] = &["業者問合せ", "業者問い合わせ"];

/// Distribution flag meaning "send to this buyer"
pub const FLAG_REQUIRED: &str = "要";
pub const FLAG_MAIL: &str = "メール";
pub const FLAG_LINE_MAIL: &str = "LINE→メール";
pub const FLAG_WISHES: &str = "希望";

/// Status fragments that end a buyer's search
pub const STATUS_OFFER: &str = "買付";
pub const GRADE_DROPPED: &str = "D";
pub const STATUS_UNKNOWN: &str = "不明";

/// Parameters separating the candidate-list and distribution call sites
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    /// Accepted distribution flags (exact, after trimming)
    pub distribution_tokens: BTreeSet<String>,
    /// If set, the status must contain at least one of these
    pub status_must_include: Option<BTreeSet<String>>,
    pub enable_distance_match: bool,
    pub distance_radius_km: f64,
}

impl FilterConfig {
    /// Narrow filter behind the candidate list screen
    pub fn candidate_list() -> Self {
        Self {
            distribution_tokens: [FLAG_REQUIRED].iter().map(|s| s.to_string()).collect(),
            status_must_include: Some(
                ["A", "B", "C", STATUS_UNKNOWN].iter().map(|s| s.to_string()).collect(),
            ),
            enable_distance_match: false,
            distance_radius_km: distance::DEFAULT_RADIUS_KM,
        }
    }

    /// Wider filter used to pick recipients of a property mailing
    pub fn distribution() -> Self {
        Self {
            distribution_tokens: [FLAG_REQUIRED, FLAG_MAIL, FLAG_LINE_MAIL, FLAG_WISHES]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            status_must_include: None,
            enable_distance_match: false,
            distance_radius_km: distance::DEFAULT_RADIUS_KM,
        }
    }

    pub fn with_distance_match(mut self, enabled: bool, radius_km: f64) -> Self {
        self.enable_distance_match = enabled;
        self.distance_radius_km = radius_km;
        self
    }
}

impl From<&Buyer> for BuyerCriteria {
    fn from(buyer: &Buyer) -> Self {
        let non_empty = |s: &str| -> BTreeSet<String> {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                BTreeSet::new()
            } else {
                [trimmed.to_string()].into()
            }
        };

        BuyerCriteria {
            buyer_number: buyer.buyer_number.clone(),
            area_specified: !buyer.desired_area.trim().is_empty(),
            zone_codes: ZoneCode::extract_all(&buyer.desired_area),
            type_preference: type_preference(&buyer.desired_property_type),
            price_ranges: PriceRanges {
                house: non_empty(&buyer.price_range_house),
                apartment: non_empty(&buyer.price_range_apartment),
                land: non_empty(&buyer.price_range_land),
            },
            status: buyer.latest_status.trim().to_string(),
            distribution_flag: buyer.distribution_type.trim().to_string(),
            distribution_flags: non_empty(&buyer.distribution_type),
            inquiry_sources: non_empty(&buyer.inquiry_source),
            broker_markers: non_empty(&buyer.broker_inquiry),
            inquired_property_numbers: non_empty(
                buyer.inquired_property_number.as_deref().unwrap_or_default(),
            ),
            inquired_coordinates: Vec::new(),
        }
    }
}

/// Interpret a desired-type field
pub fn type_preference(text: &str) -> TypePreference {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return TypePreference::Unspecified;
    }
    if trimmed == property_type::NO_PREFERENCE {
        return TypePreference::NoPreference;
    }
    let types: BTreeSet<String> = property_type::split_desired(trimmed)
        .map(property_type::normalize)
        .filter(|t| !t.is_empty())
        .collect();
    if types.is_empty() {
        TypePreference::Unspecified
    } else {
        TypePreference::Types(types)
    }
}

/// Fold fullwidth Latin letters (Ａ-Ｚ) so grades compare as ASCII
pub fn normalize_status(status: &str) -> String {
    status
        .trim()
        .chars()
        .map(|c| match c {
            'Ａ'..='Ｚ' => char::from_u32(c as u32 - 'Ａ' as u32 + 'A' as u32).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// A broker marker counts unless blank, "0" or "false"
fn is_truthy_marker(marker: &str) -> bool {
    let m = marker.trim();
    !(m.is_empty() || m == "0" || m.eq_ignore_ascii_case("false"))
}

fn mentions_broker(text: &str) -> bool {
    BROKER_TOKENS.iter().any(|token| text.contains(token))
}

/// Seven-gate eligibility check of a buyer against a property
#[derive(Debug, Clone)]
pub struct BuyerEligibilityFilter {
    config: FilterConfig,
}

impl BuyerEligibilityFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Evaluate gates in order, stopping at the first failure.
    ///
    /// Pure: the result depends only on the two arguments and the config.
    pub fn evaluate(&self, buyer: &BuyerCriteria, target: &PropertyTarget) -> MatchResult {
        let mut result = MatchResult::pending(&buyer.buyer_number);

        if !result.record(Gate::Broker, self.passes_broker(buyer))
            || !result.record(Gate::MinimumCriteria, passes_minimum_criteria(buyer))
            || !result.record(Gate::Distribution, self.passes_distribution(buyer))
            || !result.record(Gate::Status, self.passes_status(buyer))
        {
            return result;
        }

        let (geography, matched_zones, distance_km) = self.passes_geography(buyer, target);
        result.matched_zones = matched_zones;
        result.distance_km = distance_km;
        if !result.record(Gate::Geography, geography)
            || !result.record(Gate::PropertyType, passes_property_type(buyer, target))
            || !result.record(Gate::Price, passes_price(buyer, target))
        {
            return result;
        }

        result.passed = true;
        result
    }

    /// Gate 1: broker inquiries never become candidates
    fn passes_broker(&self, buyer: &BuyerCriteria) -> bool {
        let flagged = buyer.inquiry_sources.iter().any(|s| mentions_broker(s))
            || buyer.distribution_flags.iter().any(|s| mentions_broker(s))
            || buyer.broker_markers.iter().any(|m| is_truthy_marker(m));
        !flagged
    }

    /// Gate 3
    fn passes_distribution(&self, buyer: &BuyerCriteria) -> bool {
        self.config
            .distribution_tokens
            .contains(buyer.distribution_flag.trim())
    }

    /// Gate 4: no offer made, not dropped, and (if configured) a live grade
    fn passes_status(&self, buyer: &BuyerCriteria) -> bool {
        let status = normalize_status(&buyer.status);
        if status.is_empty() || status.contains(STATUS_OFFER) || status.contains(GRADE_DROPPED) {
            return false;
        }
        match &self.config.status_must_include {
            Some(required) => required.iter().any(|token| status.contains(token.as_str())),
            None => true,
        }
    }

    /// Gate 5: blank area, shared zone, or (optionally) a nearby earlier inquiry.
    /// Also returns the shared zones and the measured distance, if any.
    fn passes_geography(
        &self,
        buyer: &BuyerCriteria,
        target: &PropertyTarget,
    ) -> (bool, Vec<ZoneCode>, Option<f64>) {
        if !buyer.area_specified {
            return (true, Vec::new(), None);
        }

        let shared: Vec<ZoneCode> = buyer
            .zone_codes
            .intersection(&target.zone_codes)
            .copied()
            .collect();
        if !shared.is_empty() {
            return (true, shared, None);
        }

        if self.config.enable_distance_match {
            let nearest = buyer
                .inquired_coordinates
                .iter()
                .filter_map(|c| distance::distance_if_known(Some(*c), target.coordinates))
                .min_by(|a, b| a.total_cmp(b));
            if let Some(d) = nearest {
                return (d <= self.config.distance_radius_km, shared, Some(d));
            }
        }
        (false, shared, None)
    }
}

/// Gate 2: a buyer with neither area nor type gives nothing to match on
fn passes_minimum_criteria(buyer: &BuyerCriteria) -> bool {
    buyer.area_specified || buyer.type_preference != TypePreference::Unspecified
}

/// Gate 6
fn passes_property_type(buyer: &BuyerCriteria, target: &PropertyTarget) -> bool {
    match &buyer.type_preference {
        TypePreference::NoPreference => true,
        TypePreference::Unspecified => false,
        TypePreference::Types(types) => types
            .iter()
            .any(|t| property_type::types_match(t, &target.property_type)),
    }
}

/// Gate 7: only a parsed range that excludes the price fails
fn passes_price(buyer: &BuyerCriteria, target: &PropertyTarget) -> bool {
    let Some(asking) = target.price else {
        return true;
    };
    let Some(ranges) = buyer.price_ranges.for_kind(target.kind) else {
        return true;
    };
    if ranges.is_empty() {
        return true;
    }
    ranges.iter().any(|text| price::parse(text).admits(asking))
}

impl PropertyTarget {
    /// Build the matching view of a property from its resolved zone codes
    pub fn new(
        property: &crate::models::Property,
        zone_codes: BTreeSet<ZoneCode>,
        coordinates: Option<crate::models::Coordinates>,
    ) -> Self {
        let normalized = property_type::normalize(&property.property_type);
        Self {
            property_number: property.property_number.clone(),
            zone_codes,
            kind: PropertyKind::of(&normalized),
            property_type: normalized,
            price: property.price,
            coordinates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinates, Property};

    fn create_test_buyer() -> Buyer {
        Buyer {
            buyer_number: "B001".to_string(),
            email: "buyer@example.com".to_string(),
            desired_area: "①中心部希望".to_string(),
            desired_property_type: "戸建".to_string(),
            price_range_house: "1000万円〜2000万円".to_string(),
            latest_status: "A:1ヶ月以内".to_string(),
            distribution_type: "要".to_string(),
            inquiry_source: "SUUMO".to_string(),
            ..Buyer::default()
        }
    }

    fn create_test_target() -> PropertyTarget {
        let property = Property {
            property_number: "AA100".to_string(),
            address: "大分市中央町1丁目".to_string(),
            property_type: "中古戸建て".to_string(),
            price: Some(18_000_000),
            ..Property::default()
        };
        PropertyTarget::new(
            &property,
            [ZoneCode::circled(1), ZoneCode::circled(40)].into(),
            None,
        )
    }

    fn evaluate(buyer: &Buyer, config: FilterConfig) -> MatchResult {
        BuyerEligibilityFilter::new(config).evaluate(&buyer.into(), &create_test_target())
    }

    #[test]
    fn test_matching_buyer_passes_every_gate() {
        let result = evaluate(&create_test_buyer(), FilterConfig::candidate_list());
        assert!(result.passed);
        assert_eq!(result.failed_gate, None);
        assert_eq!(result.matched_zones, vec![ZoneCode::circled(1)]);
        assert_eq!(result.gates.price, Some(true));
    }

    #[test]
    fn test_broker_source_excluded() {
        let mut buyer = create_test_buyer();
        buyer.inquiry_source = "業者問合せ（〇〇不動産）".to_string();
        let result = evaluate(&buyer, FilterConfig::candidate_list());
        assert_eq!(result.failed_gate, Some(Gate::Broker));
        assert_eq!(result.gates.status, None);
    }

    #[test]
    fn test_broker_marker_values() {
        for (marker, excluded) in [("1", true), ("済", true), ("0", false), ("FALSE", false), (" ", false)] {
            let mut buyer = create_test_buyer();
            buyer.broker_inquiry = marker.to_string();
            let result = evaluate(&buyer, FilterConfig::candidate_list());
            assert_eq!(!result.passed, excluded, "marker {:?}", marker);
        }
    }

    #[test]
    fn test_minimum_criteria() {
        let mut buyer = create_test_buyer();
        buyer.desired_area = " ".to_string();
        buyer.desired_property_type = "".to_string();
        let result = evaluate(&buyer, FilterConfig::candidate_list());
        assert_eq!(result.failed_gate, Some(Gate::MinimumCriteria));
    }

    #[test]
    fn test_distribution_tokens_differ_by_variant() {
        let mut buyer = create_test_buyer();
        buyer.distribution_type = "メール".to_string();
        assert_eq!(
            evaluate(&buyer, FilterConfig::candidate_list()).failed_gate,
            Some(Gate::Distribution)
        );
        assert!(evaluate(&buyer, FilterConfig::distribution()).passed);

        buyer.distribution_type = "不要".to_string();
        assert!(!evaluate(&buyer, FilterConfig::distribution()).passed);
    }

    #[test]
    fn test_status_gate() {
        let cases = [
            ("A:1ヶ月以内", true, true),
            ("Ｂ", true, true),
            ("不明", true, true),
            ("買付提出済", false, false),
            ("D:他決", false, false),
            ("E:様子見", false, true),
            ("", false, false),
        ];
        for (status, narrow, wide) in cases {
            let mut buyer = create_test_buyer();
            buyer.latest_status = status.to_string();
            assert_eq!(evaluate(&buyer, FilterConfig::candidate_list()).passed, narrow, "{status}");
            assert_eq!(evaluate(&buyer, FilterConfig::distribution()).passed, wide, "{status}");
        }
    }

    #[test]
    fn test_geography_gate() {
        let mut buyer = create_test_buyer();
        buyer.desired_area = "⑤⑦西部".to_string();
        let result = evaluate(&buyer, FilterConfig::candidate_list());
        assert_eq!(result.failed_gate, Some(Gate::Geography));

        // Prose without glyphs is still a stated area
        buyer.desired_area = "大分駅の近く".to_string();
        assert_eq!(
            evaluate(&buyer, FilterConfig::candidate_list()).failed_gate,
            Some(Gate::Geography)
        );

        buyer.desired_area = "㊵".to_string();
        assert!(evaluate(&buyer, FilterConfig::candidate_list()).passed);
    }

    #[test]
    fn test_distance_match_only_when_enabled() {
        let mut criteria: BuyerCriteria = (&Buyer {
            desired_area: "⑤".to_string(),
            ..create_test_buyer()
        })
            .into();
        criteria.inquired_coordinates = vec![
            Coordinates::new(33.2790, 131.5005),
            Coordinates::new(33.2400, 131.6100),
        ];
        let mut target = create_test_target();
        target.coordinates = Some(Coordinates::new(33.2328, 131.6065));

        let off = BuyerEligibilityFilter::new(FilterConfig::candidate_list());
        assert_eq!(off.evaluate(&criteria, &target).failed_gate, Some(Gate::Geography));

        let on = BuyerEligibilityFilter::new(
            FilterConfig::candidate_list().with_distance_match(true, 3.0),
        );
        let result = on.evaluate(&criteria, &target);
        assert!(result.passed);
        assert!(result.distance_km.is_some_and(|d| d < 3.0));

        // Unknown property coordinates degrade to no match
        target.coordinates = None;
        assert!(!on.evaluate(&criteria, &target).passed);
    }

    #[test]
    fn test_property_type_gate() {
        let mut buyer = create_test_buyer();
        buyer.desired_property_type = "マンション、土地".to_string();
        assert_eq!(
            evaluate(&buyer, FilterConfig::candidate_list()).failed_gate,
            Some(Gate::PropertyType)
        );

        buyer.desired_property_type = "マンション 新築一戸建て".to_string();
        assert!(evaluate(&buyer, FilterConfig::candidate_list()).passed);

        buyer.desired_property_type = "指定なし".to_string();
        assert!(evaluate(&buyer, FilterConfig::candidate_list()).passed);

        // Area still given, so the minimum-criteria gate passes and the type gate fails
        buyer.desired_property_type = "".to_string();
        assert_eq!(
            evaluate(&buyer, FilterConfig::candidate_list()).failed_gate,
            Some(Gate::PropertyType)
        );
    }

    #[test]
    fn test_price_gate_uses_matching_kind() {
        let mut buyer = create_test_buyer();
        buyer.price_range_house = "〜1500万".to_string();
        assert_eq!(
            evaluate(&buyer, FilterConfig::candidate_list()).failed_gate,
            Some(Gate::Price)
        );

        // Apartment range is irrelevant for a house
        buyer.price_range_house = "".to_string();
        buyer.price_range_apartment = "〜500万".to_string();
        assert!(evaluate(&buyer, FilterConfig::candidate_list()).passed);

        buyer.price_range_house = "相談".to_string();
        assert!(evaluate(&buyer, FilterConfig::candidate_list()).passed);
    }

    #[test]
    fn test_price_gate_skipped_without_price_or_for_other_kinds() {
        let mut buyer = create_test_buyer();
        buyer.price_range_house = "〜100万".to_string();
        buyer.desired_property_type = "指定なし".to_string();

        let mut target = create_test_target();
        target.price = None;
        let filter = BuyerEligibilityFilter::new(FilterConfig::candidate_list());
        assert!(filter.evaluate(&(&buyer).into(), &target).passed);

        target.price = Some(50_000_000);
        target.kind = PropertyKind::Other;
        assert!(filter.evaluate(&(&buyer).into(), &target).passed);
    }
}
