use crate::core::filters::{
    normalize_status, FLAG_LINE_MAIL, FLAG_MAIL, FLAG_REQUIRED, FLAG_WISHES, GRADE_DROPPED,
    STATUS_OFFER,
};
use crate::models::{Buyer, BuyerCriteria, PriceRanges, TypePreference};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// One logical buyer built from every raw record sharing an email
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedBuyer {
    /// Normalized email, empty for records that could not be grouped
    pub email: String,
    pub buyer_numbers: BTreeSet<String>,
    /// Most recently received record, used for contact details and ranking
    pub representative: Buyer,
    pub criteria: BuyerCriteria,
}

impl From<&Buyer> for ConsolidatedBuyer {
    fn from(buyer: &Buyer) -> Self {
        Self {
            email: buyer.normalized_email(),
            buyer_numbers: [buyer.buyer_number.clone()].into(),
            representative: buyer.clone(),
            criteria: BuyerCriteria::from(buyer),
        }
    }
}

impl ConsolidatedBuyer {
    /// Combine two partial consolidations of the same person.
    ///
    /// Commutative and associative: set fields are unions, single-valued
    /// fields take the maximum under a total order.
    pub fn merge(self, other: Self) -> Self {
        let representative = match representative_order(&self.representative, &other.representative) {
            Ordering::Less => other.representative,
            _ => self.representative,
        };

        let a = self.criteria;
        let b = other.criteria;
        let criteria = BuyerCriteria {
            buyer_number: representative.buyer_number.clone(),
            area_specified: a.area_specified || b.area_specified,
            zone_codes: union(a.zone_codes, b.zone_codes),
            type_preference: merge_type_preference(a.type_preference, b.type_preference),
            price_ranges: PriceRanges {
                house: union(a.price_ranges.house, b.price_ranges.house),
                apartment: union(a.price_ranges.apartment, b.price_ranges.apartment),
                land: union(a.price_ranges.land, b.price_ranges.land),
            },
            status: pick_ranked(a.status, b.status, status_rank),
            distribution_flag: pick_ranked(a.distribution_flag, b.distribution_flag, flag_rank),
            distribution_flags: union(a.distribution_flags, b.distribution_flags),
            inquiry_sources: union(a.inquiry_sources, b.inquiry_sources),
            broker_markers: union(a.broker_markers, b.broker_markers),
            inquired_property_numbers: union(a.inquired_property_numbers, b.inquired_property_numbers),
            inquired_coordinates: Vec::new(),
        };

        Self {
            email: self.email,
            buyer_numbers: union(self.buyer_numbers, other.buyer_numbers),
            representative,
            criteria,
        }
    }
}

fn union<T: Ord>(mut a: BTreeSet<T>, b: BTreeSet<T>) -> BTreeSet<T> {
    a.extend(b);
    a
}

fn merge_type_preference(a: TypePreference, b: TypePreference) -> TypePreference {
    match (a, b) {
        (TypePreference::NoPreference, _) | (_, TypePreference::NoPreference) => {
            TypePreference::NoPreference
        }
        (TypePreference::Unspecified, other) | (other, TypePreference::Unspecified) => other,
        (TypePreference::Types(a), TypePreference::Types(b)) => TypePreference::Types(union(a, b)),
    }
}

/// Later reception date wins; a missing date loses; then the smaller buyer number
fn representative_order(a: &Buyer, b: &Buyer) -> Ordering {
    a.reception_date
        .cmp(&b.reception_date)
        .then_with(|| b.buyer_number.cmp(&a.buyer_number))
}

/// Keep the higher-ranked value; equal ranks fall back to the smaller string
fn pick_ranked(a: String, b: String, rank: fn(&str) -> u8) -> String {
    match rank(&a).cmp(&rank(&b)).then_with(|| b.cmp(&a)) {
        Ordering::Less => b,
        _ => a,
    }
}

/// Blank < offer made or dropped < any other status < grade A
pub fn status_rank(status: &str) -> u8 {
    let status = normalize_status(status);
    if status.is_empty() {
        0
    } else if status.contains(STATUS_OFFER) || status.contains(GRADE_DROPPED) {
        1
    } else if status.starts_with('A') {
        3
    } else {
        2
    }
}

/// 要 > メール > LINE→メール > 希望 > anything else.
///
/// Every flag some variant accepts outranks the ones no variant accepts.
pub fn flag_rank(flag: &str) -> u8 {
    match flag.trim() {
        FLAG_REQUIRED => 4,
        FLAG_MAIL => 3,
        FLAG_LINE_MAIL => 2,
        FLAG_WISHES => 1,
        _ => 0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum GroupKey {
    Email(String),
    /// Records without an email stay on their own
    Record(String),
}

/// Group raw records by normalized email and fold each group into one buyer.
///
/// Output is ordered by group key, so the result does not depend on the
/// order of `records`.
pub fn consolidate<'a, I>(records: I) -> Vec<ConsolidatedBuyer>
where
    I: IntoIterator<Item = &'a Buyer>,
{
    let mut groups: BTreeMap<GroupKey, Vec<&Buyer>> = BTreeMap::new();
    for buyer in records {
        let email = buyer.normalized_email();
        let key = if email.is_empty() {
            GroupKey::Record(buyer.buyer_number.clone())
        } else {
            GroupKey::Email(email)
        };
        groups.entry(key).or_default().push(buyer);
    }

    groups
        .into_values()
        .filter_map(|group| {
            group
                .into_iter()
                .map(ConsolidatedBuyer::from)
                .reduce(ConsolidatedBuyer::merge)
        })
        .collect()
}

/// Wrap each record on its own, without merging
pub fn singletons<'a, I>(records: I) -> Vec<ConsolidatedBuyer>
where
    I: IntoIterator<Item = &'a Buyer>,
{
    records.into_iter().map(ConsolidatedBuyer::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ZoneCode;
    use chrono::NaiveDate;

    fn record(number: &str, email: &str, area: &str) -> Buyer {
        Buyer {
            buyer_number: number.to_string(),
            email: email.to_string(),
            desired_area: area.to_string(),
            desired_property_type: "戸建".to_string(),
            latest_status: "B".to_string(),
            distribution_type: "メール".to_string(),
            ..Buyer::default()
        }
    }

    #[test]
    fn test_zone_glyphs_are_unioned() {
        let records = vec![
            record("1", "Taro@Example.com ", "①"),
            record("2", "taro@example.com", "③"),
        ];
        let merged = consolidate(&records);
        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged[0].criteria.zone_codes,
            [ZoneCode::circled(1), ZoneCode::circled(3)].into()
        );
        assert_eq!(merged[0].buyer_numbers, ["1".to_string(), "2".to_string()].into());
    }

    #[test]
    fn test_most_permissive_status_and_flag() {
        let mut first = record("1", "a@example.com", "①");
        first.latest_status = "D:他決".to_string();
        first.distribution_type = "要".to_string();
        let mut second = record("2", "a@example.com", "");
        second.latest_status = "A:すぐ".to_string();
        second.distribution_type = "LINE→メール".to_string();

        let merged = consolidate([&first, &second]);
        assert_eq!(merged[0].criteria.status, "A:すぐ");
        assert_eq!(merged[0].criteria.distribution_flag, "要");
        assert!(merged[0].criteria.area_specified);
    }

    #[test]
    fn test_representative_is_latest_record() {
        let mut old = record("1", "a@example.com", "");
        old.reception_date = NaiveDate::from_ymd_opt(2023, 4, 1);
        let mut new = record("2", "a@example.com", "");
        new.reception_date = NaiveDate::from_ymd_opt(2024, 9, 1);
        let undated = record("0", "a@example.com", "");

        let merged = consolidate([&old, &undated, &new]);
        assert_eq!(merged[0].representative.buyer_number, "2");
        assert_eq!(merged[0].criteria.buyer_number, "2");
    }

    #[test]
    fn test_no_preference_absorbs_types() {
        let mut first = record("1", "a@example.com", "");
        first.desired_property_type = "マンション".to_string();
        let mut second = record("2", "a@example.com", "");
        second.desired_property_type = "指定なし".to_string();
        let mut third = record("3", "a@example.com", "");
        third.desired_property_type = "".to_string();

        let merged = consolidate([&first, &second, &third]);
        assert_eq!(merged[0].criteria.type_preference, TypePreference::NoPreference);
    }

    #[test]
    fn test_records_without_email_stay_separate() {
        let records = vec![record("1", "", "①"), record("2", "  ", "②")];
        assert_eq!(consolidate(&records).len(), 2);
    }

    #[test]
    fn test_rank_tables() {
        assert!(status_rank("A") > status_rank("C"));
        assert!(status_rank("C") > status_rank("D"));
        assert!(status_rank("買付") < status_rank("不明"));
        assert!(status_rank("") < status_rank("買付"));
        assert!(flag_rank("要") > flag_rank("メール"));
        assert!(flag_rank("メール") > flag_rank("LINE→メール"));
        assert!(flag_rank("LINE→メール") > flag_rank("希望"));
        assert!(flag_rank("希望") > flag_rank("不要"));
        assert!(flag_rank("希望") > flag_rank(""));
    }

    #[test]
    fn test_accepted_flag_beats_declined_flag() {
        let mut wishes = record("1", "a@example.com", "③");
        wishes.distribution_type = "希望".to_string();
        let mut declined = record("2", "a@example.com", "③");
        declined.distribution_type = "不要".to_string();

        for merged in [consolidate([&wishes, &declined]), consolidate([&declined, &wishes])] {
            assert_eq!(merged.len(), 1);
            assert_eq!(merged[0].criteria.distribution_flag, "希望");
        }
    }
}
