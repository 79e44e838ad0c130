use crate::models::PropertyKind;

/// Sentinel a buyer writes when any property type is fine
pub const NO_PREFERENCE: &str = "指定なし";

/// Canonical token for a detached house
pub const HOUSE: &str = "戸建";
pub const APARTMENT: &str = "マンション";
pub const LAND: &str = "土地";

/// Qualifiers that don't change what kind of property it is
const QUALIFIERS: &[&str] = &["中古", "新築", "分譲"];

/// Renderings of "detached house", longest first
const HOUSE_SYNONYMS: &[&str] = &["一戸建て", "戸建て"];

/// Canonicalize a property-type label for comparison.
///
/// "中古戸建て", "新築一戸建て" and "戸建" all become "戸建";
/// "分譲マンション" becomes "マンション".
pub fn normalize(label: &str) -> String {
    let mut out = label.to_string();
    for qualifier in QUALIFIERS {
        out = out.replace(qualifier, "");
    }
    for synonym in HOUSE_SYNONYMS {
        out = out.replace(synonym, HOUSE);
    }
    out.trim().to_string()
}

/// Loose equality on normalized labels: equal, or one contains the other
/// ("戸建" matches "戸建・土地").
pub fn types_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(b) || b.contains(a)
}

/// Split a desired-type field on ASCII, fullwidth and ideographic commas and
/// on whitespace.
pub fn split_desired(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| matches!(c, ',' | '，' | '、') || c.is_whitespace())
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
}

impl PropertyKind {
    /// Price-range category for a normalized label
    pub fn of(normalized: &str) -> Self {
        if normalized.contains(HOUSE) {
            PropertyKind::House
        } else if normalized.contains(APARTMENT) {
            PropertyKind::Apartment
        } else if normalized.contains(LAND) {
            PropertyKind::Land
        } else {
            PropertyKind::Other
        }
    }
}
