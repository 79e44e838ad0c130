use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Property listing being matched against the buyer pool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub property_number: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub property_type: String,
    #[serde(default)]
    pub price: Option<u64>,
    #[serde(default)]
    pub google_map_url: Option<String>,
    /// Zone annotation kept on the listing, e.g. "①㊵"
    #[serde(default)]
    pub distribution_areas: Option<String>,
}

/// Raw buyer record as stored in the back office
///
/// One person may appear as several records sharing an email address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Buyer {
    pub buyer_number: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone_number: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub desired_area: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub desired_property_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub price_range_house: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub price_range_apartment: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub price_range_land: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub latest_status: String,
    /// Distribution flag ("要", "メール", ...)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub distribution_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub inquiry_source: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub broker_inquiry: String,
    /// Property the buyer asked about before
    #[serde(default, alias = "property_number")]
    pub inquired_property_number: Option<String>,
    #[serde(default)]
    pub reception_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Buyer {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Email used as the consolidation key (trimmed, lower-cased)
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

/// Nullable text columns come back as JSON null; treat them as empty strings.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Distribution zone token, rendered as a circled numeral (①, ㉑, ㊵, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZoneCode(char);

impl ZoneCode {
    /// Circled number `n` (1-50). Meant for constant tables, where a bad
    /// number fails at compile time.
    pub const fn circled(n: u32) -> Self {
        let code = match n {
            1..=20 => 0x2460 + n - 1,
            21..=35 => 0x3251 + n - 21,
            36..=50 => 0x32B1 + n - 36,
            _ => panic!("zone numbers run from 1 to 50"),
        };
        match char::from_u32(code) {
            Some(c) => Self(c),
            None => panic!("invalid zone glyph"),
        }
    }

    /// Accepts circled numbers 1-50; anything else is not a zone glyph.
    pub fn from_char(c: char) -> Option<Self> {
        match c as u32 {
            0x2460..=0x2473 | 0x3251..=0x325F | 0x32B1..=0x32BF => Some(Self(c)),
            _ => None,
        }
    }

    /// Numeric value of the circled number (① = 1, ㊵ = 40)
    pub fn number(&self) -> u32 {
        let c = self.0 as u32;
        match c {
            0x2460..=0x2473 => c - 0x2460 + 1,
            0x3251..=0x325F => c - 0x3251 + 21,
            _ => c - 0x32B1 + 36,
        }
    }

    /// Every zone glyph embedded in free text
    pub fn extract_all(text: &str) -> BTreeSet<ZoneCode> {
        text.chars().filter_map(ZoneCode::from_char).collect()
    }

    pub fn as_char(&self) -> char {
        self.0
    }
}

impl fmt::Display for ZoneCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ZoneCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ZoneCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut chars = s.chars();
        match (chars.next().and_then(ZoneCode::from_char), chars.next()) {
            (Some(code), None) => Ok(code),
            _ => Err(serde::de::Error::custom(format!("not a zone glyph: {s:?}"))),
        }
    }
}

/// Price-range category a property type maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    House,
    Apartment,
    Land,
    Other,
}

/// Desired property type after splitting and normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypePreference {
    /// Field left blank
    Unspecified,
    /// Explicit "指定なし"
    NoPreference,
    /// Normalized type labels
    Types(BTreeSet<String>),
}

/// Price-range texts per property kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceRanges {
    pub house: BTreeSet<String>,
    pub apartment: BTreeSet<String>,
    pub land: BTreeSet<String>,
}

impl PriceRanges {
    pub fn for_kind(&self, kind: PropertyKind) -> Option<&BTreeSet<String>> {
        match kind {
            PropertyKind::House => Some(&self.house),
            PropertyKind::Apartment => Some(&self.apartment),
            PropertyKind::Land => Some(&self.land),
            PropertyKind::Other => None,
        }
    }
}

/// What the eligibility filter needs to know about one buyer (raw or consolidated)
#[derive(Debug, Clone, PartialEq)]
pub struct BuyerCriteria {
    pub buyer_number: String,
    pub area_specified: bool,
    pub zone_codes: BTreeSet<ZoneCode>,
    pub type_preference: TypePreference,
    pub price_ranges: PriceRanges,
    pub status: String,
    pub distribution_flag: String,
    /// Every distribution flag seen, scanned by the broker gate
    pub distribution_flags: BTreeSet<String>,
    pub inquiry_sources: BTreeSet<String>,
    pub broker_markers: BTreeSet<String>,
    /// Properties the buyer inquired about earlier
    pub inquired_property_numbers: BTreeSet<String>,
    /// Coordinates of those properties, where they could be derived
    pub inquired_coordinates: Vec<Coordinates>,
}

/// Resolved view of the property being matched
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTarget {
    pub property_number: String,
    pub zone_codes: BTreeSet<ZoneCode>,
    /// Normalized property type label
    pub property_type: String,
    pub kind: PropertyKind,
    pub price: Option<u64>,
    pub coordinates: Option<Coordinates>,
}

/// The seven gates, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Broker,
    MinimumCriteria,
    Distribution,
    Status,
    Geography,
    PropertyType,
    Price,
}

/// Per-gate outcome; `None` means the gate was never reached
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateOutcomes {
    pub broker: Option<bool>,
    pub minimum_criteria: Option<bool>,
    pub distribution: Option<bool>,
    pub status: Option<bool>,
    pub geography: Option<bool>,
    pub property_type: Option<bool>,
    pub price: Option<bool>,
}

impl GateOutcomes {
    pub fn set(&mut self, gate: Gate, passed: bool) {
        let slot = match gate {
            Gate::Broker => &mut self.broker,
            Gate::MinimumCriteria => &mut self.minimum_criteria,
            Gate::Distribution => &mut self.distribution,
            Gate::Status => &mut self.status,
            Gate::Geography => &mut self.geography,
            Gate::PropertyType => &mut self.property_type,
            Gate::Price => &mut self.price,
        };
        *slot = Some(passed);
    }
}

/// Outcome of evaluating one buyer against one property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub buyer_number: String,
    pub passed: bool,
    pub failed_gate: Option<Gate>,
    pub gates: GateOutcomes,
    pub matched_zones: Vec<ZoneCode>,
    pub distance_km: Option<f64>,
}

impl MatchResult {
    /// Result with no gate evaluated yet
    pub fn pending(buyer_number: &str) -> Self {
        Self {
            buyer_number: buyer_number.to_string(),
            passed: false,
            failed_gate: None,
            gates: GateOutcomes::default(),
            matched_zones: Vec::new(),
            distance_km: None,
        }
    }

    /// Store a gate outcome, remembering the first failure. Returns `passed`.
    pub fn record(&mut self, gate: Gate, passed: bool) -> bool {
        self.gates.set(gate, passed);
        if !passed && self.failed_gate.is_none() {
            self.failed_gate = Some(gate);
        }
        passed
    }
}

/// Buyer that passed every gate, ready for the response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(flatten)]
    pub buyer: Buyer,
    /// Raw records merged into this candidate (one entry unless consolidated)
    pub merged_buyer_numbers: Vec<String>,
    pub matched_zones: Vec<ZoneCode>,
    pub distance_km: Option<f64>,
}
