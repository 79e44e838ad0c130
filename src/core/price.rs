use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Characters accepted as the separator of an explicit range
const RANGE_DASHES: &[char] = &['〜', '～', '~', '-', '－', '―', '‐', '−'];

const AT_LEAST: &str = "以上";
const AT_MOST: &str = "以下";

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("number pattern is valid"));

/// Inclusive yen interval; `max: None` is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: u64,
    pub max: Option<u64>,
}

impl PriceRange {
    #[inline]
    pub fn contains(&self, price: u64) -> bool {
        price >= self.min && self.max.map_or(true, |max| price <= max)
    }
}

/// Outcome of parsing a desired price-range text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedPrice {
    /// Blank field
    Empty,
    /// Text present but not understood; treated as unconstrained
    Unparseable,
    Range(PriceRange),
}

impl ParsedPrice {
    /// Only a parsed range can reject a price
    pub fn admits(&self, price: u64) -> bool {
        match self {
            ParsedPrice::Empty | ParsedPrice::Unparseable => true,
            ParsedPrice::Range(range) => range.contains(price),
        }
    }
}

/// Parse Japanese price-range notation such as "1000万円〜2000万円",
/// "3千万以下", "1億以上" or a bare "2500万".
pub fn parse(text: &str) -> ParsedPrice {
    if text.trim().is_empty() {
        return ParsedPrice::Empty;
    }

    let normalized = normalize_amounts(text);

    if let Some(idx) = normalized.find(RANGE_DASHES) {
        let dash_len = normalized[idx..].chars().next().map_or(1, char::len_utf8);
        let lower = first_number(&normalized[..idx]);
        let upper = first_number(&normalized[idx + dash_len..]);
        return match (lower, upper) {
            (None, None) => ParsedPrice::Unparseable,
            (lower, upper) => ParsedPrice::Range(PriceRange {
                min: lower.unwrap_or(0),
                max: upper,
            }),
        };
    }

    let Some(amount) = first_number(&normalized) else {
        return ParsedPrice::Unparseable;
    };

    if normalized.contains(AT_LEAST) {
        ParsedPrice::Range(PriceRange { min: amount, max: None })
    } else if normalized.contains(AT_MOST) {
        ParsedPrice::Range(PriceRange { min: 0, max: Some(amount) })
    } else {
        // Bare figure: allow 20% either side
        ParsedPrice::Range(PriceRange {
            min: amount.saturating_mul(8) / 10,
            max: Some(amount.saturating_mul(12) / 10),
        })
    }
}

fn first_number(text: &str) -> Option<u64> {
    NUMBER.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Rewrite every amount in `text` as a plain integer of yen.
///
/// Separators and currency marks are dropped and fullwidth digits folded,
/// then 億/万/千 multipliers are applied to the figures before them, so
/// "1億2,000万円" becomes "120000000".
fn normalize_amounts(text: &str) -> String {
    let cleaned: Vec<char> = text
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, ',' | '，' | '円' | '¥' | '￥'))
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            '．' => '.',
            _ => c,
        })
        .collect();

    let mut out = String::with_capacity(cleaned.len());
    let mut i = 0;
    while i < cleaned.len() {
        if cleaned[i].is_ascii_digit() {
            let (amount, next) = read_amount(&cleaned, i);
            out.push_str(&amount.to_string());
            i = next;
        } else {
            out.push(cleaned[i]);
            i += 1;
        }
    }
    out
}

/// Read one amount starting at `start`, e.g. "1.5億", "3千万", "1億2000万".
/// Returns the value in yen and the index after the amount.
fn read_amount(chars: &[char], start: usize) -> (u64, usize) {
    let mut total = 0.0_f64;
    let mut i = start;

    loop {
        let figure_start = i;
        while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
            i += 1;
        }
        let figure: String = chars[figure_start..i].iter().collect();
        let mut value: f64 = figure.trim_end_matches('.').parse().unwrap_or(0.0);

        if chars.get(i) == Some(&'千') {
            value *= 1_000.0;
            i += 1;
        }
        match chars.get(i) {
            Some('億') => {
                total += value * 100_000_000.0;
                i += 1;
                // "1億2000万": keep reading the lower part
                if chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
                    continue;
                }
            }
            Some('万') => {
                total += value * 10_000.0;
                i += 1;
            }
            _ => total += value,
        }
        break;
    }

    (total.round() as u64, i)
}
