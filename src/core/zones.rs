use crate::core::zone_tables::{BEPPU, OITA, PREFECTURE};
use crate::models::{Property, ZoneCode};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Named group of substring rules checked together
#[derive(Debug)]
pub struct RuleSet {
    pub name: &'static str,
    /// Lower numbers are checked first
    pub priority: u8,
    pub rules: &'static [(&'static str, ZoneCode)],
}

/// Address rules for one municipality
#[derive(Debug)]
pub struct MunicipalityTable {
    pub name: &'static str,
    /// Token identifying the municipality inside an address ("大分市")
    pub city_token: &'static str,
    /// Code covering the whole municipality
    pub city_wide: ZoneCode,
    /// Districts whose chome number selects the zone
    pub chome_districts: &'static [&'static str],
    pub rule_sets: &'static [RuleSet],
}

/// Pair of rules where the shorter pattern would shadow the longer one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityViolation {
    pub table: &'static str,
    pub shorter: &'static str,
    pub longer: &'static str,
}

static CHOME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<district>.+?)(?P<num>[0-9]+|[一二三四五六七八九十]+)丁目")
        .expect("chome pattern is valid")
});

impl MunicipalityTable {
    /// Text following the city token, or `None` if the address is elsewhere
    fn locality<'a>(&self, normalized: &'a str) -> Option<&'a str> {
        normalized
            .find(self.city_token)
            .map(|idx| &normalized[idx + self.city_token.len()..])
    }

    /// Narrow the locality to the text the rules are matched against.
    ///
    /// Only allow-listed districts keep their chome suffix. Everything else is
    /// cut back to the bare district name, and there is no second attempt with
    /// the suffix when that fails.
    fn match_subject(&self, locality: &str) -> String {
        let Some(caps) = CHOME.captures(locality) else {
            return locality.to_string();
        };
        let district = &caps["district"];
        if !self.chome_districts.iter().any(|d| district.ends_with(d)) {
            return district.to_string();
        }

        let Some(number) = chome_number(&caps["num"]) else {
            return district.to_string();
        };
        let whole = caps.get(0).map_or(0, |m| m.end());
        format!("{}{}丁目{}", district, number, &locality[whole..])
    }

    /// Codes from the first rule set with any matching rule
    fn match_fine(&self, subject: &str) -> BTreeSet<ZoneCode> {
        let mut sets: Vec<&RuleSet> = self.rule_sets.iter().collect();
        sets.sort_by_key(|set| set.priority);

        for set in sets {
            let codes: BTreeSet<ZoneCode> = set
                .rules
                .iter()
                .filter(|(pattern, _)| subject.contains(pattern))
                .map(|(_, code)| *code)
                .collect();
            if !codes.is_empty() {
                tracing::trace!("{} matched rule set {} for {}", self.name, set.name, subject);
                return codes;
            }
        }
        BTreeSet::new()
    }

    /// Rule pairs breaking the ordering invariant: a pattern contained in a
    /// longer pattern with a different zone must sit in a later rule set.
    pub fn priority_violations(&self) -> Vec<PriorityViolation> {
        let rules: Vec<(u8, &'static str, ZoneCode)> = self
            .rule_sets
            .iter()
            .flat_map(|set| set.rules.iter().map(move |(p, z)| (set.priority, *p, *z)))
            .collect();

        let mut violations = Vec::new();
        for &(short_prio, shorter, short_zone) in &rules {
            for &(long_prio, longer, long_zone) in &rules {
                if shorter != longer
                    && longer.contains(shorter)
                    && short_zone != long_zone
                    && long_prio >= short_prio
                {
                    violations.push(PriorityViolation {
                        table: self.name,
                        shorter,
                        longer,
                    });
                }
            }
        }
        violations
    }
}

/// Chome numbers arrive as ASCII digits or kanji numerals up to 99
fn chome_number(raw: &str) -> Option<u32> {
    if let Ok(n) = raw.parse::<u32>() {
        return Some(n);
    }

    let digit = |c: char| "一二三四五六七八九".chars().position(|d| d == c).map(|p| p as u32 + 1);
    match raw.split_once('十') {
        None => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => digit(c),
                _ => None,
            }
        }
        Some((tens, ones)) => {
            let tens = if tens.is_empty() { Some(1) } else { chome_number(tens) };
            let ones = if ones.is_empty() { Some(0) } else { chome_number(ones) };
            match (tens, ones) {
                (Some(t), Some(o)) if t < 10 && o < 10 => Some(t * 10 + o),
                _ => None,
            }
        }
    }
}

/// Remove whitespace and fold fullwidth digits to ASCII
fn normalize_address(address: &str) -> String {
    address
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            _ => c,
        })
        .collect::<String>()
        .replacen(PREFECTURE, "", 1)
}

/// Maps free-text addresses to distribution zone codes
#[derive(Debug)]
pub struct ZoneCodeResolver {
    tables: Vec<&'static MunicipalityTable>,
}

static DEFAULT_RESOLVER: Lazy<ZoneCodeResolver> =
    Lazy::new(|| ZoneCodeResolver::new(vec![&OITA, &BEPPU]));

impl ZoneCodeResolver {
    pub fn new(tables: Vec<&'static MunicipalityTable>) -> Self {
        for table in &tables {
            for v in table.priority_violations() {
                tracing::warn!(
                    "Zone table {}: pattern {} shadows {} at equal or higher priority",
                    v.table,
                    v.shorter,
                    v.longer
                );
            }
        }
        Self { tables }
    }

    /// Resolver over the built-in Oita and Beppu tables
    pub fn shared() -> &'static ZoneCodeResolver {
        &DEFAULT_RESOLVER
    }

    pub fn tables(&self) -> &[&'static MunicipalityTable] {
        &self.tables
    }

    /// Resolve an address to its zone codes.
    ///
    /// A recognized municipality always contributes its city-wide code,
    /// whether or not a finer rule matched. Unmapped municipalities yield an
    /// empty set.
    pub fn resolve(&self, address: &str) -> BTreeSet<ZoneCode> {
        let normalized = normalize_address(address);

        for table in &self.tables {
            if let Some(locality) = table.locality(&normalized) {
                let subject = table.match_subject(locality);
                let mut codes = table.match_fine(&subject);
                codes.insert(table.city_wide);
                return codes;
            }
        }

        tracing::debug!("No zone table for address {:?}", address);
        BTreeSet::new()
    }

    /// Address-derived codes plus any glyphs already annotated on the listing
    pub fn resolve_property(&self, property: &Property) -> BTreeSet<ZoneCode> {
        let mut codes = self.resolve(&property.address);
        if let Some(annotation) = &property.distribution_areas {
            codes.extend(ZoneCode::extract_all(annotation));
        }
        codes
    }
}
