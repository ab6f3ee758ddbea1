//! EF 0106 / 0103 / 0102: domicile of the holder.
//!
//! Depending on the card generation the same file holds either a `SEQUENCE` of structured fields
//! or a single line of postal text such as `Jud.BC Sat.Sascut (Com.Sascut), Str.Republicii,
//! nr.261`. Both are reduced to the same canonical fields:
//!
//! - county code (`BC`),
//! - locality label (`SAT SASCUT, COM. SASCUT`),
//! - remainder, i.e. the street line (`STR.REPUBLICII, NR.261`).
//!
//! The grammar below is a legacy contract kept as it is; it is not meant to parse addresses in
//! general.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ef::{decode_text, text};
use crate::tlv::{self, TlvMap};

const TAG_STREET: u8 = 0x80;
const TAG_LOCALITY: u8 = 0x81;
const TAG_COUNTY: u8 = 0x82;
const TAG_POSTAL_CODE: u8 = 0x83;
const TAG_COUNTRY: u8 = 0x84;

/// Street markers: Str, Strada, Bd, Bdul, Bulevardul, Aleea, Calea, Sos, Soseaua, Șos.
const STREET_MARKER: &str =
    r"Str(?:\.|ada)?|Bd(?:\.|ul)?|Bulevardul|Aleea|Calea|Sos(?:\.|eaua)?|Șos(?:\.|eaua)?";

/// Maximum distance, in characters, between a street chunk and the house number that follows.
const NUMBER_LOOKAHEAD: usize = 20;

static COUNTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bJud\.?\s*([A-Z]{1,3})\b").expect("county pattern"));

static LOCALITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:(Mun|Ors|Or[aă]s|Ora[sș]|Com|Sat)\.?)\s*([A-ZĂÂÎȘȚ][\w.\- ]+?)\b")
        .expect("locality pattern")
});

static COMMUNE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(\s*Com\.?\s*([^)]+?)\s*\)").expect("commune pattern"));

static STREET_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)(?:{})\b", STREET_MARKER)).expect("street start pattern")
});

static STREET_FULL: Lazy<Regex> = Lazy::new(|| {
    let part = r"([A-Za-z0-9\-/]+)";
    Regex::new(&format!(
        concat!(
            r"(?i)\b(?:{marker})\s*([^\d,][^,]*)",
            r"(?:,\s*nr\.?\s*{part})?",
            r"(?:,\s*bl(?:oc)?\.?\s*{part})?",
            r"(?:,\s*sc(?:\.|ara)?\.?\s*{part})?",
            r"(?:,\s*et(?:\.|aj)?\.?\s*{part})?",
            r"(?:,\s*ap(?:\.|art)?\.?\s*{part})?",
        ),
        marker = STREET_MARKER,
        part = part,
    ))
    .expect("street pattern")
});

static STREET_CHUNK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b(?:{})\b[^,\n\r]*", STREET_MARKER)).expect("street chunk pattern")
});

static STREET_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bStr").expect("street prefix pattern"));

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bnr\.?\s*\w+").expect("number pattern"));

/// Address of the holder, with the raw fields as found on the card and the canonical ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AddressRecord {
    /// Street field (0x80), sometimes carrying the whole address.
    pub street: Option<String>,
    /// Locality field (0x81), usually the bare name.
    pub locality: Option<String>,
    /// County field (0x82), usually the county code.
    pub county: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    /// Present fields joined by `", "`, or the cleaned free text.
    pub text: Option<String>,
    /// Whole file decoded as text, for troubleshooting.
    pub raw_text: Option<String>,

    /// Canonical county code, e.g. `VN`.
    pub county_code: Option<String>,
    /// Canonical locality, e.g. `SAT SASCUT, COM. SASCUT`.
    pub locality_label: Option<String>,
    /// Canonical street line, e.g. `STR.REPUBLICII, NR.261`.
    pub remainder: Option<String>,
}

impl<'a> From<&'a [u8]> for AddressRecord {
    fn from(raw: &'a [u8]) -> Self {
        if raw.is_empty() {
            return Self::default();
        }

        match tlv::unwrap_outer_sequence(raw) {
            Some(children) => Self::from_structured(
                raw,
                &children
                    .ok()
                    .map(tlv::decode_flat_tlv)
                    .unwrap_or_default(),
            ),
            None => Self::from_free_text(raw),
        }
    }
}

impl AddressRecord {
    fn from_free_text(raw: &[u8]) -> Self {
        let raw_text = decode_text(raw);
        let text = clean(&raw_text);
        let parsed = FreeText::parse(&text);

        Self {
            text: non_empty(text),
            raw_text: non_empty(raw_text),
            county_code: canonical(parsed.county),
            locality_label: canonical(parsed.locality),
            remainder: canonical(parsed.remainder),
            ..Default::default()
        }
    }

    fn from_structured(raw: &[u8], children: &TlvMap) -> Self {
        let raw_text = decode_text(raw);

        let street = text(children, TAG_STREET);
        let locality = text(children, TAG_LOCALITY);
        let county = text(children, TAG_COUNTY);
        let postal_code = text(children, TAG_POSTAL_CODE);
        let country = text(children, TAG_COUNTRY);

        let fields = [&street, &locality, &county, &postal_code, &country]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>();

        let combined = match fields.is_empty() {
            true => non_empty(clean(&raw_text)),
            _ => Some(fields.join(", ")),
        };

        // Some issuances put the whole address into the street field,
        // so the free-text grammar runs over every text field.
        let soup = [combined.as_deref(), street.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let guess = FreeText::parse(&soup);

        let county_code = county.clone().or(guess.county);
        let locality_label = guess.locality.or_else(|| locality.clone());
        let remainder = street.as_deref().and_then(street_line).or(guess.remainder);

        Self {
            street,
            locality,
            county,
            postal_code,
            country,
            text: combined,
            raw_text: non_empty(raw_text),
            county_code: canonical(county_code),
            locality_label: canonical(locality_label),
            remainder: canonical(remainder),
        }
    }
}

/// Canonical fields recovered from a line of postal text, in their original case.
#[derive(Debug, Default, PartialEq, Eq)]
struct FreeText {
    county: Option<String>,
    locality: Option<String>,
    remainder: Option<String>,
}

impl FreeText {
    fn parse(text: &str) -> Self {
        let text = clean(text);

        Self {
            county: COUNTY
                .captures(&text)
                .map(|captures| captures[1].to_uppercase()),
            locality: locality(&text),
            remainder: street_line(&text),
        }
    }
}

/// Formats the locality as `<KIND> <NAME>[, COM. <COMMUNE>]`.
fn locality(text: &str) -> Option<String> {
    let mut parts = Vec::new();

    if let Some(captures) = LOCALITY.captures(text) {
        parts.push(format!(
            "{} {}",
            kind_label(&captures[1]),
            clean(&captures[2]).to_uppercase()
        ));
    }

    if let Some(captures) = COMMUNE.captures(text) {
        parts.push(format!("COM. {}", clean(&captures[1]).to_uppercase()));
    }

    match parts.is_empty() {
        true => None,
        _ => Some(parts.join(", ")),
    }
}

fn kind_label(kind: &str) -> String {
    let lower = kind.to_lowercase();

    if lower.starts_with("mun") {
        "MUN.".to_string()
    } else if lower.starts_with("ors") {
        "ORS.".to_string()
    } else if lower.starts_with("ora") || lower.starts_with("oră") {
        "ORAS.".to_string()
    } else if lower.starts_with("com") {
        "COM.".to_string()
    } else if lower.starts_with("sat") {
        "SAT".to_string()
    } else {
        kind.to_uppercase()
    }
}

/// Extracts the street line: `Str.<name>[, nr.<n>][, bl.<b>][, sc.<s>][, et.<e>][, ap.<a>]`.
fn street_line(text: &str) -> Option<String> {
    let text = clean(text);
    let text = match STREET_START.find(&text) {
        Some(start) => &text[start.start()..],
        None => text.as_str(),
    };

    if let Some(captures) = STREET_FULL.captures(text) {
        let name = clean(&captures[1]);
        let mut parts = vec![match STREET_PREFIX.is_match(&name) {
            true => name,
            _ => format!("Str.{}", name),
        }];

        for (index, prefix) in [(2, "nr."), (3, "bl."), (4, "sc."), (5, "et."), (6, "ap.")] {
            if let Some(value) = captures.get(index) {
                parts.push(format!("{}{}", prefix, value.as_str()));
            }
        }

        return Some(parts.join(", "));
    }

    let chunk = STREET_CHUNK.find(text)?;
    let mut parts = vec![clean(chunk.as_str())];

    let after = &text[chunk.end()..];
    if let Some(number) = NUMBER.find(after) {
        if after[..number.start()].chars().count() < NUMBER_LOOKAHEAD {
            parts.push(clean(number.as_str()));
        }
    }

    Some(parts.join(", "))
}

/// Replaces control characters with spaces and collapses whitespace.
fn clean(text: &str) -> String {
    text.chars()
        .map(|c| if c < ' ' { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(value: String) -> Option<String> {
    match value.is_empty() {
        true => None,
        _ => Some(value),
    }
}

fn canonical(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_uppercase())
        .filter(|v| !v.is_empty())
}
