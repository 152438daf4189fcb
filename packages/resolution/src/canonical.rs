//! Place-name canonicalization.
//!
//! Two strictness tiers are applied symmetrically to incident labels and
//! boundary names so that both sides of a join use the same key:
//!
//! 1. Tier 1: trim, uppercase
//! 2. Tier 2: Tier 1, then NFD-decompose, drop combining marks, and keep
//!    only ASCII letters and digits
//!
//! Tier 2 is computed from the Tier 1 form, so names equal under Tier 1
//! are always equal under Tier 2. A name with no ASCII letters or digits
//! (for example one written only in Cyrillic) stays known at Tier 1 and
//! has no Tier 2 key.

use std::collections::BTreeSet;

use crime_dashboard_incident_models::RawPlace;
use crime_dashboard_resolution_models::config::CanonicalConfig;
use crime_dashboard_resolution_models::{CanonicalName, Tier, UNKNOWN_MARKER};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Tier 1 transform: trim surrounding whitespace and uppercase.
#[must_use]
pub fn tier1(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Tier 2 transform: Tier 1, strip diacritics, keep `[A-Z0-9]`.
#[must_use]
pub fn tier2(raw: &str) -> String {
    strip_to_ascii_alphanumeric(&tier1(raw))
}

fn strip_to_ascii_alphanumeric(tier1: &str) -> String {
    tier1
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Canonicalizes raw place values, mapping empty and sentinel values to
/// [`CanonicalName::Unknown`].
///
/// Sentinels are compared in Tier 2 form, so `"Sin datos"`, `"SIN DATOS"`
/// and `"sin-datos"` are the same sentinel. A sentinel with no Tier 2 form,
/// such as `"-"`, is compared in Tier 1 form instead. [`UNKNOWN_MARKER`] is
/// always a sentinel. Whether a value is a sentinel does not depend on the
/// tier it is canonicalized at.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    sentinels: BTreeSet<String>,
    symbol_sentinels: BTreeSet<String>,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

impl Canonicalizer {
    /// Creates a canonicalizer with the given sentinel vocabulary.
    #[must_use]
    pub fn new<I, S>(sentinels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stripped = BTreeSet::new();
        let mut symbol_sentinels = BTreeSet::new();
        for sentinel in sentinels {
            let upper = tier1(sentinel.as_ref());
            let key = strip_to_ascii_alphanumeric(&upper);
            if !key.is_empty() {
                stripped.insert(key);
            } else if !upper.is_empty() {
                symbol_sentinels.insert(upper);
            }
        }
        stripped.insert(UNKNOWN_MARKER.to_string());

        Self {
            sentinels: stripped,
            symbol_sentinels,
        }
    }

    #[must_use]
    pub fn from_config(config: &CanonicalConfig) -> Self {
        Self::new(&config.sentinels)
    }

    /// Whether the raw value means "no data".
    #[must_use]
    pub fn is_sentinel(&self, raw: &str) -> bool {
        self.canonicalize(raw, Tier::Tier1).is_unknown()
    }

    /// Canonicalizes a raw string at the requested tier. Never fails.
    #[must_use]
    pub fn canonicalize(&self, raw: &str, tier: Tier) -> CanonicalName {
        let upper = tier1(raw);
        if upper.is_empty() {
            return CanonicalName::Unknown;
        }

        let stripped = strip_to_ascii_alphanumeric(&upper);
        let sentinel = if stripped.is_empty() {
            self.symbol_sentinels.contains(&upper)
        } else {
            self.sentinels.contains(&stripped)
        };
        if sentinel {
            return CanonicalName::Unknown;
        }

        match tier {
            Tier::Tier1 => CanonicalName::Known(upper),
            Tier::Tier2 if stripped.is_empty() => CanonicalName::Unknown,
            Tier::Tier2 => CanonicalName::Known(stripped),
        }
    }

    /// Canonicalizes a raw place value; numbers are stringified first.
    #[must_use]
    pub fn canonicalize_place(&self, raw: &RawPlace, tier: Tier) -> CanonicalName {
        match raw.as_text() {
            Some(text) => self.canonicalize(&text, tier),
            None => CanonicalName::Unknown,
        }
    }
}
