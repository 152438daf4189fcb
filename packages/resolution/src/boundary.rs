//! Boundary gazetteer index.
//!
//! Builds `{canonical name -> boundary id}` lookups at both canonicalization
//! tiers from `GeoJSON` boundary features. The name-bearing property is
//! chosen by a pluggable [`NamePropertySelector`], since every gazetteer
//! names it differently.

use std::collections::BTreeMap;

use crime_dashboard_resolution_models::config::BoundaryConfig;
use crime_dashboard_resolution_models::{CanonicalName, GeographicIssue, Tier};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, feature};

use crate::ResolutionError;
use crate::canonical::Canonicalizer;

/// Chooses the name-bearing property key from a feature's property keys.
///
/// Keys are passed in declaration order.
pub trait NamePropertySelector {
    fn select(&self, keys: &[&str]) -> Option<String>;
}

impl<F> NamePropertySelector for F
where
    F: Fn(&[&str]) -> Option<String>,
{
    fn select(&self, keys: &[&str]) -> Option<String> {
        self(keys)
    }
}

/// Picks the first key containing one of the keywords (case-insensitive),
/// trying keywords in order. Falls back to the first declared key.
///
/// The fallback is a guess: a gazetteer whose first property is an id or
/// area will silently index the wrong thing. Prefer [`FixedKeySelector`]
/// when the gazetteer's schema is known.
#[derive(Debug, Clone)]
pub struct KeywordSelector {
    keywords: Vec<String>,
}

impl KeywordSelector {
    #[must_use]
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }
}

impl Default for KeywordSelector {
    fn default() -> Self {
        Self::new(&BoundaryConfig::default().keywords)
    }
}

impl NamePropertySelector for KeywordSelector {
    fn select(&self, keys: &[&str]) -> Option<String> {
        for keyword in &self.keywords {
            if let Some(key) = keys
                .iter()
                .find(|k| k.to_lowercase().contains(keyword.as_str()))
            {
                return Some((*key).to_string());
            }
        }

        let first = keys.first()?;
        log::warn!("No name-like boundary property among {keys:?}; falling back to {first:?}");
        Some((*first).to_string())
    }
}

/// Uses one known property key, if present.
#[derive(Debug, Clone)]
pub struct FixedKeySelector(pub String);

impl NamePropertySelector for FixedKeySelector {
    fn select(&self, keys: &[&str]) -> Option<String> {
        keys.contains(&self.0.as_str()).then(|| self.0.clone())
    }
}

/// Returns the selector described by the boundary config.
#[must_use]
pub fn selector_for(config: &BoundaryConfig) -> Box<dyn NamePropertySelector> {
    match &config.name_property {
        Some(key) => Box::new(FixedKeySelector(key.clone())),
        None => Box::new(KeywordSelector::new(&config.keywords)),
    }
}

/// A named boundary polygon.
#[derive(Debug, Clone)]
pub struct BoundaryFeature {
    /// Join key: the Tier 1 canonical form of [`Self::name`].
    pub id: String,
    /// Name property value as it appears in the gazetteer.
    pub name: String,
    /// Polygon geometry. Not inspected here.
    pub geometry: Option<Geometry>,
    /// Feature properties as read from the gazetteer.
    pub properties: Option<JsonObject>,
}

/// Read-only lookup from canonical boundary names to boundary ids.
#[derive(Debug, Clone)]
pub struct BoundaryIndex {
    name_property: String,
    features: Vec<BoundaryFeature>,
    tier1: BTreeMap<String, String>,
    tier2: BTreeMap<String, String>,
    skipped: Vec<GeographicIssue>,
}

impl BoundaryIndex {
    /// Parses a `GeoJSON` document (a `FeatureCollection` or a single
    /// `Feature`) and indexes it.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError`] if the document is not valid `GeoJSON`,
    /// is a bare geometry, or fails [`Self::build`].
    pub fn from_geojson_str(
        input: &str,
        selector: &dyn NamePropertySelector,
        canonicalizer: &Canonicalizer,
    ) -> Result<Self, ResolutionError> {
        let features = match input.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => {
                return Err(ResolutionError::Unsupported {
                    message: "expected a FeatureCollection, found a bare Geometry".to_string(),
                });
            }
        };

        Self::build(&features, selector, canonicalizer)
    }

    /// Indexes a list of features.
    ///
    /// The name property key is chosen once, from the first feature that
    /// carries properties. Features whose value for that key is missing,
    /// not a string or number, or canonicalizes to unknown are skipped and
    /// recorded in [`Self::skipped`], as are features repeating the Tier 1
    /// name of an earlier feature. A name with no Tier 2 form is indexed at
    /// Tier 1 only.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError`] if there are no features, none carries
    /// properties, or the selector cannot pick a key.
    pub fn build(
        features: &[Feature],
        selector: &dyn NamePropertySelector,
        canonicalizer: &Canonicalizer,
    ) -> Result<Self, ResolutionError> {
        if features.is_empty() {
            return Err(ResolutionError::EmptyBoundaries);
        }

        let first_props = features
            .iter()
            .find_map(|f| f.properties.as_ref().filter(|p| !p.is_empty()))
            .ok_or(ResolutionError::NoProperties)?;
        let keys: Vec<&str> = first_props.keys().map(String::as_str).collect();
        let name_property = selector
            .select(&keys)
            .ok_or_else(|| ResolutionError::NoNameProperty {
                keys: keys.iter().map(ToString::to_string).collect(),
            })?;
        log::debug!("Using boundary name property {name_property:?}");

        let mut index = Self {
            name_property,
            features: Vec::with_capacity(features.len()),
            tier1: BTreeMap::new(),
            tier2: BTreeMap::new(),
            skipped: Vec::new(),
        };

        for (i, feature) in features.iter().enumerate() {
            let Some(name) = index.name_of(feature) else {
                log::debug!("Boundary feature {i} has no {:?}", index.name_property);
                index.skip(i);
                continue;
            };

            let CanonicalName::Known(t1) = canonicalizer.canonicalize(&name, Tier::Tier1) else {
                log::debug!("Boundary feature {i} has a sentinel name {name:?}");
                index.skip(i);
                continue;
            };
            if let Some(existing) = index.tier1.get(&t1) {
                log::warn!("Boundary feature {i} repeats {existing:?}; keeping the first");
                index.skipped.push(GeographicIssue::DuplicateBoundaryName {
                    feature_index: i,
                    name: t1,
                });
                continue;
            }

            index.insert_key(Tier::Tier1, t1.clone(), &t1);
            if let CanonicalName::Known(t2) = canonicalizer.canonicalize(&name, Tier::Tier2) {
                index.insert_key(Tier::Tier2, t2, &t1);
            }
            index.features.push(BoundaryFeature {
                id: t1,
                name,
                geometry: feature.geometry.clone(),
                properties: feature.properties.clone(),
            });
        }

        if !index.skipped.is_empty() {
            log::warn!(
                "Skipped {} of {} boundary features without a usable, unique {:?}",
                index.skipped.len(),
                features.len(),
                index.name_property
            );
        }
        log::info!(
            "Indexed {} boundaries ({} tier 1 keys, {} tier 2 keys)",
            index.features.len(),
            index.tier1.len(),
            index.tier2.len()
        );

        Ok(index)
    }

    fn name_of(&self, feature: &Feature) -> Option<String> {
        match feature.properties.as_ref()?.get(&self.name_property)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn skip(&mut self, feature_index: usize) {
        self.skipped
            .push(GeographicIssue::MissingNameProperty { feature_index });
    }

    fn insert_key(&mut self, tier: Tier, key: String, id: &str) {
        let map = match tier {
            Tier::Tier1 => &mut self.tier1,
            Tier::Tier2 => &mut self.tier2,
        };
        match map.get(&key) {
            Some(existing) if existing != id => {
                log::warn!("{tier} key {key:?} already maps to {existing:?}; ignoring {id:?}");
            }
            Some(_) => {}
            None => {
                map.insert(key, id.to_string());
            }
        }
    }

    /// Looks up the boundary id for an already-canonical key.
    #[must_use]
    pub fn lookup(&self, key: &str, tier: Tier) -> Option<&str> {
        self.keys_map(tier).get(key).map(String::as_str)
    }

    /// Canonical keys at the given tier, sorted.
    pub fn keys(&self, tier: Tier) -> impl Iterator<Item = &str> {
        self.keys_map(tier).keys().map(String::as_str)
    }

    const fn keys_map(&self, tier: Tier) -> &BTreeMap<String, String> {
        match tier {
            Tier::Tier1 => &self.tier1,
            Tier::Tier2 => &self.tier2,
        }
    }

    /// The property key used for names.
    #[must_use]
    pub fn name_property(&self) -> &str {
        &self.name_property
    }

    /// Indexed features, in input order.
    #[must_use]
    pub fn features(&self) -> &[BoundaryFeature] {
        &self.features
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features that could not be indexed: unnamed ones and Tier 1
    /// duplicates.
    #[must_use]
    pub fn skipped(&self) -> &[GeographicIssue] {
        &self.skipped
    }

    /// Re-emits the indexed features with `id` set to the join key, ready
    /// for a choropleth renderer keyed on feature id.
    #[must_use]
    pub fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self
                .features
                .iter()
                .map(|f| Feature {
                    bbox: None,
                    geometry: f.geometry.clone(),
                    id: Some(feature::Id::String(f.id.clone())),
                    properties: f.properties.clone(),
                    foreign_members: None,
                })
                .collect(),
            foreign_members: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(json: &str) -> Vec<Feature> {
        match json.parse::<GeoJson>().unwrap() {
            GeoJson::FeatureCollection(fc) => fc.features,
            _ => panic!("expected a feature collection"),
        }
    }

    fn build(json: &str) -> BoundaryIndex {
        let canon = Canonicalizer::default();
        BoundaryIndex::build(&collection(json), &KeywordSelector::default(), &canon).unwrap()
    }

    const BARRIOS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"id": 1, "BARRIO": "Palermo", "COMUNA": 14},
             "geometry": {"type": "Point", "coordinates": [-58.42, -34.58]}},
            {"type": "Feature", "properties": {"id": 2, "BARRIO": "Núñez", "COMUNA": 13},
             "geometry": {"type": "Point", "coordinates": [-58.46, -34.54]}},
            {"type": "Feature", "properties": {"id": 3, "COMUNA": 1},
             "geometry": null},
            {"type": "Feature", "properties": {"id": 4, "BARRIO": null},
             "geometry": null}
        ]
    }"#;

    #[test]
    fn indexes_both_tiers() {
        let index = build(BARRIOS);

        assert_eq!(index.name_property(), "BARRIO");
        assert_eq!(index.len(), 2);
        assert_eq!(index.lookup("PALERMO", Tier::Tier1), Some("PALERMO"));
        assert_eq!(index.lookup("NÚÑEZ", Tier::Tier1), Some("NÚÑEZ"));
        assert_eq!(index.lookup("NUNEZ", Tier::Tier2), Some("NÚÑEZ"));
        assert_eq!(index.lookup("NUNEZ", Tier::Tier1), None);
    }

    #[test]
    fn skips_features_without_names() {
        let index = build(BARRIOS);

        assert_eq!(
            index.skipped(),
            &[
                GeographicIssue::MissingNameProperty { feature_index: 2 },
                GeographicIssue::MissingNameProperty { feature_index: 3 },
            ]
        );
    }

    #[test]
    fn keyword_selector_is_case_insensitive_and_ordered() {
        let selector = KeywordSelector::default();
        assert_eq!(
            selector.select(&["OBJECTID", "Nombre_Barrio", "NEIGHBORHOOD_NAME"]),
            Some("NEIGHBORHOOD_NAME".to_string())
        );
        assert_eq!(
            selector.select(&["OBJECTID", "nombre"]),
            Some("nombre".to_string())
        );
    }

    #[test]
    fn keyword_selector_falls_back_to_first_key() {
        let selector = KeywordSelector::default();
        assert_eq!(
            selector.select(&["OBJECTID", "AREA"]),
            Some("OBJECTID".to_string())
        );
        assert_eq!(selector.select(&[]), None);
    }

    #[test]
    fn preserves_declared_key_order_for_fallback() {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"zona": "Belgrano", "area": 7.9}, "geometry": null}
        ]}"#;
        let index = build(json);
        assert_eq!(index.name_property(), "zona");
        assert_eq!(index.lookup("BELGRANO", Tier::Tier1), Some("BELGRANO"));
    }

    #[test]
    fn closures_are_selectors() {
        let pick_comuna = |keys: &[&str]| {
            keys.iter()
                .find(|k| **k == "COMUNA")
                .map(ToString::to_string)
        };
        let canon = Canonicalizer::default();
        let index = BoundaryIndex::build(&collection(BARRIOS), &pick_comuna, &canon).unwrap();

        assert_eq!(index.name_property(), "COMUNA");
        assert_eq!(index.lookup("14", Tier::Tier1), Some("14"));
        assert_eq!(index.lookup("1", Tier::Tier2), Some("1"));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn fixed_selector_requires_key() {
        let selector = FixedKeySelector("nombre".to_string());
        let err = BoundaryIndex::build(&collection(BARRIOS), &selector, &Canonicalizer::default())
            .unwrap_err();
        assert!(matches!(err, ResolutionError::NoNameProperty { .. }));
    }

    #[test]
    fn rejects_empty_and_propertyless_datasets() {
        let canon = Canonicalizer::default();
        assert!(matches!(
            BoundaryIndex::build(&[], &KeywordSelector::default(), &canon),
            Err(ResolutionError::EmptyBoundaries)
        ));

        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": null, "geometry": null}
        ]}"#;
        assert!(matches!(
            BoundaryIndex::build(&collection(json), &KeywordSelector::default(), &canon),
            Err(ResolutionError::NoProperties)
        ));
    }

    #[test]
    fn rejects_bare_geometry_and_garbage() {
        let canon = Canonicalizer::default();
        let selector = KeywordSelector::default();
        assert!(matches!(
            BoundaryIndex::from_geojson_str(
                r#"{"type": "Point", "coordinates": [0.0, 0.0]}"#,
                &selector,
                &canon
            ),
            Err(ResolutionError::Unsupported { .. })
        ));
        assert!(matches!(
            BoundaryIndex::from_geojson_str("not json", &selector, &canon),
            Err(ResolutionError::GeoJson(_))
        ));
    }

    #[test]
    fn tier2_collision_keeps_first() {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"barrio": "Nuñez"}, "geometry": null},
            {"type": "Feature", "properties": {"barrio": "Nunez"}, "geometry": null}
        ]}"#;
        let index = build(json);
        assert_eq!(index.lookup("NUNEZ", Tier::Tier2), Some("NUÑEZ"));
        assert_eq!(index.lookup("NUNEZ", Tier::Tier1), Some("NUNEZ"));
        assert_eq!(index.keys(Tier::Tier2).count(), 1);
    }

    #[test]
    fn tier1_collision_keeps_first() {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"barrio": "Palermo"}, "geometry": null},
            {"type": "Feature", "properties": {"barrio": "PALERMO "}, "geometry": null}
        ]}"#;
        let index = build(json);

        assert_eq!(index.len(), 1);
        assert_eq!(index.features()[0].name, "Palermo");
        let ids: Vec<_> = index
            .to_feature_collection()
            .features
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec![Some(feature::Id::String("PALERMO".to_string()))]);
        assert_eq!(
            index.skipped(),
            &[GeographicIssue::DuplicateBoundaryName {
                feature_index: 1,
                name: "PALERMO".to_string(),
            }]
        );
    }

    #[test]
    fn names_without_tier2_form_index_at_tier1_only() {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"name": "Кремль"}, "geometry": null}
        ]}"#;
        let index = build(json);

        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup("КРЕМЛЬ", Tier::Tier1), Some("КРЕМЛЬ"));
        assert_eq!(index.keys(Tier::Tier2).count(), 0);
        assert!(index.skipped().is_empty());
    }

    #[test]
    fn emits_features_with_join_ids() {
        let index = build(BARRIOS);
        let fc = index.to_feature_collection();
        let ids: Vec<_> = fc.features.iter().map(|f| f.id.clone()).collect();
        assert_eq!(
            ids,
            vec![
                Some(feature::Id::String("PALERMO".to_string())),
                Some(feature::Id::String("NÚÑEZ".to_string())),
            ]
        );
    }
}
