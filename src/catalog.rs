//! Fertilizer composition catalog.
//!
//! The catalog maps fertilizer names to per-unit-mass nutrient fractions and
//! is owned by the caller: it is loaded (or edited) once and then passed by
//! shared reference into every calculator or optimizer call, which only read
//! it. Rows are added, updated and removed through an explicit API rather
//! than free-form table mutation, and insertion order is preserved so that
//! the catalog round-trips through configuration files unchanged.

use crate::errors::{FertigateError, FertigateResult};
use crate::nutrient::Nutrient;
use crate::FloatValue;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Per-unit-mass nutrient content of one fertilizer.
///
/// Fractions are kg of nutrient per kg of fertilizer, in `[0, 1]`. Absent
/// nutrients are implicitly zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FertilizerComposition {
    fractions: BTreeMap<Nutrient, FloatValue>,
}

impl FertilizerComposition {
    /// An empty composition (contributes nothing to any channel).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a composition from `(nutrient, fraction)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`FertigateError::NegativeFraction`] if any fraction is
    /// negative. Zero fractions are dropped rather than stored.
    pub fn from_fractions<I>(fractions: I) -> FertigateResult<Self>
    where
        I: IntoIterator<Item = (Nutrient, FloatValue)>,
    {
        let mut composition = Self::new();
        for (nutrient, fraction) in fractions {
            composition.set(nutrient, fraction)?;
        }
        Ok(composition)
    }

    /// Set the fraction for one nutrient, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`FertigateError::NegativeFraction`] if `fraction` is
    /// negative.
    pub fn set(&mut self, nutrient: Nutrient, fraction: FloatValue) -> FertigateResult<()> {
        if fraction < 0.0 {
            return Err(FertigateError::NegativeFraction {
                nutrient,
                value: fraction,
            });
        }
        if fraction == 0.0 {
            self.fractions.remove(&nutrient);
        } else {
            self.fractions.insert(nutrient, fraction);
        }
        Ok(())
    }

    /// Mass fraction for one nutrient; zero when the nutrient is absent.
    pub fn fraction(&self, nutrient: Nutrient) -> FloatValue {
        self.fractions.get(&nutrient).copied().unwrap_or(0.0)
    }

    /// Iterate over the non-zero `(nutrient, fraction)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Nutrient, FloatValue)> + '_ {
        self.fractions.iter().map(|(&n, &f)| (n, f))
    }

    /// Whether the composition has no non-zero fraction.
    pub fn is_empty(&self) -> bool {
        self.fractions.is_empty()
    }
}

/// Name-keyed, insertion-ordered collection of fertilizer compositions.
///
/// # Example
///
/// ```rust
/// use fertigate::catalog::{FertilizerCatalog, FertilizerComposition};
/// use fertigate::nutrient::Nutrient;
///
/// let mut catalog = FertilizerCatalog::new();
/// catalog
///     .add(
///         "KNO3",
///         FertilizerComposition::from_fractions([
///             (Nutrient::NitrateN, 0.135),
///             (Nutrient::Potassium, 0.38),
///         ])
///         .unwrap(),
///     )
///     .unwrap();
///
/// assert_eq!(catalog.get("KNO3").unwrap().fraction(Nutrient::Potassium), 0.38);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FertilizerCatalog {
    entries: HashMap<String, FertilizerComposition>,
    order: Vec<String>,
}

impl FertilizerCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// The built-in thirteen-entry fertilizer library covering the common
    /// fertigation salts, from urea through the sulfate trace carriers.
    pub fn standard() -> Self {
        use Nutrient::*;

        let entries: [(&str, &[(Nutrient, FloatValue)]); 13] = [
            ("Urea", &[(UreaN, 0.46)]),
            ("MAP", &[(AmmoniumN, 0.12), (Phosphorus, 0.266)]),
            ("MKP", &[(Phosphorus, 0.227), (Potassium, 0.299)]),
            ("KNO3", &[(NitrateN, 0.135), (Potassium, 0.38)]),
            ("K2SO4", &[(Potassium, 0.446), (SulfateS, 0.18)]),
            ("Mg(NO3)2", &[(NitrateN, 0.10), (Magnesium, 0.09)]),
            ("MgSO4", &[(Magnesium, 0.095), (SulfateS, 0.125)]),
            ("Ca(NO3)2", &[(NitrateN, 0.11), (Calcium, 0.16)]),
            ("(NH4)2SO4", &[(AmmoniumN, 0.21), (SulfateS, 0.24)]),
            ("Fe chelate", &[(Iron, 0.13)]),
            ("MnSO4", &[(SulfateS, 0.18), (Manganese, 0.31)]),
            ("ZnSO4", &[(SulfateS, 0.17), (Zinc, 0.35)]),
            ("Borax", &[(Boron, 0.11)]),
        ];

        let mut catalog = Self::new();
        for (name, fractions) in entries {
            let composition = FertilizerComposition::from_fractions(fractions.iter().copied())
                .expect("standard catalog entries are well-formed");
            catalog
                .add(name, composition)
                .expect("standard catalog names are unique");
        }
        catalog
    }

    /// Add a new fertilizer.
    ///
    /// # Errors
    ///
    /// Returns [`FertigateError::DuplicateFertilizer`] if the name is
    /// already present.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        composition: FertilizerComposition,
    ) -> FertigateResult<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(FertigateError::DuplicateFertilizer(name));
        }
        self.order.push(name.clone());
        self.entries.insert(name, composition);
        Ok(())
    }

    /// Replace the composition of an existing fertilizer.
    ///
    /// # Errors
    ///
    /// Returns [`FertigateError::UnknownFertilizer`] if the name is not
    /// present.
    pub fn update(
        &mut self,
        name: &str,
        composition: FertilizerComposition,
    ) -> FertigateResult<()> {
        match self.entries.get_mut(name) {
            Some(entry) => {
                *entry = composition;
                Ok(())
            }
            None => Err(FertigateError::UnknownFertilizer(name.to_string())),
        }
    }

    /// Remove a fertilizer, returning its composition.
    ///
    /// # Errors
    ///
    /// Returns [`FertigateError::UnknownFertilizer`] if the name is not
    /// present.
    pub fn remove(&mut self, name: &str) -> FertigateResult<FertilizerComposition> {
        match self.entries.remove(name) {
            Some(composition) => {
                self.order.retain(|n| n != name);
                Ok(composition)
            }
            None => Err(FertigateError::UnknownFertilizer(name.to_string())),
        }
    }

    /// Look up a composition by name.
    pub fn get(&self, name: &str) -> Option<&FertilizerComposition> {
        self.entries.get(name)
    }

    /// Whether the catalog contains `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Fertilizer names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Iterate over `(name, composition)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FertilizerComposition)> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name).map(|c| (name.as_str(), c)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for FertilizerCatalog {
    fn default() -> Self {
        Self::new()
    }
}

// The catalog serialises as a plain ordered map of name -> composition so a
// configuration file reads as a table per fertilizer. The derive form would
// leak the internal entries/order split.
impl Serialize for FertilizerCatalog {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.order.len()))?;
        for (name, composition) in self.iter() {
            map.serialize_entry(name, composition)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FertilizerCatalog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CatalogVisitor;

        impl<'de> Visitor<'de> for CatalogVisitor {
            type Value = FertilizerCatalog;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of fertilizer names to composition tables")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut catalog = FertilizerCatalog::new();
                while let Some((name, composition)) =
                    access.next_entry::<String, FertilizerComposition>()?
                {
                    catalog
                        .add(name, composition)
                        .map_err(serde::de::Error::custom)?;
                }
                Ok(catalog)
            }
        }

        deserializer.deserialize_map(CatalogVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kno3() -> FertilizerComposition {
        FertilizerComposition::from_fractions([
            (Nutrient::NitrateN, 0.135),
            (Nutrient::Potassium, 0.38),
        ])
        .unwrap()
    }

    #[test]
    fn test_absent_nutrients_are_zero() {
        let composition = kno3();
        assert_eq!(composition.fraction(Nutrient::NitrateN), 0.135);
        assert_eq!(composition.fraction(Nutrient::Calcium), 0.0);
    }

    #[test]
    fn test_negative_fraction_rejected() {
        let result = FertilizerComposition::from_fractions([(Nutrient::Potassium, -0.1)]);
        assert!(matches!(
            result,
            Err(FertigateError::NegativeFraction {
                nutrient: Nutrient::Potassium,
                ..
            })
        ));
    }

    #[test]
    fn test_zero_fractions_are_dropped() {
        let composition =
            FertilizerComposition::from_fractions([(Nutrient::Potassium, 0.0)]).unwrap();
        assert!(composition.is_empty());
    }

    #[test]
    fn test_add_and_get() {
        let mut catalog = FertilizerCatalog::new();
        catalog.add("KNO3", kno3()).unwrap();

        assert!(catalog.contains("KNO3"));
        assert_eq!(
            catalog.get("KNO3").unwrap().fraction(Nutrient::Potassium),
            0.38
        );
        assert!(catalog.get("MAP").is_none());
    }

    #[test]
    fn test_duplicate_rejection() {
        let mut catalog = FertilizerCatalog::new();
        catalog.add("KNO3", kno3()).unwrap();

        let result = catalog.add("KNO3", FertilizerComposition::new());
        assert!(matches!(result, Err(FertigateError::DuplicateFertilizer(name)) if name == "KNO3"));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_update_unknown_name() {
        let mut catalog = FertilizerCatalog::new();
        let result = catalog.update("MAP", FertilizerComposition::new());
        assert!(matches!(result, Err(FertigateError::UnknownFertilizer(name)) if name == "MAP"));
    }

    #[test]
    fn test_remove() {
        let mut catalog = FertilizerCatalog::new();
        catalog.add("KNO3", kno3()).unwrap();

        let removed = catalog.remove("KNO3").unwrap();
        assert_eq!(removed.fraction(Nutrient::NitrateN), 0.135);
        assert!(catalog.is_empty());
        assert!(catalog.remove("KNO3").is_err());
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut catalog = FertilizerCatalog::new();
        catalog.add("Urea", FertilizerComposition::new()).unwrap();
        catalog.add("Borax", FertilizerComposition::new()).unwrap();
        catalog.add("MAP", FertilizerComposition::new()).unwrap();
        catalog.remove("Borax").unwrap();

        let names: Vec<&str> = catalog.names().collect();
        assert_eq!(names, vec!["Urea", "MAP"]);
    }

    #[test]
    fn test_standard_library() {
        let catalog = FertilizerCatalog::standard();
        assert_eq!(catalog.len(), 13);

        let kno3 = catalog.get("KNO3").unwrap();
        assert_eq!(kno3.fraction(Nutrient::NitrateN), 0.135);
        assert_eq!(kno3.fraction(Nutrient::Potassium), 0.38);

        let urea = catalog.get("Urea").unwrap();
        assert_eq!(urea.fraction(Nutrient::UreaN), 0.46);

        // Every stored fraction is a plausible mass fraction
        for (name, composition) in catalog.iter() {
            for (nutrient, fraction) in composition.iter() {
                assert!(
                    fraction > 0.0 && fraction <= 1.0,
                    "{} {} fraction out of range: {}",
                    name,
                    nutrient,
                    fraction
                );
            }
        }
    }

    #[test]
    fn test_serde_round_trip_preserves_order() {
        let mut catalog = FertilizerCatalog::new();
        catalog.add("Urea", FertilizerComposition::new()).unwrap();
        catalog.add("KNO3", kno3()).unwrap();
        catalog.add("MAP", FertilizerComposition::new()).unwrap();

        let json = serde_json::to_string(&catalog).unwrap();
        let parsed: FertilizerCatalog = serde_json::from_str(&json).unwrap();

        let names: Vec<&str> = parsed.names().collect();
        assert_eq!(names, vec!["Urea", "KNO3", "MAP"]);
        assert_eq!(parsed, catalog);
    }

    #[test]
    fn test_deserialize_rejects_duplicate_names() {
        let json = r#"{"KNO3": {"K": 0.38}, "KNO3": {"K": 0.4}}"#;
        let result: Result<FertilizerCatalog, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
