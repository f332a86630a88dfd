//! Nutrient channels and balance ions.
//!
//! The catalog, the raw-water baseline and every computed concentration are
//! keyed by [`Nutrient`], a closed enum of the fourteen channels a
//! fertigation program tracks. Nitrogen is split into its three agronomic
//! forms (nitrate, ammonium and urea) because they behave differently in the
//! ion balance and in raw water.
//!
//! [`Ion`] lists the seven dissolved species that enter the charge-balance
//! diagnostic, each tied to the nutrient channel that carries it and to the
//! equivalent weight used to convert ppm into meq/L.

use crate::constants::{
    EQ_WEIGHT_AMMONIUM, EQ_WEIGHT_CALCIUM, EQ_WEIGHT_MAGNESIUM, EQ_WEIGHT_NITRATE,
    EQ_WEIGHT_PHOSPHATE, EQ_WEIGHT_POTASSIUM, EQ_WEIGHT_SULFATE,
};
use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// A tracked nutrient channel.
///
/// The declaration order matches the column order of the standard catalog,
/// so iterating a `BTreeMap` keyed by `Nutrient` reproduces that order.
/// Serde maps each variant to the conventional column symbol (e.g. `NO3-N`),
/// which keeps maps keyed by `Nutrient` readable in TOML and JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Nutrient {
    /// Nitrate nitrogen.
    #[serde(rename = "NO3-N")]
    NitrateN,
    /// Ammonium nitrogen.
    #[serde(rename = "NH4-N")]
    AmmoniumN,
    /// Phosphorus (elemental basis).
    #[serde(rename = "P")]
    Phosphorus,
    /// Potassium.
    #[serde(rename = "K")]
    Potassium,
    /// Magnesium.
    #[serde(rename = "Mg")]
    Magnesium,
    /// Calcium.
    #[serde(rename = "Ca")]
    Calcium,
    /// Iron (chelated).
    #[serde(rename = "Fe")]
    Iron,
    /// Sulfur delivered as sulfate (elemental S basis).
    #[serde(rename = "SO4-S")]
    SulfateS,
    /// Manganese.
    #[serde(rename = "Mn")]
    Manganese,
    /// Zinc.
    #[serde(rename = "Zn")]
    Zinc,
    /// Copper.
    #[serde(rename = "Cu")]
    Copper,
    /// Boron.
    #[serde(rename = "B")]
    Boron,
    /// Molybdenum.
    #[serde(rename = "Mo")]
    Molybdenum,
    /// Urea nitrogen. Assumed absent from raw water; the calculator reports
    /// it as pure fertilizer contribution.
    #[serde(rename = "Urea-N")]
    UreaN,
}

impl Nutrient {
    /// Every tracked channel, in catalog column order.
    pub const ALL: [Nutrient; 14] = [
        Nutrient::NitrateN,
        Nutrient::AmmoniumN,
        Nutrient::Phosphorus,
        Nutrient::Potassium,
        Nutrient::Magnesium,
        Nutrient::Calcium,
        Nutrient::Iron,
        Nutrient::SulfateS,
        Nutrient::Manganese,
        Nutrient::Zinc,
        Nutrient::Copper,
        Nutrient::Boron,
        Nutrient::Molybdenum,
        Nutrient::UreaN,
    ];

    /// Conventional column symbol, e.g. `"NO3-N"`.
    pub fn symbol(&self) -> &'static str {
        match self {
            Nutrient::NitrateN => "NO3-N",
            Nutrient::AmmoniumN => "NH4-N",
            Nutrient::Phosphorus => "P",
            Nutrient::Potassium => "K",
            Nutrient::Magnesium => "Mg",
            Nutrient::Calcium => "Ca",
            Nutrient::Iron => "Fe",
            Nutrient::SulfateS => "SO4-S",
            Nutrient::Manganese => "Mn",
            Nutrient::Zinc => "Zn",
            Nutrient::Copper => "Cu",
            Nutrient::Boron => "B",
            Nutrient::Molybdenum => "Mo",
            Nutrient::UreaN => "Urea-N",
        }
    }

    /// Whether this channel belongs to the primary macro-nutrient set
    /// {NO3-N, NH4-N, P, K, Ca, Mg}.
    ///
    /// Blend design penalises deviations on these channels far more heavily
    /// than on trace channels.
    pub fn is_macro(&self) -> bool {
        matches!(
            self,
            Nutrient::NitrateN
                | Nutrient::AmmoniumN
                | Nutrient::Phosphorus
                | Nutrient::Potassium
                | Nutrient::Calcium
                | Nutrient::Magnesium
        )
    }

    /// Whether this channel is one of the three nitrogen forms summed into
    /// total nitrogen.
    pub fn is_nitrogen(&self) -> bool {
        matches!(
            self,
            Nutrient::NitrateN | Nutrient::AmmoniumN | Nutrient::UreaN
        )
    }
}

impl std::fmt::Display for Nutrient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A dissolved species entering the charge-balance diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ion {
    #[serde(rename = "NH4+")]
    Ammonium,
    #[serde(rename = "K+")]
    Potassium,
    #[serde(rename = "Ca2+")]
    Calcium,
    #[serde(rename = "Mg2+")]
    Magnesium,
    #[serde(rename = "NO3-")]
    Nitrate,
    #[serde(rename = "H2PO4-")]
    DihydrogenPhosphate,
    #[serde(rename = "SO4 2-")]
    Sulfate,
}

impl Ion {
    /// The positively charged species.
    pub const CATIONS: [Ion; 4] = [Ion::Ammonium, Ion::Potassium, Ion::Calcium, Ion::Magnesium];

    /// The negatively charged species.
    pub const ANIONS: [Ion; 3] = [Ion::Nitrate, Ion::DihydrogenPhosphate, Ion::Sulfate];

    /// Display symbol, e.g. `"NH4+"`.
    pub fn symbol(&self) -> &'static str {
        match self {
            Ion::Ammonium => "NH4+",
            Ion::Potassium => "K+",
            Ion::Calcium => "Ca2+",
            Ion::Magnesium => "Mg2+",
            Ion::Nitrate => "NO3-",
            Ion::DihydrogenPhosphate => "H2PO4-",
            Ion::Sulfate => "SO4 2-",
        }
    }

    /// The nutrient channel whose ppm carries this ion.
    pub fn source(&self) -> Nutrient {
        match self {
            Ion::Ammonium => Nutrient::AmmoniumN,
            Ion::Potassium => Nutrient::Potassium,
            Ion::Calcium => Nutrient::Calcium,
            Ion::Magnesium => Nutrient::Magnesium,
            Ion::Nitrate => Nutrient::NitrateN,
            Ion::DihydrogenPhosphate => Nutrient::Phosphorus,
            Ion::Sulfate => Nutrient::SulfateS,
        }
    }

    /// Equivalent weight (g/eq) dividing the source channel's ppm to give
    /// meq/L. Nitrogen and phosphorus species use the element basis of their
    /// source channels.
    pub fn equivalent_weight(&self) -> FloatValue {
        match self {
            Ion::Ammonium => EQ_WEIGHT_AMMONIUM,
            Ion::Potassium => EQ_WEIGHT_POTASSIUM,
            Ion::Calcium => EQ_WEIGHT_CALCIUM,
            Ion::Magnesium => EQ_WEIGHT_MAGNESIUM,
            Ion::Nitrate => EQ_WEIGHT_NITRATE,
            Ion::DihydrogenPhosphate => EQ_WEIGHT_PHOSPHATE,
            Ion::Sulfate => EQ_WEIGHT_SULFATE,
        }
    }

    /// Whether the ion is positively charged.
    pub fn is_cation(&self) -> bool {
        matches!(
            self,
            Ion::Ammonium | Ion::Potassium | Ion::Calcium | Ion::Magnesium
        )
    }
}

impl std::fmt::Display for Ion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_complete_and_ordered() {
        assert_eq!(Nutrient::ALL.len(), 14);
        assert_eq!(Nutrient::ALL[0], Nutrient::NitrateN);
        assert_eq!(Nutrient::ALL[13], Nutrient::UreaN);

        // Declaration order backs the Ord derive, so a sorted copy is a no-op
        let mut sorted = Nutrient::ALL;
        sorted.sort();
        assert_eq!(sorted, Nutrient::ALL);
    }

    #[test]
    fn test_macro_tier_membership() {
        let macros: Vec<Nutrient> = Nutrient::ALL.iter().copied().filter(Nutrient::is_macro).collect();
        assert_eq!(
            macros,
            vec![
                Nutrient::NitrateN,
                Nutrient::AmmoniumN,
                Nutrient::Phosphorus,
                Nutrient::Potassium,
                Nutrient::Magnesium,
                Nutrient::Calcium,
            ]
        );
        assert!(!Nutrient::Iron.is_macro());
        assert!(!Nutrient::UreaN.is_macro());
    }

    #[test]
    fn test_nitrogen_forms() {
        let forms: Vec<Nutrient> = Nutrient::ALL
            .iter()
            .copied()
            .filter(Nutrient::is_nitrogen)
            .collect();
        assert_eq!(
            forms,
            vec![Nutrient::NitrateN, Nutrient::AmmoniumN, Nutrient::UreaN]
        );
    }

    #[test]
    fn test_symbol_serde_round_trip() {
        for nutrient in Nutrient::ALL {
            let json = serde_json::to_string(&nutrient).unwrap();
            assert_eq!(json, format!("\"{}\"", nutrient.symbol()));

            let parsed: Nutrient = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, nutrient);
        }
    }

    #[test]
    fn test_ion_partition() {
        assert_eq!(Ion::CATIONS.len() + Ion::ANIONS.len(), 7);
        assert!(Ion::CATIONS.iter().all(Ion::is_cation));
        assert!(Ion::ANIONS.iter().all(|ion| !ion.is_cation()));
    }

    #[test]
    fn test_equivalent_weights_positive() {
        for ion in Ion::CATIONS.iter().chain(Ion::ANIONS.iter()) {
            assert!(
                ion.equivalent_weight() > 0.0,
                "{} should have a positive equivalent weight",
                ion
            );
        }
    }

    #[test]
    fn test_sulfate_uses_elemental_sulfur_basis() {
        // Half the atomic mass of sulfur, not the mass of the full SO4 ion
        assert!((Ion::Sulfate.equivalent_weight() - 16.03).abs() < 1e-10);
        assert_eq!(Ion::Sulfate.source(), Nutrient::SulfateS);
    }
}
