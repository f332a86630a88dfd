//! TOML description of a complete computation request.
//!
//! A [`Scenario`] bundles everything one calculator or optimizer call needs:
//! the catalog, the system parameters, the raw-water baseline and — depending
//! on the direction of the computation — either a dosing plan to back-test or
//! target concentrations to design a blend for. Scenarios round-trip through
//! TOML so a whole request can live in a single file:
//!
//! ```toml
//! [parameters]
//! tank_volume = 1000.0
//! injection_ratio = 0.0053
//! ec_calibration = 1.08
//!
//! [water]
//! ec = 0.05
//!
//! [water.concentrations]
//! "Ca" = 24.0
//!
//! [catalog.KNO3]
//! "NO3-N" = 0.135
//! "K" = 0.38
//!
//! [targets]
//! "NO3-N" = 100.0
//! "K" = 180.0
//! ```

use crate::catalog::FertilizerCatalog;
use crate::errors::{FertigateError, FertigateResult};
use crate::optimizer::NutrientTargets;
use crate::parameters::{RawWaterBaseline, SystemParameters};
use crate::solution::DosingPlan;
use serde::{Deserialize, Serialize};

/// One self-contained computation request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scenario {
    /// Tank and injection parameters.
    #[serde(default)]
    pub parameters: SystemParameters,

    /// Raw-water baseline.
    #[serde(default)]
    pub water: RawWaterBaseline,

    /// Fertilizer catalog.
    #[serde(default)]
    pub catalog: FertilizerCatalog,

    /// Target concentrations for blend design, when this scenario is an
    /// optimization request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<NutrientTargets>,

    /// Dosing plan to back-test, when this scenario is a calculator
    /// request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<DosingPlan>,
}

impl Scenario {
    /// Parse a scenario from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`FertigateError::MalformedScenario`] when the document does
    /// not parse or violates a catalog invariant (duplicate fertilizer
    /// names, negative fractions).
    pub fn from_toml_str(document: &str) -> FertigateResult<Self> {
        toml::from_str(document).map_err(|err| FertigateError::MalformedScenario(err.to_string()))
    }

    /// Serialise the scenario to a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`FertigateError::MalformedScenario`] when the scenario
    /// cannot be represented as TOML.
    pub fn to_toml_string(&self) -> FertigateResult<String> {
        toml::to_string(self).map_err(|err| FertigateError::MalformedScenario(err.to_string()))
    }
}
