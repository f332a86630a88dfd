//! System parameters and raw-water baseline.
//!
//! [`SystemParameters`] describes the dosing hardware: how much concentrated
//! stock is mixed per batch and what fraction of it is injected per unit of
//! irrigation water. [`RawWaterBaseline`] describes what the source water
//! already carries before any fertilizer is added.

use crate::constants::MG_PER_KG;
use crate::errors::{FertigateError, FertigateResult};
use crate::nutrient::Nutrient;
use crate::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stock-tank and injection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemParameters {
    /// Stock-tank volume
    /// unit: L
    /// default: 1000.0
    pub tank_volume: FloatValue,

    /// Proportion of stock solution drawn per unit of final irrigation
    /// water.
    /// unit: dimensionless fraction
    /// default: 0.0053 (0.53 %)
    pub injection_ratio: FloatValue,

    /// Calibration multiplier on the meq-derived EC estimate, compensating
    /// for non-ideality of real solutions.
    /// unit: dimensionless
    /// default: 1.08
    pub ec_calibration: FloatValue,
}

impl Default for SystemParameters {
    fn default() -> Self {
        Self {
            tank_volume: 1000.0,
            injection_ratio: 0.0053,
            ec_calibration: 1.08,
        }
    }
}

impl SystemParameters {
    /// Create parameters from explicit values.
    pub fn new(
        tank_volume: FloatValue,
        injection_ratio: FloatValue,
        ec_calibration: FloatValue,
    ) -> Self {
        Self {
            tank_volume,
            injection_ratio,
            ec_calibration,
        }
    }

    /// Create parameters with the dosing ratio given as a percentage, the
    /// convention used by dosing-pump frontends (`0.53` means 0.53 %).
    pub fn from_dosing_percentage(
        tank_volume: FloatValue,
        dosing_percent: FloatValue,
        ec_calibration: FloatValue,
    ) -> Self {
        Self::new(tank_volume, dosing_percent / 100.0, ec_calibration)
    }

    /// Check the preconditions every conversion relies on.
    ///
    /// # Errors
    ///
    /// Returns [`FertigateError::DegenerateConfiguration`] when the tank
    /// volume or injection ratio is not strictly positive.
    pub fn validate(&self) -> FertigateResult<()> {
        if self.tank_volume <= 0.0 {
            return Err(FertigateError::DegenerateConfiguration {
                parameter: "tank volume",
                value: self.tank_volume,
            });
        }
        if self.injection_ratio <= 0.0 {
            return Err(FertigateError::DegenerateConfiguration {
                parameter: "injection ratio",
                value: self.injection_ratio,
            });
        }
        Ok(())
    }

    /// Conversion factor from kilograms dosed into the stock tank to ppm in
    /// the irrigation line: `1e6 * injection_ratio / tank_volume`.
    ///
    /// # Errors
    ///
    /// Returns [`FertigateError::DegenerateConfiguration`] instead of
    /// dividing by a non-positive tank volume.
    pub fn dilution_factor(&self) -> FertigateResult<FloatValue> {
        self.validate()?;
        Ok(MG_PER_KG * self.injection_ratio / self.tank_volume)
    }
}

/// Background nutrient content of the source water.
///
/// An additive offset on every channel except urea nitrogen, which is never
/// assumed present in raw water. Unlisted nutrients are zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawWaterBaseline {
    /// Per-nutrient background concentration
    /// unit: ppm
    #[serde(default)]
    pub concentrations: BTreeMap<Nutrient, FloatValue>,

    /// Baseline electrical conductivity of the source water
    /// unit: dS/m
    #[serde(default)]
    pub ec: FloatValue,
}

impl RawWaterBaseline {
    /// A baseline with no dissolved nutrients and zero EC.
    pub fn new() -> Self {
        Self::default()
    }

    /// Background concentration for one nutrient (ppm); zero when unlisted.
    pub fn concentration(&self, nutrient: Nutrient) -> FloatValue {
        self.concentrations.get(&nutrient).copied().unwrap_or(0.0)
    }

    /// Set the background concentration for one nutrient.
    pub fn set_concentration(&mut self, nutrient: Nutrient, ppm: FloatValue) {
        self.concentrations.insert(nutrient, ppm);
    }
}
