//! Numeric constants shared by the calculator and the optimizer.
//!
//! Centralises the fixed values used throughout the crate so that the
//! forward calculation and the inverse (blend design) problem are guaranteed
//! to use the same conversions.

use crate::FloatValue;

// -- Unit conversion --

/// Milligrams per kilogram. Converts a kg/L mass concentration into mg/L
/// (ppm) once the dilution ratio has cancelled the volume units.
pub const MG_PER_KG: FloatValue = 1_000_000.0;

// -- Conductivity estimate --

/// Empirical total-meq/L per unit of electrical conductivity (dS/m).
/// The combined cation and anion equivalent sum divided by this constant
/// approximates the EC contributed by dissolved fertilizer salts.
pub const MEQ_PER_EC_UNIT: FloatValue = 20.0;

// -- Dosing plan handling --

/// Dosages below this mass (kg) are treated as "fertilizer not used" when a
/// solved plan is reported.
pub const DOSE_EPSILON: FloatValue = 0.001;

/// Default per-fertilizer dosage upper bound (kg) for blend design. Generous
/// enough not to bind realistic recipes while keeping the program bounded.
pub const DEFAULT_DOSE_CAP: FloatValue = 100.0;

// -- Blend-design objective weights --

/// Deviation penalty for the primary macro nutrients (NO3-N, NH4-N, P, K,
/// Ca, Mg).
pub const MACRO_DEVIATION_WEIGHT: FloatValue = 100.0;

/// Deviation penalty for every other tracked nutrient.
pub const TRACE_DEVIATION_WEIGHT: FloatValue = 1.0;

/// Weight on total dosage mass in the best-effort objective. Small relative
/// to the deviation weights so that accuracy is never traded away just to
/// save fertilizer.
pub const DOSAGE_MASS_WEIGHT: FloatValue = 0.01;

// -- Ionic equivalent weights (g/eq) --
// Dividing a nutrient's ppm by the equivalent weight of the ion carrying it
// yields meq/L.

/// NH4+ carried by the NH4-N channel (N basis).
pub const EQ_WEIGHT_AMMONIUM: FloatValue = 14.01;

/// K+.
pub const EQ_WEIGHT_POTASSIUM: FloatValue = 39.1;

/// Ca2+.
pub const EQ_WEIGHT_CALCIUM: FloatValue = 20.04;

/// Mg2+.
pub const EQ_WEIGHT_MAGNESIUM: FloatValue = 12.15;

/// NO3- carried by the NO3-N channel (N basis).
pub const EQ_WEIGHT_NITRATE: FloatValue = 14.01;

/// H2PO4- carried by the P channel (P basis).
pub const EQ_WEIGHT_PHOSPHATE: FloatValue = 30.97;

/// SO4 2- carried by the SO4-S channel. The catalog stores elemental
/// sulfur delivered as sulfate, so the divisor is half the atomic mass of S
/// (32.06 / 2). A 48.03 divisor would correspond to a full-ion-mass column
/// convention, which this crate does not use.
pub const EQ_WEIGHT_SULFATE: FloatValue = 16.03;
