//! Concentration calculator.
//!
//! Turns a dosing plan into what actually reaches the irrigation line:
//!
//! 1. Each dosed fertilizer contributes
//!    `dose_kg * dilution_factor * fraction` ppm to every nutrient channel
//!    it carries, where the dilution factor scales a kilogram in the stock
//!    tank down to mg/L in the diluted line.
//! 2. The raw-water baseline is added to every channel except urea
//!    nitrogen, which is reported as pure fertilizer contribution.
//! 3. Ion equivalents, total nitrogen and an EC estimate are derived from
//!    the final concentrations.
//!
//! Plan entries naming fertilizers absent from the catalog contribute
//! nothing; the calculator logs a warning and carries on.

use crate::catalog::FertilizerCatalog;
use crate::constants::MEQ_PER_EC_UNIT;
use crate::errors::FertigateResult;
use crate::nutrient::{Ion, Nutrient};
use crate::parameters::{RawWaterBaseline, SystemParameters};
use crate::FloatValue;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fertilizer masses (kg) added per batch of concentrated stock solution.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DosingPlan {
    doses: BTreeMap<String, FloatValue>,
}

impl DosingPlan {
    /// An empty plan (doses nothing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dose for one fertilizer, replacing any previous value.
    pub fn set(&mut self, fertilizer: impl Into<String>, kilograms: FloatValue) {
        self.doses.insert(fertilizer.into(), kilograms);
    }

    /// Dose for one fertilizer (kg); zero when unlisted.
    pub fn dose(&self, fertilizer: &str) -> FloatValue {
        self.doses.get(fertilizer).copied().unwrap_or(0.0)
    }

    /// Iterate over `(fertilizer, kg)` entries, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, FloatValue)> {
        self.doses.iter().map(|(name, &kg)| (name.as_str(), kg))
    }

    /// Total fertilizer mass in the plan (kg).
    pub fn total_mass(&self) -> FloatValue {
        self.doses.values().sum()
    }

    /// Drop entries with doses below `epsilon` (kg). Such entries are
    /// treated as "fertilizer not used" for reporting.
    pub fn prune(&mut self, epsilon: FloatValue) {
        self.doses.retain(|_, kg| *kg >= epsilon);
    }

    pub fn len(&self) -> usize {
        self.doses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doses.is_empty()
    }
}

impl FromIterator<(String, FloatValue)> for DosingPlan {
    fn from_iter<I: IntoIterator<Item = (String, FloatValue)>>(iter: I) -> Self {
        Self {
            doses: iter.into_iter().collect(),
        }
    }
}

/// Charge-balance diagnostic in meq/L.
///
/// Each field is the final ppm of the carrying nutrient channel divided by
/// the ion's equivalent weight. In a well-balanced solution the cation and
/// anion sums come out approximately equal; the charge difference surfaces
/// imbalance without enforcing it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IonBalance {
    pub ammonium: FloatValue,
    pub potassium: FloatValue,
    pub calcium: FloatValue,
    pub magnesium: FloatValue,
    pub nitrate: FloatValue,
    pub phosphate: FloatValue,
    pub sulfate: FloatValue,
}

impl IonBalance {
    /// Derive the balance from final per-nutrient concentrations (ppm).
    pub fn from_concentrations(concentrations: &BTreeMap<Nutrient, FloatValue>) -> Self {
        let meq = |ion: Ion| -> FloatValue {
            let ppm = concentrations.get(&ion.source()).copied().unwrap_or(0.0);
            ppm / ion.equivalent_weight()
        };

        Self {
            ammonium: meq(Ion::Ammonium),
            potassium: meq(Ion::Potassium),
            calcium: meq(Ion::Calcium),
            magnesium: meq(Ion::Magnesium),
            nitrate: meq(Ion::Nitrate),
            phosphate: meq(Ion::DihydrogenPhosphate),
            sulfate: meq(Ion::Sulfate),
        }
    }

    /// meq/L for one ion.
    pub fn meq(&self, ion: Ion) -> FloatValue {
        match ion {
            Ion::Ammonium => self.ammonium,
            Ion::Potassium => self.potassium,
            Ion::Calcium => self.calcium,
            Ion::Magnesium => self.magnesium,
            Ion::Nitrate => self.nitrate,
            Ion::DihydrogenPhosphate => self.phosphate,
            Ion::Sulfate => self.sulfate,
        }
    }

    /// Sum over NH4+, K+, Ca2+ and Mg2+.
    pub fn cation_sum(&self) -> FloatValue {
        self.ammonium + self.potassium + self.calcium + self.magnesium
    }

    /// Sum over NO3-, H2PO4- and SO4 2-.
    pub fn anion_sum(&self) -> FloatValue {
        self.nitrate + self.phosphate + self.sulfate
    }

    /// Cation sum minus anion sum. Near zero for a balanced solution.
    pub fn charge_difference(&self) -> FloatValue {
        self.cation_sum() - self.anion_sum()
    }
}

/// Everything the calculator derives from one dosing plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionReport {
    /// Final concentration per nutrient channel (ppm): fertilizer
    /// contribution plus raw-water baseline, except urea nitrogen which
    /// carries no baseline term.
    pub concentrations: BTreeMap<Nutrient, FloatValue>,

    /// NO3-N + NH4-N + Urea-N final ppm.
    pub total_nitrogen: FloatValue,

    /// Charge-balance diagnostic.
    pub ion_balance: IonBalance,

    /// Estimated electrical conductivity (dS/m):
    /// `(cation_sum + anion_sum) / 20 * ec_calibration + baseline EC`.
    pub estimated_ec: FloatValue,
}

impl SolutionReport {
    /// Final concentration for one nutrient channel (ppm).
    pub fn ppm(&self, nutrient: Nutrient) -> FloatValue {
        self.concentrations.get(&nutrient).copied().unwrap_or(0.0)
    }

    pub fn cation_sum(&self) -> FloatValue {
        self.ion_balance.cation_sum()
    }

    pub fn anion_sum(&self) -> FloatValue {
        self.ion_balance.anion_sum()
    }

    pub fn charge_difference(&self) -> FloatValue {
        self.ion_balance.charge_difference()
    }
}

/// The concentration calculator.
///
/// Holds the system parameters; the catalog, plan and raw water are passed
/// into each [`compute`](SolutionCalculator::compute) call so one
/// calculator can serve many requests against an externally-owned catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionCalculator {
    parameters: SystemParameters,
}

impl SolutionCalculator {
    /// Create a calculator from system parameters.
    pub fn from_parameters(parameters: SystemParameters) -> Self {
        Self { parameters }
    }

    /// Get the parameters.
    pub fn parameters(&self) -> &SystemParameters {
        &self.parameters
    }

    /// Compute the resulting solution for one dosing plan.
    ///
    /// # Errors
    ///
    /// Returns [`FertigateError::DegenerateConfiguration`] when the
    /// parameters fail validation. Plan entries naming fertilizers absent
    /// from the catalog are ignored with a warning.
    ///
    /// [`FertigateError::DegenerateConfiguration`]: crate::errors::FertigateError::DegenerateConfiguration
    pub fn compute(
        &self,
        catalog: &FertilizerCatalog,
        plan: &DosingPlan,
        water: &RawWaterBaseline,
    ) -> FertigateResult<SolutionReport> {
        let factor = self.parameters.dilution_factor()?;

        let mut concentrations: BTreeMap<Nutrient, FloatValue> =
            Nutrient::ALL.iter().map(|&n| (n, 0.0)).collect();

        for (name, dose) in plan.iter() {
            if dose <= 0.0 {
                continue;
            }
            let Some(composition) = catalog.get(name) else {
                warn!("dosing plan names '{name}', which is not in the catalog; ignoring it");
                continue;
            };
            let scale = dose * factor;
            for (nutrient, fraction) in composition.iter() {
                *concentrations.entry(nutrient).or_insert(0.0) += scale * fraction;
            }
        }

        for (nutrient, ppm) in concentrations.iter_mut() {
            if *nutrient != Nutrient::UreaN {
                *ppm += water.concentration(*nutrient);
            }
        }

        let total_nitrogen = Nutrient::ALL
            .iter()
            .filter(|n| n.is_nitrogen())
            .map(|n| concentrations.get(n).copied().unwrap_or(0.0))
            .sum();

        let ion_balance = IonBalance::from_concentrations(&concentrations);
        let estimated_ec = (ion_balance.cation_sum() + ion_balance.anion_sum())
            / MEQ_PER_EC_UNIT
            * self.parameters.ec_calibration
            + water.ec;

        Ok(SolutionReport {
            concentrations,
            total_nitrogen,
            ion_balance,
            estimated_ec,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FertilizerComposition;
    use approx::assert_relative_eq;

    fn single_kno3_catalog() -> FertilizerCatalog {
        let mut catalog = FertilizerCatalog::new();
        catalog
            .add(
                "KNO3",
                FertilizerComposition::from_fractions([
                    (Nutrient::NitrateN, 0.135),
                    (Nutrient::Potassium, 0.38),
                ])
                .unwrap(),
            )
            .unwrap();
        catalog
    }

    fn default_calculator() -> SolutionCalculator {
        SolutionCalculator::from_parameters(SystemParameters::default())
    }

    // ===== Plan Handling =====

    #[test]
    fn test_plan_total_mass_and_prune() {
        let mut plan = DosingPlan::new();
        plan.set("KNO3", 10.0);
        plan.set("MAP", 0.0004);
        plan.set("Urea", 2.5);

        assert_relative_eq!(plan.total_mass(), 12.5004);

        plan.prune(0.001);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.dose("MAP"), 0.0);
        assert_eq!(plan.dose("KNO3"), 10.0);
    }

    // ===== Concentration Accumulation =====

    #[test]
    fn test_documented_kno3_recipe() {
        // 10 kg KNO3, 1000 L tank, 0.53 % injection:
        // NO3-N = 10 * 1e6 * 0.0053 / 1000 * 0.135 = 7.155 ppm
        // K     = 10 * 1e6 * 0.0053 / 1000 * 0.38  = 20.14 ppm
        let calculator = default_calculator();
        let mut plan = DosingPlan::new();
        plan.set("KNO3", 10.0);

        let report = calculator
            .compute(&single_kno3_catalog(), &plan, &RawWaterBaseline::new())
            .unwrap();

        assert_relative_eq!(report.ppm(Nutrient::NitrateN), 7.155, epsilon = 1e-9);
        assert_relative_eq!(report.ppm(Nutrient::Potassium), 20.14, epsilon = 1e-9);
        assert_eq!(report.ppm(Nutrient::Calcium), 0.0);
    }

    #[test]
    fn test_zero_plan_reproduces_baseline() {
        let calculator = default_calculator();
        let mut water = RawWaterBaseline::new();
        water.set_concentration(Nutrient::Calcium, 24.0);
        water.set_concentration(Nutrient::NitrateN, 3.5);
        water.ec = 0.05;

        let report = calculator
            .compute(&single_kno3_catalog(), &DosingPlan::new(), &water)
            .unwrap();

        for nutrient in Nutrient::ALL {
            let expected = if nutrient == Nutrient::UreaN {
                0.0
            } else {
                water.concentration(nutrient)
            };
            assert_eq!(
                report.ppm(nutrient),
                expected,
                "{} should equal the baseline with nothing dosed",
                nutrient
            );
        }
    }

    #[test]
    fn test_urea_channel_carries_no_baseline() {
        let calculator = default_calculator();
        let mut catalog = FertilizerCatalog::new();
        catalog
            .add(
                "Urea",
                FertilizerComposition::from_fractions([(Nutrient::UreaN, 0.46)]).unwrap(),
            )
            .unwrap();

        // A (nonsensical) urea baseline must not leak into the result
        let mut water = RawWaterBaseline::new();
        water.set_concentration(Nutrient::UreaN, 12.0);

        let mut plan = DosingPlan::new();
        plan.set("Urea", 1.0);

        let report = calculator.compute(&catalog, &plan, &water).unwrap();
        assert_relative_eq!(report.ppm(Nutrient::UreaN), 5.3 * 0.46, epsilon = 1e-9);
    }

    #[test]
    fn test_dose_scaling_is_linear() {
        let calculator = default_calculator();
        let catalog = single_kno3_catalog();
        let mut water = RawWaterBaseline::new();
        water.set_concentration(Nutrient::Potassium, 4.0);

        let mut plan = DosingPlan::new();
        plan.set("KNO3", 2.0);
        let base = calculator.compute(&catalog, &plan, &water).unwrap();

        let mut tripled = DosingPlan::new();
        tripled.set("KNO3", 6.0);
        let scaled = calculator.compute(&catalog, &tripled, &water).unwrap();

        // Fertilizer-derived contribution scales by 3; the baseline term
        // does not.
        let base_contribution = base.ppm(Nutrient::Potassium) - 4.0;
        let scaled_contribution = scaled.ppm(Nutrient::Potassium) - 4.0;
        assert_relative_eq!(scaled_contribution, 3.0 * base_contribution, epsilon = 1e-9);
    }

    #[test]
    fn test_unknown_fertilizer_is_ignored() {
        let calculator = default_calculator();
        let mut plan = DosingPlan::new();
        plan.set("KNO3", 10.0);
        plan.set("Mystery blend", 50.0);

        let with_unknown = calculator
            .compute(&single_kno3_catalog(), &plan, &RawWaterBaseline::new())
            .unwrap();

        let mut known_only = DosingPlan::new();
        known_only.set("KNO3", 10.0);
        let reference = calculator
            .compute(&single_kno3_catalog(), &known_only, &RawWaterBaseline::new())
            .unwrap();

        assert_eq!(with_unknown, reference);
    }

    #[test]
    fn test_degenerate_parameters_rejected() {
        let calculator = SolutionCalculator::from_parameters(SystemParameters::new(
            0.0, 0.0053, 1.08,
        ));
        let result = calculator.compute(
            &single_kno3_catalog(),
            &DosingPlan::new(),
            &RawWaterBaseline::new(),
        );
        assert!(result.is_err());
    }

    // ===== Derived Quantities =====

    #[test]
    fn test_ion_balance_from_known_concentrations() {
        let mut concentrations: BTreeMap<Nutrient, FloatValue> = BTreeMap::new();
        concentrations.insert(Nutrient::Potassium, 39.1);
        concentrations.insert(Nutrient::NitrateN, 28.02);
        concentrations.insert(Nutrient::SulfateS, 32.06);

        let balance = IonBalance::from_concentrations(&concentrations);
        assert_relative_eq!(balance.potassium, 1.0, epsilon = 1e-9);
        assert_relative_eq!(balance.nitrate, 2.0, epsilon = 1e-9);
        assert_relative_eq!(balance.sulfate, 2.0, epsilon = 1e-3);
        assert_eq!(balance.calcium, 0.0);

        assert_relative_eq!(balance.cation_sum(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(balance.anion_sum(), 4.0, epsilon = 1e-3);
        assert_relative_eq!(balance.charge_difference(), -3.0, epsilon = 1e-3);
    }

    #[test]
    fn test_sums_non_negative_for_non_negative_inputs() {
        let calculator = default_calculator();
        let catalog = FertilizerCatalog::standard();
        let mut water = RawWaterBaseline::new();
        water.set_concentration(Nutrient::Calcium, 18.0);

        let mut plan = DosingPlan::new();
        for name in catalog.names() {
            plan.set(name.to_string(), 1.5);
        }

        let report = calculator.compute(&catalog, &plan, &water).unwrap();
        assert!(report.cation_sum() >= 0.0);
        assert!(report.anion_sum() >= 0.0);
    }

    #[test]
    fn test_total_nitrogen_sums_three_forms() {
        let calculator = default_calculator();
        let catalog = FertilizerCatalog::standard();

        let mut plan = DosingPlan::new();
        plan.set("KNO3", 10.0); // NO3-N
        plan.set("MAP", 5.0); // NH4-N
        plan.set("Urea", 2.0); // Urea-N

        let mut water = RawWaterBaseline::new();
        water.set_concentration(Nutrient::NitrateN, 2.0);

        let report = calculator.compute(&catalog, &plan, &water).unwrap();
        let expected = report.ppm(Nutrient::NitrateN)
            + report.ppm(Nutrient::AmmoniumN)
            + report.ppm(Nutrient::UreaN);
        assert_relative_eq!(report.total_nitrogen, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_ec_estimate() {
        let calculator = default_calculator();
        let mut water = RawWaterBaseline::new();
        water.ec = 0.05;

        let mut plan = DosingPlan::new();
        plan.set("KNO3", 10.0);

        let report = calculator
            .compute(&single_kno3_catalog(), &plan, &water)
            .unwrap();

        let expected =
            (report.cation_sum() + report.anion_sum()) / 20.0 * 1.08 + 0.05;
        assert_relative_eq!(report.estimated_ec, expected, epsilon = 1e-12);
        assert!(report.estimated_ec > 0.05);
    }

    #[test]
    fn test_report_serde_round_trip() {
        let calculator = default_calculator();
        let mut plan = DosingPlan::new();
        plan.set("KNO3", 10.0);

        let report = calculator
            .compute(&single_kno3_catalog(), &plan, &RawWaterBaseline::new())
            .unwrap();

        let json = serde_json::to_string(&report).unwrap();
        let parsed: SolutionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
