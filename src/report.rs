//! Sheet-shaped output tables for external exporters.
//!
//! Reporting collaborators (spreadsheet writers, table renderers, chart
//! builders) consume a [`FertigationReport`]: the dosing plan, the final
//! element concentrations, the ion balance with its sums and charge
//! difference, and a summary block. Values are rounded to the conventional
//! precision of each sheet. The actual file writing stays outside the
//! crate; the generation timestamp is supplied by the caller so that this
//! module stays clock-free.

use crate::nutrient::{Ion, Nutrient};
use crate::solution::{DosingPlan, SolutionReport};
use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// One dosing-plan row: fertilizer and mass, rounded to 4 decimal places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseRow {
    pub fertilizer: String,
    pub kilograms: FloatValue,
}

/// One element row: nutrient channel and final ppm, rounded to 3 decimal
/// places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationRow {
    pub nutrient: Nutrient,
    pub ppm: FloatValue,
}

/// One ion-balance row: ion and meq/L, rounded to 3 decimal places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IonRow {
    pub ion: Ion,
    pub meq: FloatValue,
}

/// Headline metrics of the computed solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total nitrogen (ppm), 1 decimal place.
    pub total_nitrogen: FloatValue,
    /// Estimated EC (dS/m), 2 decimal places.
    pub estimated_ec: FloatValue,
    /// Cation equivalent sum (meq/L), 3 decimal places.
    pub cation_sum: FloatValue,
    /// Anion equivalent sum (meq/L), 3 decimal places.
    pub anion_sum: FloatValue,
    /// Cation sum minus anion sum (meq/L), 3 decimal places.
    pub charge_difference: FloatValue,
    /// Caller-supplied generation timestamp.
    pub generated_at: String,
}

/// The full report: one table per sheet of the exported workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertigationReport {
    pub dosing: Vec<DoseRow>,
    pub concentrations: Vec<ConcentrationRow>,
    pub ion_balance: Vec<IonRow>,
    pub summary: ReportSummary,
}

impl FertigationReport {
    /// Assemble the report tables from a dosing plan and the solution
    /// computed for it.
    pub fn new(
        plan: &DosingPlan,
        solution: &SolutionReport,
        generated_at: impl Into<String>,
    ) -> Self {
        let dosing = plan
            .iter()
            .map(|(fertilizer, kilograms)| DoseRow {
                fertilizer: fertilizer.to_string(),
                kilograms: round_to(kilograms, 4),
            })
            .collect();

        let concentrations = Nutrient::ALL
            .iter()
            .map(|&nutrient| ConcentrationRow {
                nutrient,
                ppm: round_to(solution.ppm(nutrient), 3),
            })
            .collect();

        let ion_balance = Ion::CATIONS
            .iter()
            .chain(Ion::ANIONS.iter())
            .map(|&ion| IonRow {
                ion,
                meq: round_to(solution.ion_balance.meq(ion), 3),
            })
            .collect();

        let summary = ReportSummary {
            total_nitrogen: round_to(solution.total_nitrogen, 1),
            estimated_ec: round_to(solution.estimated_ec, 2),
            cation_sum: round_to(solution.cation_sum(), 3),
            anion_sum: round_to(solution.anion_sum(), 3),
            charge_difference: round_to(solution.charge_difference(), 3),
            generated_at: generated_at.into(),
        };

        Self {
            dosing,
            concentrations,
            ion_balance,
            summary,
        }
    }
}

fn round_to(value: FloatValue, decimals: i32) -> FloatValue {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
