//! Blend design by linear programming.
//!
//! Given target concentrations and the fertilizer catalog, the optimizer
//! solves for non-negative dosages that achieve the targets once diluted
//! into the irrigation line. Two formulations are offered:
//!
//! - [`OptimizationMode::Exact`] imposes each target as an equality
//!   constraint and minimises total fertilizer mass. When the catalog cannot
//!   produce the requested nutrient ratios the program is infeasible and no
//!   plan is returned; that is an expected outcome, not a fault.
//! - [`OptimizationMode::BestEffort`] bounds the absolute deviation from
//!   each target with a slack variable and minimises the weighted deviation
//!   sum plus a small total-mass term. Macro-nutrient deviations carry a
//!   hundredfold penalty, so the solver sacrifices trace accuracy before
//!   macro accuracy. This formulation is always feasible.
//!
//! The linear program itself is handed to an external solver backend;
//! dosages below the reporting epsilon are dropped from the returned plan.

use crate::catalog::{FertilizerCatalog, FertilizerComposition};
use crate::constants::{
    DEFAULT_DOSE_CAP, DOSAGE_MASS_WEIGHT, DOSE_EPSILON, MACRO_DEVIATION_WEIGHT,
    TRACE_DEVIATION_WEIGHT,
};
use crate::errors::{FertigateError, FertigateResult};
use crate::nutrient::Nutrient;
use crate::parameters::{RawWaterBaseline, SystemParameters};
use crate::solution::DosingPlan;
use crate::FloatValue;
use good_lp::{
    constraint, default_solver, variable, variables, Expression, ResolutionError, Solution,
    SolverModel, Variable,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How strictly the targets must be met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationMode {
    /// Hit every target exactly or report infeasibility.
    Exact,
    /// Minimise weighted deviation from the targets; always feasible.
    BestEffort,
}

/// Target concentrations (ppm) for blend design.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NutrientTargets {
    targets: BTreeMap<Nutrient, FloatValue>,
}

impl NutrientTargets {
    /// No targets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target for one nutrient (ppm), replacing any previous value.
    pub fn set(&mut self, nutrient: Nutrient, ppm: FloatValue) {
        self.targets.insert(nutrient, ppm);
    }

    /// Target for one nutrient, if set.
    pub fn get(&self, nutrient: Nutrient) -> Option<FloatValue> {
        self.targets.get(&nutrient).copied()
    }

    /// Iterate over the targeted `(nutrient, ppm)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Nutrient, FloatValue)> + '_ {
        self.targets.iter().map(|(&n, &ppm)| (n, ppm))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl FromIterator<(Nutrient, FloatValue)> for NutrientTargets {
    fn from_iter<I: IntoIterator<Item = (Nutrient, FloatValue)>>(iter: I) -> Self {
        Self {
            targets: iter.into_iter().collect(),
        }
    }
}

/// The blend optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendOptimizer {
    parameters: SystemParameters,
    mode: OptimizationMode,
    /// Per-fertilizer dosage upper bound (kg). Generous by default; keeps
    /// the program bounded.
    dose_cap: FloatValue,
}

impl BlendOptimizer {
    /// Create an optimizer from system parameters and a mode.
    pub fn from_parameters(parameters: SystemParameters, mode: OptimizationMode) -> Self {
        Self {
            parameters,
            mode,
            dose_cap: DEFAULT_DOSE_CAP,
        }
    }

    /// Set a custom per-fertilizer dosage cap (kg).
    pub fn with_dose_cap(self, dose_cap: FloatValue) -> Self {
        Self { dose_cap, ..self }
    }

    /// Get the mode.
    pub fn mode(&self) -> OptimizationMode {
        self.mode
    }

    /// Solve for a dosing plan achieving `targets`.
    ///
    /// The raw-water baseline is subtracted from each target first (floored
    /// at zero: the fertilizer cannot remove what the water already
    /// carries). Dosages below 0.001 kg are dropped from the returned plan.
    ///
    /// # Errors
    ///
    /// - [`FertigateError::DegenerateConfiguration`] when the parameters
    ///   fail validation.
    /// - [`FertigateError::InfeasibleTargets`] in [`OptimizationMode::Exact`]
    ///   when no non-negative combination satisfies every target. No
    ///   partial plan is produced.
    /// - [`FertigateError::Solver`] for any other solver failure.
    pub fn optimize(
        &self,
        catalog: &FertilizerCatalog,
        targets: &NutrientTargets,
        water: &RawWaterBaseline,
    ) -> FertigateResult<DosingPlan> {
        let factor = self.parameters.dilution_factor()?;

        let entries: Vec<(&str, &FertilizerComposition)> = catalog.iter().collect();
        let rows: Vec<(Nutrient, FloatValue)> = targets
            .iter()
            .map(|(nutrient, ppm)| (nutrient, (ppm - water.concentration(nutrient)).max(0.0)))
            .collect();

        // An empty catalog can dose nothing; don't hand the solver a
        // variable-free program
        if entries.is_empty() {
            let unreachable_target = rows.iter().any(|&(_, net_target)| net_target > 0.0);
            return if unreachable_target && self.mode == OptimizationMode::Exact {
                Err(FertigateError::InfeasibleTargets)
            } else {
                Ok(DosingPlan::new())
            };
        }

        let mut problem = variables!();
        let doses: Vec<Variable> = entries
            .iter()
            .map(|_| problem.add(variable().min(0.0).max(self.dose_cap)))
            .collect();

        // ppm achieved on one channel, as a linear expression in the doses
        let achieved = |nutrient: Nutrient| -> Expression {
            let mut expr = Expression::default();
            for ((_, composition), &dose) in entries.iter().zip(&doses) {
                let fraction = composition.fraction(nutrient);
                if fraction > 0.0 {
                    expr += dose * (factor * fraction);
                }
            }
            expr
        };

        let solution = match self.mode {
            OptimizationMode::Exact => {
                let mut objective = Expression::default();
                for &dose in &doses {
                    objective += dose;
                }

                let mut model = problem.minimise(objective).using(default_solver);
                for &(nutrient, net_target) in &rows {
                    model = model.with(constraint!(achieved(nutrient) == net_target));
                }

                model.solve().map_err(|err| match err {
                    ResolutionError::Infeasible => FertigateError::InfeasibleTargets,
                    other => FertigateError::Solver(other.to_string()),
                })?
            }
            OptimizationMode::BestEffort => {
                let slacks: Vec<Variable> = rows
                    .iter()
                    .map(|_| problem.add(variable().min(0.0)))
                    .collect();

                let mut objective = Expression::default();
                for &dose in &doses {
                    objective += dose * DOSAGE_MASS_WEIGHT;
                }
                for (&slack, &(nutrient, _)) in slacks.iter().zip(&rows) {
                    let weight = if nutrient.is_macro() {
                        MACRO_DEVIATION_WEIGHT
                    } else {
                        TRACE_DEVIATION_WEIGHT
                    };
                    objective += slack * weight;
                }

                let mut model = problem.minimise(objective).using(default_solver);
                for (&slack, &(nutrient, net_target)) in slacks.iter().zip(&rows) {
                    let expr = achieved(nutrient);
                    // |achieved - net_target| <= slack, split into two
                    // one-sided constraints
                    model = model.with(constraint!(expr.clone() - slack <= net_target));
                    model = model.with(constraint!(expr + slack >= net_target));
                }

                model
                    .solve()
                    .map_err(|err| FertigateError::Solver(err.to_string()))?
            }
        };

        let mut plan = DosingPlan::new();
        for ((name, _), &dose) in entries.iter().zip(&doses) {
            let kilograms = solution.value(dose);
            if kilograms > DOSE_EPSILON {
                plan.set(name.to_string(), kilograms);
            }
        }

        debug!(
            "solved {:?} blend over {} fertilizers and {} targets; {} fertilizers used",
            self.mode,
            entries.len(),
            rows.len(),
            plan.len()
        );

        Ok(plan)
    }
}
