//! Periodic contribution planner.
//!
//! Spreads a contribution budget over successive periods. Two genuinely
//! different product behaviors live here, kept as distinct named strategies
//! behind [`PlanningStrategy`] rather than collapsed into one algorithm:
//!
//! - [`FixedInstallment`]: the installment size is fixed; the planner solves
//!   for how many periods are needed and applies one static percentage split
//!   (taken from the lump-sum solve) to every installment.
//! - [`FixedHorizon`]: the period count is fixed; the planner re-simulates
//!   the portfolio period by period, redistributing underused budget to the
//!   most underweight asset and stopping early once balance is reached.

use log::{debug, warn};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::lump_sum;
use crate::snapshot::PortfolioSnapshot;

/// How a plan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlanTermination {
    /// Balance was reached before the period budget ran out.
    StoppedEarly,
    /// Every planned period was consumed.
    Exhausted,
}

/// Money assigned to each asset within one period, in snapshot order.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodAllocation {
    pub period: u32,
    pub amounts: Vec<(String, f64)>,
    pub total: f64,
}

/// A complete periodic contribution plan.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodPlan {
    pub strategy: &'static str,
    pub periods_used: u32,
    pub period_amount: f64,
    /// Sum of everything actually allocated across all periods.
    pub total_invested: f64,
    pub final_total_value: f64,
    /// True when every asset's final percentage is within the balance
    /// tolerance of its target.
    pub balanced: bool,
    pub termination: PlanTermination,
    /// `total_invested / total_needed`, for plans derived from a lump-sum
    /// solve. `None` for the dynamic strategy.
    pub coverage_ratio: Option<f64>,
    /// True unless the coverage ratio fell below the configured threshold.
    pub sufficient: bool,
    pub periods: Vec<PeriodAllocation>,
}

impl PeriodPlan {
    fn empty(strategy: &'static str, total_value: f64, period_amount: f64) -> Self {
        Self {
            strategy,
            periods_used: 0,
            period_amount,
            total_invested: 0.0,
            final_total_value: total_value,
            balanced: true,
            termination: PlanTermination::StoppedEarly,
            coverage_ratio: None,
            sufficient: true,
            periods: Vec::new(),
        }
    }
}

/// A strategy that turns a snapshot into a periodic contribution plan.
pub trait PlanningStrategy {
    fn name(&self) -> &'static str;
    fn plan(&self, snapshot: &PortfolioSnapshot, config: &EngineConfig) -> Result<PeriodPlan>;
}

/// Fixed installment size; the planner solves for the period count.
///
/// The total need comes from the lump-sum minimum solve; each installment is
/// split with the same static percentages derived from that solve. Rounding
/// the period count up can still undershoot if the static split drifts from
/// the true marginal need, so the coverage ratio is always surfaced.
pub struct FixedInstallment {
    pub amount: f64,
}

impl PlanningStrategy for FixedInstallment {
    fn name(&self) -> &'static str {
        "fixed-installment"
    }

    fn plan(&self, snapshot: &PortfolioSnapshot, config: &EngineConfig) -> Result<PeriodPlan> {
        if self.amount <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "period amount must be positive, got {:.2}",
                self.amount
            )));
        }

        let tol = config.cent_tolerance;
        let lump = lump_sum::solve_minimum(snapshot, config);
        let total_needed = lump.total_contribution;

        if total_needed <= tol {
            return Ok(PeriodPlan::empty(
                self.name(),
                snapshot.total_value,
                self.amount,
            ));
        }

        let periods = (total_needed / self.amount).ceil() as u32;

        // Static split: each asset's share of the total need.
        let split: Vec<(String, f64)> = lump
            .lines
            .iter()
            .map(|l| (l.name.clone(), l.amount_to_add / total_needed))
            .collect();

        let mut plan_periods = Vec::with_capacity(periods as usize);
        for period in 1..=periods {
            let amounts: Vec<(String, f64)> = split
                .iter()
                .map(|(name, fraction)| (name.clone(), self.amount * fraction))
                .filter(|&(_, amount)| amount > tol)
                .collect();
            let total = amounts.iter().map(|&(_, a)| a).sum();
            plan_periods.push(PeriodAllocation {
                period,
                amounts,
                total,
            });
        }

        let total_invested = periods as f64 * self.amount;
        let coverage_ratio = total_invested / total_needed;
        let sufficient = coverage_ratio >= config.coverage_threshold;
        if !sufficient {
            warn!(
                "planned {periods} periods cover only {:.1}% of the need",
                coverage_ratio * 100.0
            );
        }

        // Simulate the end state under the static split to judge balance.
        let invested: FxHashMap<&str, f64> = split
            .iter()
            .map(|(name, fraction)| (name.as_str(), total_invested * fraction))
            .collect();
        let final_total = snapshot.total_value + total_invested;
        let balanced = snapshot.entries.iter().all(|e| {
            let final_value = e.current_value + invested.get(e.name.as_str()).copied().unwrap_or(0.0);
            let final_pct = final_value / final_total * 100.0;
            (final_pct - e.target_pct).abs() <= config.balance_tolerance_pct
        });

        Ok(PeriodPlan {
            strategy: self.name(),
            periods_used: periods,
            period_amount: self.amount,
            total_invested,
            final_total_value: final_total,
            balanced,
            termination: PlanTermination::Exhausted,
            coverage_ratio: Some(coverage_ratio),
            sufficient,
            periods: plan_periods,
        })
    }
}

/// Fixed period count with a per-period budget cap; dynamic re-simulation.
///
/// Each period measures every asset's need against the new total including
/// that period's budget, allocates proportionally capped at the asset's own
/// need, and routes any residual budget to the single most underweight
/// asset while the portfolio remains imbalanced. Stops early as soon as the
/// portfolio is balanced at the start of a period.
pub struct FixedHorizon {
    pub periods: u32,
    pub max_per_period: f64,
}

impl PlanningStrategy for FixedHorizon {
    fn name(&self) -> &'static str {
        "fixed-horizon"
    }

    fn plan(&self, snapshot: &PortfolioSnapshot, config: &EngineConfig) -> Result<PeriodPlan> {
        if self.periods == 0 {
            return Err(Error::InvalidParameter("period count must be >= 1".into()));
        }
        if self.max_per_period <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "per-period amount must be positive, got {:.2}",
                self.max_per_period
            )));
        }

        let tol = config.cent_tolerance;
        let budget = self.max_per_period;

        // Running values, keyed by name; snapshot order drives all output.
        let mut values: FxHashMap<&str, f64> = snapshot
            .entries
            .iter()
            .map(|e| (e.name.as_str(), e.current_value))
            .collect();

        let mut plan_periods: Vec<PeriodAllocation> = Vec::new();
        let mut termination = PlanTermination::Exhausted;

        for period in 1..=self.periods {
            let running_total: f64 = values.values().sum();

            // Balance gate: a balanced portfolio would produce an empty
            // allocation map, so stop before consuming the period.
            let balanced_now = snapshot.entries.iter().all(|e| {
                let pct = values[e.name.as_str()] / running_total * 100.0;
                (pct - e.target_pct).abs() <= config.balance_tolerance_pct
            });
            if balanced_now {
                debug!("balance reached before period {period}, stopping early");
                termination = PlanTermination::StoppedEarly;
                break;
            }

            let new_total = running_total + budget;
            let needs: Vec<f64> = snapshot
                .entries
                .iter()
                .map(|e| (e.target_pct / 100.0 * new_total - values[e.name.as_str()]).max(0.0))
                .collect();
            let total_needed: f64 = needs.iter().sum();
            if total_needed <= tol {
                termination = PlanTermination::StoppedEarly;
                break;
            }

            // Proportional allocation, capped at each asset's own need so
            // nobody is funded past its immediate target.
            let mut amounts: Vec<f64> = needs
                .iter()
                .map(|&needed| needed.min(needed / total_needed * budget))
                .collect();
            let allocated: f64 = amounts.iter().sum();

            // Residual budget goes to the single most underweight asset,
            // as long as the portfolio is still off target.
            let leftover = budget - allocated;
            if leftover > tol {
                let interim_total = running_total + allocated;
                let most_underweight = snapshot
                    .entries
                    .iter()
                    .enumerate()
                    .map(|(i, e)| {
                        let value = values[e.name.as_str()] + amounts[i];
                        let pct = value / interim_total * 100.0;
                        (i, e.target_pct - pct)
                    })
                    .max_by(|a, b| a.1.total_cmp(&b.1));

                if let Some((index, deficit)) = most_underweight {
                    if deficit > config.balance_tolerance_pct {
                        amounts[index] += leftover;
                    }
                }
            }

            let entries: Vec<(String, f64)> = snapshot
                .entries
                .iter()
                .zip(&amounts)
                .filter(|&(_, &amount)| amount > tol)
                .map(|(e, &amount)| (e.name.clone(), amount))
                .collect();
            let period_total: f64 = entries.iter().map(|&(_, a)| a).sum();

            for (i, e) in snapshot.entries.iter().enumerate() {
                if amounts[i] > tol {
                    *values.get_mut(e.name.as_str()).unwrap() += amounts[i];
                }
            }

            plan_periods.push(PeriodAllocation {
                period,
                amounts: entries,
                total: period_total,
            });
        }

        let total_invested: f64 = plan_periods.iter().map(|p| p.total).sum();
        let final_total = snapshot.total_value + total_invested;
        let balanced = snapshot.entries.iter().all(|e| {
            let pct = values[e.name.as_str()] / final_total * 100.0;
            (pct - e.target_pct).abs() <= config.balance_tolerance_pct
        });

        Ok(PeriodPlan {
            strategy: self.name(),
            periods_used: plan_periods.len() as u32,
            period_amount: budget,
            total_invested,
            final_total_value: final_total,
            balanced,
            termination,
            coverage_ratio: None,
            sufficient: true,
            periods: plan_periods,
        })
    }
}

impl std::fmt::Display for PeriodPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.periods_used == 0 {
            return writeln!(f, "Portfolio is already balanced, no plan needed.");
        }
        writeln!(
            f,
            "{} plan: {} periods of up to {:.2} each",
            self.strategy, self.periods_used, self.period_amount
        )?;
        for p in &self.periods {
            write!(f, "  period {:>3}:", p.period)?;
            for (name, amount) in &p.amounts {
                write!(f, "  {name} {amount:.2}")?;
            }
            writeln!(f, "  (total {:.2})", p.total)?;
        }
        writeln!(
            f,
            "Total invested: {:.2}  Final value: {:.2}",
            self.total_invested, self.final_total_value
        )?;
        if let Some(ratio) = self.coverage_ratio {
            writeln!(f, "Coverage: {:.1}%", ratio * 100.0)?;
        }
        if !self.sufficient {
            writeln!(
                f,
                "Warning: planned contributions may not fully cover the need; \
                 consider a larger installment."
            )?;
        }
        match self.termination {
            PlanTermination::StoppedEarly => {
                writeln!(f, "Balance reached after {} periods.", self.periods_used)
            }
            PlanTermination::Exhausted if self.balanced => {
                writeln!(f, "All periods used; portfolio ends balanced.")
            }
            PlanTermination::Exhausted => {
                writeln!(f, "All periods used; portfolio is still off target.")
            }
        }?;
        if self.periods_used >= 12 {
            writeln!(
                f,
                "Estimated horizon: {:.1} years ({} periods)",
                self.periods_used as f64 / 12.0,
                self.periods_used
            )?;
        }
        Ok(())
    }
}
