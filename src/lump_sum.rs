//! Lump-sum solver: one-time contributions without selling.
//!
//! Two modes. With a fixed amount, the contribution is spread across
//! underweight assets and scaled down proportionally when it cannot cover
//! the full need. With no amount given, the solver finds the minimum
//! contribution that reaches exact target allocation.
//!
//! The minimum-contribution solve is a fixed-point problem: each asset's
//! required top-up depends on the new total, which depends on the sum of
//! all top-ups. We iterate a damped fixed-point loop with a hard cap of
//! `solver_max_iterations`, then fall back to the closed-form solve over
//! the underweight group if the cap is reached before the step size drops
//! under the cent tolerance.

use log::debug;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::snapshot::PortfolioSnapshot;

/// A per-asset contribution line. Only assets that receive money appear.
#[derive(Debug, Clone, Serialize)]
pub struct ContributionLine {
    pub name: String,
    pub current_value: f64,
    pub target_pct: f64,
    /// Value this asset should hold at the post-contribution total.
    pub final_target_value: f64,
    pub amount_to_add: f64,
}

/// How the solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum LumpSumStatus {
    /// The contribution covers the full need.
    Funded,
    /// Nothing to do: every asset already sits on its target.
    AlreadyBalanced,
    /// Fixed amount short of the full need; allocations were scaled down
    /// proportionally (`requested / required`).
    Insufficient { requested: f64, required: f64 },
}

/// Result of a lump-sum solve.
#[derive(Debug, Clone, Serialize)]
pub struct LumpSumPlan {
    /// Total money actually allocated across assets.
    pub total_contribution: f64,
    /// Portfolio value after the contribution.
    pub final_total_value: f64,
    pub lines: Vec<ContributionLine>,
    pub status: LumpSumStatus,
}

impl LumpSumPlan {
    pub fn is_balanced(&self) -> bool {
        self.status == LumpSumStatus::AlreadyBalanced
    }

    fn already_balanced(total_value: f64) -> Self {
        Self {
            total_contribution: 0.0,
            final_total_value: total_value,
            lines: Vec::new(),
            status: LumpSumStatus::AlreadyBalanced,
        }
    }
}

impl std::fmt::Display for LumpSumPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            LumpSumStatus::AlreadyBalanced => {
                return writeln!(f, "Portfolio is already balanced, nothing to add.");
            }
            LumpSumStatus::Insufficient {
                requested,
                required,
            } => {
                writeln!(
                    f,
                    "Warning: {requested:.2} does not cover the full need of {required:.2}; \
                     allocations scaled down proportionally."
                )?;
            }
            LumpSumStatus::Funded => {}
        }
        writeln!(f, "Total to contribute: {:.2}", self.total_contribution)?;
        writeln!(
            f,
            "{:<20} {:>12} {:>9} {:>12} {:>12}",
            "Asset", "Value", "Target %", "Target val", "Add"
        )?;
        for line in &self.lines {
            writeln!(
                f,
                "{:<20} {:>12.2} {:>8.1}% {:>12.2} {:>12.2}",
                line.name,
                line.current_value,
                line.target_pct,
                line.final_target_value,
                line.amount_to_add
            )?;
        }
        writeln!(f, "Final portfolio value: {:.2}", self.final_total_value)
    }
}

/// Mode B: solve for the minimum contribution that reaches exact target
/// allocation without selling anything.
///
/// Overweight assets are excluded from the deficit set up front and never
/// receive money. Underweight assets are topped up to their target share
/// of `total + X`, where `X` is found by fixed-point iteration: start from
/// the deficit against the current total, recompute against `total + X`
/// until the change drops under the cent tolerance or the iteration cap
/// is hit.
pub fn solve_minimum(snapshot: &PortfolioSnapshot, config: &EngineConfig) -> LumpSumPlan {
    let total = snapshot.total_value;
    let tol = config.cent_tolerance;

    // Deficit set: underweight assets, measured against the current total.
    let deficits: Vec<(&str, f64, f64)> = snapshot
        .entries
        .iter()
        .filter(|e| e.current_pct < e.target_pct)
        .filter(|e| e.gap > tol)
        .map(|e| (e.name.as_str(), e.current_value, e.target_pct))
        .collect();

    if deficits.is_empty() {
        return LumpSumPlan::already_balanced(total);
    }

    // First estimate: sum of deficits at the current total.
    let mut x: f64 = deficits
        .iter()
        .map(|&(_, value, target_pct)| target_pct / 100.0 * total - value)
        .sum();

    let mut converged = false;
    for iteration in 0..config.solver_max_iterations {
        let previous = x;
        let new_total = total + x;
        x = deficits
            .iter()
            .map(|&(_, value, target_pct)| (target_pct / 100.0 * new_total - value).max(0.0))
            .sum();

        if (x - previous).abs() < tol {
            debug!("lump-sum solver converged after {} iterations", iteration + 1);
            converged = true;
            break;
        }
    }

    // The damped loop contracts by the deficit set's target share per step,
    // which can leave it short of the tolerance at the cap. The deficit set
    // is stable (needs only grow with X), so the fixed point has a closed
    // form over that set: X = (s*T - V) / (1 - s).
    if !converged {
        let s: f64 = deficits.iter().map(|&(_, _, tp)| tp / 100.0).sum();
        let v: f64 = deficits.iter().map(|&(_, value, _)| value).sum();
        if s < 1.0 {
            x = (s * total - v) / (1.0 - s);
            debug!("lump-sum solver hit the iteration cap, used closed-form refinement");
        }
    }

    let final_total = total + x;
    let lines: Vec<ContributionLine> = deficits
        .iter()
        .map(|&(name, value, target_pct)| {
            let final_target_value = target_pct / 100.0 * final_total;
            ContributionLine {
                name: name.to_string(),
                current_value: value,
                target_pct,
                final_target_value,
                amount_to_add: final_target_value - value,
            }
        })
        .filter(|line| line.amount_to_add > tol)
        .collect();

    LumpSumPlan {
        total_contribution: x,
        final_total_value: final_total,
        lines,
        status: LumpSumStatus::Funded,
    }
}

/// Mode A: allocate a fixed contribution across underweight assets without
/// selling.
///
/// Each asset's need is measured against the post-contribution total. If
/// the budget covers the total need, amounts are returned unscaled and any
/// leftover stays unallocated. If not, every amount is scaled by the same
/// `amount / total_needed` ratio and the plan is flagged insufficient.
pub fn allocate_fixed(
    snapshot: &PortfolioSnapshot,
    amount: f64,
    config: &EngineConfig,
) -> Result<LumpSumPlan> {
    if amount <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "contribution amount must be positive, got {amount:.2}"
        )));
    }

    let tol = config.cent_tolerance;
    let total = snapshot.total_value;
    let new_total = total + amount;

    let needs: Vec<(&str, f64, f64, f64)> = snapshot
        .entries
        .iter()
        .map(|e| {
            let needed = (e.target_pct / 100.0 * new_total - e.current_value).max(0.0);
            (e.name.as_str(), e.current_value, e.target_pct, needed)
        })
        .collect();

    let total_needed: f64 = needs.iter().map(|&(_, _, _, n)| n).sum();
    if total_needed <= tol {
        return Ok(LumpSumPlan::already_balanced(total));
    }

    let (scale, status) = if total_needed <= amount {
        (1.0, LumpSumStatus::Funded)
    } else {
        (
            amount / total_needed,
            LumpSumStatus::Insufficient {
                requested: amount,
                required: total_needed,
            },
        )
    };

    let lines: Vec<ContributionLine> = needs
        .iter()
        .map(|&(name, value, target_pct, needed)| ContributionLine {
            name: name.to_string(),
            current_value: value,
            target_pct,
            final_target_value: target_pct / 100.0 * new_total,
            amount_to_add: needed * scale,
        })
        .filter(|line| line.amount_to_add > tol)
        .collect();

    let total_contribution: f64 = lines.iter().map(|l| l.amount_to_add).sum();

    Ok(LumpSumPlan {
        total_contribution,
        final_total_value: total + total_contribution,
        lines,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Asset;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn two_asset_snapshot() -> PortfolioSnapshot {
        PortfolioSnapshot::build(&[
            Asset::new("Equity", 800.0, 50.0),
            Asset::new("Bonds", 200.0, 50.0),
        ])
    }

    #[test]
    fn solve_matches_closed_form() {
        // Closed form: bonds must reach 50% of (1000 + X) with equity
        // untouched, so 200 + X = 0.5 * (1000 + X) => X = 600.
        let plan = solve_minimum(&two_asset_snapshot(), &config());
        assert!((plan.total_contribution - 600.0).abs() < 0.01);
        assert!((plan.final_total_value - 1600.0).abs() < 0.01);

        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].name, "Bonds");
        assert!((plan.lines[0].amount_to_add - 600.0).abs() < 0.01);
    }

    #[test]
    fn solve_never_touches_overweight_assets() {
        let plan = solve_minimum(&two_asset_snapshot(), &config());
        assert!(plan.lines.iter().all(|l| l.name != "Equity"));
    }

    #[test]
    fn solve_three_assets() {
        let snap = PortfolioSnapshot::build(&[
            Asset::new("A", 600.0, 40.0),
            Asset::new("B", 300.0, 40.0),
            Asset::new("C", 100.0, 20.0),
        ]);
        let plan = solve_minimum(&snap, &config());
        let x = plan.total_contribution;
        assert!(x > 0.0);

        // At the converged X, every funded asset sits on its target share
        // of the new total.
        let new_total = 1000.0 + x;
        for line in &plan.lines {
            let final_value = line.current_value + line.amount_to_add;
            let pct = final_value / new_total * 100.0;
            assert!(
                (pct - line.target_pct).abs() < 0.01,
                "{} ended at {pct:.3}% vs target {}%",
                line.name,
                line.target_pct
            );
        }
    }

    #[test]
    fn solve_already_balanced() {
        let snap = PortfolioSnapshot::build(&[
            Asset::new("A", 500.0, 50.0),
            Asset::new("B", 500.0, 50.0),
        ]);
        let plan = solve_minimum(&snap, &config());
        assert!(plan.is_balanced());
        assert_eq!(plan.total_contribution, 0.0);
        assert!(plan.lines.is_empty());
    }

    #[test]
    fn fixed_amount_covering_the_need_is_funded() {
        // Need at new total 2000: bonds need 0.5*2000 - 200 = 800,
        // equity needs 0.5*2000 - 800 = 200, total 1000 <= 1000.
        let plan = allocate_fixed(&two_asset_snapshot(), 1000.0, &config()).unwrap();
        assert_eq!(plan.status, LumpSumStatus::Funded);
        assert!((plan.total_contribution - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn fixed_amount_funded_amounts_are_unscaled() {
        let plan = allocate_fixed(&two_asset_snapshot(), 3000.0, &config()).unwrap();
        assert_eq!(plan.status, LumpSumStatus::Funded);
        // Every line carries its raw need, no scaling applied.
        let new_total = 1000.0 + 3000.0;
        for line in &plan.lines {
            let needed = line.target_pct / 100.0 * new_total - line.current_value;
            assert!((line.amount_to_add - needed).abs() < 1e-6);
        }
    }

    #[test]
    fn fixed_amount_insufficient_scales_proportionally() {
        let plan = allocate_fixed(&two_asset_snapshot(), 100.0, &config()).unwrap();
        match plan.status {
            LumpSumStatus::Insufficient {
                requested,
                required,
            } => {
                assert_eq!(requested, 100.0);
                assert!(required > 100.0);
            }
            other => panic!("expected Insufficient, got {other:?}"),
        }
        // Everything gets spent, scaled by the same ratio
        assert!((plan.total_contribution - 100.0).abs() < 1e-6);

        let new_total = 1100.0;
        let ratios: Vec<f64> = plan
            .lines
            .iter()
            .map(|l| {
                let needed = l.target_pct / 100.0 * new_total - l.current_value;
                l.amount_to_add / needed
            })
            .collect();
        for pair in ratios.windows(2) {
            assert!((pair[0] - pair[1]).abs() < 1e-9);
        }
    }

    #[test]
    fn fixed_amount_rejects_non_positive() {
        assert!(allocate_fixed(&two_asset_snapshot(), 0.0, &config()).is_err());
        assert!(allocate_fixed(&two_asset_snapshot(), -50.0, &config()).is_err());
    }

    #[test]
    fn fixed_amount_on_balanced_portfolio_tops_everyone_up() {
        let snap = PortfolioSnapshot::build(&[
            Asset::new("A", 500.0, 50.0),
            Asset::new("B", 500.0, 50.0),
        ]);
        // A balanced portfolio plus new money: both assets are underweight
        // relative to the new total and split the amount by target.
        let plan = allocate_fixed(&snap, 200.0, &config()).unwrap();
        assert_eq!(plan.status, LumpSumStatus::Funded);
        assert_eq!(plan.lines.len(), 2);
        assert!((plan.lines[0].amount_to_add - 100.0).abs() < 1e-6);
        assert!((plan.lines[1].amount_to_add - 100.0).abs() < 1e-6);
    }
}
