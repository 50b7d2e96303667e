//! Immediate rebalancer: buy/sell deltas to hit targets right now.
//!
//! One pass over the snapshot, no iteration. Gaps inside the cent tolerance
//! are suppressed so floating rounding never produces phantom trades.

use serde::Serialize;

use crate::config::EngineConfig;
use crate::snapshot::PortfolioSnapshot;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
        }
    }
}

/// A single computed trade. `amount` is always positive.
#[derive(Debug, Clone, Serialize)]
pub struct TradeLine {
    pub name: String,
    pub action: TradeAction,
    pub amount: f64,
}

/// Result of an immediate rebalance: one line per asset whose gap exceeds
/// the cent tolerance, in snapshot order.
#[derive(Debug, Clone, Serialize)]
pub struct ImmediatePlan {
    pub trades: Vec<TradeLine>,
}

impl ImmediatePlan {
    /// No trades needed: the portfolio already sits on its targets.
    pub fn is_balanced(&self) -> bool {
        self.trades.is_empty()
    }

    /// Sum of buy amounts, computed on demand.
    pub fn total_buys(&self) -> f64 {
        self.trades
            .iter()
            .filter(|t| t.action == TradeAction::Buy)
            .map(|t| t.amount)
            .sum()
    }

    /// Sum of sell amounts, computed on demand.
    pub fn total_sells(&self) -> f64 {
        self.trades
            .iter()
            .filter(|t| t.action == TradeAction::Sell)
            .map(|t| t.amount)
            .sum()
    }
}

impl std::fmt::Display for ImmediatePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_balanced() {
            return writeln!(f, "Portfolio is already balanced, no trades needed.");
        }
        writeln!(f, "{:<20} {:>6} {:>12}", "Asset", "Side", "Amount")?;
        for t in &self.trades {
            writeln!(
                f,
                "{:<20} {:>6} {:>12.2}",
                t.name,
                t.action.to_string(),
                t.amount
            )?;
        }
        writeln!(
            f,
            "Total buys: {:.2}  Total sells: {:.2}",
            self.total_buys(),
            self.total_sells()
        )
    }
}

/// Compute the buy/sell deltas that hit every target at the current total.
pub fn rebalance_now(snapshot: &PortfolioSnapshot, config: &EngineConfig) -> ImmediatePlan {
    let tol = config.cent_tolerance;
    let trades = snapshot
        .entries
        .iter()
        .filter(|e| e.gap.abs() > tol)
        .map(|e| TradeLine {
            name: e.name.clone(),
            action: if e.gap > 0.0 {
                TradeAction::Buy
            } else {
                TradeAction::Sell
            },
            amount: e.gap.abs(),
        })
        .collect();

    ImmediatePlan { trades }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Asset;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn buy_and_sell() {
        let snap = PortfolioSnapshot::build(&[
            Asset::new("Equity", 800.0, 50.0),
            Asset::new("Bonds", 200.0, 50.0),
        ]);
        let plan = rebalance_now(&snap, &config());

        assert_eq!(plan.trades.len(), 2);
        assert_eq!(plan.trades[0].name, "Equity");
        assert_eq!(plan.trades[0].action, TradeAction::Sell);
        assert!((plan.trades[0].amount - 300.0).abs() < 1e-9);
        assert_eq!(plan.trades[1].action, TradeAction::Buy);
        assert!((plan.trades[1].amount - 300.0).abs() < 1e-9);
    }

    #[test]
    fn buy_and_sell_totals_match() {
        let snap = PortfolioSnapshot::build(&[
            Asset::new("A", 700.0, 40.0),
            Asset::new("B", 100.0, 30.0),
            Asset::new("C", 200.0, 30.0),
        ]);
        let plan = rebalance_now(&snap, &config());
        // Immediate rebalancing moves money around, it never adds any
        assert!((plan.total_buys() - plan.total_sells()).abs() < 1e-6);
    }

    #[test]
    fn balanced_portfolio_yields_no_trades() {
        let snap = PortfolioSnapshot::build(&[
            Asset::new("A", 500.0, 50.0),
            Asset::new("B", 500.0, 50.0),
        ]);
        let plan = rebalance_now(&snap, &config());
        assert!(plan.is_balanced());
    }

    #[test]
    fn single_asset_full_target_is_balanced() {
        let snap = PortfolioSnapshot::build(&[Asset::new("All-in", 1234.56, 100.0)]);
        let plan = rebalance_now(&snap, &config());
        assert!(plan.is_balanced());
    }

    #[test]
    fn sub_cent_gaps_are_suppressed() {
        // 0.005 off target: inside the cent tolerance
        let snap = PortfolioSnapshot::build(&[
            Asset::new("A", 500.005, 50.0),
            Asset::new("B", 499.995, 50.0),
        ]);
        let plan = rebalance_now(&snap, &config());
        assert!(plan.is_balanced());
    }

    #[test]
    fn no_asset_appears_twice() {
        let snap = PortfolioSnapshot::build(&[
            Asset::new("A", 700.0, 40.0),
            Asset::new("B", 100.0, 30.0),
            Asset::new("C", 200.0, 30.0),
        ]);
        let plan = rebalance_now(&snap, &config());
        let mut names: Vec<&str> = plan.trades.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), plan.trades.len());
    }
}
