//! Account state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Running equity snapshot. In backtest mode this is owned by the harness and
/// updated on position close; in live mode it is refreshed from the broker
/// each evaluation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    /// Closed balance (realized only)
    pub balance: Decimal,
    /// Balance plus mark-to-market of open positions
    pub equity: Decimal,
    /// Cumulative realized PnL since start
    pub realized_pnl: Decimal,
    /// Absolute market value currently at open risk
    pub open_exposure: Decimal,
}

impl AccountState {
    /// Create a fresh account with the given starting capital.
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            balance: initial_capital,
            equity: initial_capital,
            realized_pnl: Decimal::ZERO,
            open_exposure: Decimal::ZERO,
        }
    }

    /// Realize a closed trade's PnL into the balance.
    pub fn apply_close(&mut self, pnl: Decimal) {
        self.balance += pnl;
        self.realized_pnl += pnl;
    }

    /// Re-mark equity from current unrealized PnL and exposure.
    pub fn mark(&mut self, unrealized_pnl: Decimal, open_exposure: Decimal) {
        self.equity = self.balance + unrealized_pnl;
        self.open_exposure = open_exposure;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_account_lifecycle() {
        let mut account = AccountState::new(dec!(10000));
        assert_eq!(account.equity, dec!(10000));

        account.mark(dec!(50), dec!(1200));
        assert_eq!(account.equity, dec!(10050));
        assert_eq!(account.open_exposure, dec!(1200));

        account.apply_close(dec!(-120));
        account.mark(Decimal::ZERO, Decimal::ZERO);
        assert_eq!(account.balance, dec!(9880));
        assert_eq!(account.equity, dec!(9880));
        assert_eq!(account.realized_pnl, dec!(-120));
    }
}
