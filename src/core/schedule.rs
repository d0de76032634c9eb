use super::rates::{expense_at_retirement, monthly_expense_for_year};
use super::types::{Inputs, WithdrawalYear};

/// Fixed withdrawal parameters for one retirement; the starting corpus varies per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawdownPlan {
    pub retirement_age: u32,
    pub retirement_years: u32,
    pub expense_at_retirement: f64,
    pub inflation_pct: f64,
    pub monthly_post_return: f64,
}

impl DrawdownPlan {
    pub fn from_inputs(inputs: &Inputs) -> Self {
        let horizon = inputs.horizon();
        let rates = inputs.monthly_rates();
        Self {
            retirement_age: inputs.retirement_age,
            retirement_years: horizon.retirement_years,
            expense_at_retirement: expense_at_retirement(
                inputs.monthly_expense_today,
                rates.inflation,
                horizon.months_to_retire,
            ),
            inflation_pct: inputs.inflation_rate_annual,
            monthly_post_return: rates.post_retirement,
        }
    }

    pub fn monthly_expense(&self, year: u32) -> f64 {
        monthly_expense_for_year(self.expense_at_retirement, self.inflation_pct, year)
    }

    /// Growth of one unit left untouched for the whole drawdown.
    pub fn horizon_growth(&self) -> f64 {
        (1.0 + self.monthly_post_return).powi((self.retirement_years * 12) as i32)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleOutcome {
    /// Balance after the final month, never negative.
    pub terminal_balance: f64,
    /// Terminal balance less every unfunded withdrawal compounded to the end.
    ///
    /// Equal to `terminal_balance` whenever the corpus lasts; negative once it runs dry.
    /// Strictly increasing in the starting corpus.
    pub net_terminal: f64,
    pub rows: Vec<WithdrawalYear>,
}

/// Replays the drawdown month by month from `corpus`.
///
/// Each month withdraws first (capped at the balance) and then grows what is left.
pub fn simulate(corpus: f64, plan: &DrawdownPlan) -> ScheduleOutcome {
    let growth = 1.0 + plan.monthly_post_return;
    let mut balance = corpus;
    let mut deficit = 0.0;
    let mut rows = Vec::with_capacity(plan.retirement_years as usize);

    for year in 0..plan.retirement_years {
        let monthly_expense = plan.monthly_expense(year);
        let mut withdrawn = 0.0;
        for _ in 0..12 {
            let withdrawal = if balance > 0.0 {
                monthly_expense.min(balance)
            } else {
                0.0
            };
            balance -= withdrawal;
            withdrawn += withdrawal;
            deficit += monthly_expense - withdrawal;
            if balance > 0.0 {
                balance *= growth;
            }
            deficit *= growth;
        }
        rows.push(WithdrawalYear {
            age: plan.retirement_age + year,
            year_index: year + 1,
            annual_withdrawal: withdrawn,
            monthly_withdrawal: monthly_expense,
            remaining_balance: balance,
        });
    }

    ScheduleOutcome {
        terminal_balance: balance,
        net_terminal: balance - deficit,
        rows,
    }
}
