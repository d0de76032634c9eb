use serde::Serialize;

use super::rates::monthly_rate;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorpusMethod {
    /// Bisection over the month-by-month depletion simulation.
    #[default]
    Simulated,
    /// Growing annuity-due at the real post-retirement rate.
    ClosedForm,
}

/// Caller-supplied plan parameters. Rates are annual percentages (7.0 means 7%).
#[derive(Debug, Clone)]
pub struct Inputs {
    pub current_age: u32,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    pub monthly_expense_today: f64,
    pub inflation_rate_annual: f64,
    pub pre_retirement_return_annual: f64,
    pub post_retirement_return_annual: f64,
    pub existing_corpus: f64,
    pub current_monthly_contribution: f64,
    pub legacy_target_today: f64,
    pub contribution_step_up_rate_annual: Option<f64>,
    pub corpus_method: CorpusMethod,
}

impl Inputs {
    pub fn horizon(&self) -> Horizon {
        let years_to_retire = self.retirement_age.saturating_sub(self.current_age);
        let retirement_years = self.life_expectancy.saturating_sub(self.retirement_age);
        Horizon {
            years_to_retire,
            retirement_years,
            months_to_retire: years_to_retire.saturating_mul(12),
            retirement_months: retirement_years.saturating_mul(12),
        }
    }

    pub fn monthly_rates(&self) -> MonthlyRates {
        MonthlyRates {
            inflation: monthly_rate(self.inflation_rate_annual),
            pre_retirement: monthly_rate(self.pre_retirement_return_annual),
            post_retirement: monthly_rate(self.post_retirement_return_annual),
        }
    }

    /// Step-up as a percentage, treating `None` and zero alike.
    pub fn step_up_rate(&self) -> f64 {
        self.contribution_step_up_rate_annual.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Horizon {
    pub years_to_retire: u32,
    pub retirement_years: u32,
    pub months_to_retire: u32,
    pub retirement_months: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyRates {
    pub inflation: f64,
    pub pre_retirement: f64,
    pub post_retirement: f64,
}

/// One retirement year of the depletion table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalYear {
    pub age: u32,
    /// 1-based.
    pub year_index: u32,
    /// Sum of what was actually withdrawn; falls short of 12x the monthly amount once depleted.
    pub annual_withdrawal: f64,
    /// Scheduled nominal monthly amount for this year.
    pub monthly_withdrawal: f64,
    pub remaining_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    pub corpus_method: CorpusMethod,
    pub months_to_retire: u32,
    pub retirement_months: u32,
    pub expense_at_retirement: f64,
    pub legacy_nominal_value: f64,
    pub required_corpus: f64,
    pub projected_savings: f64,
    pub shortfall: f64,
    pub surplus: f64,
    pub required_extra_contribution: f64,
    pub required_extra_lumpsum: f64,
    pub funded_corpus: f64,
    pub withdrawal_schedule: Vec<WithdrawalYear>,
}
