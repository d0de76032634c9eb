/// Equivalent monthly compounding rate for an annual percentage.
///
/// `(1 + annual/100)^(1/12) - 1`. Zero and negative rates pass through; rates at or below
/// -100% are the caller's problem.
pub fn monthly_rate(annual_pct: f64) -> f64 {
    (1.0 + annual_pct / 100.0).powf(1.0 / 12.0) - 1.0
}

/// Inflation-adjusted annual return as a fraction: `(1+nominal)/(1+inflation) - 1`.
pub fn real_rate(nominal_pct: f64, inflation_pct: f64) -> f64 {
    (1.0 + nominal_pct / 100.0) / (1.0 + inflation_pct / 100.0) - 1.0
}

/// `(1 + rate)^periods`.
pub fn growth_factor(rate: f64, periods: u32) -> f64 {
    (1.0 + rate).powi(periods as i32)
}

/// Today's monthly expense in money of the retirement date.
pub fn expense_at_retirement(
    monthly_expense_today: f64,
    monthly_inflation: f64,
    months_to_retire: u32,
) -> f64 {
    monthly_expense_today * growth_factor(monthly_inflation, months_to_retire)
}

/// Monthly withdrawal during retirement year `year` (0-based).
///
/// Cost of living is adjusted once per year, so the amount is flat within a year.
pub fn monthly_expense_for_year(expense_at_retirement: f64, inflation_pct: f64, year: u32) -> f64 {
    expense_at_retirement * (1.0 + inflation_pct / 100.0).powi(year as i32)
}

/// Nominal legacy at life expectancy, compounded over both the saving and drawdown spans.
pub fn legacy_nominal_value(legacy_today: f64, monthly_inflation: f64, total_months: u32) -> f64 {
    legacy_today * growth_factor(monthly_inflation, total_months)
}
