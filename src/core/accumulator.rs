use super::error::PlanError;
use super::rates::growth_factor;
use super::solver::{SolverConfig, bisect};

/// Future value of one unit paid at the start of each of `periods` months (annuity-due).
pub fn sip_factor(periods: u32, monthly_rate: f64) -> f64 {
    if monthly_rate.abs() < 1e-12 {
        return periods as f64;
    }
    (growth_factor(monthly_rate, periods) - 1.0) / monthly_rate * (1.0 + monthly_rate)
}

pub fn future_value_lumpsum(amount: f64, monthly_rate: f64, months: u32) -> f64 {
    amount * growth_factor(monthly_rate, months)
}

/// Future value of a monthly contribution stream over `years` whole years.
///
/// With a step-up, the contribution rises by `step_up_pct` at each anniversary and stays flat
/// within the year.
pub fn future_value_contributions(
    monthly_contribution: f64,
    monthly_rate: f64,
    years: u32,
    step_up_pct: f64,
) -> f64 {
    if step_up_pct == 0.0 {
        return monthly_contribution * sip_factor(years * 12, monthly_rate);
    }

    let year_factor = sip_factor(12, monthly_rate);
    let mut contribution = monthly_contribution;
    let mut total = 0.0;
    for year in 0..years {
        let remaining_months = (years - year - 1) * 12;
        total += contribution * year_factor * growth_factor(monthly_rate, remaining_months);
        contribution *= 1.0 + step_up_pct / 100.0;
    }
    total
}

/// Existing savings plus the contribution stream, valued at the retirement date.
pub fn projected_savings(
    existing_corpus: f64,
    monthly_contribution: f64,
    monthly_rate: f64,
    years_to_retire: u32,
    step_up_pct: f64,
) -> f64 {
    future_value_lumpsum(existing_corpus, monthly_rate, years_to_retire * 12)
        + future_value_contributions(
            monthly_contribution,
            monthly_rate,
            years_to_retire,
            step_up_pct,
        )
}

/// Additional starting monthly contribution that accumulates to `shortfall` by retirement.
///
/// The extra stream follows the same step-up as the existing one. Flat streams invert the
/// annuity-due factor directly; stepped-up streams are searched.
pub fn required_extra_contribution(
    shortfall: f64,
    monthly_rate: f64,
    years_to_retire: u32,
    step_up_pct: f64,
    config: SolverConfig,
) -> Result<f64, PlanError> {
    if shortfall <= 0.0 {
        return Ok(0.0);
    }
    if years_to_retire == 0 {
        return Err(PlanError::invalid(
            "retirement_age",
            "must leave at least one year to contribute",
        ));
    }

    if step_up_pct == 0.0 {
        return Ok(shortfall / sip_factor(years_to_retire * 12, monthly_rate));
    }

    let per_unit = future_value_contributions(1.0, monthly_rate, years_to_retire, step_up_pct);
    let result = bisect(
        |extra| future_value_contributions(extra, monthly_rate, years_to_retire, step_up_pct),
        shortfall,
        per_unit,
        config,
    )?;
    Ok(result.value)
}

/// `shortfall` discounted back to today at the pre-retirement rate.
pub fn required_extra_lumpsum(shortfall: f64, monthly_rate: f64, months_to_retire: u32) -> f64 {
    if shortfall <= 0.0 {
        return 0.0;
    }
    shortfall / growth_factor(monthly_rate, months_to_retire)
}
