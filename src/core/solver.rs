use tracing::debug;

use super::error::PlanError;
use super::rates::{growth_factor, real_rate};
use super::schedule::{DrawdownPlan, simulate};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Largest candidate tried, in currency units.
    pub upper_bound: f64,
    /// Bracket width at which the search stops.
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            upper_bound: 1e10,
            tolerance: 0.01,
            max_iterations: 200,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<(), PlanError> {
        if !self.upper_bound.is_finite() || self.upper_bound <= 0.0 {
            return Err(PlanError::invalid("search_upper_bound", "must be > 0"));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(PlanError::invalid("search_tolerance", "must be > 0"));
        }
        if self.max_iterations == 0 {
            return Err(PlanError::invalid("max_iterations", "must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    pub value: f64,
    pub achieved: f64,
    pub iterations: u32,
}

/// Smallest `x` in `[0, upper_bound]` with `objective(x) >= target`, for a non-decreasing
/// objective.
///
/// `slope` bounds how fast the objective moves per unit of `x`; the final candidate must land
/// within `tolerance * slope` of the target or the search reports non-convergence.
pub fn bisect<F>(
    objective: F,
    target: f64,
    slope: f64,
    config: SolverConfig,
) -> Result<SearchResult, PlanError>
where
    F: Fn(f64) -> f64,
{
    config.validate()?;

    let mut lo = 0.0;
    let mut hi = config.upper_bound;

    let high_eval = objective(hi);
    if high_eval < target {
        return Err(PlanError::SearchNonConvergence {
            target,
            achieved: high_eval,
            upper_bound: hi,
        });
    }
    let low_eval = objective(lo);
    if low_eval >= target {
        return Ok(SearchResult {
            value: lo,
            achieved: low_eval,
            iterations: 0,
        });
    }

    let mut iterations = 0;
    while iterations < config.max_iterations && hi - lo > config.tolerance {
        iterations += 1;
        let mid = (lo + hi) * 0.5;
        if mid <= lo || mid >= hi {
            break;
        }
        if objective(mid) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let achieved = objective(hi);
    let allowed = 2.0 * config.tolerance * slope.abs().max(1.0) + target.abs() * 1e-9;
    if (achieved - target).abs() > allowed {
        return Err(PlanError::SearchNonConvergence {
            target,
            achieved,
            upper_bound: config.upper_bound,
        });
    }

    Ok(SearchResult {
        value: hi,
        achieved,
        iterations,
    })
}

/// Smallest corpus whose simulated drawdown ends on `legacy_nominal`.
pub fn required_corpus_simulated(
    plan: &DrawdownPlan,
    legacy_nominal: f64,
    config: SolverConfig,
) -> Result<SearchResult, PlanError> {
    let result = bisect(
        |corpus| simulate(corpus, plan).net_terminal,
        legacy_nominal,
        plan.horizon_growth(),
        config,
    )?;
    debug!(
        corpus = result.value,
        terminal = result.achieved,
        iterations = result.iterations,
        "solved required corpus by simulation"
    );
    Ok(result)
}

/// Present value at retirement of every scheduled withdrawal plus the discounted legacy.
///
/// Withdrawals form a growing annuity-due: monthly payments at the start of each month,
/// stepped up once a year, discounted at the nominal post-retirement rate. Summed year by year
/// this is a geometric series in the real annual rate.
pub fn required_corpus_closed_form(plan: &DrawdownPlan, legacy_nominal: f64) -> f64 {
    let monthly = plan.monthly_post_return;
    let discount = 1.0 / (1.0 + monthly);
    let within_year = if monthly.abs() < 1e-12 {
        12.0
    } else {
        (1.0 - discount.powi(12)) / (1.0 - discount)
    };

    let years = plan.retirement_years as i32;
    let annual_pct = (growth_factor(monthly, 12) - 1.0) * 100.0;
    let real = real_rate(annual_pct, plan.inflation_pct);
    let across_years = if real.abs() < 1e-12 {
        years as f64
    } else {
        let real_discount = 1.0 / (1.0 + real);
        (1.0 - real_discount.powi(years)) / (1.0 - real_discount)
    };

    let withdrawals = plan.expense_at_retirement * within_year * across_years;
    let legacy = legacy_nominal / plan.horizon_growth();
    withdrawals + legacy
}
