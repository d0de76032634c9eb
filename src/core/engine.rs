use tracing::{debug, info};

use super::accumulator::{projected_savings, required_extra_contribution, required_extra_lumpsum};
use super::error::PlanError;
use super::rates::legacy_nominal_value;
use super::schedule::{DrawdownPlan, simulate};
use super::solver::{SolverConfig, required_corpus_closed_form, required_corpus_simulated};
use super::types::{CorpusMethod, Inputs, PlanResult};

/// Oldest life expectancy a plan may run to.
pub const MAX_LIFE_EXPECTANCY: u32 = 150;

pub fn run_plan(inputs: &Inputs) -> Result<PlanResult, PlanError> {
    run_plan_with_config(inputs, SolverConfig::default())
}

pub fn run_plan_with_config(
    inputs: &Inputs,
    config: SolverConfig,
) -> Result<PlanResult, PlanError> {
    validate_inputs(inputs)?;
    config.validate()?;

    let horizon = inputs.horizon();
    let rates = inputs.monthly_rates();
    let step_up = inputs.step_up_rate();

    let projected = projected_savings(
        inputs.existing_corpus,
        inputs.current_monthly_contribution,
        rates.pre_retirement,
        horizon.years_to_retire,
        step_up,
    );

    let plan = DrawdownPlan::from_inputs(inputs);
    let legacy_nominal = legacy_nominal_value(
        inputs.legacy_target_today,
        rates.inflation,
        horizon.months_to_retire + horizon.retirement_months,
    );

    let required_corpus = match inputs.corpus_method {
        CorpusMethod::Simulated => required_corpus_simulated(&plan, legacy_nominal, config)?.value,
        CorpusMethod::ClosedForm => required_corpus_closed_form(&plan, legacy_nominal),
    };

    let shortfall = (required_corpus - projected).max(0.0);
    let surplus = (projected - required_corpus).max(0.0);
    let required_extra_contribution = required_extra_contribution(
        shortfall,
        rates.pre_retirement,
        horizon.years_to_retire,
        step_up,
        config,
    )?;
    let required_extra_lumpsum =
        required_extra_lumpsum(shortfall, rates.pre_retirement, horizon.months_to_retire);

    // The table shows what the saver will actually hold once any gap is closed.
    let funded_corpus = required_corpus.max(projected);
    let schedule = simulate(funded_corpus, &plan);
    debug!(
        funded_corpus,
        terminal_balance = schedule.terminal_balance,
        legacy_nominal,
        "replayed withdrawal schedule"
    );

    info!(
        required_corpus,
        projected_savings = projected,
        shortfall,
        method = ?inputs.corpus_method,
        "retirement plan computed"
    );

    Ok(PlanResult {
        corpus_method: inputs.corpus_method,
        months_to_retire: horizon.months_to_retire,
        retirement_months: horizon.retirement_months,
        expense_at_retirement: plan.expense_at_retirement,
        legacy_nominal_value: legacy_nominal,
        required_corpus,
        projected_savings: projected,
        shortfall,
        surplus,
        required_extra_contribution,
        required_extra_lumpsum,
        funded_corpus,
        withdrawal_schedule: schedule.rows,
    })
}

/// Rejects inputs the engine cannot plan for, before any computation runs.
pub fn validate_inputs(inputs: &Inputs) -> Result<(), PlanError> {
    if inputs.current_age >= inputs.retirement_age
        || inputs.retirement_age >= inputs.life_expectancy
    {
        return Err(PlanError::InvalidAgeOrder {
            current_age: inputs.current_age,
            retirement_age: inputs.retirement_age,
            life_expectancy: inputs.life_expectancy,
        });
    }

    if inputs.life_expectancy > MAX_LIFE_EXPECTANCY {
        return Err(PlanError::invalid(
            "life_expectancy",
            format!("must be <= {MAX_LIFE_EXPECTANCY}"),
        ));
    }

    if !inputs.monthly_expense_today.is_finite() || inputs.monthly_expense_today <= 0.0 {
        return Err(PlanError::invalid("monthly_expense_today", "must be > 0"));
    }

    for (field, rate) in [
        ("inflation_rate_annual", inputs.inflation_rate_annual),
        (
            "pre_retirement_return_annual",
            inputs.pre_retirement_return_annual,
        ),
        (
            "post_retirement_return_annual",
            inputs.post_retirement_return_annual,
        ),
        (
            "contribution_step_up_rate_annual",
            inputs.step_up_rate(),
        ),
    ] {
        if !rate.is_finite() || rate < 0.0 {
            return Err(PlanError::invalid(field, "must be a finite rate >= 0"));
        }
    }

    for (field, amount) in [
        ("existing_corpus", inputs.existing_corpus),
        (
            "current_monthly_contribution",
            inputs.current_monthly_contribution,
        ),
        ("legacy_target_today", inputs.legacy_target_today),
    ] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(PlanError::invalid(field, "must be a finite amount >= 0"));
        }
    }

    if inputs.post_retirement_return_annual <= inputs.inflation_rate_annual {
        return Err(PlanError::UnsustainableWithdrawal {
            post_retirement_return: inputs.post_retirement_return_annual,
            inflation: inputs.inflation_rate_annual,
        });
    }

    Ok(())
}
