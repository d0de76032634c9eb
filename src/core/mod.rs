mod accumulator;
mod engine;
mod error;
mod rates;
mod schedule;
mod solver;
mod types;

pub use accumulator::{
    future_value_contributions, projected_savings, required_extra_contribution,
    required_extra_lumpsum, sip_factor,
};
pub use engine::{MAX_LIFE_EXPECTANCY, run_plan, run_plan_with_config, validate_inputs};
pub use error::PlanError;
pub use rates::{monthly_rate, real_rate};
pub use schedule::{DrawdownPlan, ScheduleOutcome, simulate};
pub use solver::{
    SearchResult, SolverConfig, bisect, required_corpus_closed_form, required_corpus_simulated,
};
pub use types::{CorpusMethod, Horizon, Inputs, MonthlyRates, PlanResult, WithdrawalYear};
