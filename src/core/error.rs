/// Why a plan could not be computed. Every variant is final for the given inputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error(
        "ages must satisfy current_age < retirement_age < life_expectancy \
         (got {current_age}, {retirement_age}, {life_expectancy})"
    )]
    InvalidAgeOrder {
        current_age: u32,
        retirement_age: u32,
        life_expectancy: u32,
    },

    #[error("{field} {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error(
        "sustainable withdrawal requires post-retirement return to exceed inflation \
         ({post_retirement_return}% <= {inflation}%)"
    )]
    UnsustainableWithdrawal {
        post_retirement_return: f64,
        inflation: f64,
    },

    #[error(
        "search did not converge: target {target:.2}, best candidate reached {achieved:.2} \
         (upper bound {upper_bound:.2})"
    )]
    SearchNonConvergence {
        target: f64,
        achieved: f64,
        upper_bound: f64,
    },
}

impl PlanError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        PlanError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PlanError::InvalidAgeOrder { .. } => "invalid-age-order",
            PlanError::InvalidInput { .. } => "invalid-input",
            PlanError::UnsustainableWithdrawal { .. } => "unsustainable-withdrawal",
            PlanError::SearchNonConvergence { .. } => "search-non-convergence",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PlanError::InvalidAgeOrder { .. } | PlanError::InvalidInput { .. }
        )
    }
}
