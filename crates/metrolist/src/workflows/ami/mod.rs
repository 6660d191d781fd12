//! Area Median Income estimation: table loading, the estimator form, and the
//! recommendation handed to the search filters.

pub mod estimator;
pub mod form;
pub mod preferences;
pub mod table;

pub use estimator::{
    estimate_ami, is_above_upper_bound, parse_currency, recommend_ami, AmiEstimate,
    HouseholdProfile, IncomeRate, AMI_UPPER_BOUND,
};
pub use form::{AmiEstimatorForm, EstimatorStep, FormError, FormField, FormValidation};
pub use preferences::{opt_into_recommendation, record_estimate};
pub use table::{AmiIncomeTable, AmiTableError, AmiTier};
