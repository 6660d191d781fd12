use tracing::info;

use super::estimator::AmiEstimate;
use crate::store::{
    KeyValueStore, StoreError, AMI_RECOMMENDATION_KEY, HOUSEHOLD_INCOME_KEY,
    USE_AMI_RECOMMENDATION_KEY,
};

/// Persist the recommendation (and annual income, when known) for the next search session.
pub fn record_estimate<S>(
    store: &S,
    estimate: &AmiEstimate,
    annual_income: Option<f64>,
) -> Result<(), StoreError>
where
    S: KeyValueStore + ?Sized,
{
    store.set(AMI_RECOMMENDATION_KEY, &estimate.recommendation.to_string())?;
    if let Some(income) = annual_income.filter(|income| income.is_finite()) {
        store.set(HOUSEHOLD_INCOME_KEY, &income.to_string())?;
    }
    info!(
        estimation = estimate.estimation,
        recommendation = estimate.recommendation,
        "recorded AMI estimate"
    );
    Ok(())
}

/// Ask the next search session to start from the recommended AMI lower bound.
pub fn opt_into_recommendation<S>(store: &S) -> Result<(), StoreError>
where
    S: KeyValueStore + ?Sized,
{
    store.set(USE_AMI_RECOMMENDATION_KEY, "true")
}
