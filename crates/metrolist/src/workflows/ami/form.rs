use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::estimator::{AmiEstimate, HouseholdProfile, IncomeRate};
use super::table::AmiIncomeTable;

pub const MISSING_VALUE_MESSAGE: &str = "Please fill out this field.";
pub const SUBMISSION_ALERT: &str = "There were errors in your submission.";

/// Ordered pages of the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EstimatorStep {
    HouseholdSize,
    HouseholdIncome,
    Disclosure,
    Result,
}

impl EstimatorStep {
    pub const ALL: [EstimatorStep; 4] = [
        EstimatorStep::HouseholdSize,
        EstimatorStep::HouseholdIncome,
        EstimatorStep::Disclosure,
        EstimatorStep::Result,
    ];

    /// 1-based position used by the progress indicator.
    pub fn number(self) -> usize {
        match self {
            EstimatorStep::HouseholdSize => 1,
            EstimatorStep::HouseholdIncome => 2,
            EstimatorStep::Disclosure => 3,
            EstimatorStep::Result => 4,
        }
    }

    pub fn relative_path(self) -> &'static str {
        match self {
            EstimatorStep::HouseholdSize => "/",
            EstimatorStep::HouseholdIncome => "/household-income",
            EstimatorStep::Disclosure => "/disclosure",
            EstimatorStep::Result => "/result",
        }
    }

    pub fn from_relative_path(path: &str) -> Option<Self> {
        let normalized = format!("/{}", path.trim_matches('/'));
        Self::ALL
            .into_iter()
            .find(|step| step.relative_path() == normalized)
    }

    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.number()).copied()
    }

    pub fn previous(self) -> Option<Self> {
        self.number()
            .checked_sub(2)
            .and_then(|index| Self::ALL.get(index).copied())
    }

    pub fn required_fields(self) -> &'static [FormField] {
        match self {
            EstimatorStep::HouseholdSize => &[FormField::HouseholdSize],
            EstimatorStep::HouseholdIncome => &[FormField::HouseholdIncome, FormField::IncomeRate],
            EstimatorStep::Disclosure => &[FormField::Disclosure],
            EstimatorStep::Result => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    HouseholdSize,
    HouseholdIncome,
    IncomeRate,
    Disclosure,
}

/// Field-level messages plus the page alert shown when a step fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormValidation {
    pub alert: String,
    pub fields: BTreeMap<FormField, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("{} ({} field(s) missing)", .0.alert, .0.fields.len())]
    Invalid(FormValidation),
    #[error("income rate '{0}' is not Monthly or Annual")]
    InvalidIncomeRate(String),
    #[error("no step after {0:?}")]
    NoNextStep(EstimatorStep),
    #[error("no step before {0:?}")]
    NoPreviousStep(EstimatorStep),
    #[error("cannot find estimator step for path '{0}'")]
    UnknownStep(String),
}

/// State of one pass through the estimator.
#[derive(Debug, Clone)]
pub struct AmiEstimatorForm {
    step: EstimatorStep,
    values: BTreeMap<FormField, String>,
    estimate: Option<AmiEstimate>,
}

impl Default for AmiEstimatorForm {
    fn default() -> Self {
        Self::new()
    }
}

impl AmiEstimatorForm {
    pub fn new() -> Self {
        Self {
            step: EstimatorStep::HouseholdSize,
            values: BTreeMap::new(),
            estimate: None,
        }
    }

    /// Resume at the step addressed by a relative path such as `/disclosure`.
    pub fn at_path(path: &str) -> Result<Self, FormError> {
        let step = EstimatorStep::from_relative_path(path)
            .ok_or_else(|| FormError::UnknownStep(path.to_string()))?;
        Ok(Self {
            step,
            ..Self::new()
        })
    }

    pub fn step(&self) -> EstimatorStep {
        self.step
    }

    pub fn estimate(&self) -> Option<AmiEstimate> {
        self.estimate
    }

    pub fn value(&self, field: FormField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn update(&mut self, field: FormField, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn validate_current_step(&self) -> Result<(), FormError> {
        let fields: BTreeMap<FormField, String> = self
            .step
            .required_fields()
            .iter()
            .filter(|field| !self.is_filled(**field))
            .map(|field| (*field, MISSING_VALUE_MESSAGE.to_string()))
            .collect();

        if fields.is_empty() {
            Ok(())
        } else {
            Err(FormError::Invalid(FormValidation {
                alert: SUBMISSION_ALERT.to_string(),
                fields,
            }))
        }
    }

    /// Validate the current step and move forward; entering the result step computes the estimate.
    pub fn advance(&mut self, table: &AmiIncomeTable) -> Result<EstimatorStep, FormError> {
        self.validate_current_step()?;
        let next = self.step.next().ok_or(FormError::NoNextStep(self.step))?;

        if next == EstimatorStep::Result {
            let profile = self.household_profile()?;
            self.estimate = Some(AmiEstimate::for_household(&profile, table));
        }

        self.step = next;
        Ok(next)
    }

    pub fn back(&mut self) -> Result<EstimatorStep, FormError> {
        let previous = self
            .step
            .previous()
            .ok_or(FormError::NoPreviousStep(self.step))?;
        self.step = previous;
        Ok(previous)
    }

    pub fn household_profile(&self) -> Result<HouseholdProfile, FormError> {
        let raw_rate = self.value(FormField::IncomeRate).unwrap_or_default();
        let income_rate = raw_rate
            .parse::<IncomeRate>()
            .map_err(|_| FormError::InvalidIncomeRate(raw_rate.to_string()))?;

        Ok(HouseholdProfile {
            household_size: self
                .value(FormField::HouseholdSize)
                .unwrap_or_default()
                .to_string(),
            household_income: self
                .value(FormField::HouseholdIncome)
                .unwrap_or_default()
                .to_string(),
            income_rate,
        })
    }

    fn is_filled(&self, field: FormField) -> bool {
        match (field, self.value(field)) {
            (FormField::Disclosure, Some(value)) => value.trim().eq_ignore_ascii_case("true"),
            (_, Some(value)) => !value.trim().is_empty(),
            (_, None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> AmiEstimatorForm {
        let mut form = AmiEstimatorForm::new();
        form.update(FormField::HouseholdSize, "4");
        form.update(FormField::HouseholdIncome, "$5,000.00");
        form.update(FormField::IncomeRate, "Monthly");
        form.update(FormField::Disclosure, "true");
        form
    }

    #[test]
    fn walks_every_step_to_the_result() {
        let table = AmiIncomeTable::boston_2020();
        let mut form = filled_form();

        assert_eq!(form.advance(&table), Ok(EstimatorStep::HouseholdIncome));
        assert_eq!(form.advance(&table), Ok(EstimatorStep::Disclosure));
        assert_eq!(form.advance(&table), Ok(EstimatorStep::Result));

        let estimate = form.estimate().expect("estimate computed on result step");
        assert_eq!(estimate.estimation, 52);
        assert_eq!(estimate.recommendation, 55);
        assert_eq!(
            form.advance(&table),
            Err(FormError::NoNextStep(EstimatorStep::Result))
        );
    }

    #[test]
    fn missing_values_block_navigation() {
        let table = AmiIncomeTable::boston_2020();
        let mut form = AmiEstimatorForm::at_path("/household-income").expect("known step");
        form.update(FormField::HouseholdIncome, "  ");

        match form.advance(&table) {
            Err(FormError::Invalid(validation)) => {
                assert_eq!(validation.alert, SUBMISSION_ALERT);
                assert_eq!(validation.fields.len(), 2);
                assert_eq!(
                    validation.fields.get(&FormField::IncomeRate).map(String::as_str),
                    Some(MISSING_VALUE_MESSAGE)
                );
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(form.step(), EstimatorStep::HouseholdIncome);
    }

    #[test]
    fn disclosure_must_be_acknowledged() {
        let table = AmiIncomeTable::boston_2020();
        let mut form = filled_form();
        form.update(FormField::Disclosure, "false");
        form.advance(&table).expect("size step");
        form.advance(&table).expect("income step");
        assert!(matches!(form.advance(&table), Err(FormError::Invalid(_))));
    }

    #[test]
    fn back_stops_at_first_step() {
        let mut form = AmiEstimatorForm::at_path("disclosure/").expect("known step");
        assert_eq!(form.back(), Ok(EstimatorStep::HouseholdIncome));
        assert_eq!(form.back(), Ok(EstimatorStep::HouseholdSize));
        assert_eq!(
            form.back(),
            Err(FormError::NoPreviousStep(EstimatorStep::HouseholdSize))
        );
    }

    #[test]
    fn unknown_paths_are_rejected() {
        assert!(matches!(
            AmiEstimatorForm::at_path("/summary"),
            Err(FormError::UnknownStep(_))
        ));
    }
}
