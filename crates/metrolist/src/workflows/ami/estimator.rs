use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::table::AmiIncomeTable;

/// Estimations above this percentage are unlikely to qualify for any listing.
pub const AMI_UPPER_BOUND: i64 = 200;

const RECOMMENDATION_STEP: i64 = 5;

/// How often the declared household income is received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncomeRate {
    Monthly,
    Annual,
}

impl IncomeRate {
    pub fn label(self) -> &'static str {
        match self {
            IncomeRate::Monthly => "Monthly",
            IncomeRate::Annual => "Annual",
        }
    }
}

impl FromStr for IncomeRate {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "monthly" | "month" => Ok(Self::Monthly),
            "annual" | "annually" | "yearly" | "year" => Ok(Self::Annual),
            other => Err(format!("unknown income rate '{other}' (expected Monthly or Annual)")),
        }
    }
}

impl fmt::Display for IncomeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Household answers exactly as entered into the estimator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdProfile {
    pub household_size: String,
    pub household_income: String,
    pub income_rate: IncomeRate,
}

impl HouseholdProfile {
    pub fn annualized_income(&self) -> Option<f64> {
        parse_currency(&self.household_income).map(|income| annualize(income, self.income_rate))
    }
}

/// Estimation plus the derived search recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmiEstimate {
    pub estimation: i64,
    pub recommendation: i64,
    pub above_upper_bound: bool,
}

impl AmiEstimate {
    pub fn from_estimation(estimation: i64) -> Self {
        Self {
            estimation,
            recommendation: recommend_ami(estimation),
            above_upper_bound: is_above_upper_bound(estimation),
        }
    }

    pub fn for_household(profile: &HouseholdProfile, table: &AmiIncomeTable) -> Self {
        Self::from_estimation(estimate_ami(profile, table))
    }

    pub fn summary(&self) -> String {
        if self.above_upper_bound {
            format!(
                "estimated eligibility {}% AMI; unlikely to qualify for listed units",
                self.estimation
            )
        } else {
            format!(
                "estimated eligibility {}% AMI; search homes listed at {}% AMI and above",
                self.estimation, self.recommendation
            )
        }
    }
}

/// Parse a currency-formatted amount such as `"$5,000.00"`.
///
/// Like a browser's `parseFloat`, trailing garbage after the numeric prefix is ignored.
pub fn parse_currency(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    let trimmed = cleaned.trim_start();

    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_point = false;
    for (index, c) in trimmed.char_indices() {
        match c {
            '+' | '-' if index == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_point => seen_point = true,
            _ => break,
        }
        end = index + c.len_utf8();
    }

    if !seen_digit {
        return None;
    }
    trimmed[..end].parse::<f64>().ok()
}

pub fn annualize(income: f64, rate: IncomeRate) -> f64 {
    match rate {
        IncomeRate::Monthly => income * 12.0,
        IncomeRate::Annual => income,
    }
}

/// Integer percentage of the 100% AMI ceiling for the household's size.
///
/// Unusable inputs resolve to `0` with a warning instead of an error.
pub fn estimate_ami(profile: &HouseholdProfile, table: &AmiIncomeTable) -> i64 {
    let annualized = profile.annualized_income();
    let ceiling = table.ceiling_for(&profile.household_size);

    match (annualized, ceiling) {
        (Some(income), Some(ceiling)) if income.is_finite() && ceiling.is_finite() && ceiling > 0.0 => {
            ((income / ceiling) * 100.0).floor() as i64
        }
        _ => {
            warn!(
                household_size = %profile.household_size,
                household_income = %profile.household_income,
                "AMI calculation failed: annualized income or income ceiling is not numeric"
            );
            0
        }
    }
}

/// Round a positive estimation up to the next multiple of five.
pub fn recommend_ami(estimation: i64) -> i64 {
    if estimation < 0 {
        return 0;
    }

    if estimation == 0 {
        return estimation;
    }

    (estimation + RECOMMENDATION_STEP - 1) / RECOMMENDATION_STEP * RECOMMENDATION_STEP
}

pub fn is_above_upper_bound(estimation: i64) -> bool {
    estimation > AMI_UPPER_BOUND
}
