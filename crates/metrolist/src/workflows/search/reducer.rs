use serde::{Deserialize, Serialize};

use super::domain::CardinalDirection;
use super::filters::Filters;
use super::parsing::parse_leading_integer;
use crate::workflows::ami::parse_currency;

/// Criteria whose controls carry integer slider values.
const NUMERIC_CRITERIA: [&str; 2] = ["amiQualification", "rentalPrice"];

/// Kind of control that produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum InputKind {
    Checkbox { checked: bool },
    Value,
}

/// A single filter control interaction, decoupled from any UI event system.
///
/// `criterion` is the enclosing filter group for nested controls (for example
/// `location` for a neighborhood checkbox, or `rentalPrice` for a slider handle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criterion: Option<String>,
    pub name: String,
    pub value: String,
    pub input: InputKind,
}

impl FilterChange {
    /// Checkbox toggle addressed by a dotted path such as `offer.rent` or
    /// `location.neighborhood.Dorchester`.
    pub fn checkbox(path: &str, checked: bool) -> Result<Self, FilterChangeError> {
        let segments: Vec<&str> = path.splitn(3, '.').collect();
        let (criterion, name, value) = match segments.as_slice() {
            [name, value] => (None, *name, *value),
            [criterion, name, value] => (Some(*criterion), *name, *value),
            _ => return Err(FilterChangeError::InvalidPath(path.to_string())),
        };

        Ok(Self {
            criterion: criterion.map(str::to_string),
            name: name.to_string(),
            value: value.to_string(),
            input: InputKind::Checkbox { checked },
        })
    }

    /// Non-checkbox control addressed as `criterion.name`, e.g. `rentalPrice.upperBound`.
    pub fn value(path: &str, value: impl Into<String>) -> Result<Self, FilterChangeError> {
        let (criterion, name) = path
            .split_once('.')
            .filter(|(criterion, name)| !criterion.is_empty() && !name.is_empty())
            .ok_or_else(|| FilterChangeError::InvalidPath(path.to_string()))?;

        Ok(Self {
            criterion: Some(criterion.to_string()),
            name: name.to_string(),
            value: value.into(),
            input: InputKind::Value,
        })
    }

    fn resolved_value(&self) -> Result<Resolved, FilterChangeError> {
        let numeric = self
            .criterion
            .as_deref()
            .is_some_and(|criterion| NUMERIC_CRITERIA.contains(&criterion));

        match (self.input, numeric) {
            (InputKind::Checkbox { checked }, false) => Ok(Resolved::Flag(checked)),
            (InputKind::Value, false) => Ok(Resolved::Text(self.value.clone())),
            (InputKind::Value, true) => parse_leading_integer(&self.value)
                .map(Resolved::Integer)
                .ok_or_else(|| FilterChangeError::NotAnInteger(self.value.clone())),
            (InputKind::Checkbox { checked }, true) => {
                Err(FilterChangeError::NotAnInteger(checked.to_string()))
            }
        }
    }

    fn target(&self) -> Vec<&str> {
        match (&self.criterion, self.input) {
            (Some(criterion), InputKind::Checkbox { .. }) if *criterion != self.name => {
                vec![criterion.as_str(), self.name.as_str(), self.value.as_str()]
            }
            (Some(criterion), InputKind::Value) if *criterion != self.name => {
                vec![criterion.as_str(), self.name.as_str()]
            }
            _ => vec![self.name.as_str(), self.value.as_str()],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Resolved {
    Flag(bool),
    Integer(i64),
    Text(String),
}

impl Resolved {
    fn is_truthy(&self) -> bool {
        match self {
            Resolved::Flag(flag) => *flag,
            Resolved::Integer(value) => *value != 0,
            Resolved::Text(text) => !text.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterChangeError {
    #[error("'{0}' is not a valid filter path")]
    InvalidPath(String),
    #[error("'{0}' is not a base-10 integer")]
    NotAnInteger(String),
    #[error("no filter at '{0}'")]
    UnknownTarget(String),
    #[error("filter '{target}' expects {expected}")]
    TypeMismatch {
        target: String,
        expected: &'static str,
    },
}

/// Produce the filter tree that results from one control change.
///
/// `filters` is left untouched; the returned tree is an independent copy.
pub fn apply_filter_change(
    filters: &Filters,
    change: &FilterChange,
) -> Result<Filters, FilterChangeError> {
    let value = change.resolved_value()?;
    let target = change.target();
    let mut next = filters.clone();

    assign(&mut next, &target, &value)?;

    match change.name.as_str() {
        "neighborhood" if value.is_truthy() && !filters.location.city.boston => {
            next.location.city.boston = true;
        }
        "cardinalDirection" if value.is_truthy() && !filters.location.city.beyond_boston => {
            next.location.city.beyond_boston = true;
        }
        _ => {}
    }

    // Selecting Boston or Beyond Boston checks/unchecks all of its subcategories.
    if let Resolved::Flag(selected) = value {
        match change.value.as_str() {
            "boston" => {
                for flag in next.location.neighborhood.values_mut() {
                    *flag = selected;
                }
            }
            "beyondBoston" => next.location.cardinal_direction.set_all(selected),
            _ => {}
        }
    }

    Ok(next)
}

fn assign(
    filters: &mut Filters,
    target: &[&str],
    value: &Resolved,
) -> Result<(), FilterChangeError> {
    let path = target.join(".");
    let mismatch = |expected: &'static str| FilterChangeError::TypeMismatch {
        target: path.clone(),
        expected,
    };

    match target {
        ["offer", key] => {
            let slot = match *key {
                "rent" => &mut filters.offer.rent,
                "sale" => &mut filters.offer.sale,
                _ => return Err(FilterChangeError::UnknownTarget(path.clone())),
            };
            *slot = as_flag(value).ok_or_else(|| mismatch("a checkbox"))?;
        }
        ["location", "city", key] => {
            let slot = match *key {
                "boston" => &mut filters.location.city.boston,
                "beyondBoston" => &mut filters.location.city.beyond_boston,
                _ => return Err(FilterChangeError::UnknownTarget(path.clone())),
            };
            *slot = as_flag(value).ok_or_else(|| mismatch("a checkbox"))?;
        }
        ["location", "neighborhood", name] => {
            let selected = as_flag(value).ok_or_else(|| mismatch("a checkbox"))?;
            filters
                .location
                .neighborhood
                .insert((*name).to_string(), selected);
        }
        ["location", "cardinalDirection", key] => {
            let direction = CardinalDirection::from_key(key)
                .ok_or_else(|| FilterChangeError::UnknownTarget(path.clone()))?;
            let selected = as_flag(value).ok_or_else(|| mismatch("a checkbox"))?;
            filters.location.cardinal_direction.set(direction, selected);
        }
        ["bedrooms", key] => {
            let selected = as_flag(value).ok_or_else(|| mismatch("a checkbox"))?;
            let slot = filters
                .bedrooms
                .slot_mut(key)
                .ok_or_else(|| FilterChangeError::UnknownTarget(path.clone()))?;
            *slot = selected;
        }
        [criterion @ ("amiQualification" | "rentalPrice"), bound] => {
            let Resolved::Integer(number) = value else {
                return Err(mismatch("an integer"));
            };
            let range = if *criterion == "amiQualification" {
                &mut filters.ami_qualification
            } else {
                &mut filters.rental_price
            };
            let slot = range
                .slot_mut(bound)
                .ok_or_else(|| FilterChangeError::UnknownTarget(path.clone()))?;
            *slot = *number;
        }
        ["incomeQualification", "upperBound"] => {
            filters.income_qualification.upper_bound = match value {
                Resolved::Text(text) if text.trim().is_empty() => None,
                Resolved::Text(text) => {
                    Some(parse_currency(text).ok_or_else(|| mismatch("an amount"))?)
                }
                Resolved::Integer(number) => Some(*number as f64),
                Resolved::Flag(_) => return Err(mismatch("an amount")),
            };
        }
        _ => return Err(FilterChangeError::UnknownTarget(path.clone())),
    }

    Ok(())
}

fn as_flag(value: &Resolved) -> Option<bool> {
    match value {
        Resolved::Flag(flag) => Some(*flag),
        _ => None,
    }
}
