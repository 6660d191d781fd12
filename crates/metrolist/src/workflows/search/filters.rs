use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::domain::{CardinalDirection, Offer};

pub const DEFAULT_AMI_LOWER_BOUND: i64 = 0;
pub const DEFAULT_AMI_UPPER_BOUND: i64 = 200;
/// Right-most position of the rental price slider; prices above it still match.
pub const RENTAL_PRICE_CEILING: i64 = 3000;

/// Top-level branches a persisted filter document may carry.
pub const FILTER_KEYS: [&str; 6] = [
    "offer",
    "location",
    "bedrooms",
    "amiQualification",
    "incomeQualification",
    "rentalPrice",
];

/// Search criteria selected by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Filters {
    pub offer: OfferFilter,
    pub location: LocationFilter,
    pub bedrooms: BedroomFilter,
    pub ami_qualification: RangeFilter,
    pub income_qualification: IncomeQualificationFilter,
    pub rental_price: RangeFilter,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            offer: OfferFilter::default(),
            location: LocationFilter::default(),
            bedrooms: BedroomFilter::default(),
            ami_qualification: RangeFilter {
                lower_bound: DEFAULT_AMI_LOWER_BOUND,
                upper_bound: DEFAULT_AMI_UPPER_BOUND,
            },
            income_qualification: IncomeQualificationFilter::default(),
            rental_price: RangeFilter {
                lower_bound: 0,
                upper_bound: RENTAL_PRICE_CEILING,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferFilter {
    pub rent: bool,
    pub sale: bool,
}

impl OfferFilter {
    pub fn allows(&self, offer: Offer) -> bool {
        match offer {
            Offer::Rent => self.rent,
            Offer::Sale => self.sale,
        }
    }

    pub fn none_selected(&self) -> bool {
        !self.rent && !self.sale
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFilter {
    pub city: CityFilter,
    pub neighborhood: BTreeMap<String, bool>,
    pub cardinal_direction: CardinalDirectionFilter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityFilter {
    pub boston: bool,
    pub beyond_boston: bool,
}

impl CityFilter {
    pub fn none_selected(&self) -> bool {
        !self.boston && !self.beyond_boston
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardinalDirectionFilter {
    pub west: bool,
    pub north: bool,
    pub south: bool,
}

impl CardinalDirectionFilter {
    pub fn get(&self, direction: CardinalDirection) -> bool {
        match direction {
            CardinalDirection::West => self.west,
            CardinalDirection::North => self.north,
            CardinalDirection::South => self.south,
        }
    }

    pub fn set(&mut self, direction: CardinalDirection, selected: bool) {
        match direction {
            CardinalDirection::West => self.west = selected,
            CardinalDirection::North => self.north = selected,
            CardinalDirection::South => self.south = selected,
        }
    }

    pub fn set_all(&mut self, selected: bool) {
        for direction in CardinalDirection::ALL {
            self.set(direction, selected);
        }
    }
}

/// Bedroom buckets; `3+` covers every unit with three or more bedrooms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedroomFilter {
    #[serde(rename = "0")]
    pub studio: bool,
    #[serde(rename = "1")]
    pub one: bool,
    #[serde(rename = "2")]
    pub two: bool,
    #[serde(rename = "3+")]
    pub three_plus: bool,
}

impl BedroomFilter {
    pub const KEYS: [&'static str; 4] = ["0", "1", "2", "3+"];

    pub fn none_selected(&self) -> bool {
        !self.studio && !self.one && !self.two && !self.three_plus
    }

    /// Exact bucket match for a single unit.
    pub fn allows(&self, bedrooms: u32) -> bool {
        match bedrooms {
            0 => self.studio,
            1 => self.one,
            2 => self.two,
            _ => self.three_plus,
        }
    }

    pub fn slot_mut(&mut self, key: &str) -> Option<&mut bool> {
        match key {
            "0" => Some(&mut self.studio),
            "1" => Some(&mut self.one),
            "2" => Some(&mut self.two),
            "3+" => Some(&mut self.three_plus),
            _ => None,
        }
    }
}

/// Slider pair; the handles can cross, so the bounds are not guaranteed ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeFilter {
    pub lower_bound: i64,
    pub upper_bound: i64,
}

impl RangeFilter {
    /// `(min, max)` of the two handles.
    pub fn normalized(&self) -> (i64, i64) {
        if self.lower_bound > self.upper_bound {
            (self.upper_bound, self.lower_bound)
        } else {
            (self.lower_bound, self.upper_bound)
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        let (low, high) = self.normalized();
        value >= low as f64 && value <= high as f64
    }

    pub fn slot_mut(&mut self, key: &str) -> Option<&mut i64> {
        match key {
            "lowerBound" => Some(&mut self.lower_bound),
            "upperBound" => Some(&mut self.upper_bound),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeQualificationFilter {
    pub upper_bound: Option<f64>,
}

impl IncomeQualificationFilter {
    /// The ceiling when one is set; zero means unset.
    pub fn ceiling(&self) -> Option<f64> {
        self.upper_bound
            .filter(|ceiling| ceiling.is_finite() && *ceiling != 0.0)
    }
}

impl Filters {
    /// Parse a persisted filter document, falling back to defaults when it is unusable.
    pub fn from_persisted(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_value(value),
            Err(err) => {
                debug!(error = %err, "persisted filters are not JSON; using defaults");
                Self::default()
            }
        }
    }

    /// Sanitize a filter document and merge it over the defaults.
    ///
    /// Each top-level branch is merged on its own; a branch with an unexpected
    /// shape falls back to its defaults without discarding the others.
    pub fn from_value(value: Value) -> Self {
        let mut saved = sanitize(value);
        let defaults = Self::default();

        Self {
            offer: merge_branch(&mut saved, "offer", defaults.offer),
            location: merge_branch(&mut saved, "location", defaults.location),
            bedrooms: merge_branch(&mut saved, "bedrooms", defaults.bedrooms),
            ami_qualification: merge_branch(
                &mut saved,
                "amiQualification",
                defaults.ami_qualification,
            ),
            income_qualification: merge_branch(
                &mut saved,
                "incomeQualification",
                defaults.income_qualification,
            ),
            rental_price: merge_branch(&mut saved, "rentalPrice", defaults.rental_price),
        }
    }

    /// Fresh defaults that keep every known neighborhood, all deselected.
    pub fn reset(&self) -> Self {
        let mut filters = Self::default();
        filters.location.neighborhood = self
            .location
            .neighborhood
            .keys()
            .map(|name| (name.clone(), false))
            .collect();
        filters
    }

    /// Add neighborhoods seen in the listings without disturbing existing selections.
    pub fn register_neighborhoods<'a, I>(&mut self, names: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for name in names {
            self.location
                .neighborhood
                .entry(name.clone())
                .or_insert(false);
        }
    }
}

/// Drop foreign top-level keys and migrate legacy bedroom buckets.
fn sanitize(value: Value) -> Map<String, Value> {
    let Value::Object(mut saved) = value else {
        return Map::new();
    };

    saved.retain(|key, _| FILTER_KEYS.contains(&key.as_str()));

    if let Some(Value::Object(bedrooms)) = saved.get_mut("bedrooms") {
        if let Some(three) = bedrooms.remove("3") {
            bedrooms.insert("3+".to_string(), three);
        }
        bedrooms.remove("4+");
    }

    if let Some(Value::Object(location)) = saved.get_mut("location") {
        if let Some(Value::Object(neighborhoods)) = location.get_mut("neighborhood") {
            for selected in neighborhoods.values_mut() {
                *selected = Value::Bool(truthy(selected));
            }
        }
    }

    saved
}

/// Loose truthiness for neighborhood selections saved by older clients.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(selected) => *selected,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn merge_branch<T>(saved: &mut Map<String, Value>, key: &str, default: T) -> T
where
    T: Serialize + DeserializeOwned,
{
    let Some(patch) = saved.remove(key) else {
        return default;
    };
    let mut merged = match serde_json::to_value(&default) {
        Ok(value) => value,
        Err(_) => return default,
    };
    merge(&mut merged, patch);

    match serde_json::from_value(merged) {
        Ok(branch) => branch,
        Err(err) => {
            debug!(branch = key, error = %err, "persisted filter branch has unexpected shape; using its defaults");
            default
        }
    }
}

/// Overlay `patch` onto `base`; objects merge per key and `null` keeps the base value.
fn merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (_, Value::Null) => {}
        (base, patch) => *base = patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_serialize_to_expected_shape() {
        let value = serde_json::to_value(Filters::default()).expect("serializes");
        assert_eq!(
            value,
            json!({
                "offer": { "rent": false, "sale": false },
                "location": {
                    "city": { "boston": false, "beyondBoston": false },
                    "neighborhood": {},
                    "cardinalDirection": { "west": false, "north": false, "south": false }
                },
                "bedrooms": { "0": false, "1": false, "2": false, "3+": false },
                "amiQualification": { "lowerBound": 0, "upperBound": 200 },
                "incomeQualification": { "upperBound": null },
                "rentalPrice": { "lowerBound": 0, "upperBound": 3000 }
            })
        );
    }

    #[test]
    fn sanitizes_legacy_documents() {
        let filters = Filters::from_value(json!({
            "offer": { "rent": true },
            "bedrooms": { "3": true, "4+": true, "1": true },
            "location": { "neighborhood": { "Roxbury": true, "Allston": false } },
            "debugPanel": { "open": true }
        }));

        assert!(filters.offer.rent);
        assert!(!filters.offer.sale);
        assert!(filters.bedrooms.three_plus);
        assert!(filters.bedrooms.one);
        assert!(!filters.bedrooms.two);
        let names: Vec<&String> = filters.location.neighborhood.keys().collect();
        assert_eq!(names, vec!["Allston", "Roxbury"]);
        assert_eq!(filters.rental_price.upper_bound, RENTAL_PRICE_CEILING);
    }

    #[test]
    fn null_bounds_keep_defaults() {
        let filters = Filters::from_value(json!({
            "amiQualification": { "lowerBound": 55, "upperBound": null }
        }));
        assert_eq!(filters.ami_qualification.lower_bound, 55);
        assert_eq!(filters.ami_qualification.upper_bound, DEFAULT_AMI_UPPER_BOUND);
    }

    #[test]
    fn malformed_documents_fall_back_to_defaults() {
        assert_eq!(Filters::from_persisted("{not json"), Filters::default());
        assert_eq!(Filters::from_value(json!([1, 2, 3])), Filters::default());
        assert_eq!(
            Filters::from_value(json!({ "offer": { "rent": "yes" } })),
            Filters::default()
        );
    }

    #[test]
    fn bad_leaf_only_resets_its_branch() {
        let filters = Filters::from_persisted(
            r#"{"offer":{"rent":true},"bedrooms":{"2":true},"location":{"neighborhood":{"Dorchester":null,"Roxbury":1}},"rentalPrice":{"upperBound":"cheap"}}"#,
        );

        assert!(filters.offer.rent);
        assert!(filters.bedrooms.two);
        assert_eq!(filters.location.neighborhood.get("Dorchester"), Some(&false));
        assert_eq!(filters.location.neighborhood.get("Roxbury"), Some(&true));
        assert_eq!(filters.rental_price.upper_bound, RENTAL_PRICE_CEILING);
    }

    #[test]
    fn reset_keeps_neighborhood_keys() {
        let mut filters = Filters::default();
        filters.offer.sale = true;
        filters
            .location
            .neighborhood
            .insert("Dorchester".to_string(), true);

        let reset = filters.reset();
        assert!(!reset.offer.sale);
        assert_eq!(reset.location.neighborhood.get("Dorchester"), Some(&false));
    }

    #[test]
    fn ranges_normalize_crossed_handles() {
        let crossed = RangeFilter {
            lower_bound: 80,
            upper_bound: 40,
        };
        assert_eq!(crossed.normalized(), (40, 80));
        assert!(crossed.contains(60.0));
        assert!(!crossed.contains(81.0));
    }

    #[test]
    fn income_ceiling_ignores_zero() {
        let filter = IncomeQualificationFilter {
            upper_bound: Some(0.0),
        };
        assert_eq!(filter.ceiling(), None);
    }
}
