use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Whether a listing is offered for rent or for sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Offer {
    Rent,
    Sale,
}

/// Region of a listing located beyond Boston.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardinalDirection {
    West,
    North,
    South,
}

impl CardinalDirection {
    pub const ALL: [CardinalDirection; 3] = [
        CardinalDirection::West,
        CardinalDirection::North,
        CardinalDirection::South,
    ];

    pub fn key(self) -> &'static str {
        match self {
            CardinalDirection::West => "west",
            CardinalDirection::North => "north",
            CardinalDirection::South => "south",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|direction| direction.key() == key)
    }
}

/// A development as returned by the listings endpoint.
///
/// A listing is either in Boston (`neighborhood` set, no `cardinal_direction`)
/// or beyond it (`cardinal_direction` set). Fields the engine does not inspect
/// are carried through untouched in `details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Home {
    pub offer: Offer,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub cardinal_direction: Option<CardinalDirection>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub home_type: Option<String>,
    #[serde(default)]
    pub income_restricted: bool,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Home {
    pub fn is_in_boston(&self) -> bool {
        self.cardinal_direction.is_none()
    }

    pub fn is_apartment(&self) -> bool {
        self.home_type.as_deref() == Some("apt")
    }

    pub fn max_bedrooms(&self) -> Option<u32> {
        self.units.iter().map(|unit| unit.bedrooms).max()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub bedrooms: u32,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub ami_qualification: Option<f64>,
    #[serde(default)]
    pub income_qualification: Option<f64>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Unit {
    /// AMI restriction, treating a zero value the same as an undisclosed one.
    pub fn disclosed_ami(&self) -> Option<f64> {
        self.ami_qualification.filter(|ami| *ami != 0.0)
    }

    pub fn disclosed_income_ceiling(&self) -> Option<f64> {
        self.income_qualification.filter(|income| *income != 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_listing_payload() {
        let payload = json!({
            "offer": "rent",
            "city": "Boston",
            "neighborhood": "Dorchester",
            "cardinalDirection": null,
            "type": "apt",
            "incomeRestricted": true,
            "title": "Treadmark",
            "units": [
                { "bedrooms": 2, "price": 1850, "amiQualification": 60, "incomeQualification": null }
            ]
        });

        let home: Home = serde_json::from_value(payload).expect("listing parses");
        assert_eq!(home.offer, Offer::Rent);
        assert!(home.is_in_boston());
        assert!(home.is_apartment());
        assert_eq!(home.details.get("title"), Some(&json!("Treadmark")));
        assert_eq!(home.units[0].disclosed_ami(), Some(60.0));
        assert_eq!(home.units[0].disclosed_income_ceiling(), None);
    }

    #[test]
    fn zero_ami_counts_as_undisclosed() {
        let unit: Unit =
            serde_json::from_value(json!({ "bedrooms": 0, "amiQualification": 0 })).expect("unit");
        assert_eq!(unit.disclosed_ami(), None);
        assert_eq!(unit.price, None);
    }

    #[test]
    fn beyond_boston_listing_reports_direction() {
        let home: Home = serde_json::from_value(json!({
            "offer": "sale",
            "city": "Newton",
            "neighborhood": null,
            "cardinalDirection": "west",
            "units": [{ "bedrooms": 1 }, { "bedrooms": 4 }]
        }))
        .expect("listing parses");
        assert!(!home.is_in_boston());
        assert_eq!(home.max_bedrooms(), Some(4));
        assert_eq!(CardinalDirection::from_key("west"), home.cardinal_direction);
    }
}
