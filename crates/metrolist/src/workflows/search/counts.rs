use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{CardinalDirection, Home, Offer};

/// Number of listings per filter option, shown next to each checkbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingCounts {
    pub offer: OfferCounts,
    pub location: LocationCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OfferCounts {
    pub rent: usize,
    pub sale: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCounts {
    pub city: CityCounts,
    pub neighborhood: BTreeMap<String, usize>,
    pub cardinal_direction: DirectionCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityCounts {
    pub boston: usize,
    pub beyond_boston: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectionCounts {
    pub west: usize,
    pub north: usize,
    pub south: usize,
}

impl DirectionCounts {
    fn bump(&mut self, direction: CardinalDirection) {
        match direction {
            CardinalDirection::West => self.west += 1,
            CardinalDirection::North => self.north += 1,
            CardinalDirection::South => self.south += 1,
        }
    }
}

impl ListingCounts {
    pub fn from_homes(homes: &[Home]) -> Self {
        let mut counts = Self::default();
        counts.populate(homes);
        counts
    }

    /// Recount from scratch; previous totals are discarded.
    pub fn populate(&mut self, homes: &[Home]) {
        *self = Self::default();

        for home in homes {
            match home.offer {
                Offer::Rent => self.offer.rent += 1,
                Offer::Sale => self.offer.sale += 1,
            }

            if let Some(city) = home.city.as_deref().filter(|city| !city.is_empty()) {
                if city.eq_ignore_ascii_case("boston") {
                    self.location.city.boston += 1;
                } else {
                    self.location.city.beyond_boston += 1;
                }
            }

            match (&home.neighborhood, home.cardinal_direction) {
                (Some(neighborhood), _) if !neighborhood.is_empty() => {
                    *self
                        .location
                        .neighborhood
                        .entry(neighborhood.clone())
                        .or_insert(0) += 1;
                }
                (_, Some(direction)) => self.location.cardinal_direction.bump(direction),
                _ => {}
            }
        }
    }

    pub fn neighborhoods(&self) -> impl Iterator<Item = &String> {
        self.location.neighborhood.keys()
    }
}
