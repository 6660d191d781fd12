//! Listing and unit predicates that turn the full listing set into search results.
//!
//! Listing-level checks decide whether a home is considered at all; unit-level
//! checks then decide which of its units survive. A home with no surviving
//! units is dropped. Both passes are pure, so re-running them is idempotent.

use super::domain::{Home, Offer, Unit};
use super::filters::{Filters, RENTAL_PRICE_CEILING};

/// Knobs for [`filter_homes_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// Treat a checkbox group with nothing selected as matching everything.
    pub match_on_none_selected: bool,
    /// Slider maximum; an upper bound at this value also admits higher prices.
    pub rental_price_ceiling: i64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            match_on_none_selected: true,
            rental_price_ceiling: RENTAL_PRICE_CEILING,
        }
    }
}

pub fn filter_homes(homes: &[Home], filters: &Filters) -> Vec<Home> {
    filter_homes_with(homes, filters, MatchOptions::default())
}

pub fn filter_homes_with(homes: &[Home], filters: &Filters, options: MatchOptions) -> Vec<Home> {
    homes
        .iter()
        .filter(|home| home_matches(home, filters, options))
        .filter_map(|home| {
            let units: Vec<Unit> = home
                .units
                .iter()
                .filter(|unit| unit_matches(home, unit, filters, options))
                .cloned()
                .collect();

            if units.is_empty() {
                None
            } else {
                Some(Home {
                    units,
                    ..home.clone()
                })
            }
        })
        .collect()
}

pub fn home_matches(home: &Home, filters: &Filters, options: MatchOptions) -> bool {
    let relax = options.match_on_none_selected;
    let any_offer = relax && filters.offer.none_selected();
    let any_location = relax && filters.location.city.none_selected();
    let any_bedrooms = relax && filters.bedrooms.none_selected();

    (any_offer || matches_offer(home, filters))
        && (any_location || (matches_broad_location(home, filters) && matches_narrow_location(home, filters)))
        && (any_bedrooms || matches_bedrooms(home, filters))
        && matches_ami_qualification(home, filters)
}

pub fn unit_matches(home: &Home, unit: &Unit, filters: &Filters, options: MatchOptions) -> bool {
    let any_bedrooms = options.match_on_none_selected && filters.bedrooms.none_selected();

    unit_matches_rental_price(home, unit, filters, options)
        && (any_bedrooms || filters.bedrooms.allows(unit.bedrooms))
        && unit_matches_ami_qualification(unit, filters)
        && unit_matches_income_qualification(unit, filters)
}

fn matches_offer(home: &Home, filters: &Filters) -> bool {
    filters.offer.allows(home.offer)
}

fn matches_broad_location(home: &Home, filters: &Filters) -> bool {
    let city = filters.location.city;
    (city.boston && home.is_in_boston()) || (city.beyond_boston && !home.is_in_boston())
}

fn matches_narrow_location(home: &Home, filters: &Filters) -> bool {
    match home.cardinal_direction {
        None => home
            .neighborhood
            .as_ref()
            .and_then(|name| filters.location.neighborhood.get(name))
            .copied()
            .unwrap_or(false),
        Some(direction) => filters.location.cardinal_direction.get(direction),
    }
}

fn matches_bedrooms(home: &Home, filters: &Filters) -> bool {
    let buckets = filters.bedrooms;
    let has = |bedrooms: u32| home.units.iter().any(|unit| unit.bedrooms == bedrooms);

    (buckets.studio && has(0))
        || (buckets.one && has(1))
        || (buckets.two && has(2))
        || (buckets.three_plus && home.max_bedrooms().is_some_and(|max| max >= 3))
}

/// Any unit inside the AMI range admits the listing; a unit without a disclosed
/// AMI admits it unconditionally.
fn matches_ami_qualification(home: &Home, filters: &Filters) -> bool {
    if !home.income_restricted {
        return true;
    }

    let mut distinct: Vec<Option<f64>> = Vec::with_capacity(home.units.len());
    for unit in &home.units {
        let ami = unit.disclosed_ami();
        if !distinct.contains(&ami) {
            distinct.push(ami);
        }
    }

    distinct.into_iter().any(|ami| match ami {
        None => true,
        Some(ami) => filters.ami_qualification.contains(ami),
    })
}

fn unit_matches_rental_price(home: &Home, unit: &Unit, filters: &Filters, options: MatchOptions) -> bool {
    let applies = filters.rental_price.upper_bound != 0
        && (home.offer == Offer::Rent || home.is_apartment());
    if !applies {
        return true;
    }

    // An unpriced unit compares as zero.
    let price = unit.price.unwrap_or(0.0);
    let (low, high) = filters.rental_price.normalized();
    let (low, high) = (low as f64, high as f64);
    let open_ended = high == options.rental_price_ceiling as f64;

    price >= low && (price <= high || (open_ended && price >= high))
}

fn unit_matches_ami_qualification(unit: &Unit, filters: &Filters) -> bool {
    match unit.disclosed_ami() {
        None => true,
        Some(ami) => filters.ami_qualification.contains(ami),
    }
}

fn unit_matches_income_qualification(unit: &Unit, filters: &Filters) -> bool {
    match (unit.disclosed_income_ceiling(), filters.income_qualification.ceiling()) {
        (Some(required), Some(ceiling)) => required <= ceiling,
        _ => true,
    }
}
