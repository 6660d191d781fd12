pub mod ami;
pub mod search;
