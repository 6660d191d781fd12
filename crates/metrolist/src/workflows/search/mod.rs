//! Listing search: the filter tree, the change reducer, the matching engine,
//! pagination, listing counts, and the session tying them to persisted state.

pub mod counts;
pub mod domain;
pub mod filters;
pub mod matching;
pub mod pagination;
mod parsing;
pub mod reducer;
pub mod session;
pub mod source;

pub use counts::ListingCounts;
pub use domain::{CardinalDirection, Home, Offer, Unit};
pub use filters::{
    Filters, RangeFilter, DEFAULT_AMI_LOWER_BOUND, DEFAULT_AMI_UPPER_BOUND, RENTAL_PRICE_CEILING,
};
pub use matching::{filter_homes, filter_homes_with, MatchOptions};
pub use pagination::{page_from_query, paginate, resolve_page, DEFAULT_PAGE_SIZE};
pub use reducer::{apply_filter_change, FilterChange, FilterChangeError, InputKind};
pub use session::{SearchResults, SearchSession, SessionError};
pub use source::{
    load_ami_table_or_default, load_listings_or_empty, AmiTableSource, DataSource, ListingSource,
    SourceError,
};
