pub mod classifier;
pub mod error;
pub mod fetcher;
pub mod outcome;

pub use classifier::{Classification, PARKED_PHRASES, classify, matched_phrase};
pub use error::ScanError;
pub use fetcher::{Fetcher, FetcherBuilder, host_authority, redirect_allowed};
pub use outcome::FetchOutcome;
