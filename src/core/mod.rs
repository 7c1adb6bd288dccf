// Core recommendation exports
pub mod cancel;
pub mod error;
pub mod filters;
pub mod matcher;
pub mod ports;
pub mod ranker;
pub mod scoring;

pub use cancel::{CancelHandle, CancelSignal};
pub use error::MatchError;
pub use filters::exclude_decided;
pub use matcher::Matcher;
pub use ports::{ExclusionStore, ImageStore, ProfileStore, StoreError};
pub use ranker::{sort_and_truncate, Ranker};
pub use scoring::{calculate_match_score, normalize_score, GEO_DISABLED, MAX_RAW_SCORE};
