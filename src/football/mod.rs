pub mod classifier;
pub mod differ;
pub mod football_data;
pub mod provider;

pub use classifier::Classifier;
pub use differ::diff;
pub use football_data::FootballData;
pub use provider::{FetchError, MatchProvider};
