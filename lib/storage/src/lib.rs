pub mod cache;
pub mod feedback;
pub mod loader;
pub mod manager;

pub use cache::SingleFlight;
pub use feedback::{FeedbackLog, FeedbackRecord};
pub use loader::{parse_catalog, parse_records, read_records, SampleProduct};
pub use manager::{DataConfig, DataManager};
