pub mod constants;
pub mod credentials;
pub mod ids;

pub use credentials::{data_dir, Credentials, ExtractionProvider};
pub use ids::validate_id;
