// vsci-net/src/lib.rs
pub mod http;
pub mod validation;

pub use http::{download_progress_percent, fetch};
pub use validation::{file_name_from_url, validate_url};
