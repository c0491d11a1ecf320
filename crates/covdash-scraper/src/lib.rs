pub mod client;
pub mod error;
pub mod images;

pub use client::{DashboardClient, Fetched, PageSource};
pub use error::{FetchError, ImageFetchError};
pub use images::collect_images;
