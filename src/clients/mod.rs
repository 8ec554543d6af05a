pub mod page_client;

pub use page_client::{FetchResponse, PageClient};
