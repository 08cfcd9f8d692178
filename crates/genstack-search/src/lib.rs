pub mod serpapi;

pub use serpapi::{digest, SerpApiClient};
