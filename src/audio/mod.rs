//! Audio download utilities.

mod downloader;

pub use downloader::{download_to, format_size, FetchBody, Fetcher, HttpFetcher};

#[cfg(test)]
pub(crate) use downloader::testing;
