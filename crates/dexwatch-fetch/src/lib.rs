//! Upstream trade source for dexwatch.
//!
//! The monitor only sees the [`Fetcher`] trait: one call returns an ordered,
//! normalized batch of records or a [`FetchError`]. This crate provides:
//!
//! - [`BitqueryClient`]: GraphQL client for large DEX trades
//! - [`normalize`]: raw response → `Record` conversion, dropping incomplete entries
//! - [`MockFetcher`]: scripted fetcher for tests

pub mod bitquery;
pub mod error;
pub mod fetcher;
pub mod normalize;

pub use bitquery::{BitqueryClient, BitqueryConfig};
pub use error::{FetchError, FetchResult};
pub use fetcher::{BoxFuture, DynFetcher, Fetcher, MockFetcher};
