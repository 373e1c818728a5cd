//! bizcrawl - browser-driven business directory crawler.
//!
//! Submits search queries to a map site, walks the lazily loaded result
//! list, opens each business and appends its details to a CSV file.

pub mod cli;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod models;
pub mod runner;
pub mod scrapers;
pub mod storage;
