//! NewsNexus - news-curation API
//!
//! Builds Google News RSS and News API searches from reviewer keywords,
//! stores the returned articles, and serves the article review, report and
//! deduplication endpoints used by the portal.

pub mod api;
pub mod app;
pub mod articles;
pub mod automation;
pub mod config;
pub mod database;
pub mod deduper;
pub mod error;
pub mod excel_files;
pub mod feed;
pub mod ingest;
pub mod news_api;
pub mod query;
pub mod reports;
pub mod spreadsheet;
pub mod state_assigner;
