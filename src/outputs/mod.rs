//! Output generation for collected articles.
//!
//! # Submodules
//!
//! - [`csv`]: the persisted, newest-first article store
//!
//! # Output Structure
//!
//! ```text
//! aljadeed_news.csv        # one row per article, newest first
//! aljadeed_scraper.log     # full-detail run log
//! ```

pub mod csv;
