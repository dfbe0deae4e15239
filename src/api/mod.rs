//! HTTP JSON API for the menu site.
//!
//! Serves the calendar/browsing queries, the upload + import pipeline with
//! 409 conflict handling, uploaded-file management, and admin auth.
//! Run with `grubpeek serve`.

pub mod handlers;
pub mod server;

pub use server::run_api_server;
