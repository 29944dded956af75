//! Harvests recent page conversations from the Facebook Graph API.
//!
//! Two core pieces: [`token::setup`] escalates a short-lived user token into
//! a page-scoped access token, and [`harvest::harvest`] collects messages
//! from conversation threads updated within a trailing window. The
//! [`server`] module wraps both behind a small HTTP boundary.

pub mod config;
pub mod graph;
pub mod harvest;
pub mod server;
pub mod token;
