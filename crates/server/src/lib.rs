//! HTTP front end of the previewer: accepts uploads, runs the conversion
//! pipeline and delivers previews.

pub mod api;
pub mod metrics;
pub mod state;
