//! One-shot setup flows driven through the site's own UI.
//!
//! Every bounded wait in these flows is fatal except the optional steps
//! (login confirmation prompt, "Latest" tab), which only log.

pub mod login;
pub mod search;

pub use login::{login, Credentials};
pub use search::{build_query, search};
