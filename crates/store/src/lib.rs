//! In-memory implementation of the notification backend lookups.
//!
//! [`MemoryStore`] holds accounts, watches, groups, projects and stars and
//! implements every trait in [`reviewmail_core::backend`]. It can be built
//! programmatically or loaded from a JSON [`SiteFixture`]. Change filters
//! are compiled by [`TermFilterParser`], a small AND-of-terms matcher.

pub mod fixture;
pub mod memory;
pub mod terms;

pub use fixture::{SiteFixture, StoreError};
pub use memory::MemoryStore;
pub use terms::TermFilterParser;
