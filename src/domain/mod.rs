//! Domain module: what there is to crawl
//!
//! A domain description is a two-level hierarchy of identifiers (for example
//! regions and the districts inside them). Every leaf is one work unit, and
//! every work unit is paginated independently.

mod description;
mod enumerator;
mod unit;

pub use description::{load_domain, DomainDescription, DomainGroup, DomainItem};
pub use enumerator::{Enumeration, WorkEnumerator};
pub use unit::{UnitKey, WorkUnit};
