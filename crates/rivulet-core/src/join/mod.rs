//! Inner-join ordering: indexed-relationship discovery, branch-and-bound
//! order search, and river formation.

mod relationship;
mod river;
mod search;
mod stream_info;


pub use relationship::IndexRelationship;
pub use river::{River, StreamAccess};
pub use search::JoinOrder;
pub use stream_info::StreamInfo;

pub(crate) use river::{RiverFormation, form_rivers};
