pub mod config;
pub mod entry;
pub mod error;
pub mod export;
pub mod normalize;
pub mod report;
pub mod search;
pub mod session;
pub mod timestamp;

pub mod prelude {
    pub use crate::entry::RawEntry;
    pub use crate::error::LookupError;
    pub use crate::normalize::{NormalizedGroup, NormalizedUser};
    pub use crate::search::{LookupPlan, Mode, Searcher};
    pub use crate::session::{Session, SessionGuard};
}
