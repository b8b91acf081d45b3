//! Paginated list replay

mod replayer;

pub use replayer::{ListReplayer, Pages, PaginationError, DEFAULT_MAX_PAGES};
