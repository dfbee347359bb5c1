pub mod options;
pub mod recent;
pub mod status;

pub use options::{poll_interval_secs, Category, ClientOptions, PollRatio, RatioError};
pub use recent::RecentIds;
pub use status::{Status, StatusId};
