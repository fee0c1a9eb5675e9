pub mod feed;
pub mod post;

pub use feed::{FeedEntry, RefreshTarget, StatusMap};
pub use post::{format_post, has_tag, message_of};
