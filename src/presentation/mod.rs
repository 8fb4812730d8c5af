// Presentation - client-side feed state and the controller that drives it
pub mod feed_controller;
pub mod feed_state;

pub use feed_controller::{FeedController, FeedKey};
pub use feed_state::{apply, filter_posts, FeedAction, FeedState, Optimistic};
