pub mod rss;
pub mod youtube;

pub use rss::RssFeedAdapter;
pub use youtube::VideoApiAdapter;
