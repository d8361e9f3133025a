pub mod autolink;
pub mod feed;
pub mod links;
pub mod listing;
pub mod model;
pub mod snowflake;
pub mod util;
