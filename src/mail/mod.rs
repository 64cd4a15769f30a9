pub mod links;
pub mod parse;

pub use links::extract_unsubscribe_url;
pub use parse::{parse_message, parse_sender};
