pub mod bulk;
pub mod get;
pub mod messages;
pub mod migrate;
pub mod sync;
pub mod unsubscribe;
