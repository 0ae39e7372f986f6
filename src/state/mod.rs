pub mod lookup_store;
pub mod messages;
pub mod refresher;
pub mod settings;
pub mod worker;
