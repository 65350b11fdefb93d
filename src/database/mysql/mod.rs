pub mod batch_upsert;
pub mod client;
