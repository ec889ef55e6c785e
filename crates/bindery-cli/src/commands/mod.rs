pub mod bind;
pub mod records;
pub mod request;
pub mod schema;
pub mod seed;
pub mod serve;
pub mod show;
