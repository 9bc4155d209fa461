pub mod client;
pub mod extract;
pub mod mapper;
pub mod schema;
