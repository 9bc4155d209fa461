pub mod coder;
pub mod model;
