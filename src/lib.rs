pub mod encoder;
pub mod model;
pub mod types;
