pub mod base;
pub mod fields;
pub mod http;
pub mod yahoo;
