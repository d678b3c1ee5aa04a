pub mod http;
pub mod xml;
