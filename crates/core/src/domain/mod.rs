pub mod customer;
pub mod http;
pub mod scenario;
