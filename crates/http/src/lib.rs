pub mod client;

pub use client::ReqwestAdapter;
