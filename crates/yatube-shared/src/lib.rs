//! # Yatube Shared
//!
//! Wire types shared by the server and its clients: submitted forms, the page
//! envelope and RFC 7807 error bodies.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse, PageDocument};
