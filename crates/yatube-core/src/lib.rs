//! # Yatube Core
//!
//! The domain layer of Yatube: entities, ports and the feed/follow rules.
//! This crate contains pure business logic with zero infrastructure dependencies.

pub mod accounts;
pub mod domain;
pub mod error;
pub mod feed;
pub mod follow;
pub mod pagination;
pub mod policy;
pub mod ports;
pub mod posts;

pub use error::DomainError;
