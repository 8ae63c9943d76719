//! API endpoint handlers.

pub mod catalog;
pub mod encoding;
pub mod health;
pub mod resource;
pub mod result;
pub mod run;
pub mod validate;
