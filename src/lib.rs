//! An in-memory HomeKit Accessory Protocol data model.
//!
//! Accessories are declared with typed builders, handed to a [`registry::Registry`]
//! and served through an [`interaction_model::Dispatcher`], which routes reads,
//! writes and change notifications between the accessory tree and a transport.

#[macro_use]
extern crate num_derive;

pub mod config;
pub mod constants;
/// Characteristics, services, accessories and application handlers
pub mod data_model;
mod error;
pub mod interaction_model;
pub mod registry;

pub use error::{Error, Result, StatusCode};
