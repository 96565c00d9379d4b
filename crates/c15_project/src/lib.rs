//! C15 project support: manifest (c15.toml) and package root discovery.

mod manifest;

pub use manifest::*;
