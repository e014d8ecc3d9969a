#[macro_use]
extern crate common;

mod client;

// TODO: These two modules should only be shared between the client and main
// crate.
pub mod constants;
pub mod key_encoding;
pub mod key_utils;

pub use client::*;
