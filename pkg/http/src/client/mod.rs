mod client;
mod client_interface;
mod direct_client;
mod load_balanced_client;
pub mod resolver;

pub use client::*;
pub use client_interface::*;
pub use resolver::*;
