//! Safe SQL builder: identifiers from the schema only, values as parameters.

pub mod args;
mod builder;
pub mod filter;
pub mod params;
pub use args::*;
pub use builder::*;
pub use filter::*;
pub use params::*;
