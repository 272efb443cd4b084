pub mod connection;
pub mod tenant;

pub use connection::*;
pub use tenant::*;
