pub mod error;
pub mod quote;
pub mod traits;
pub mod types;

pub use error::*;
pub use quote::*;
pub use traits::*;
pub use types::*;
