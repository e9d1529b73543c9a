pub mod date;
pub mod logger;
pub mod validation;

pub use date::*;
pub use logger::*;
pub use validation::*;
