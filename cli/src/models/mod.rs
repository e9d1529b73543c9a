pub mod analysis;
pub mod date_range;
pub mod market_data;
pub mod session;
pub mod settings;
pub mod symbol;

pub use analysis::*;
pub use date_range::*;
pub use market_data::*;
pub use session::*;
pub use settings::*;
pub use symbol::*;
