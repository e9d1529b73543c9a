pub mod analysis_select;
pub mod date_range_entry;
pub mod display_results;
pub mod exiting;
pub mod main_menu;
pub mod running_analysis;
pub mod settings_menu;
pub mod symbol_entry;

pub use analysis_select::*;
pub use date_range_entry::*;
pub use display_results::*;
pub use exiting::*;
pub use main_menu::*;
pub use running_analysis::*;
pub use settings_menu::*;
pub use symbol_entry::*;
