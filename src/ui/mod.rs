pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, info, muted, resource_title, section, success, timing, warn};
pub use table::{attribute_table, links_table, results_table};
pub use theme::{theme, Theme};
