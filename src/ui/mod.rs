pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    dropped, error, header, id, info, list_item, muted, section, status, success, summary_row,
    timing, warn,
};
pub use progress::Spinner;
pub use table::{db_stats_table, outcome_table, stats_table, TableBuilder};
pub use theme::{theme, Role, Theme};
