mod matcher;
mod table;

pub use matcher::normalize_text;
pub use table::{BaseDaily, PerRole, RoleInfo, Topic, TopicTable};
