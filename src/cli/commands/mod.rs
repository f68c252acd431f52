mod due_summary;
mod seed;

pub use due_summary::cmd_due_summary;
pub use seed::cmd_seed;
