mod config;
mod reset;
pub mod seed;

pub use config::{cmd_check_config, cmd_init};
pub use reset::cmd_reset_db;
pub use seed::cmd_seed;
