pub mod prelude;

pub mod account_tokens;
pub mod users;
