pub use super::account_tokens::Entity as AccountTokens;
pub use super::users::Entity as Users;
