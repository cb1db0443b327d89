// Public handlers: token acquisition, no authentication required.
pub mod user;

pub use user::login as user_login;
pub use user::register as user_register;
