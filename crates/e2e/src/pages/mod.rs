//! Page objects for the application under test

mod login;

pub use login::{resolve_url, LoginPage};
