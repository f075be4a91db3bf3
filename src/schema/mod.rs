pub mod field;
pub mod loader;
pub mod validator;
pub mod value;
