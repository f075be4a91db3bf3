pub mod dispatcher;
pub mod error;
pub mod mapping;
pub mod request;
pub mod transport;
