pub mod dynamic_form;
pub mod events;
pub mod extract;
pub mod service;
