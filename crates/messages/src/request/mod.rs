//! Request messages.

mod template;

pub use template::RequestTemplate;
