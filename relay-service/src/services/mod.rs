pub mod metrics;
pub mod providers;
pub mod responder;

pub use responder::Responder;
