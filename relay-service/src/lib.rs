//! relay-service: forwards user queries, prefixed with an instruction
//! preamble, to a generative-text backend and returns the reply as JSON.

pub mod config;
pub mod handlers;
pub mod services;
pub mod startup;
