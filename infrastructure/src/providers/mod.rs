//! Generation provider adapters

pub mod openai;
