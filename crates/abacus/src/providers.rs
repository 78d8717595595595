pub mod base;
pub mod configs;
pub mod groq;
pub mod utils;

#[cfg(test)]
pub mod mock;
