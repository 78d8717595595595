pub mod agent;
pub mod calculator;
pub mod errors;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod reasoning;
pub mod systems;
pub mod wikipedia;
