pub mod analytics;
pub mod auth;
pub mod coach;
pub mod health;
pub mod journey;
pub mod plans;
pub mod tasks;
pub mod users;
