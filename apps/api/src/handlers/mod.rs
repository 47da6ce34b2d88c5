pub mod health;
pub mod integrations;
