pub mod chat;
pub mod cockpit;
pub mod costs;
pub mod health;
pub mod search;
pub mod status;
