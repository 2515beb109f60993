pub mod appointments;
pub mod bonus;
pub mod health;
pub mod promo;
pub mod reviews;
pub mod services;
pub mod specialists;
