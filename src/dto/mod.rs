pub mod admin;
pub mod adverts;
pub mod auth;
pub mod capture;
pub mod payments;
pub mod plans;
pub mod products;
pub mod recipes;
pub mod reports;
