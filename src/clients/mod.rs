pub mod ai;
pub mod mailer;
pub mod rates;
pub mod stripe;
