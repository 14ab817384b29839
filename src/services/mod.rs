pub mod admin_service;
pub mod advert_service;
pub mod auth_service;
pub mod capture_service;
pub mod payment_service;
pub mod plan_service;
pub mod product_service;
pub mod recipe_service;
pub mod report_service;
