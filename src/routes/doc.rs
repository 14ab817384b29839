use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{DashboardStats, PromotionRequest, PromotionResponse, UserList},
        adverts::{AdvertList, CreateAdvertRequest, UpdateAdvertRequest},
        auth::{
            ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
            ResetPasswordRequest, UpdateProfileRequest,
        },
        capture::{ProductDraft, ScanImageRequest, SpoilageEstimate},
        payments::{CreateSessionRequest, CreateSessionResponse, VerifySessionResponse, WebhookAck},
        plans::{CreatePlanRequest, PlanList, UpdatePlanRequest},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        recipes::{RecipeSuggestion, SaveRecipeRequest, SavedRecipeList},
        reports::{MonthlyReport, UserWasteReport, WasteByCategory},
    },
    models::{Advertisement, Plan, Product, SavedRecipe, Subscription, User},
    response::{ApiResponse, Meta},
    routes::{
        admin, adverts, auth, capture, health, health::HealthData, params, payments, plans,
        products, recipes, users,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::forgot_password,
        auth::reset_password,
        users::get_profile,
        users::update_profile,
        users::waste_report,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        plans::list_plans,
        plans::create_plan,
        plans::update_plan,
        plans::delete_plan,
        payments::create_session,
        payments::verify_session,
        payments::webhook,
        recipes::suggest,
        recipes::save_recipe,
        recipes::list_saved,
        recipes::delete_saved,
        capture::scan_label,
        capture::estimate_condition,
        capture::barcode_lookup,
        adverts::list_adverts,
        adverts::create_advert,
        adverts::update_advert,
        adverts::delete_advert,
        admin::dashboard,
        admin::monthly_report,
        admin::list_users,
        admin::delete_user,
        admin::send_promotions,
    ),
    components(
        schemas(
            HealthData,
            User,
            Product,
            Plan,
            Subscription,
            Advertisement,
            SavedRecipe,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            UpdateProfileRequest,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CreatePlanRequest,
            UpdatePlanRequest,
            PlanList,
            CreateSessionRequest,
            CreateSessionResponse,
            VerifySessionResponse,
            WebhookAck,
            RecipeSuggestion,
            SaveRecipeRequest,
            SavedRecipeList,
            ProductDraft,
            ScanImageRequest,
            SpoilageEstimate,
            CreateAdvertRequest,
            UpdateAdvertRequest,
            AdvertList,
            DashboardStats,
            UserList,
            PromotionRequest,
            PromotionResponse,
            MonthlyReport,
            UserWasteReport,
            WasteByCategory,
            params::Pagination,
            params::ProductQuery,
            Meta,
            ApiResponse<HealthData>,
            ApiResponse<User>,
            ApiResponse<LoginResponse>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<PlanList>,
            ApiResponse<MonthlyReport>,
            ApiResponse<UserWasteReport>,
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication and password reset"),
        (name = "Users", description = "Profile and personal reports"),
        (name = "Products", description = "Inventory endpoints"),
        (name = "Plans", description = "Subscription plan catalog"),
        (name = "Payments", description = "Checkout and reconciliation"),
        (name = "Recipes", description = "Recipe suggestions for near-expiry items"),
        (name = "Capture", description = "OCR, vision and barcode drafts"),
        (name = "Adverts", description = "Advertisement management"),
        (name = "Admin", description = "Admin dashboard and user management"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Building the document exercises every path annotation; a broken one
    // fails here rather than only when /docs is hit.
    #[test]
    fn openapi_document_builds_with_all_paths() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();

        for path in [
            "/health",
            "/api/products",
            "/api/payments/checkout-session",
            "/api/payments/webhook",
            "/api/admin/promotions",
        ] {
            assert!(json["paths"].get(path).is_some(), "missing path {path}");
        }
    }

    #[test]
    fn webhook_documents_a_raw_string_body() {
        let json = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let webhook = &json["paths"]["/api/payments/webhook"]["post"];
        assert!(webhook.get("requestBody").is_some());
    }

    #[test]
    fn create_endpoints_document_the_status_they_return() {
        let json = serde_json::to_value(ApiDoc::openapi()).unwrap();
        for path in ["/api/products", "/api/recipes"] {
            let responses = &json["paths"][path]["post"]["responses"];
            assert!(responses.get("200").is_some(), "{path} should document 200");
            assert!(responses.get("201").is_none(), "{path} handlers return 200, not 201");
        }
    }
}
