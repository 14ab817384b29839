use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use rand::Rng;
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::auth::{
        Claims, ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
        ResetPasswordRequest, UpdateProfileRequest,
    },
    error::{AppError, AppResult, FieldError},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

const OTP_TTL_MINUTES: i64 = 10;

fn validate_registration(payload: &RegisterRequest) -> AppResult<()> {
    let mut errors = Vec::new();
    if payload.name.trim().is_empty() {
        errors.push(FieldError {
            field: "name".into(),
            message: "name is required".into(),
            value: None,
        });
    }
    if !payload.email.contains('@') {
        errors.push(FieldError {
            field: "email".into(),
            message: "email is invalid".into(),
            value: Some(serde_json::json!(payload.email)),
        });
    }
    if payload.password.len() < 8 {
        errors.push(FieldError {
            field: "password".into(),
            message: "password must be at least 8 characters".into(),
            value: None,
        });
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub async fn register_user(
    pool: &DbPool,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    validate_registration(&payload)?;
    let RegisterRequest {
        name,
        email,
        password,
    } = payload;

    let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(pool)
        .await?;
    if exist.is_some() {
        return Err(AppError::BadRequest("Email is already taken".to_string()));
    }

    let password_hash = hash_password(&password)?;
    let id = Uuid::new_v4();

    let user: User = sqlx::query_as(
        "INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(email.as_str())
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    audit::record(
        pool,
        Some(user.id),
        "user_register",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await;
    Ok(ApiResponse::success("User created", user, None))
}

pub async fn login_user(
    pool: &DbPool,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let user: Option<User> = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(pool)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::BadRequest("Invalid email or password".into())),
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    let resp = LoginResponse {
        token: format!("Bearer {}", token),
    };

    audit::record(
        pool,
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await;

    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}

/// Mail a one-time reset code. Responds identically whether or not the email
/// exists, so the endpoint cannot be used to probe accounts.
pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(payload.email.as_str())
        .fetch_optional(&state.pool)
        .await?;

    if let Some(user) = user {
        let otp = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        let expires = Utc::now() + Duration::minutes(OTP_TTL_MINUTES);

        sqlx::query("UPDATE users SET otp = $1, otp_expires = $2 WHERE id = $3")
            .bind(otp.as_str())
            .bind(expires)
            .bind(user.id)
            .execute(&state.pool)
            .await?;

        let body = format!(
            "Hi {},\n\nYour password reset code is {otp}. It expires in {OTP_TTL_MINUTES} minutes.",
            user.name
        );
        if let Err(err) = state.mailer.send(&user.email, "Password reset code", &body).await {
            tracing::warn!(user_id = %user.id, error = %err, "reset code mail failed");
        }
    }

    Ok(ApiResponse::success(
        "If the account exists, a reset code has been sent",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn reset_password(
    pool: &DbPool,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if payload.new_password.len() < 8 {
        return Err(AppError::Validation(vec![FieldError {
            field: "new_password".into(),
            message: "password must be at least 8 characters".into(),
            value: None,
        }]));
    }

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(payload.email.as_str())
        .fetch_optional(pool)
        .await?;
    let user = user.ok_or(AppError::BadRequest("Invalid reset code".into()))?;

    let valid = user.otp.as_deref() == Some(payload.otp.as_str())
        && user.otp_expires.is_some_and(|exp| exp > Utc::now());
    if !valid {
        return Err(AppError::BadRequest("Invalid reset code".into()));
    }

    let password_hash = hash_password(&payload.new_password)?;
    sqlx::query(
        "UPDATE users SET password_hash = $1, otp = NULL, otp_expires = NULL WHERE id = $2",
    )
    .bind(password_hash)
    .bind(user.id)
    .execute(pool)
    .await?;

    Ok(ApiResponse::success(
        "Password updated",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn get_profile(pool: &DbPool, auth: &AuthUser) -> AppResult<ApiResponse<User>> {
    let user = crate::services::plan_service::current_user(pool, auth).await?;
    Ok(ApiResponse::success("Profile", user, None))
}

pub async fn update_profile(
    pool: &DbPool,
    auth: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let user = crate::services::plan_service::current_user(pool, auth).await?;

    let name = match payload.name {
        Some(name) if !name.trim().is_empty() => name,
        Some(_) => return Err(AppError::BadRequest("name must not be empty".into())),
        None => user.name.clone(),
    };

    let user: User = sqlx::query_as("UPDATE users SET name = $1 WHERE id = $2 RETURNING *")
        .bind(name)
        .bind(user.id)
        .fetch_one(pool)
        .await?;

    Ok(ApiResponse::success("Profile updated", user, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_validation_collects_all_failures() {
        let payload = RegisterRequest {
            name: " ".into(),
            email: "not-an-email".into(),
            password: "short".into(),
        };
        match validate_registration(&payload) {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors.len(), 3);
                assert!(errors.iter().any(|e| e.field == "email"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_registration_passes() {
        let payload = RegisterRequest {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "longenough".into(),
        };
        assert!(validate_registration(&payload).is_ok());
    }
}
