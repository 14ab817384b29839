use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use pantry_tracker_api::db::create_pool;

/// Seed the plan catalog and a superadmin account for local development.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")?;
    let pool = create_pool(&database_url).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let plans: [(&str, f64, &str); 3] = [
        ("Free", 0.0, "Track up to 5 products"),
        ("Monthly", 4.99, "Unlimited products, waste reports and recipes"),
        ("Yearly", 49.99, "Everything in Monthly, billed once a year"),
    ];

    for (name, price, description) in plans {
        sqlx::query(
            r#"
            INSERT INTO plans (id, name, price, description, features)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(price)
        .bind(description)
        .bind(vec![description.to_string()])
        .execute(&pool)
        .await?;
    }

    let admin_email =
        std::env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string());
    let admin_password =
        std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "changeme123".to_string());

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(admin_password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, password_hash, role)
        VALUES ($1, 'Admin', $2, $3, 'superadmin')
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(admin_email.as_str())
    .bind(password_hash)
    .execute(&pool)
    .await?;

    println!("Seeded plan catalog and superadmin {admin_email}");
    Ok(())
}
