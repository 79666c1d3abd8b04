use dotenvy::dotenv;
use grocery_ledger::{
    config::{self, database},
    core::{access::Role, user},
    errors::{Error, Result},
    state::AppState,
};
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Creates the admin account named by `ADMIN_EMAIL` unless it already exists.
async fn ensure_admin(state: &AppState) -> Result<()> {
    let Ok(email) = env::var("ADMIN_EMAIL") else {
        info!("ADMIN_EMAIL not set, skipping admin bootstrap.");
        return Ok(());
    };

    match user::get_user_by_email(&state.database, &email).await {
        Ok(existing) => {
            info!("Admin account {} already present.", existing.id);
            return Ok(());
        }
        Err(Error::UserNotFound { .. }) => {}
        Err(e) => return Err(e),
    }

    let password_hash = env::var("ADMIN_PASSWORD_HASH")
        .inspect_err(|e| error!("ADMIN_PASSWORD_HASH not found: {}", e))?;
    let name = env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string());

    let admin = state
        .register_user(user::NewUser {
            name,
            email,
            password_hash,
            role: Role::Admin.as_str().to_string(),
        })
        .await?;
    info!("Created admin account {}.", admin.id);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()?;
    info!("Successfully processed application configuration.");

    // 4. Connect and bootstrap the schema
    let db = database::create_connection(&app_config.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Wire services and ensure an admin exists
    let state = AppState::new(app_config, db);
    let bootstrap = ensure_admin(&state).await;

    // 6. Let queued background work finish before exiting
    state.shutdown().await;
    bootstrap?;

    info!("Grocery ledger ready.");
    Ok(())
}
