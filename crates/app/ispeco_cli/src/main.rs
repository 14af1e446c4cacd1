// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use cli::{Cli, Commands};
use ispeco_core::auth::password::{hash_password, validate_password};
use ispeco_core::auth::queries;
use ispeco_core::models::auth::NewUser;
use rand::RngCore;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

mod cli;
mod logging;

const KEY_LEN: usize = 32;
const SUPERUSER_PASSWORD_ENV: &str = "SUPERUSER_PASSWORD";

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    logging::init()?;

    let args = Cli::parse();

    match args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
        Commands::GenerateKey => {
            println!("{}", generate_key());
        }
        Commands::Migrate { database_url } => {
            block_on(async {
                let pool = connect(&database_url).await?;
                ispeco_core::migrate::migrate(&pool).await?;
                log::info!("migrations applied");
                Ok(())
            })?;
        }
        Commands::CreateSuperuser {
            email,
            first_name,
            last_name,
            database_url,
        } => {
            let password = std::env::var(SUPERUSER_PASSWORD_ENV)
                .ok()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| Error::Custom(format!("{SUPERUSER_PASSWORD_ENV} is not set")))?;
            validate_password(&password)?;
            block_on(async {
                let pool = connect(&database_url).await?;
                create_superuser(&pool, &email, &first_name, &last_name, &password).await
            })?;
        }
    }

    Ok(())
}

fn generate_key() -> String {
    let mut key = [0u8; KEY_LEN];
    rand::rng().fill_bytes(&mut key);
    STANDARD.encode(key)
}

fn block_on<F: std::future::Future<Output = Result<()>>>(fut: F) -> Result<()> {
    tokio::runtime::Runtime::new()?.block_on(fut)
}

async fn connect(database_url: &str) -> Result<PgPool> {
    Ok(PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?)
}

async fn create_superuser(
    pool: &PgPool,
    email: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
) -> Result<()> {
    if queries::email_exists(pool, email).await? {
        log::warn!("user {email} already exists, nothing to do");
        return Ok(());
    }
    let pw_hash = hash_password(password)?;
    let user = queries::create_user(
        pool,
        &NewUser {
            email,
            password_hash: &pw_hash,
            first_name,
            last_name,
            phone_number: None,
            address: None,
            is_staff: true,
        },
    )
    .await?;
    log::info!("created staff user {} ({})", user.email, user.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_random_32_bytes() {
        let a = generate_key();
        let b = generate_key();
        assert_ne!(a, b);
        assert_eq!(STANDARD.decode(&a).unwrap().len(), KEY_LEN);
    }
}
