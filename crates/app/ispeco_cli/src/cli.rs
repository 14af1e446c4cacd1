use clap::{Parser, Subcommand};

const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/ispeco";

#[derive(Parser, Debug)]
#[command(name = "ispeco", version, about = "ISPECO administration tool")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the version.
    Version,

    /// Print a fresh random value for CAMERA_ENCRYPTION_KEY.
    GenerateKey,

    /// Apply pending database migrations.
    Migrate {
        #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
        database_url: String,
    },

    /// Create a staff account. The password is read from `SUPERUSER_PASSWORD`
    /// so it never appears in argv or shell history.
    CreateSuperuser {
        #[arg(long)]
        email: String,

        #[arg(long, default_value = "Admin")]
        first_name: String,

        #[arg(long, default_value = "User")]
        last_name: String,

        #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
        database_url: String,
    },
}
