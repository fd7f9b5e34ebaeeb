use anyhow::{anyhow, bail};
use clap::Subcommand;
use serde_json::json;

use crate::auth;
use crate::cli::utils::output_success;
use crate::cli::{connect, OutputFormat};
use crate::database::Repository;
use crate::forms::valid_email;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user account")]
    Create {
        #[arg(help = "Username")]
        username: String,

        #[arg(help = "Email address")]
        email: String,

        #[arg(long, help = "Grant superuser rights")]
        superuser: bool,
    },

    #[command(about = "Mint a session token for an existing user")]
    Token {
        #[arg(help = "Username")]
        username: String,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let (database, repo) = connect().await?;

    let result = match cmd {
        UserCommands::Create {
            username,
            email,
            superuser,
        } => {
            if !valid_email(&email.trim().to_lowercase()) {
                bail!("'{}' is not a valid email address", email);
            }
            if repo.find_user_by_username(&username).await?.is_some() {
                bail!("User '{}' already exists", username);
            }

            let user = repo.create_user(&username, &email, superuser).await?;
            output_success(
                &output_format,
                &format!("Created user '{}' ({})", user.username, user.id),
                Some(json!({ "user": user })),
            )
        }
        UserCommands::Token { username } => {
            let user = repo
                .find_user_by_username(&username)
                .await?
                .ok_or_else(|| anyhow!("User '{}' not found", username))?;
            let token = auth::session_token_for(&user)?;

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    "Session token issued",
                    Some(json!({ "username": user.username, "token": token })),
                ),
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
            }
        }
    };

    database.close().await;
    result
}
