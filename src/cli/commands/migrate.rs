use crate::cli::utils::output_success;
use crate::cli::{connect, OutputFormat};

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let (database, _) = connect().await?;
    database.migrate().await?;
    database.close().await;

    output_success(&output_format, "Database migrations applied", None)
}
