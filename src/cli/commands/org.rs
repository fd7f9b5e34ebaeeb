use anyhow::anyhow;
use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::output_empty_collection;
use crate::cli::{connect, OutputFormat};
use crate::database::Repository;

#[derive(Subcommand)]
pub enum OrgCommands {
    #[command(about = "List all organizations with their zone counts")]
    List,

    #[command(about = "Show the admin and invitation removals recorded for an organization")]
    Audit {
        #[arg(help = "Organization ID")]
        org_id: Uuid,
    },
}

pub async fn handle(cmd: OrgCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let (database, repo) = connect().await?;

    let result = match cmd {
        OrgCommands::List => {
            let organizations = repo.list_organizations().await?;
            if organizations.is_empty() {
                database.close().await;
                return output_empty_collection(&output_format, "organizations", "No organizations");
            }

            let mut rows = Vec::with_capacity(organizations.len());
            for org in organizations {
                let zones = repo.zone_count(org.id).await?;
                let members = repo.organization_members(org.id).await?.len();
                rows.push((org, zones, members));
            }

            match output_format {
                OutputFormat::Json => {
                    let organizations: Vec<_> = rows
                        .iter()
                        .map(|(org, zones, members)| {
                            json!({
                                "id": org.id,
                                "name": org.name,
                                "owner_id": org.owner_id,
                                "zones": zones,
                                "members": members,
                                "created_at": org.created_at,
                            })
                        })
                        .collect();
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({ "organizations": organizations }))?
                    );
                }
                OutputFormat::Text => {
                    println!("{:<38} {:<30} {:>6} {:>8}", "ID", "NAME", "ZONES", "MEMBERS");
                    println!("{}", "-".repeat(85));
                    for (org, zones, members) in &rows {
                        println!("{:<38} {:<30} {:>6} {:>8}", org.id, org.name, zones, members);
                    }
                }
            }
            Ok(())
        }
        OrgCommands::Audit { org_id } => {
            let org = repo
                .get_organization(org_id)
                .await?
                .ok_or_else(|| anyhow!("Organization '{}' not found", org_id))?;
            let records = repo.deletion_records_for_organization(org.id).await?;
            if records.is_empty() {
                database.close().await;
                return output_empty_collection(
                    &output_format,
                    "deletion_records",
                    &format!("No removals recorded for {}", org.name),
                );
            }

            match output_format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({ "deletion_records": records }))?
                    );
                }
                OutputFormat::Text => {
                    println!("{:<26} {:<38} {}", "WHEN", "DELETER", "REMOVED");
                    println!("{}", "-".repeat(100));
                    for record in &records {
                        let removed = match (&record.deleted_invite_email, record.deleted_user_id) {
                            (Some(email), _) => format!("invitation for {email}"),
                            (None, Some(user_id)) => format!("admin {user_id}"),
                            (None, None) => "-".to_string(),
                        };
                        let deleter = record
                            .deleter_id
                            .map(|id| id.to_string())
                            .unwrap_or_else(|| "-".to_string());
                        println!(
                            "{:<26} {:<38} {}",
                            record.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                            deleter,
                            removed
                        );
                    }
                }
            }
            Ok(())
        }
    };

    database.close().await;
    result
}
