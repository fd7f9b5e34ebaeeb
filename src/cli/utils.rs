use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(body)) = (data, response.as_object_mut()) {
                body.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(
    output_format: &OutputFormat,
    collection_name: &str,
    message: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ collection_name: [] }))?
            );
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}
