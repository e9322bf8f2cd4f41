//! `courier validate`: check the environment configuration for errors.
//!
//! Resolves the configuration exactly as the services would, validates
//! it, and reports which services it enables, in human-readable text or
//! machine-readable JSON.

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::validation;
use crate::config::ForwardConfig;
use crate::error::CourierError;

pub fn execute(args: &ValidateArgs) -> Result<(), CourierError> {
    let config = ForwardConfig::resolve(&args.config);

    if let Err(errors) = validation::validate(&config) {
        match args.format {
            ValidateFormat::Text => {
                eprintln!("\u{2717} configuration has {} errors\n", errors.len());
                for error in &errors {
                    eprintln!("{error}");
                }
            }
            ValidateFormat::Json => {
                let json_errors: Vec<serde_json::Value> = errors
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "field": e.field,
                            "message": e.message,
                            "suggestion": e.suggestion,
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": false,
                        "errors": json_errors,
                    })
                );
            }
        }
        return Err(CourierError::ConfigValidation { errors });
    }

    match args.format {
        ValidateFormat::Text => {
            println!("\u{2713} {}", validation::format_validation_report(&config));
        }
        ValidateFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "valid": true,
                    "proxy": {
                        "enabled": config.target_base_url().is_some(),
                        "target_base_url": config.target_base_url(),
                    },
                    "relay": {
                        "enabled": config.relay_configured(),
                        "missing": config.missing_relay_vars(),
                        "interval_seconds": config.poll_interval.as_secs(),
                    },
                })
            );
        }
    }

    Ok(())
}
