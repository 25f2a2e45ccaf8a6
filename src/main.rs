use chegou_hub::utils::error::ErrorSeverity;
use chegou_hub::utils::{logger, validation::Validate};
use chegou_hub::{app::commands, Cli, HubConfig};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting chegou-hub CLI");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    let config = match HubConfig::from_file(&cli.config).and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    if let Err(e) = commands::run(cli, config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        if let Some(fields) = e.field_errors() {
            for (field, messages) in fields {
                eprintln!("   {}: {}", field, messages.join("; "));
            }
        }
        eprintln!("💡 Sugestão: {}", e.recovery_suggestion());

        std::process::exit(exit_code(e.severity()));
    }

    Ok(())
}

/// Any failed command exits non-zero; input mistakes share the retry code.
fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low | ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}
