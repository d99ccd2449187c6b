//! `citeweave config`: Configuration management commands.

use citeweave_config::AppConfig;
use citeweave_core::ProviderKind;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   Config parsed successfully");

            let warnings = warnings(&config);
            if warnings.is_empty() {
                println!("   All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   warning: {w}");
                }
            }

            println!();
            println!("   Provider:    {}", config.default_provider);
            for kind in ProviderKind::ALL {
                println!("   {:<12} {}", format!("{kind}:"), config.model(kind));
            }
            println!("   Word budget: {}", config.word_budget);
            println!(
                "   Gateway:     {}:{}",
                config.gateway.host, config.gateway.port
            );
            println!("   State:       {}", config.state_path().display());
        }
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Problems that do not stop the app but will surface as failures later.
fn warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    for kind in ProviderKind::ALL {
        if config.api_key(kind).is_none() {
            warnings.push(format!(
                "No {kind} API key set (set {}_API_KEY or add it in settings)",
                kind.as_str().to_uppercase()
            ));
        }
    }

    if config.api_key(config.default_provider).is_none() {
        warnings.push(format!(
            "The default provider ({}) has no API key; generation will fail until one is set",
            config.default_provider
        ));
    }

    if config.search.api_key.is_none() {
        warnings.push("No Semantic Scholar API key set; searches use the shared rate limit".into());
    }

    if config.gateway.host == "0.0.0.0" {
        warnings.push("Gateway bound to 0.0.0.0; the API has no authentication".into());
    }

    warnings
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let toml_str = toml::to_string_pretty(&config.redacted())?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
