//! `carebridge status`: Show configuration and collaborator status.

use carebridge_config::AppConfig;
use carebridge_core::provider::Provider;
use carebridge_retrieval::CatalogRetrieval;
use std::path::Path;

pub async fn run(check: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("AI 케어브릿지 Status");
    println!("===================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", config.default_model);
    println!("  Temperature:  {}", config.default_temperature);
    println!("  Timeout:      {}s", config.request_timeout_secs);
    println!("  API key:      {}", if config.has_api_key() { "configured" } else { "missing" });
    println!(
        "  Memory:       {} (summary after {} messages)",
        config.memory.backend, config.memory.summary_threshold
    );
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);

    let catalog_path = config.retrieval.catalog_path.as_deref();
    match CatalogRetrieval::from_path(catalog_path.map(Path::new)) {
        Ok(retrieval) => println!(
            "  Welfare:      {} programs from {} (top {})",
            retrieval.catalog().len(),
            catalog_path.unwrap_or("built-in catalog"),
            config.retrieval.top_k
        ),
        Err(e) => println!("  Welfare:      catalog error: {e}"),
    }

    if check {
        println!("  Reachable:    {}", provider_health(&config).await);
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file, run `carebridge init` first");
    }

    Ok(())
}

/// One-line verdict on the default provider's `/models` endpoint.
async fn provider_health(config: &AppConfig) -> String {
    let router = carebridge_providers::build_from_config(config);
    let Some(provider) = router.default() else {
        return format!("provider '{}' is not registered", router.default_name());
    };
    match provider.health_check().await {
        Ok(true) => format!("yes ({})", provider.name()),
        Ok(false) => format!("no, {} answered with an error status", provider.name()),
        Err(e) => format!("no, {e}"),
    }
}
