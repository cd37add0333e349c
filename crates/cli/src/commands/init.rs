//! `carebridge init`: Write a default configuration file.

use carebridge_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("AI 케어브릿지: Setup");
    println!("=====================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("  Config file already exists: {}", config_path.display());
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Wrote default config: {}", config_path.display());
    }

    println!();
    println!("  Next steps:");
    println!("    1. Set an API key: export UPSTAGE_API_KEY=...");
    println!("    2. Try a turn:     carebridge chat -m \"안녕하세요\"");
    println!("    3. Start the API:  carebridge gateway");
    println!();

    Ok(())
}
