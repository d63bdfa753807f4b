//! `affinity init`: write the default config.

use affinity_config::AppConfig;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    std::fs::create_dir_all(&config_dir)?;
    println!("Config directory: {}", config_dir.display());

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        println!("\nConfig already exists at: {}", config_path.display());
        println!("Edit it manually or delete it and re-run init.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Created config.toml at: {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Add your API key to {} (or set OPENROUTER_API_KEY)", config_path.display());
    println!("  2. Set [companion] name and persona");
    println!("  3. Run: affinity chat\n");

    Ok(())
}
