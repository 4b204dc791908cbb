use crate::config::Config;

pub fn cmd_init() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("✓ Created config.toml");
        println!("  Set tokens.jwt_secret (or JWT_SECRET_KEY) before running in production.");
    } else {
        println!("config.toml already exists, leaving it untouched.");
    }
    Ok(())
}

pub fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    config.validate()?;

    println!("✓ Configuration is valid ({})", config.general.environment);
    println!();
    print!("{}", toml::to_string_pretty(&config.masked())?);
    Ok(())
}
