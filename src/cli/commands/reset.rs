use crate::config::{Config, Environment};
use crate::db::Store;

pub async fn cmd_reset_db(config: &Config, yes: bool) -> anyhow::Result<()> {
    if config.general.environment == Environment::Production {
        anyhow::bail!("Refusing to reset the database in production");
    }

    if !yes {
        println!("This will delete all data in {}.", config.general.database_url);
        println!("Type 'yes' to continue:");

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("yes") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let store = Store::new(&config.general.database_url).await?;
    store.reset().await?;

    println!("✓ Database reset");
    Ok(())
}
