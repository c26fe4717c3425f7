use crate::server::config::AppConfig;
use crate::server::resolve_endpoints;
use anyhow::bail;
use minecord_core::validate_endpoints;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("🔎 MineCord config check\n");

    let mut all_ok = true;
    all_ok &= check_discord(config);
    all_ok &= check_bots(config);

    println!();
    if !all_ok {
        bail!("configuration check failed");
    }
    println!("✅ All checks passed! Ready to run MineCord.");
    Ok(())
}

fn check_discord(config: &AppConfig) -> bool {
    print!("Checking Discord token... ");
    match config.discord.resolve() {
        Ok(discord) => {
            if discord.allowed_guilds.is_empty() {
                println!("✅ set (all guilds)");
            } else {
                println!("✅ set ({} allowed guilds)", discord.allowed_guilds.len());
            }
            true
        }
        Err(e) => {
            println!("❌ {}", e);
            false
        }
    }
}

fn check_bots(config: &AppConfig) -> bool {
    print!("Checking bots ({})... ", config.bots_file);
    let source = match resolve_endpoints(config) {
        Ok(source) => source,
        Err(e) => {
            println!("❌ {:#}", e);
            return false;
        }
    };

    let mode = source.mode();
    let mut bots = source.into_configs();
    if let Err(e) = validate_endpoints(&mut bots) {
        println!("❌ {}", e);
        return false;
    }

    println!("✅ {} bot(s), {} mode", bots.len(), mode);
    for bot in &bots {
        let channel = bot
            .channel_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let enabled = if bot.enabled { "" } else { " (disabled)" };
        println!(
            "   • {} → {} as {} [{}], channel {}{}",
            bot.name,
            bot.address(),
            bot.credentials.username,
            bot.credentials.auth.as_str(),
            channel,
            enabled
        );
    }
    true
}
