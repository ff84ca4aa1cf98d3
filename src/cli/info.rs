use anyhow::Result;

use crate::cli::context::CliContext;

pub fn cmd_info(ctx: &CliContext) -> Result<()> {
    let config = ctx.config();

    println!("uia-driver System Information");
    println!("=============================");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Build Date: {}", env!("BUILD_DATE"));
    println!("Git Commit: {}", env!("GIT_HASH"));
    println!("Git Branch: {}", env!("GIT_BRANCH"));
    println!();

    println!("Configuration:");
    println!("- Source: {}", ctx.config_path().display());
    println!(
        "- Default Timeout: {} ms",
        config.locator.default_timeout_ms
    );
    println!(
        "- App Package: {}",
        config.locator.app_package.as_deref().unwrap_or("(device)")
    );
    match &config.tree.fixture {
        Some(path) => println!("- Tree Fixture: {}", path.display()),
        None => println!("- Tree Fixture: (none)"),
    }
    println!("- Log Level: {}", config.logging.level);
    println!();

    println!("Effective configuration (YAML):");
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}
