use std::path::Path;

use stackplan_core::StackplanConfig;

pub fn init(config_path: &Path, inventory: Option<&Path>, force: bool) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }
    let config = StackplanConfig::scaffold(inventory);
    std::fs::write(config_path, config.to_toml_string()?)?;
    println!("✓ Generated {}", config_path.display());
    Ok(())
}
