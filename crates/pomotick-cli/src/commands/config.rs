use clap::Subcommand;
use pomotick_core::error::Result;
use pomotick_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the full configuration as TOML
    Show,
    /// Get a value by dot-separated key (e.g. timer.work_duration)
    Get { key: String },
    /// Set a value by dot-separated key and persist
    Set { key: String, value: String },
}

pub fn run(action: ConfigAction) -> Result<()> {
    let mut config = Config::load()?;

    match action {
        ConfigAction::Show => {
            print!(
                "{}",
                toml::to_string_pretty(&config)
                    .map_err(|e| pomotick_core::CoreError::Custom(e.to_string()))?
            );
        }
        ConfigAction::Get { key } => match config.get(&key) {
            Some(value) => println!("{value}"),
            None => {
                return Err(pomotick_core::ConfigError::UnknownKey(key).into());
            }
        },
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            println!("{key} = {value}");
        }
    }
    Ok(())
}
