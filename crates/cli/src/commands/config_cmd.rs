//! `liftlog config`: show or initialize the configuration.

use liftlog_config::AppConfig;

pub async fn run(init: bool) -> Result<(), Box<dyn std::error::Error>> {
    if init {
        return write_default();
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("# {}", AppConfig::config_path().display());
    println!("{}", redacted_toml(&config)?);
    Ok(())
}

fn write_default() -> Result<(), Box<dyn std::error::Error>> {
    let path = AppConfig::config_path();
    if path.exists() {
        return Err(format!("{} already exists; not overwriting", path.display()).into());
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

/// The config as TOML with every `api_key` masked.
fn redacted_toml(config: &AppConfig) -> Result<String, Box<dyn std::error::Error>> {
    let mut value = toml::Value::try_from(config)?;
    if let Some(table) = value.as_table_mut() {
        mask_key(table);
        if let Some(providers) = table.get_mut("providers").and_then(|p| p.as_table_mut()) {
            for (_, provider) in providers.iter_mut() {
                if let Some(provider) = provider.as_table_mut() {
                    mask_key(provider);
                }
            }
        }
    }
    Ok(toml::to_string_pretty(&value)?)
}

fn mask_key(table: &mut toml::map::Map<String, toml::Value>) {
    if let Some(key) = table.get_mut("api_key") {
        *key = toml::Value::String("***".into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liftlog_config::ProviderConfig;

    #[test]
    fn secrets_are_masked() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-top-secret".into());
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-provider-secret".into()),
                ..Default::default()
            },
        );

        let rendered = redacted_toml(&config).unwrap();
        assert!(!rendered.contains("sk-top-secret"));
        assert!(!rendered.contains("sk-provider-secret"));
        assert!(rendered.contains("***"));
        assert!(rendered.contains("gpt-4o-mini"));
    }

    #[test]
    fn config_path_is_valid() {
        let path = AppConfig::config_path();
        assert!(path.to_str().unwrap().contains("config.toml"));
    }
}
