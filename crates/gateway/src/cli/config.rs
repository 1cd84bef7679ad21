use anyhow::Context;
use cc_domain::config::{AuthMode, Config, ConfigSeverity, ProviderConfig};
use cc_providers::keychain_entry;

/// Parse and validate the config, printing any issues.
///
/// Returns `false` when at least one error-severity issue was found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!(
        "\n{} error(s), {} warning(s) in {config_path}",
        error_count, warning_count,
    );

    error_count == 0
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("serializing config: {e}"))?;
    print!("{output}");
    Ok(())
}

// ── Keychain secrets ──────────────────────────────────────────────────

fn find_provider<'a>(config: &'a Config, provider_id: &str) -> anyhow::Result<&'a ProviderConfig> {
    config
        .llm
        .providers
        .iter()
        .find(|p| p.id == provider_id)
        .ok_or_else(|| anyhow::anyhow!("no provider with id {provider_id:?} in config"))
}

/// Prompt for an API key and store it in the OS keychain.
pub fn set_secret(config: &Config, provider_id: &str) -> anyhow::Result<()> {
    let provider = find_provider(config, provider_id)?;
    let (service, account) = keychain_entry(provider);

    let secret = rpassword::prompt_password(format!("API key for {provider_id}: ")).context("reading secret")?;
    let secret = secret.trim();
    if secret.is_empty() {
        anyhow::bail!("empty secret, nothing stored");
    }

    let entry = keyring::Entry::new(&service, &account)
        .map_err(|e| anyhow::anyhow!("opening keychain entry {service}/{account}: {e}"))?;
    entry
        .set_password(secret)
        .map_err(|e| anyhow::anyhow!("storing secret in keychain: {e}"))?;

    println!("Stored key for {provider_id} under {service}/{account}");
    if provider.auth.mode != AuthMode::Keychain {
        println!("Set auth.mode = \"keychain\" for provider {provider_id} to use it.");
    }
    Ok(())
}

/// Print a masked view of the provider's keychain secret.
pub fn get_secret(config: &Config, provider_id: &str) -> anyhow::Result<()> {
    let provider = find_provider(config, provider_id)?;
    let (service, account) = keychain_entry(provider);

    let secret = cc_providers::read_keychain(&service, &account)?;
    println!("{provider_id} ({service}/{account}): {}", mask(&secret));
    Ok(())
}

fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(chars.len() - 6))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_hides_the_middle() {
        assert_eq!(mask("sk-abcdefghij"), "sk-a*******ij");
        assert_eq!(mask("short"), "*****");
    }

    #[test]
    fn unknown_provider_is_an_error() {
        let config = Config::default();
        assert!(find_provider(&config, "missing").is_err());
    }

    #[test]
    fn set_secret_rejects_unknown_provider_before_prompting() {
        let err = set_secret(&Config::default(), "missing").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
