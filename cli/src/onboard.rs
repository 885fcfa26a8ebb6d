use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use toolloop_core::config::{Config, get_config_path};
use toolloop_core::providers::{ollama, openai};

const BANNER: &str = r"
    -------------------------------------

     _              _ _
    | |_ ___   ___ | | | ___   ___  _ __
    | __/ _ \ / _ \| | |/ _ \ / _ \| '_ \
    | || (_) | (_) | | | (_) | (_) | |_) |
     \__\___/ \___/|_|_|\___/ \___/| .__/
                                   |_|

    -------------------------------------
";

const PROVIDERS: [&str; 2] = ["openai", "ollama"];

fn print_step(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, total, title))
            .cyan()
            .bold()
    );
    println!();
}

fn setup_provider() -> Result<&'static str> {
    let selection = Select::new()
        .with_prompt("Select your model backend")
        .items(&PROVIDERS)
        .default(0)
        .interact()
        .context("Failed to select provider")?;

    Ok(PROVIDERS[selection])
}

fn default_base_url(provider: &str) -> &'static str {
    match provider {
        "ollama" => ollama::DEFAULT_BASE_URL,
        _ => openai::DEFAULT_BASE_URL,
    }
}

fn setup_base_url(provider: &str) -> Result<String> {
    Input::new()
        .with_prompt("Base URL (any OpenAI-compatible endpoint works)")
        .default(default_base_url(provider).to_string())
        .interact_text()
        .context("Failed to read base URL")
}

fn setup_model(provider: &str) -> Result<String> {
    let models: &[&str] = match provider {
        "ollama" => &[ollama::DEFAULT_MODEL, "qwen2.5", "llama3.2"],
        _ => &[openai::DEFAULT_MODEL, "gpt-4o-mini", "qwen-plus", "deepseek-chat"],
    };

    let selection = Select::new()
        .with_prompt("Select your model")
        .items(models)
        .default(0)
        .interact()
        .context("Failed to select model")?;

    Ok(models[selection].to_string())
}

fn setup_api_key() -> Result<String> {
    let api_key: String = Input::new()
        .with_prompt("Enter your API key")
        .interact_text()
        .context("Failed to read API key")?;

    if api_key.is_empty() {
        return Err(anyhow::anyhow!("API key cannot be empty"));
    }

    Ok(api_key)
}

fn setup_weather_key() -> Result<Option<String>> {
    let key: String = Input::new()
        .with_prompt("OpenWeather API key (leave empty to skip)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read OpenWeather API key")?;

    Ok(Some(key.trim().to_string()).filter(|k| !k.is_empty()))
}

/// Assembles the answers into a config. The base URL is only stored when it differs
/// from the backend's default.
fn build_config(
    provider: &str,
    base_url: String,
    model: String,
    api_key: String,
    weather_key: Option<String>,
) -> Config {
    let mut config = Config {
        provider: Some(provider.to_string()),
        base_url: Some(base_url).filter(|url| url.trim_end_matches('/') != default_base_url(provider)),
        model: Some(model),
        api_key,
        ..Default::default()
    };
    config.weather.api_key = weather_key;
    config
}

pub fn run_onboard() -> Result<Config> {
    println!("{}", style(BANNER).cyan().bold());

    println!("  {}", style("Welcome to toolloop!").white().bold());
    println!(
        "  {}",
        style("This wizard will configure your model backend and tools.").dim()
    );
    println!();

    print_step(1, 4, "Backend Selection");
    let provider = setup_provider()?;
    let base_url = setup_base_url(provider)?;

    print_step(2, 4, "Model Selection");
    let model = setup_model(provider)?;

    print_step(3, 4, "API Key Setup");
    let api_key = if provider == "ollama" {
        println!("  {} Ollama needs no API key", style("✓").green());
        String::new()
    } else {
        setup_api_key()?
    };

    print_step(4, 4, "Weather Tool");
    let weather_key = setup_weather_key()?;

    let config = build_config(provider, base_url, model, api_key, weather_key);

    println!();
    println!("  {} Configuration complete!", style("✓").green().bold());
    println!(
        "  {} Config saved to {}",
        style("→").green(),
        style(get_config_path().display()).cyan()
    );
    println!();
    println!(
        "  {} You can now run: {}",
        style("→").green(),
        style("toolloop chat").cyan().bold()
    );
    println!();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_url_is_not_stored() {
        let config = build_config(
            "openai",
            "https://api.openai.com/v1/".into(),
            "gpt-4o".into(),
            "sk".into(),
            None,
        );
        assert_eq!(config.base_url, None);
        assert_eq!(config.provider_name(), "openai");
    }

    #[test]
    fn custom_base_url_and_weather_key_are_kept() {
        let config = build_config(
            "openai",
            "https://dashscope.aliyuncs.com/compatible-mode/v1".into(),
            "qwen-plus".into(),
            "sk".into(),
            Some("ow".into()),
        );
        assert_eq!(
            config.base_url.as_deref(),
            Some("https://dashscope.aliyuncs.com/compatible-mode/v1")
        );
        assert_eq!(config.weather.api_key.as_deref(), Some("ow"));
        assert_eq!(config.model_name(), "qwen-plus");
    }
}
