//! Configuration commands: setup, config

use anyhow::Result;
use dialoguer::Input;

use super::output::Output;
use crate::remote::{self, StoreError};
use crate::storage::{mask_secret, Config, Workspace};

/// Raw answers to the setup prompts; empty means "keep the current value"
#[derive(Debug, Clone, Default)]
pub struct Answers {
    pub database_url: String,
    pub ca_cert: String,
    pub cloudinary_url: String,
    pub cloudinary_folder: String,
}

/// Merges non-empty answers into `config`
pub fn apply_answers(config: &mut Config, answers: Answers) {
    let keep_or_set = |slot: &mut Option<String>, answer: String| {
        let answer = answer.trim();
        if !answer.is_empty() {
            *slot = Some(answer.to_string());
        }
    };

    keep_or_set(&mut config.database_url, answers.database_url);
    keep_or_set(&mut config.ca_cert, answers.ca_cert);
    keep_or_set(&mut config.cloudinary_url, answers.cloudinary_url);
    keep_or_set(&mut config.cloudinary_folder, answers.cloudinary_folder);
}

fn secret_hint(value: &Option<String>) -> &'static str {
    if value.as_deref().is_some_and(|v| !v.is_empty()) {
        "***"
    } else {
        "none"
    }
}

fn ask(label: &str, hint: &str) -> Result<String> {
    let answer: String = Input::new()
        .with_prompt(format!("{} [{}]", label, hint))
        .allow_empty(true)
        .interact_text()?;
    Ok(answer)
}

async fn count_documents(config: &Config) -> Result<u64, StoreError> {
    let store = remote::connect(config).await?;
    let count = store.count().await;
    store.close().await;
    count
}

pub async fn run(output: &Output, workspace: &Workspace) -> Result<()> {
    output.title("Blog CLI Setup");

    let mut config = workspace.config()?.unwrap_or_default();

    output.line("Enter your database connection details:");
    output.blank();

    let mut answers = Answers {
        database_url: ask("DATABASE_URL", secret_hint(&config.database_url))?,
        ca_cert: ask("CA_CERT (base64)", secret_hint(&config.ca_cert))?,
        ..Answers::default()
    };
    output.blank();
    answers.cloudinary_url = ask("CLOUDINARY_URL", secret_hint(&config.cloudinary_url))?;
    answers.cloudinary_folder = ask("CLOUDINARY_FOLDER", config.cloudinary_folder())?;

    apply_answers(&mut config, answers);

    if config.database_url().is_err() {
        output.error("DATABASE_URL is required");
        return Ok(());
    }

    config.save(workspace.config_path())?;
    output.ok(&format!("Config saved to {}", workspace.config_path().display()));

    output.info("Testing database connection...");
    match count_documents(&config).await {
        Ok(count) => output.ok(&format!("Connected! Found {} blogs in database", count)),
        Err(e) => output.error(&format!("Connection failed: {}", e)),
    }

    Ok(())
}

pub fn show(output: &Output, workspace: &Workspace) -> Result<()> {
    let Some(config) = workspace.config()? else {
        output.warn("No config found. Run: blog setup");
        return Ok(());
    };

    let database = config
        .database_url()
        .map(|url| mask_secret(url, 20))
        .unwrap_or_else(|_| "not set".to_string());
    let set = |present: bool| if present { "set" } else { "not set" };

    if output.is_json() {
        output.data(&serde_json::json!({
            "configFile": workspace.config_path(),
            "blogsDir": workspace.blog_dir(),
            "database": database,
            "caCert": config.ca_cert().is_some(),
            "cloudinary": config.cloudinary_url().is_ok(),
            "cloudinaryFolder": config.cloudinary_folder(),
            "nodeTable": config.node_table(),
        }));
        return Ok(());
    }

    output.title("Current Configuration");
    output.line(&format!("Config file: {}", workspace.config_path().display()));
    output.line(&format!("Blogs dir:   {}", workspace.blog_dir().display()));
    output.line(&format!("Database:    {}", database));
    output.line(&format!("CA Cert:     {}", set(config.ca_cert().is_some())));
    output.line(&format!("Cloudinary:  {}", set(config.cloudinary_url().is_ok())));
    output.line(&format!("Folder:      {}", config.cloudinary_folder()));

    Ok(())
}
