use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docchat_core::config::API_URL_ENV_VAR;
use docchat_core::Route;

#[derive(Debug, Parser)]
#[command(name = "docchat", version, about = "Chat with AI providers over your documents")]
pub struct Cli {
    /// Backend base URL
    #[arg(long, global = true, env = API_URL_ENV_VAR)]
    pub api_url: Option<String>,

    /// Where to keep the session: file, keyring, or memory
    #[arg(long, global = true)]
    pub storage: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account
    Register {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        username: Option<String>,
    },
    /// Log in and remember the session
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show who is logged in
    Whoami,
    /// Send one message to the assistant
    Chat {
        message: String,
        /// Ground the answer in this document
        #[arg(long)]
        document: Option<String>,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// Use this key instead of the stored default
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Manage uploaded documents
    #[command(subcommand)]
    Docs(DocsCommand),
    /// List available AI providers and their models
    Providers,
    /// Manage provider API keys
    #[command(subcommand)]
    Keys(KeysCommand),
    /// Scrape a web page through the backend
    Scrape {
        url: String,
        /// Save the scraped content as a document
        #[arg(long)]
        save: bool,
        /// GET or POST
        #[arg(long, default_value = "GET")]
        method: String,
        /// Form field as key=value, repeatable
        #[arg(long = "form", value_name = "KEY=VALUE")]
        form: Vec<String>,
    },
    /// Run the structured UCR scraper with a JSON payload file
    ScrapeUcr { payload: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum DocsCommand {
    List,
    Show { id: String },
    Upload { path: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum KeysCommand {
    List,
    Add {
        key: String,
        /// Skip detection and use this provider
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        name: Option<String>,
        /// Do not make this the provider's default key
        #[arg(long)]
        not_default: bool,
    },
    Delete { id: String },
    Default { id: String },
    /// Guess a key's provider without storing it
    Detect { key: String },
}

impl Command {
    /// Screen this command corresponds to.
    pub fn route(&self) -> Route {
        match self {
            Command::Register { .. } => Route::Register,
            Command::Login { .. } => Route::Login,
            Command::Logout | Command::Whoami => Route::Home,
            Command::Chat { .. } => Route::Chat,
            Command::Docs(_) => Route::Documents,
            // Detection is local and needs no session.
            Command::Keys(KeysCommand::Detect { .. }) => Route::Home,
            Command::Providers | Command::Keys(_) => Route::ApiSettings,
            Command::Scrape { .. } | Command::ScrapeUcr { .. } => Route::Scraper,
        }
    }
}

/// Split `key=value` form arguments.
pub fn parse_form_fields(fields: &[String]) -> Result<Vec<(String, String)>, String> {
    fields
        .iter()
        .map(|field| {
            field
                .split_once('=')
                .filter(|(k, _)| !k.trim().is_empty())
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .ok_or_else(|| format!("Form field must be KEY=VALUE: {}", field))
        })
        .collect()
}
