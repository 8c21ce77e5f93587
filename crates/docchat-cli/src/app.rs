//! Application shell: wires config, credential store, API client, session
//! manager and navigation together, and runs one command.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};

use docchat_core::api::{ApiClient, ApiError, Credentials, Registration};
use docchat_core::config::{Config, StorageBackend};
use docchat_core::models::{detect_provider, ChatRequest, ScrapeMethod, ScrapeRequest};
use docchat_core::{AuthEvent, AuthManager, AuthState, Navigator, Route};

use crate::cli::{parse_form_fields, Cli, Command, DocsCommand, KeysCommand};

/// Characters of document text shown by `docs show` before truncating
const DOCUMENT_PREVIEW_CHARS: usize = 2000;

pub struct App {
    config: Config,
    client: ApiClient,
    manager: AuthManager,
    navigator: Navigator,
    events: broadcast::Receiver<AuthEvent>,
}

impl App {
    pub fn new(cli: &Cli) -> Result<Self> {
        let mut config = Config::load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        });
        if let Some(ref storage) = cli.storage {
            config.storage = storage
                .parse::<StorageBackend>()
                .map_err(|e| anyhow::anyhow!(e))?;
        }

        let api_url = cli.api_url.clone().unwrap_or_else(|| config.api_url());
        debug!(%api_url, storage = %config.storage, "Configuring client");

        let credentials = Arc::new(config.credential_store()?);
        let client = ApiClient::new(api_url, credentials).context("Failed to create API client")?;
        Ok(Self::with_client(config, client))
    }

    fn with_client(config: Config, client: ApiClient) -> Self {
        let events = client.subscribe();
        let manager = AuthManager::new(client.clone());
        Self {
            config,
            client,
            manager,
            navigator: Navigator::default(),
            events,
        }
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        // Settle the stored session before anything protected is shown.
        if matches!(self.manager.state(), AuthState::Validating) {
            println!("Checking saved session...");
        }
        self.manager.validate_on_startup().await;
        self.process_events();

        let route = command.route();
        if route.requires_auth() && !self.manager.is_authenticated() {
            self.navigator.navigate(Route::Login);
            bail!("Not logged in. Run `docchat login` first.");
        }
        self.navigator.navigate(route);

        let result = self.dispatch(command).await;
        self.process_events();
        result
    }

    /// Drain auth events from the request layer into session state and
    /// navigation. Returns how many session-expired notices were shown.
    fn process_events(&mut self) -> usize {
        let mut notices = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    if !self.manager.handle_event(&event) {
                        continue;
                    }
                    let moved = self.navigator.handle_event(&event);
                    if moved && matches!(event, AuthEvent::SessionExpired { .. }) {
                        eprintln!("Your session has expired. Run `docchat login` to sign in again.");
                        notices += 1;
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed auth events");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        notices
    }

    async fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Register { email, username } => self.register(email, username).await,
            Command::Login { email } => self.login(email).await,
            Command::Logout => {
                self.manager.logout();
                println!("Logged out.");
                Ok(())
            }
            Command::Whoami => {
                match self.manager.current_user() {
                    Some(user) => println!("{} <{}>", user.display_name(), user.email),
                    None => println!("Not logged in."),
                }
                Ok(())
            }
            Command::Chat {
                message,
                document,
                provider,
                model,
                api_key,
            } => self.chat(message, document, provider, model, api_key).await,
            Command::Docs(cmd) => self.docs(cmd).await,
            Command::Providers => self.providers().await,
            Command::Keys(cmd) => self.keys(cmd).await,
            Command::Scrape {
                url,
                save,
                method,
                form,
            } => self.scrape(url, save, method, form).await,
            Command::ScrapeUcr { payload } => {
                let contents = std::fs::read_to_string(&payload)
                    .with_context(|| format!("Failed to read {}", payload.display()))?;
                let payload: serde_json::Value =
                    serde_json::from_str(&contents).context("Payload is not valid JSON")?;
                let result = self
                    .client
                    .scrape_ucr(&payload)
                    .await
                    .map_err(|e| user_error(e, "Failed to run UCR scrape"))?;
                println!("{}", serde_json::to_string_pretty(&result)?);
                Ok(())
            }
        }
    }

    async fn register(&mut self, email: Option<String>, username: Option<String>) -> Result<()> {
        let email = match email {
            Some(email) => email,
            None => prompt("Email: ")?,
        };
        let username = match username {
            Some(username) => username,
            None => prompt("Username: ")?,
        };
        let password = rpassword::prompt_password("Password: ")?;
        let confirm = rpassword::prompt_password("Confirm password: ")?;
        if password != confirm {
            bail!("Passwords do not match");
        }

        let registration = Registration {
            email,
            username,
            password,
        };
        match self.manager.register(&registration).await {
            Ok(_) => {
                println!("Account created. Run `docchat login` to sign in.");
                self.navigator.navigate(Route::Login);
                Ok(())
            }
            Err(_) => bail!(self.failure_message("Failed to register")),
        }
    }

    async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => prompt("Email: ")?,
        };
        let password = rpassword::prompt_password("Password: ")?;

        match self.manager.login(&Credentials::new(email.clone(), password)).await {
            Ok(user) => {
                println!("Logged in as {}.", user.display_name());
                self.config.last_email = Some(email);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                Ok(())
            }
            Err(_) => bail!(self.failure_message("Failed to login")),
        }
    }

    fn failure_message(&self, fallback: &str) -> String {
        self.manager.last_error().unwrap_or(fallback).to_string()
    }

    async fn chat(
        &self,
        message: String,
        document: Option<String>,
        provider: Option<String>,
        model: Option<String>,
        api_key: Option<String>,
    ) -> Result<()> {
        let mut request = ChatRequest::new(message);
        if let Some(document_id) = document {
            let doc = self
                .client
                .get_document(&document_id)
                .await
                .map_err(|e| user_error(e, "Failed to load document"))?;
            request = request.with_document(doc.id.clone(), Some(doc.text().to_string()));
        }
        if let Some(provider) = provider {
            request = request.with_provider(provider, model);
        } else if model.is_some() {
            request.model = model;
        }
        if let Some(key) = api_key {
            request = request.with_api_key(key);
        }

        let reply = self
            .client
            .send_chat(&request)
            .await
            .map_err(|e| user_error(e, "There was an error processing your request."))?;
        println!("{}", reply.response);
        if let (Some(provider), Some(model)) = (reply.provider, reply.model) {
            println!("\n[{} / {}]", provider, model);
        }
        Ok(())
    }

    async fn docs(&self, cmd: DocsCommand) -> Result<()> {
        match cmd {
            DocsCommand::List => {
                let docs = self
                    .client
                    .list_documents()
                    .await
                    .map_err(|e| user_error(e, "Failed to fetch documents"))?;
                if docs.is_empty() {
                    println!("No documents yet.");
                }
                for doc in docs {
                    let created = doc
                        .created_at
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default();
                    println!("{}  {:<40}  {}", doc.id, doc.filename, created);
                }
            }
            DocsCommand::Show { id } => {
                let doc = self
                    .client
                    .get_document(&id)
                    .await
                    .map_err(|e| user_error(e, "Failed to load document"))?;
                println!("# {}\n", doc.filename);
                let text: String = doc.text().chars().take(DOCUMENT_PREVIEW_CHARS).collect();
                println!("{}", text);
                if doc.text().chars().count() > DOCUMENT_PREVIEW_CHARS {
                    println!("\n... (truncated)");
                }
            }
            DocsCommand::Upload { path } => {
                let resp = self
                    .client
                    .upload_document_file(&path)
                    .await
                    .map_err(|e| user_error(e, "Failed to upload document"))?;
                println!("{}", resp.message);
            }
        }
        Ok(())
    }

    async fn providers(&self) -> Result<()> {
        let providers = self
            .client
            .list_providers()
            .await
            .map_err(|e| user_error(e, "Failed to fetch providers"))?;
        for provider in providers {
            let default = provider.default_model.as_deref().unwrap_or("-");
            println!("{} ({}) default: {}", provider.name, provider.id, default);
            for model in provider.models {
                println!("  - {}", model);
            }
        }
        Ok(())
    }

    async fn keys(&self, cmd: KeysCommand) -> Result<()> {
        match cmd {
            KeysCommand::List => {
                let keys = self
                    .client
                    .list_api_keys()
                    .await
                    .map_err(|e| user_error(e, "Failed to fetch API keys"))?;
                if keys.is_empty() {
                    println!("No API keys stored.");
                }
                for key in keys {
                    println!("{}  {:<10}  {}", key.id, key.provider, key.display_label());
                }
            }
            KeysCommand::Add {
                key,
                provider,
                name,
                not_default,
            } => {
                let resp = self
                    .client
                    .add_api_key(&key, provider.as_deref(), name.as_deref(), !not_default)
                    .await
                    .map_err(|e| user_error(e, "Failed to add API key"))?;
                println!("API key added for {} ({}).", resp.provider, resp.key_id);
            }
            KeysCommand::Delete { id } => {
                self.client
                    .delete_api_key(&id)
                    .await
                    .map_err(|e| user_error(e, "Failed to delete API key"))?;
                println!("API key deleted.");
            }
            KeysCommand::Default { id } => {
                self.client
                    .set_default_api_key(&id)
                    .await
                    .map_err(|e| user_error(e, "Failed to update default API key"))?;
                println!("Default API key updated.");
            }
            KeysCommand::Detect { key } => match detect_provider(&key) {
                Some(provider) => println!("{} ({})", provider.display_name(), provider.id()),
                None => bail!("Could not detect provider. Please select one manually."),
            },
        }
        Ok(())
    }

    async fn scrape(&self, url: String, save: bool, method: String, form: Vec<String>) -> Result<()> {
        let method = method.parse::<ScrapeMethod>().map_err(|e| anyhow::anyhow!(e))?;
        let form: BTreeMap<String, String> = parse_form_fields(&form)
            .map_err(|e| anyhow::anyhow!(e))?
            .into_iter()
            .collect();

        let request = ScrapeRequest::new(url).save(save).with_form(method, form);
        let result = self
            .client
            .scrape(&request)
            .await
            .map_err(|e| user_error(e, "Failed to scrape URL. Please try again."))?;
        println!("{}", result.content);
        if let Some(document_id) = result.document_id {
            println!("\nSaved as document {}.", document_id);
        }
        Ok(())
    }
}

/// Turn an API failure into the message shown to the user.
fn user_error(err: ApiError, fallback: &str) -> anyhow::Error {
    debug!(error = %err, "Request failed");
    anyhow::anyhow!(err.user_message(fallback))
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_core::{CredentialStore, Session, User};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn alice() -> User {
        User {
            id: "u1".to_string(),
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
        }
    }

    fn app_with(server: &MockServer, token: Option<&str>) -> App {
        let store = CredentialStore::in_memory();
        if let Some(token) = token {
            store.save(&Session::new(token, alice())).unwrap();
        }
        let config = Config {
            storage: StorageBackend::Memory,
            ..Default::default()
        };
        let client = ApiClient::new(server.uri(), Arc::new(store)).unwrap();
        App::with_client(config, client)
    }

    async fn mount_current_user(server: &MockServer, status: u16) {
        Mock::given(method("GET"))
            .and(path("/api/auth/user"))
            .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
                "id": "u1", "email": "alice@example.com", "name": "alice"
            })))
            .mount(server)
            .await;
    }

    async fn document_requests(server: &MockServer) -> usize {
        server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/api/documents")
            .count()
    }

    #[tokio::test]
    async fn test_protected_command_needs_login() {
        let server = MockServer::start().await;
        let mut app = app_with(&server, None);

        let err = app.run(Command::Docs(DocsCommand::List)).await.unwrap_err();
        assert!(err.to_string().contains("Not logged in"));
        assert_eq!(app.navigator.current(), Route::Login);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_stored_session_blocks_protected_command() {
        let server = MockServer::start().await;
        mount_current_user(&server, 401).await;
        let mut app = app_with(&server, Some("OLD"));
        assert_eq!(app.manager.state(), &AuthState::Validating);

        let err = app.run(Command::Docs(DocsCommand::List)).await.unwrap_err();
        assert!(err.to_string().contains("Not logged in"));
        assert_eq!(document_requests(&server).await, 0);
        assert_eq!(app.client.credentials().load(), None);
        assert_eq!(app.navigator.current(), Route::Login);
    }

    #[tokio::test]
    async fn test_protected_command_runs_once_session_is_confirmed() {
        let server = MockServer::start().await;
        mount_current_user(&server, 200).await;
        Mock::given(method("GET"))
            .and(path("/api/documents"))
            .and(header("Authorization", "Bearer T"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"documents": []})))
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app_with(&server, Some("T"));
        app.run(Command::Docs(DocsCommand::List)).await.unwrap();
        assert!(app.manager.is_authenticated());
        assert_eq!(app.navigator.current(), Route::Documents);
    }

    #[tokio::test]
    async fn test_expired_session_notice_is_shown_once() {
        let server = MockServer::start().await;
        mount_current_user(&server, 200).await;
        Mock::given(method("GET"))
            .and(path("/api/documents"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let mut app = app_with(&server, Some("T"));
        app.manager.validate_on_startup().await;
        app.navigator.navigate(Route::Documents);

        // Two requests in a row both come back 401.
        app.client.list_documents().await.unwrap_err();
        app.client.list_documents().await.unwrap_err();

        assert_eq!(app.process_events(), 1);
        assert_eq!(app.navigator.current(), Route::Login);
        assert!(!app.manager.is_authenticated());
        assert_eq!(app.process_events(), 0);
    }

    #[tokio::test]
    async fn test_local_command_skips_login_gate() {
        let server = MockServer::start().await;
        let mut app = app_with(&server, None);
        app.run(Command::Keys(KeysCommand::Detect {
            key: "gsk_abc".to_string(),
        }))
        .await
        .unwrap();
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
