//! `lockbox` CLI: command-line client for the Lockbox credential vault.
//!
//! Talks to the server over its JSON API. The only local state is the
//! `~/.lockbox` directory holding the caller's key and last token, which
//! enables client-side sealing of secret values with `--encrypt`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod client;
mod local;

use std::io::{BufRead as _, IsTerminal as _};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};

use lockbox_core::envelope;

use crate::client::Client;
use crate::local::LocalDir;

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

// ── CLI structure ────────────────────────────────────────────────────

/// Lockbox: a multi-tenant credential vault.
#[derive(Parser)]
#[command(
    name = "lockbox",
    version,
    about = "Lockbox CLI: store and fetch credentials in a Lockbox server",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         LOCKBOX_ADDR       Server address (default: http://127.0.0.1:8080)\n  \
         LOCKBOX_TOKEN      Session token (overrides the saved token)\n  \
         LOCKBOX_PASSWORD   Account password for login/init (skips the prompt)\n  \
         LOCKBOX_HOME       Local key/token directory (default: ~/.lockbox)\n\n\
         {DIM}Examples:{RESET}\n  \
         lockbox init --username alice\n  \
         lockbox password add mail --username alice@example.com --encrypt\n  \
         lockbox password get mail"
    ),
)]
struct Cli {
    /// Lockbox server address.
    #[arg(long, env = "LOCKBOX_ADDR", default_value = "http://127.0.0.1:8080")]
    addr: String,

    /// Session token. Falls back to the token saved by `login`.
    #[arg(long, env = "LOCKBOX_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the server is up.
    Health,
    /// Log in and save the session token locally.
    Login {
        #[arg(long)]
        username: String,
    },
    /// Log in, then fetch and save your key for client-side encryption.
    Init {
        #[arg(long)]
        username: String,
    },
    /// Print your key (base64) as stored on the server.
    Key {
        #[arg(long)]
        username: String,
    },
    /// User administration (admin only).
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
    /// Stored credential operations.
    Password {
        #[command(subcommand)]
        action: PasswordCommands,
    },
    /// Session token operations.
    Token {
        #[command(subcommand)]
        action: TokenCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Provision a user. Prompts for the new user's password.
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Grant the admin role.
        #[arg(long)]
        admin: bool,
    },
    /// List all users.
    List,
    /// Show one user by id.
    Get { id: i64 },
}

#[derive(Subcommand)]
enum PasswordCommands {
    /// Store a credential. Prompts for the value if `--value` is not given.
    Add {
        name: String,
        /// Login username stored next to the value.
        #[arg(long, default_value = "")]
        username: String,
        #[arg(long)]
        value: Option<String>,
        /// Seal the value with your local key before sending it.
        #[arg(long)]
        encrypt: bool,
    },
    /// Show a credential. Sealed values are opened when a local key exists.
    Get {
        name: String,
        /// Require a local key instead of printing sealed values as-is.
        #[arg(long)]
        decrypt: bool,
    },
    /// List credential names and usernames.
    List,
    /// Replace a credential's username and value.
    Update {
        name: String,
        #[arg(long, default_value = "")]
        username: String,
        #[arg(long)]
        value: Option<String>,
        #[arg(long)]
        encrypt: bool,
    },
    /// Delete a credential.
    Rm { name: String },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Replace your session token with a fresh one.
    Rotate,
}

// ── Pretty output helpers ────────────────────────────────────────────

fn header(icon: &str, title: &str) {
    println!("{BOLD}{CYAN}{icon} {title}{RESET}");
    println!("{DIM}─────────────────────────────────────────{RESET}");
}

fn kv_line(key: &str, value: &str) {
    println!("  {DIM}{key:<20}{RESET} {WHITE}{value}{RESET}");
}

fn success(msg: &str) {
    println!("{GREEN}{BOLD}✓{RESET} {msg}");
}

fn warning(msg: &str) {
    println!("{YELLOW}{BOLD}⚠{RESET} {YELLOW}{msg}{RESET}");
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

fn print_user(user: &Value) {
    let id = user.get("id").and_then(Value::as_i64).unwrap_or_default();
    kv_line("ID", &id.to_string());
    kv_line("First name", str_field(user, "first_name"));
    kv_line("Last name", str_field(user, "last_name"));
}

fn print_user_list(resp: &Value) {
    header("👥", "Users");
    match resp.get("users").and_then(Value::as_array) {
        Some(users) if !users.is_empty() => {
            for user in users {
                let id = user.get("id").and_then(Value::as_i64).unwrap_or_default();
                println!(
                    "  {CYAN}├─{RESET} {id:<6} {} {}",
                    str_field(user, "first_name"),
                    str_field(user, "last_name"),
                );
            }
        }
        _ => println!("  {DIM}(empty){RESET}"),
    }
    println!();
}

fn print_secret(secret: &Value, value: &str) {
    header("🔑", &format!("Password: {}", str_field(secret, "name")));
    kv_line("Username", str_field(secret, "username"));
    kv_line("Password", value);
    println!();
}

fn print_secret_list(resp: &Value) {
    header("📂", "Passwords");
    match resp.get("passwords").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => {
            for item in items {
                let sealed = if envelope::is_sealed(str_field(item, "password")) {
                    format!(" {DIM}(sealed){RESET}")
                } else {
                    String::new()
                };
                println!(
                    "  {CYAN}├─{RESET} {:<24} {DIM}{}{RESET}{sealed}",
                    str_field(item, "name"),
                    str_field(item, "username"),
                );
            }
        }
        _ => println!("  {DIM}(empty){RESET}"),
    }
    println!();
}

// ── API paths ────────────────────────────────────────────────────────

fn key_path(username: &str) -> String {
    format!("/api/v1/user/key/{}", urlencoding::encode(username))
}

fn password_path(name: &str) -> String {
    format!("/api/v1/password/{}", urlencoding::encode(name))
}

// ── Input helpers ────────────────────────────────────────────────────

/// Read a secret from `env_var`, a hidden TTY prompt, or one line of stdin.
fn read_secret(prompt: &str, env_var: Option<&str>) -> Result<String> {
    if let Some(value) = env_var.and_then(|v| std::env::var(v).ok()) {
        if !value.is_empty() {
            return Ok(value);
        }
    }

    let value = if std::io::stdin().is_terminal() {
        eprint!("{prompt}: ");
        rpassword::read_password().context("failed to read from terminal")?
    } else {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("failed to read from stdin")?;
        line.trim_end_matches(['\r', '\n']).to_owned()
    };

    if value.is_empty() {
        bail!("{} must not be empty", prompt.to_lowercase());
    }
    Ok(value)
}

// ── Entry point ──────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let local = LocalDir::discover()?;
    let token = match cli.token.filter(|t| !t.is_empty()) {
        Some(token) => Some(token),
        None => local.load_token()?,
    };
    let client = Client::new(&cli.addr, token);

    match cli.command {
        Commands::Health => cmd_health(&client).await,
        Commands::Login { username } => cmd_login(&cli.addr, &local, &username).await,
        Commands::Init { username } => cmd_init(&cli.addr, &local, &username).await,
        Commands::Key { username } => cmd_key(&client, &username).await,
        Commands::User { action } => cmd_user(&client, action).await,
        Commands::Password { action } => cmd_password(&client, &local, action).await,
        Commands::Token { action } => cmd_token(&client, &local, action).await,
    }
}

// ── Session commands ─────────────────────────────────────────────────

async fn cmd_health(client: &Client) -> Result<()> {
    let body = client.get_text_no_auth("/healthz").await?;
    println!();
    success(&format!("Server is up ({})", body.trim()));
    println!();
    Ok(())
}

async fn login(addr: &str, username: &str) -> Result<String> {
    let password = read_secret("Password", Some("LOCKBOX_PASSWORD"))?;
    let resp = Client::new(addr, None)
        .post_no_auth(
            "/login",
            &json!({ "username": username, "password": password }),
        )
        .await?;
    let token = str_field(&resp, "token");
    if token.is_empty() {
        bail!("server response did not include a token");
    }
    Ok(token.to_owned())
}

async fn cmd_login(addr: &str, local: &LocalDir, username: &str) -> Result<()> {
    let token = login(addr, username).await?;
    let path = local.save_token(&token)?;
    println!();
    success(&format!("Logged in as {BOLD}{username}{RESET}"));
    kv_line("Token saved to", &path.display().to_string());
    println!();
    Ok(())
}

async fn cmd_init(addr: &str, local: &LocalDir, username: &str) -> Result<()> {
    let token = login(addr, username).await?;
    let client = Client::new(addr, Some(token.clone()));
    let resp = client
        .get(&key_path(username))
        .await?;
    let key_path = local.save_key(str_field(&resp, "key"))?;
    let token_path = local.save_token(&token)?;

    println!();
    success(&format!("Initialized local credentials for {BOLD}{username}{RESET}"));
    kv_line("Key", &key_path.display().to_string());
    kv_line("Token", &token_path.display().to_string());
    println!();
    warning("Anyone who can read the key file can open your sealed passwords.");
    println!();
    Ok(())
}

async fn cmd_key(client: &Client, username: &str) -> Result<()> {
    let resp = client
        .get(&key_path(username))
        .await?;
    println!("{}", str_field(&resp, "key"));
    Ok(())
}

async fn cmd_token(client: &Client, local: &LocalDir, action: TokenCommands) -> Result<()> {
    match action {
        TokenCommands::Rotate => {
            let resp = client.post("/api/v1/token/rotate", &json!({})).await?;
            let token = str_field(&resp, "token");
            println!();
            success("Token rotated. The previous token no longer works.");
            if local.has_token() {
                let path = local.save_token(token)?;
                kv_line("Token saved to", &path.display().to_string());
            } else {
                kv_line("Token", token);
            }
            println!();
        }
    }
    Ok(())
}

// ── User commands ────────────────────────────────────────────────────

async fn cmd_user(client: &Client, action: UserCommands) -> Result<()> {
    match action {
        UserCommands::Create {
            username,
            first_name,
            last_name,
            admin,
        } => {
            let password = read_secret("New user's password", None)?;
            let role = if admin { "admin" } else { "standard" };
            let body = json!({
                "username": username,
                "first_name": first_name,
                "last_name": last_name,
                "password": password,
                "role": role,
            });
            let resp = client.post("/api/v1/user", &body).await?;
            println!();
            success(&format!("User {BOLD}{username}{RESET} created"));
            kv_line("Role", role);
            kv_line("Token", str_field(&resp, "token"));
            println!();
        }
        UserCommands::List => {
            let resp = client.get("/api/v1/users").await?;
            println!();
            print_user_list(&resp);
        }
        UserCommands::Get { id } => {
            let resp = client.get(&format!("/api/v1/user/{id}")).await?;
            println!();
            header("👤", &format!("User {id}"));
            print_user(&resp);
            println!();
        }
    }
    Ok(())
}

// ── Password commands ────────────────────────────────────────────────

/// Resolve the value to send, sealing it when requested.
fn outgoing_value(local: &LocalDir, value: Option<String>, encrypt: bool) -> Result<String> {
    // Load the key first so a missing key fails before any prompt.
    let key = if encrypt {
        Some(local.require_key()?)
    } else {
        None
    };
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => read_secret("Password", None)?,
    };
    match key {
        Some(key) => envelope::seal(&key, &value).context("failed to seal value"),
        None => Ok(value),
    }
}

async fn cmd_password(client: &Client, local: &LocalDir, action: PasswordCommands) -> Result<()> {
    match action {
        PasswordCommands::Add {
            name,
            username,
            value,
            encrypt,
        } => {
            let value = outgoing_value(local, value, encrypt)?;
            let body = json!({ "name": name, "username": username, "password": value });
            client.post("/api/v1/password", &body).await?;
            println!();
            success(&format!("Password {BOLD}{name}{RESET} stored"));
            println!();
        }
        PasswordCommands::Get { name, decrypt } => {
            let key = if decrypt {
                Some(local.require_key()?)
            } else {
                local.load_key()?
            };
            let resp = client
                .get(&password_path(&name))
                .await?;
            let stored = str_field(&resp, "password");
            let shown = match (&key, envelope::is_sealed(stored)) {
                (Some(key), true) => {
                    envelope::open(key, stored).context("failed to open sealed value")?
                }
                _ => stored.to_owned(),
            };
            println!();
            print_secret(&resp, &shown);
        }
        PasswordCommands::List => {
            let resp = client.get("/api/v1/passwords").await?;
            println!();
            print_secret_list(&resp);
        }
        PasswordCommands::Update {
            name,
            username,
            value,
            encrypt,
        } => {
            let value = outgoing_value(local, value, encrypt)?;
            let body = json!({ "username": username, "password": value });
            client
                .put(&password_path(&name), &body)
                .await?;
            println!();
            success(&format!("Password {BOLD}{name}{RESET} updated"));
            println!();
        }
        PasswordCommands::Rm { name } => {
            client
                .delete(&password_path(&name))
                .await?;
            println!();
            success(&format!("Password {BOLD}{name}{RESET} deleted"));
            println!();
        }
    }
    Ok(())
}
