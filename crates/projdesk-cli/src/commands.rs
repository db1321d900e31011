//! Command implementations. Each one drives the `SessionManager` the way a
//! form screen would and prints the outcome.

use anyhow::{anyhow, bail, Result};
use chrono::Local;
use tracing::{info, warn};

use projdesk_core::auth::AuthFailure;
use projdesk_core::models::StatusPriority;
use projdesk_core::{ApiError, Config, ProjectDraft, Registration, SessionManager};

use crate::prompt::{env_value, prompt, prompt_password};

/// Field order of the login/registration forms; anything else prints after.
const FORM_FIELDS: [&str; 4] = ["username", "email", "password", "confirmPassword"];

const USERNAME_ENV: &str = "PROJDESK_USERNAME";
const PASSWORD_ENV: &str = "PROJDESK_PASSWORD";

const LOAD_OPTIONS_ERROR: &str = "Error loading statuses and priorities";

pub async fn login(manager: &SessionManager, config: &mut Config) -> Result<()> {
    let username = match env_value(USERNAME_ENV) {
        Some(u) => u,
        None => prompt("Username", config.last_username.as_deref())?,
    };
    let password = match env_value(PASSWORD_ENV) {
        Some(p) => p,
        None => prompt_password("Password")?,
    };

    println!("\nAuthenticating...");

    if let Err(failure) = manager.login(&username, &password).await {
        print_failure(&failure);
        bail!("Login failed");
    }

    config.last_username = Some(username);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Login successful!");
    Ok(())
}

pub async fn register(manager: &SessionManager) -> Result<()> {
    let registration = Registration {
        username: prompt("Username", None)?,
        email: prompt("Email", None)?,
        password: prompt_password("Password")?,
        confirm_password: prompt_password("Confirm password")?,
    };

    match manager.register(&registration).await {
        Ok(user) => {
            println!("User: {} created successfully", user.username);
            println!("Run `projdesk login` to sign in.");
            Ok(())
        }
        Err(failure) => {
            print_failure(&failure);
            bail!("Registration failed");
        }
    }
}

pub fn logout(manager: &SessionManager) {
    manager.logout();
    println!("Logged out.");
}

pub async fn status(manager: &SessionManager, config: &Config) -> Result<()> {
    println!("API:      {}", manager.api().base_url());
    println!("Storage:  {:?}", config.token_storage);

    if manager.initialize().await {
        println!("Session:  logged in");
    } else {
        println!("Session:  not logged in");
    }
    Ok(())
}

pub async fn options(manager: &SessionManager) -> Result<()> {
    let token = require_session(manager).await?;
    let options = manager
        .api()
        .fetch_status_priority(&token)
        .await
        .map_err(|e| api_failure(e, LOAD_OPTIONS_ERROR))?;
    print_options(&options);
    Ok(())
}

pub async fn create_project(manager: &SessionManager) -> Result<()> {
    let token = require_session(manager).await?;

    let options = manager
        .api()
        .fetch_status_priority(&token)
        .await
        .map_err(|e| api_failure(e, LOAD_OPTIONS_ERROR))?;
    print_options(&options);
    println!();

    let draft = ProjectDraft {
        name: prompt("Project name", None)?,
        description: prompt("Description", None)?,
        deadline: prompt("Deadline (YYYY-MM-DDTHH:MM)", None)?,
        status: prompt("Status id", None)?,
        priority: prompt("Priority id", None)?,
    };

    let project = draft.validate(Local::now().naive_local(), Some(&options))?;

    let created = manager
        .api()
        .create_project(&token, &project)
        .await
        .map_err(|e| api_failure(e, "Error creating the project"))?;

    info!(id = ?created.id, "Project created");
    match created.id {
        Some(id) => println!("Project created successfully (id {})", id),
        None => println!("Project created successfully"),
    }
    Ok(())
}

async fn require_session(manager: &SessionManager) -> Result<String> {
    if !manager.initialize().await {
        bail!("Not logged in. Run `projdesk login` first.");
    }
    manager
        .access_token()
        .ok_or_else(|| anyhow!("Session has no access token"))
}

fn api_failure(error: ApiError, action: &str) -> anyhow::Error {
    if error.needs_login() {
        anyhow!("{}: {}. Run `projdesk login` to sign in again.", action, error)
    } else {
        anyhow::Error::new(error).context(action.to_string())
    }
}

fn print_options(options: &StatusPriority) {
    println!("Statuses:");
    for choice in &options.project_statuses {
        println!("  {:>3}  {}", choice.id, choice.name);
    }
    println!("Priorities:");
    for choice in &options.priority_labels {
        println!("  {:>3}  {}", choice.id, choice.name);
    }
}

fn print_failure(failure: &AuthFailure) {
    for line in failure_lines(failure) {
        eprintln!("{}", line);
    }
}

/// One line per field (its first message, like a form shows), then detail.
fn failure_lines(failure: &AuthFailure) -> Vec<String> {
    let mut lines = Vec::new();

    for field in FORM_FIELDS {
        if let Some(message) = failure.first_error(field) {
            lines.push(format!("  {}: {}", field, message));
        }
    }
    for (field, messages) in &failure.field_errors {
        if FORM_FIELDS.contains(&field.as_str()) {
            continue;
        }
        if let Some(message) = messages.first() {
            lines.push(format!("  {}: {}", field, message));
        }
    }
    if let Some(ref detail) = failure.detail {
        lines.push(format!("  {}", detail));
    }

    lines
}
