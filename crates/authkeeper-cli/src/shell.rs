//! Interactive shell over an `AuthManager`.

use std::io::{self, Write};

use anyhow::{anyhow, Result};
use authkeeper_core::api::{ApiRequest, Method};
use authkeeper_core::{AuthError, AuthManager, AuthSnapshot};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

/// Environment variable consulted before prompting for a username
const USERNAME_ENV: &str = "AUTHKEEPER_USERNAME";

/// Environment variable consulted before prompting for a password
const PASSWORD_ENV: &str = "AUTHKEEPER_PASSWORD";

const HELP: &str = "\
Commands:
  login [username]        sign in (password is prompted)
  logout                  sign out
  whoami                  ask the server who is signed in
  status                  show cached session state (no network)
  reset                   forget cached session state
  get <path>              protected GET
  post <path> [json]      protected POST (also put, patch)
  delete <path>           protected DELETE
  debug                   dump manager and storage state
  help                    this text
  quit                    exit";

/// Map a shell verb to a request, `None` for non-HTTP commands
fn request_for(verb: &str, path: &str) -> Option<ApiRequest> {
    let method = match verb {
        "get" => Method::GET,
        "post" => Method::POST,
        "put" => Method::PUT,
        "patch" => Method::PATCH,
        "delete" => Method::DELETE,
        _ => return None,
    };
    Some(ApiRequest::new(method, path))
}

pub fn print_status(manager: &AuthManager) {
    let cache = manager.cache();
    match cache.read().user() {
        Some(user) => println!("Signed in as {}", user.display_name()),
        None if cache.read().is_resolved() => println!("Not signed in"),
        None => println!("Session not checked yet"),
    }

    match cache.persisted_flag() {
        Some(flag) => println!("Persisted flag: {}", flag),
        None => println!("Persisted flag: (none)"),
    }
    match cache.persisted_user() {
        Ok(Some(user)) => println!("Persisted user: {}", user.display_name()),
        Ok(None) => {}
        Err(e) => println!("Persisted user unreadable: {}", e),
    }
    match cache.last_confirmed() {
        Ok(Some(confirmed)) => println!("Last confirmed: {}", confirmed.age_display()),
        Ok(None) => {}
        Err(e) => println!("Confirmation time unreadable: {}", e),
    }
}

pub async fn print_whoami(manager: &AuthManager) {
    match manager.current_user().await {
        Some(user) => {
            let role = if user.is_privileged() { " (staff)" } else { "" };
            println!("{}{}", user.display_name(), role);
        }
        None => println!("Not signed in"),
    }
}

fn describe(snapshot: &AuthSnapshot) -> String {
    let who = match snapshot.user {
        Some(ref user) => format!("signed in as {}", user.username),
        None => "signed out".to_string(),
    };
    match snapshot.error {
        Some(ref error) => format!("{} - {}", who, error),
        None => who,
    }
}

async fn prompt<R>(input: &mut Lines<R>, label: &str) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    print!("{}", label);
    io::stdout().flush()?;
    let line = input.next_line().await?.unwrap_or_default();
    Ok(line.trim().to_string())
}

async fn login<R>(manager: &AuthManager, input: &mut Lines<R>, arg: Option<&str>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let username = match arg {
        Some(name) => name.to_string(),
        None => match std::env::var(USERNAME_ENV) {
            Ok(name) if !name.is_empty() => name,
            _ => prompt(input, "Username: ").await?,
        },
    };
    if username.is_empty() {
        return Err(anyhow!("Username required"));
    }

    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => tokio::task::spawn_blocking(|| rpassword::prompt_password("Password: ")).await??,
    };

    match manager.login(&username, &password).await {
        Ok(user) => {
            println!("Login successful: {}", user.display_name());
            Ok(())
        }
        Err(AuthError::InvalidCredentials) => Err(anyhow!("Invalid username or password")),
        Err(e) => Err(e.into()),
    }
}

async fn request(manager: &AuthManager, verb: &str, rest: &[&str]) -> Result<()> {
    let path = rest
        .first()
        .ok_or_else(|| anyhow!("Usage: {} <path> [json]", verb))?;
    let mut req = request_for(verb, path).ok_or_else(|| anyhow!("Unknown method: {}", verb))?;

    if rest.len() > 1 {
        let raw = rest[1..].join(" ");
        let body: serde_json::Value = serde_json::from_str(&raw)?;
        req = req.json(&body)?;
    }

    match manager.send(req).await {
        Ok(response) => {
            println!("{}", response.status);
            match response.json::<serde_json::Value>() {
                Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                Err(_) => println!("{}", response.text()),
            }
            Ok(())
        }
        Err(AuthError::SessionExpired) => Err(anyhow!("Session expired - please log in again")),
        Err(e) => Err(e.into()),
    }
}

fn print_debug(manager: &AuthManager) {
    let info = manager.debug_info();
    println!("State:    {:?}", info.state);
    println!("Snapshot: {:?}", info.snapshot);
    println!("Epoch:    {}", info.epoch);
    println!("Lookup pending: {}", info.lookup_pending);
    for (key, value) in info.persisted {
        println!("{}: {}", key, value.as_deref().unwrap_or("null"));
    }
}

/// Read commands until `quit` or end of input
pub async fn run(manager: AuthManager) -> Result<()> {
    let mut updates = manager.subscribe();
    let watcher = tokio::spawn(async move {
        let mut last = describe(&updates.borrow_and_update());
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            debug!(?snapshot, "Auth snapshot changed");
            let current = describe(&snapshot);
            if !snapshot.loading && current != last {
                println!("[auth] {}", current);
                last = current;
            }
        }
    });

    println!("authkeeper shell - type 'help' for commands");
    print_whoami(&manager).await;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("authkeeper> ");
        io::stdout().flush()?;

        let Some(line) = input.next_line().await? else {
            break;
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, rest)) = words.split_first() else {
            continue;
        };

        let result = match command {
            "login" => login(&manager, &mut input, rest.first().copied()).await,
            "logout" => {
                manager.logout().await;
                println!("Logged out");
                Ok(())
            }
            "whoami" => {
                print_whoami(&manager).await;
                Ok(())
            }
            "status" => {
                print_status(&manager);
                Ok(())
            }
            "reset" => {
                manager.invalidate();
                println!("Session state cleared");
                Ok(())
            }
            "get" | "post" | "put" | "patch" | "delete" => request(&manager, command, rest).await,
            "debug" => {
                print_debug(&manager);
                Ok(())
            }
            "help" => {
                println!("{}", HELP);
                Ok(())
            }
            "quit" | "exit" => break,
            other => Err(anyhow!("Unknown command: {} (try 'help')", other)),
        };

        if let Err(e) = result {
            eprintln!("Error: {}", e);
        }
    }

    watcher.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prompt_reads_trimmed_lines_until_eof() {
        let mut input = BufReader::new(&b"  alice \nbob\n"[..]).lines();
        assert_eq!(prompt(&mut input, "").await.unwrap(), "alice");
        assert_eq!(prompt(&mut input, "").await.unwrap(), "bob");
        assert_eq!(prompt(&mut input, "").await.unwrap(), "");
    }

    #[test]
    fn test_request_for_verbs() {
        assert_eq!(request_for("patch", "items/").unwrap().method, Method::PATCH);
        assert_eq!(request_for("delete", "items/").unwrap().url, "items/");
        assert!(request_for("login", "items/").is_none());
    }

    #[test]
    fn test_describe_snapshot() {
        let snapshot = AuthSnapshot {
            user: None,
            loading: false,
            error: Some("Session expired".to_string()),
        };
        assert_eq!(describe(&snapshot), "signed out - Session expired");
    }
}
