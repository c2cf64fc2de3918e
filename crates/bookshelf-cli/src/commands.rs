use std::io::{self, Write};

use anyhow::{anyhow, bail, Result};
use bookshelf_core::auth::{AuthError, SessionManager, SessionState};
use bookshelf_core::config::Config;
use bookshelf_core::models::{LoginOutcome, LoginRequest, RegisterRequest};
use bookshelf_core::navigation::{Navigation, NavigationGuard, RouteTable};
use tracing::warn;

use crate::{AdminCommand, Command, TwoFactorCommand};

/// Attempts allowed for a 2FA code before the login is abandoned.
const MAX_CODE_ATTEMPTS: u32 = 3;

/// Minimum password length accepted by the backend.
const MIN_PASSWORD_LENGTH: usize = 8;

pub async fn run(command: Command, manager: &SessionManager, config: &mut Config) -> Result<()> {
    match command {
        Command::Register { email, username } => register(manager, email, username).await,
        Command::Login { email } => login(manager, config, email).await,
        Command::Logout => {
            manager.logout();
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => whoami(manager).await,
        Command::Status => {
            status(manager);
            Ok(())
        }
        Command::Open { path } => {
            open(manager, &path);
            Ok(())
        }
        Command::TwoFactor(command) => two_factor(manager, command).await,
        Command::Admin(AdminCommand::Grant { user_id }) => {
            manager.grant_admin(user_id).await.map_err(report)?;
            println!("User {} is now an admin.", user_id);
            Ok(())
        }
    }
}

fn report(error: AuthError) -> anyhow::Error {
    anyhow!(error.user_message())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_password(label: &str) -> Result<String> {
    let password = rpassword::prompt_password(format!("{}: ", label))?;
    Ok(password)
}

fn code_or_prompt(code: Option<String>) -> Result<String> {
    match code {
        Some(code) => Ok(code),
        None => prompt("Verification code"),
    }
}

async fn register(manager: &SessionManager, email: String, username: String) -> Result<()> {
    let password = prompt_password("Password")?;
    if password.len() < MIN_PASSWORD_LENGTH {
        bail!("Password must be at least {} characters", MIN_PASSWORD_LENGTH);
    }
    if prompt_password("Confirm password")? != password {
        bail!("Passwords do not match");
    }

    let account = manager
        .register(&RegisterRequest {
            email,
            username,
            password,
        })
        .await
        .map_err(report)?;

    println!(
        "{}",
        account
            .message
            .unwrap_or_else(|| "Registration successful.".to_string())
    );
    println!("Run `bookshelf login --email {}` to sign in.", account.user.email);
    Ok(())
}

async fn login(manager: &SessionManager, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) if !email.is_empty() => email,
        _ => prompt("Email")?,
    };
    if email.is_empty() {
        bail!("Email required");
    }
    let password = prompt_password("Password")?;

    let outcome = manager
        .login(&LoginRequest {
            email: email.clone(),
            password,
        })
        .await
        .map_err(report)?;

    if let LoginOutcome::SecondFactorRequired { .. } = outcome {
        verify_code(manager).await?;
    }

    config.last_email = Some(email);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    match manager.current_user() {
        Some(user) => println!("Signed in as {}.", user.display_name()),
        None => println!("Signed in."),
    }
    Ok(())
}

async fn verify_code(manager: &SessionManager) -> Result<()> {
    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let code = prompt("Verification code")?;
        match manager.verify_second_factor(&code).await {
            Ok(()) => return Ok(()),
            Err(AuthError::InvalidCode(message)) => {
                eprintln!("Invalid code ({}), attempt {} of {}.", message, attempt, MAX_CODE_ATTEMPTS);
            }
            Err(e) => {
                manager.abandon_login();
                return Err(report(e));
            }
        }
    }
    manager.abandon_login();
    bail!("Too many invalid codes, login abandoned")
}

async fn whoami(manager: &SessionManager) -> Result<()> {
    if !manager.is_authenticated() {
        println!("Not signed in.");
        return Ok(());
    }
    match manager.fetch_profile().await {
        Some(user) => {
            println!("{}", serde_json::to_string_pretty(&user)?);
            Ok(())
        }
        None => bail!("Session is no longer valid; signed out"),
    }
}

fn status(manager: &SessionManager) {
    match manager.state() {
        SessionState::Anonymous => println!("Not signed in."),
        SessionState::AwaitingSecondFactor { user_id } => {
            println!("Waiting for a verification code (user {}).", user_id)
        }
        SessionState::Authenticated => {
            let name = manager
                .current_user()
                .map(|u| u.display_name().to_string())
                .unwrap_or_default();
            let role = if manager.is_admin() { "admin" } else { "reader" };
            println!("Signed in as {} ({}).", name, role);
        }
    }
}

fn open(manager: &SessionManager, path: &str) {
    let guard = NavigationGuard::new(RouteTable::default(), manager.session().clone());
    let route = guard
        .routes()
        .resolve(path)
        .map(|r| r.name)
        .unwrap_or("unknown");

    match guard.check(path) {
        Navigation::Allow => println!("{} ({}): allowed", path, route),
        Navigation::Redirect(redirect) => {
            println!("{} ({}): redirected to {}", path, route, redirect.location())
        }
    }
}

async fn two_factor(manager: &SessionManager, command: TwoFactorCommand) -> Result<()> {
    match command {
        TwoFactorCommand::Setup => {
            let setup = manager.setup_second_factor().await.map_err(report)?;
            println!("Secret: {}", setup.secret);
            println!("QR code: {}", setup.qr_code);
            println!("Add the secret to your authenticator app, then enter a code.");

            let code = prompt("Verification code")?;
            if code.is_empty() {
                println!("Not confirmed. Run `bookshelf 2fa enable <code>` when ready.");
                return Ok(());
            }
            manager
                .confirm_second_factor_setup(&code)
                .await
                .map_err(report)?;
            println!("Two-factor authentication enabled.");
        }
        TwoFactorCommand::Enable { code } => {
            let code = code_or_prompt(code)?;
            manager
                .confirm_second_factor_setup(&code)
                .await
                .map_err(report)?;
            println!("Two-factor authentication enabled.");
        }
        TwoFactorCommand::Disable { code } => {
            let code = code_or_prompt(code)?;
            manager.disable_second_factor(&code).await.map_err(report)?;
            println!("Two-factor authentication disabled.");
        }
    }
    Ok(())
}
