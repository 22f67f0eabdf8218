use crate::cli::actions::Action;
use anyhow::Result;
use secrecy::SecretString;

/// Turn parsed CLI matches into an action.
///
/// # Errors
/// Returns an error if a required argument is missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        dsn: matches.get_one::<String>("dsn").cloned(),
        base_url: matches
            .get_one::<String>("base-url")
            .cloned()
            .unwrap_or_else(|| "http://localhost:8080".to_string()),
        code_ttl: matches.get_one::<i64>("code-ttl").copied().unwrap_or(1800),
        session_ttl: matches
            .get_one::<i64>("session-ttl")
            .copied()
            .unwrap_or(43200),
        notifier_url: matches.get_one::<String>("notifier-url").cloned(),
        notifier_token: matches
            .get_one::<String>("notifier-token")
            .map(|token| SecretString::from(token.clone())),
    })
}
