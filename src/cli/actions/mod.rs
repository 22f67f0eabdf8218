pub mod server;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: Option<String>,
        base_url: String,
        code_ttl: i64,
        session_ttl: i64,
        notifier_url: Option<String>,
        notifier_token: Option<SecretString>,
    },
}
