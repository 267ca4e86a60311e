use std::{
    io::{self, BufRead, Write},
    net::SocketAddr,
};

use tracing::warn;

/// Operator's answer to a connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthDecision {
    Approve,
    Deny,
    /// Deny and refuse the address from now on.
    Ban,
}

/// Decides whether a new connection may become a session.
///
/// Called on a blocking thread; the event loop waits for the answer.
pub(crate) trait Authorizer: Send + Sync {
    fn decide(&self, addr: SocketAddr) -> AuthDecision;
}

/// Asks on the console.
#[derive(Debug, Default)]
pub(crate) struct ConsoleAuthorizer;

impl Authorizer for ConsoleAuthorizer {
    fn decide(&self, addr: SocketAddr) -> AuthDecision {
        let mut stdout = io::stdout().lock();
        if let Err(e) = write!(
            stdout,
            "Approve connection from {}? Yes / No / Ban (y/n/b): ",
            addr
        )
        .and_then(|_| stdout.flush())
        {
            warn!(%addr, error = %e, "Could not prompt for approval, denying");
            return AuthDecision::Deny;
        }
        drop(stdout);

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => parse_answer(&answer),
            Err(e) => {
                warn!(%addr, error = %e, "Could not read approval, denying");
                AuthDecision::Deny
            }
        }
    }
}

/// `y`/`yes` approve, `b`/`ban` ban, anything else denies.
pub(crate) fn parse_answer(answer: &str) -> AuthDecision {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => AuthDecision::Approve,
        "b" | "ban" => AuthDecision::Ban,
        _ => AuthDecision::Deny,
    }
}
