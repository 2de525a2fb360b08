//! OS signal handling.
//!
//! SIGINT and SIGTERM both resolve [`wait_for_termination`]; the caller
//! turns that into a [`Shutdown`](super::Shutdown) trigger.

/// Which signal ended the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

impl std::fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationSignal::Interrupt => f.write_str("SIGINT"),
            TerminationSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Wait for SIGINT or SIGTERM. Fails only if a handler cannot be installed.
pub async fn wait_for_termination() -> std::io::Result<TerminationSignal> {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map(|()| TerminationSignal::Interrupt),
            _ = sigterm.recv() => Ok(TerminationSignal::Terminate),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok(TerminationSignal::Interrupt)
    }
}
