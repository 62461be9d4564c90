use tokio::process::Command;
use tracing::{debug, warn};

/// Platform credentials used when a kubeconfig user carries none, such as
/// Google application default credentials.
#[derive(Debug, Clone, Default)]
pub struct DefaultCredentials {
    /// Program and arguments printing a bearer token; empty disables the lookup
    command: Vec<String>,
}

impl DefaultCredentials {
    pub fn new(command: Vec<String>) -> Self {
        DefaultCredentials { command }
    }

    pub async fn bearer_token(&self) -> Option<String> {
        let (program, args) = self.command.split_first()?;

        let output = match Command::new(program).args(args).output().await {
            Ok(output) => output,
            Err(e) => {
                debug!("Default credentials command '{}' unavailable: {}", program, e);
                return None;
            }
        };
        if !output.status.success() {
            warn!(
                "Default credentials command '{}' exited with {}.",
                program, output.status
            );
            return None;
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!token.is_empty()).then_some(token)
    }
}
