pub mod seed;
pub mod server;

// Internal "interpreter" for `Action`.
mod run;

use crate::config::ServerConfig;

#[derive(Debug)]
pub enum Action {
    Server(ServerConfig),
    Seed(ServerConfig),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
