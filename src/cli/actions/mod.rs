pub mod server;
pub mod token;

// Internal "interpreter" for `Action`, so this module only declares variants.
mod run;

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    Token(token::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
