use super::csv::command_reader::{CommandKind, ScriptCommand, ScriptReader};
use crate::application::catalog::ProductDraft;
use crate::application::directory::NewAccount;
use crate::application::machine::VendingMachine;
use crate::domain::account::AccountId;
use crate::domain::product::ProductId;
use crate::error::{Result, VendingError};
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, error, info, warn};

/// Counters reported once a script has been replayed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub failed: usize,
    pub malformed: usize,
}

/// Replays script commands against a machine, acting as the request layer.
///
/// Credentials handed out by `login` are kept per user name and presented
/// again on every authenticated command.
pub struct ScriptRunner<'a> {
    machine: &'a VendingMachine,
    credentials: HashMap<String, String>,
}

impl<'a> ScriptRunner<'a> {
    pub fn new(machine: &'a VendingMachine) -> Self {
        Self {
            machine,
            credentials: HashMap::new(),
        }
    }

    /// Runs every row of `source`. Rejected commands are logged and skipped;
    /// only a fatal error stops the replay.
    pub async fn run<R: Read>(&mut self, source: R) -> Result<ReplaySummary> {
        let mut summary = ReplaySummary::default();
        // Line 1 is the header.
        for (line, row) in (2..).zip(ScriptReader::new(source).commands()) {
            let command = match row {
                Ok(command) => command,
                Err(e) => {
                    warn!(line, "skipping malformed row: {e}");
                    summary.malformed += 1;
                    continue;
                }
            };
            match self.apply(&command).await {
                Ok(()) => summary.applied += 1,
                Err(e) if e.is_fatal() => {
                    error!(line, command = command.command.as_str(), kind = %e.kind(), "{e}");
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        line,
                        command = command.command.as_str(),
                        user = %command.user,
                        kind = %e.kind(),
                        "command rejected: {e}"
                    );
                    summary.failed += 1;
                }
            }
        }
        info!(
            applied = summary.applied,
            failed = summary.failed,
            malformed = summary.malformed,
            "replay finished"
        );
        Ok(summary)
    }

    /// Resolves the caller from the credential held for `user`.
    async fn caller(&self, user: &str) -> Result<AccountId> {
        let credential = self
            .credentials
            .get(user)
            .ok_or(VendingError::Unauthorized)?;
        self.machine.sessions().validate(credential).await
    }

    /// Product names are not unique, so a script may only address one that is.
    async fn product_id(&self, name: &str) -> Result<ProductId> {
        let mut matches = self.machine.catalog().list_products(Some(name)).await?;
        match matches.len() {
            0 => Err(VendingError::NotFound(format!("product {name:?}"))),
            1 => Ok(matches.remove(0).id),
            n => Err(VendingError::InvalidInput(format!(
                "product name {name:?} is ambiguous ({n} products)"
            ))),
        }
    }

    async fn apply(&mut self, command: &ScriptCommand) -> Result<()> {
        let user = command.user.as_str();
        match command.command {
            CommandKind::Register => {
                let account = self
                    .machine
                    .directory()
                    .register(NewAccount::new(user, command.password()?, command.role()?))
                    .await?;
                debug!(user, account = %account.id, "registered");
            }
            CommandKind::Login => {
                let grant = self
                    .machine
                    .sessions()
                    .login(user, command.password()?)
                    .await?;
                self.credentials.insert(user.to_string(), grant.credential);
            }
            CommandKind::Logout => {
                let caller = self.caller(user).await?;
                self.machine.sessions().logout(&caller).await?;
                self.credentials.remove(user);
            }
            CommandKind::LogoutAll => {
                self.machine
                    .sessions()
                    .logout_by_credentials(user, command.password()?)
                    .await?;
                self.credentials.remove(user);
            }
            CommandKind::Deposit => {
                let caller = self.caller(user).await?;
                let balance = self
                    .machine
                    .engine()
                    .deposit(&caller, command.value()?)
                    .await?;
                debug!(user, balance = balance.value(), "deposit accepted");
            }
            CommandKind::Buy => {
                let caller = self.caller(user).await?;
                let product = self.product_id(command.product()?).await?;
                let purchase = self
                    .machine
                    .engine()
                    .buy(&caller, &product, command.quantity()?)
                    .await?;
                debug!(user, product = %purchase.product_name, change = %purchase.change, "bought");
            }
            CommandKind::Reset => {
                let caller = self.caller(user).await?;
                let change = self.machine.engine().reset(&caller).await?;
                debug!(user, change = %change, "deposit reset");
            }
            CommandKind::AddProduct => {
                let caller = self.caller(user).await?;
                let draft =
                    ProductDraft::new(command.product()?, command.value()?, command.quantity()?);
                self.machine.catalog().create_product(&caller, draft).await?;
            }
            CommandKind::UpdateProduct => {
                let caller = self.caller(user).await?;
                let name = command.product()?;
                let product = self.product_id(name).await?;
                let draft = ProductDraft::new(name, command.value()?, command.quantity()?);
                self.machine
                    .catalog()
                    .update_product(&caller, &product, draft)
                    .await?;
            }
            CommandKind::DeleteProduct => {
                let caller = self.caller(user).await?;
                let product = self.product_id(command.product()?).await?;
                self.machine
                    .catalog()
                    .delete_product(&caller, &product)
                    .await?;
            }
        }
        Ok(())
    }
}
