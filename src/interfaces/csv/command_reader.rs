use crate::domain::account::Role;
use crate::error::{Result, VendingError};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Register,
    Login,
    Logout,
    LogoutAll,
    Deposit,
    Buy,
    Reset,
    AddProduct,
    UpdateProduct,
    DeleteProduct,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Register => "register",
            CommandKind::Login => "login",
            CommandKind::Logout => "logout",
            CommandKind::LogoutAll => "logout_all",
            CommandKind::Deposit => "deposit",
            CommandKind::Buy => "buy",
            CommandKind::Reset => "reset",
            CommandKind::AddProduct => "add_product",
            CommandKind::UpdateProduct => "update_product",
            CommandKind::DeleteProduct => "delete_product",
        }
    }
}

/// One row of a replay script.
///
/// `value` is the coin for `deposit` and the unit cost for product commands;
/// `quantity` is the amount bought for `buy` and the stock for product
/// commands.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptCommand {
    pub command: CommandKind,
    pub user: String,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub product: Option<String>,
    pub value: Option<u64>,
    pub quantity: Option<u32>,
}

fn required<T>(field: Option<T>, name: &str) -> Result<T> {
    field.ok_or_else(|| VendingError::InvalidInput(format!("missing {name}")))
}

impl ScriptCommand {
    pub fn password(&self) -> Result<&str> {
        required(self.password.as_deref(), "password")
    }

    pub fn role(&self) -> Result<Role> {
        required(self.role, "role")
    }

    pub fn product(&self) -> Result<&str> {
        required(self.product.as_deref(), "product")
    }

    pub fn value(&self) -> Result<u64> {
        required(self.value, "value")
    }

    pub fn quantity(&self) -> Result<u32> {
        required(self.quantity, "quantity")
    }
}

/// Reads script commands from a CSV source with the header
/// `command,user,password,role,product,value,quantity`.
///
/// Fields are trimmed and trailing empty columns may be omitted.
pub struct ScriptReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ScriptReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes commands; a malformed row yields an error and
    /// reading continues with the next one.
    pub fn commands(self) -> impl Iterator<Item = Result<ScriptCommand>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(VendingError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "command, user, password, role, product, value, quantity\n";

    fn read(body: &str) -> Vec<Result<ScriptCommand>> {
        ScriptReader::new(format!("{HEADER}{body}").as_bytes())
            .commands()
            .collect()
    }

    #[test]
    fn test_reads_commands_with_optional_fields() {
        let results = read(
            "register, buyer1, pw, buyer,,,\n\
             deposit, buyer1,,,, 20\n\
             buy, buyer1,,, Cola,, 3\n",
        );
        assert_eq!(results.len(), 3);

        let register = results[0].as_ref().unwrap();
        assert_eq!(register.command, CommandKind::Register);
        assert_eq!(register.role().unwrap(), Role::Buyer);
        assert_eq!(register.password().unwrap(), "pw");

        let deposit = results[1].as_ref().unwrap();
        assert_eq!(deposit.value().unwrap(), 20);
        assert!(deposit.product.is_none());
        assert!(deposit.quantity.is_none());

        let buy = results[2].as_ref().unwrap();
        assert_eq!(buy.product().unwrap(), "Cola");
        assert_eq!(buy.quantity().unwrap(), 3);
    }

    #[test]
    fn test_malformed_rows_do_not_stop_reading() {
        let results = read(
            "explode, buyer1,,,,,\n\
             deposit, buyer1,,,, lots\n\
             reset, buyer1,,,,,\n",
        );
        assert!(results[0].is_err());
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().command, CommandKind::Reset);
    }

    #[test]
    fn test_missing_required_field_is_invalid_input() {
        let results = read("login, buyer1,,,,,\n");
        let login = results[0].as_ref().unwrap();
        assert!(matches!(login.password(), Err(VendingError::InvalidInput(_))));
    }
}
