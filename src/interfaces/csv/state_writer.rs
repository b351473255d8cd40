use crate::domain::account::{Account, Role};
use crate::domain::product::Product;
use crate::error::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

#[derive(Serialize)]
struct AccountRow<'a> {
    name: &'a str,
    role: Role,
    deposit: u64,
    session: &'static str,
}

#[derive(Serialize)]
struct ProductRow<'a> {
    name: &'a str,
    seller: &'a str,
    cost: u64,
    stock: u32,
}

/// Writes the final machine state as two CSV tables, accounts then
/// products, separated by a blank line. Rows are sorted by name.
pub struct StateWriter<W: Write> {
    inner: W,
}

impl<W: Write> StateWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// `now` decides whether a stored session is reported as active or expired.
    pub fn write_state(
        &mut self,
        mut accounts: Vec<Account>,
        mut products: Vec<Product>,
        now: i64,
    ) -> Result<()> {
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        let sellers: HashMap<_, _> = accounts
            .iter()
            .map(|a| (a.id.clone(), a.name.clone()))
            .collect();

        {
            let mut writer = csv::Writer::from_writer(&mut self.inner);
            for account in &accounts {
                writer.serialize(AccountRow {
                    name: &account.name,
                    role: account.role,
                    deposit: account.deposit.value(),
                    session: match &account.session {
                        Some(s) if s.is_active(now) => "active",
                        Some(_) => "expired",
                        None => "none",
                    },
                })?;
            }
            if accounts.is_empty() {
                writer.write_record(["name", "role", "deposit", "session"])?;
            }
            writer.flush().map_err(csv::Error::from)?;
        }
        writeln!(self.inner).map_err(csv::Error::from)?;

        let mut writer = csv::Writer::from_writer(&mut self.inner);
        for product in &products {
            writer.serialize(ProductRow {
                name: &product.name,
                seller: sellers
                    .get(&product.seller_id)
                    .map(String::as_str)
                    .unwrap_or(product.seller_id.as_str()),
                cost: product.cost.value(),
                stock: product.stock,
            })?;
        }
        if products.is_empty() {
            writer.write_record(["name", "seller", "cost", "stock"])?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}
