#![allow(dead_code)]

use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use vending::application::catalog::ProductDraft;
use vending::application::directory::NewAccount;
use vending::application::machine::VendingMachine;
use vending::config::MachineConfig;
use vending::domain::account::{AccountId, Role};
use vending::domain::ports::{AccountStoreRef, ProductStoreRef};
use vending::domain::product::ProductId;
use vending::infrastructure::clock::ManualClock;
use vending::infrastructure::in_memory::{InMemoryAccountStore, InMemoryProductStore};

pub const START: i64 = 1_700_000_000_000;
pub const DAY: i64 = 24 * 60 * 60 * 1000;

pub fn test_config() -> MachineConfig {
    MachineConfig {
        hash_memory_kib: 8,
        hash_iterations: 1,
        signing_secret: Some("integration-secret".into()),
        ..Default::default()
    }
}

pub fn machine_with(
    accounts: AccountStoreRef,
    products: ProductStoreRef,
) -> (VendingMachine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START));
    let machine = VendingMachine::new(&test_config(), accounts, products, clock.clone())
        .expect("valid test config");
    (machine, clock)
}

pub fn machine() -> (VendingMachine, Arc<ManualClock>) {
    machine_with(
        Arc::new(InMemoryAccountStore::new()),
        Arc::new(InMemoryProductStore::new()),
    )
}

/// Registers an account and logs it in, returning the validated caller id.
pub async fn signed_in(machine: &VendingMachine, name: &str, role: Role) -> AccountId {
    machine
        .directory()
        .register(NewAccount::new(name, "pw", role))
        .await
        .unwrap();
    let grant = machine.sessions().login(name, "pw").await.unwrap();
    machine.sessions().validate(&grant.credential).await.unwrap()
}

pub async fn stocked_product(
    machine: &VendingMachine,
    seller: &AccountId,
    name: &str,
    cost: u64,
    stock: u32,
) -> ProductId {
    machine
        .catalog()
        .create_product(seller, ProductDraft::new(name, cost, stock))
        .await
        .unwrap()
        .id
}

pub fn write_script(path: &Path, rows: &[&str]) -> Result<(), Error> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)?;
    wtr.write_record(["command", "user", "password", "role", "product", "value", "quantity"])?;
    for row in rows {
        let fields: Vec<&str> = row.split(',').collect();
        wtr.write_record(&fields)?;
    }
    wtr.flush()?;
    Ok(())
}
