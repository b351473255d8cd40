use crate::error::{Result, VendingError};
use serde::{Deserialize, Serialize};

/// Accepted denominations, largest first.
///
/// The set is canonical, so greedy change-making always uses the fewest
/// coins. Adding a denomination can break that (25 next to 20 and 10 does),
/// which would void the optimality guarantee of [`make_change`].
pub const DENOMINATIONS: [u64; 5] = [100, 50, 20, 10, 5];

/// The smallest accepted coin. Every monetary quantity is a multiple of it.
pub const SMALLEST_COIN: u64 = 5;

/// A single coin of an accepted denomination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Coin(u64);

impl Coin {
    pub fn new(value: u64) -> Result<Self> {
        if DENOMINATIONS.contains(&value) {
            Ok(Self(value))
        } else {
            Err(VendingError::InvalidCoin(value))
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for Coin {
    type Error = VendingError;

    fn try_from(value: u64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Coin> for u64 {
    fn from(coin: Coin) -> Self {
        coin.0
    }
}

/// Checks a coin value against the accepted set.
pub fn validate(value: u64) -> Result<()> {
    Coin::new(value).map(|_| ())
}

/// Deposit credit held by a buyer account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Balance(pub u64);

impl Balance {
    pub const ZERO: Self = Self(0);

    pub fn new(amount: u64) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}

impl From<Coin> for Balance {
    fn from(coin: Coin) -> Self {
        Self(coin.0)
    }
}

/// Unit price of a product: positive and a multiple of the smallest coin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Price(u64);

impl Price {
    pub fn new(value: u64) -> Result<Self> {
        if value > 0 && value % SMALLEST_COIN == 0 {
            Ok(Self(value))
        } else {
            Err(VendingError::InvalidInput(
                "cost should be positive and in multiples of 5".to_string(),
            ))
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Total cost of `quantity` units, rejecting overflow.
    pub fn times(&self, quantity: u32) -> Result<Balance> {
        self.0
            .checked_mul(u64::from(quantity))
            .map(Balance)
            .ok_or_else(|| VendingError::InvalidInput("total cost is too large".to_string()))
    }
}

impl TryFrom<u64> for Price {
    type Error = VendingError;

    fn try_from(value: u64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Price> for u64 {
    fn from(price: Price) -> Self {
        price.0
    }
}

/// Coins paid back to a buyer, largest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Change(Vec<Coin>);

impl Change {
    pub fn total(&self) -> u64 {
        self.0.iter().map(Coin::value).sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Coin values in payout order, e.g. `[20, 10, 5]`.
    pub fn values(&self) -> Vec<u64> {
        self.0.iter().map(Coin::value).collect()
    }
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values: Vec<String> = self.0.iter().map(|c| c.0.to_string()).collect();
        write!(f, "[{}]", values.join(" "))
    }
}

/// Pays out `amount` with the fewest coins by greedy descent through [`DENOMINATIONS`].
///
/// Pure: the same amount always yields the same sequence. Fails with
/// [`VendingError::ChangeNotRepresentable`] when a remainder smaller than the
/// smallest coin is left over.
pub fn make_change(amount: u64) -> Result<Change> {
    let mut remaining = amount;
    let mut coins = Vec::new();
    for denomination in DENOMINATIONS {
        let count = remaining / denomination;
        coins.extend(std::iter::repeat_n(Coin(denomination), count as usize));
        remaining -= count * denomination;
    }
    if remaining != 0 {
        return Err(VendingError::ChangeNotRepresentable(amount));
    }
    Ok(Change(coins))
}
