use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use num_bigint::{BigInt, Sign};
use num_rational::BigRational;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// How long a broadcast waits and what counts as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastMode {
    /// Wait for CheckTx, success iff its code is 0.
    #[default]
    Sync,
    /// Return as soon as the node accepted the submission. Gives no delivery guarantee.
    Async,
    /// Wait for block inclusion, success iff both CheckTx and execution report code 0.
    Commit,
}

impl Display for BroadcastMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BroadcastMode::Sync => f.write_str("sync"),
            BroadcastMode::Async => f.write_str("async"),
            BroadcastMode::Commit => f.write_str("commit"),
        }
    }
}

/// Non-negative decimal parsed from its text, kept exact so products round up deterministically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    ratio: BigRational,
    text: String,
}

impl Decimal {
    /// Builds the decimal written by the shortest representation of `value`.
    pub fn from_f64(value: f64) -> Result<Self, ClientError> {
        if !value.is_finite() {
            return Err(ClientError::Configuration(format!("{value} is not a finite decimal")));
        }
        value.to_string().parse()
    }

    /// `ceil(self * value)`.
    pub fn mul_ceil(&self, value: u64) -> BigInt {
        (self.ratio.clone() * BigInt::from(value)).ceil().to_integer()
    }

    pub fn is_zero(&self) -> bool {
        self.ratio.numer().sign() == Sign::NoSign
    }
}

impl FromStr for Decimal {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ClientError::Configuration(format!("invalid decimal {s:?}"));

        let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
            return Err(invalid());
        }

        let numer: BigInt = format!("{whole}{fraction}").parse().map_err(|_| invalid())?;
        let exponent = u32::try_from(fraction.len()).map_err(|_| invalid())?;
        let denom = BigInt::from(10u8).pow(exponent);

        Ok(Self {
            ratio: BigRational::new(numer, denom),
            text: s.to_string(),
        })
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.text)
    }
}

/// Gas price in the `<decimal><denom>` notation, e.g. `0.0025untrn`.
#[derive(Debug, Clone, PartialEq)]
pub struct GasPrice {
    pub amount: Decimal,
    pub denom: String,
}

impl GasPrice {
    /// Fee for `gas` units, rounded up to the next whole coin.
    pub fn fee_amount(&self, gas: u64) -> Result<u128, ClientError> {
        u128::try_from(self.amount.mul_ceil(gas))
            .map_err(|_| ClientError::Build(format!("fee for {gas} gas at {self} overflows")))
    }
}

impl FromStr for GasPrice {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| ClientError::Configuration(format!("gas price {s:?} has no denom")))?;
        let (amount, denom) = s.split_at(split);

        let amount: Decimal = amount
            .parse()
            .map_err(|e| ClientError::Configuration(format!("invalid gas price amount in {s:?}: {e}")))?;

        Ok(Self {
            amount,
            denom: denom.to_string(),
        })
    }
}

impl Display for GasPrice {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Configuration for signing and broadcasting submissions
#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    pub chain_id: String,
    /// Bech32 prefix of account addresses on the submission chain
    pub chain_prefix: String,
    pub gas_price: GasPrice,
    /// Multiplier applied to the simulated gas
    pub gas_adjustment: Decimal,
    pub broadcast_mode: BroadcastMode,
    pub memo: String,
}
