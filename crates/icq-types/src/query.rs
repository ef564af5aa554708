use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FilterError;

/// Event attribute the relayer uses to search only for transactions it has not relayed yet.
pub const TX_HEIGHT_FIELD: &str = "tx.height";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Kv,
    Tx,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Kv => "kv",
            QueryType::Tx => "tx",
        }
    }
}

impl Display for QueryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// ModuleKeySpec describes one piece of remote module state a KV query wants proven.
///
/// The semantic variants are turned into raw store keys by the relayer's key builder,
/// the raw variants are used verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleKeySpec {
    /// A single `x/bank` balance of `address` in `denom`.
    Balance { address: String, denom: String },
    /// Every `x/staking` delegation made by `delegator`.
    Delegations { delegator: String },
    /// An exact key in the given module store.
    Raw {
        store_key: String,
        #[serde(with = "hex::serde")]
        key: Vec<u8>,
    },
    /// All keys under a prefix in the given module store.
    RawPrefix {
        store_key: String,
        #[serde(with = "hex::serde")]
        prefix: Vec<u8>,
    },
}

/// RegisteredQuery is the task the relayer dequeues. It is not modified while it is processed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredQuery {
    pub id: u64,
    pub query_type: QueryType,
    #[serde(default)]
    pub keys: Vec<ModuleKeySpec>,
    /// JSON encoded [`TransactionsFilter`], only read for TX queries.
    #[serde(default)]
    pub transactions_filter: String,
}

impl RegisteredQuery {
    pub fn kv(id: u64, keys: Vec<ModuleKeySpec>) -> Self {
        Self {
            id,
            query_type: QueryType::Kv,
            keys,
            transactions_filter: String::new(),
        }
    }

    pub fn tx(id: u64, transactions_filter: impl Into<String>) -> Self {
        Self {
            id,
            query_type: QueryType::Tx,
            keys: Vec::new(),
            transactions_filter: transactions_filter.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FromStr for FilterOp {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eq" | "=" => Ok(FilterOp::Eq),
            "gt" | ">" => Ok(FilterOp::Gt),
            "gte" | ">=" => Ok(FilterOp::Gte),
            "lt" | "<" => Ok(FilterOp::Lt),
            "lte" | "<=" => Ok(FilterOp::Lte),
            _ => Err(FilterError::UnknownOp(s.to_string())),
        }
    }
}

/// Operand of a filter condition, borrowed from the JSON value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterValue<'a> {
    Str(&'a str),
    Uint(u64),
    Int(i64),
    Float(f64),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionsFilterItem {
    pub field: String,
    pub op: String,
    pub value: Value,
}

impl TransactionsFilterItem {
    pub fn new(field: impl Into<String>, op: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: op.into(),
            value: value.into(),
        }
    }

    pub fn op(&self) -> Result<FilterOp, FilterError> {
        self.op.parse()
    }

    pub fn operand(&self) -> Result<FilterValue<'_>, FilterError> {
        match &self.value {
            Value::String(s) => Ok(FilterValue::Str(s)),
            Value::Number(n) => {
                if let Some(v) = n.as_u64() {
                    Ok(FilterValue::Uint(v))
                } else if let Some(v) = n.as_i64() {
                    Ok(FilterValue::Int(v))
                } else if let Some(v) = n.as_f64() {
                    Ok(FilterValue::Float(v))
                } else {
                    Err(self.unsupported())
                }
            }
            _ => Err(self.unsupported()),
        }
    }

    fn unsupported(&self) -> FilterError {
        FilterError::UnsupportedValue {
            field: self.field.clone(),
            value: self.value.to_string(),
        }
    }
}

/// TransactionsFilter is an ordered list of conditions that are ANDed together.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionsFilter(pub Vec<TransactionsFilterItem>);

impl TransactionsFilter {
    pub fn parse(json: &str) -> Result<Self, FilterError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Appends the `tx.height > last_height` condition.
    pub fn with_height_floor(mut self, last_height: u64) -> Self {
        self.0.push(TransactionsFilterItem::new(TX_HEIGHT_FIELD, "gt", last_height));
        self
    }

    pub fn items(&self) -> &[TransactionsFilterItem] {
        &self.0
    }
}
