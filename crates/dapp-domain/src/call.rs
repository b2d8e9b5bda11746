use std::{fmt, str::FromStr};

use alloy::primitives::{Address, Bytes, hex};
use serde::{Deserialize, Serialize};

/// Gas assumed for a call that does not declare its own requirement.
pub const DEFAULT_GAS_REQUIRED: u64 = 1_000_000;

const KEY_SEPARATOR: char = '-';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCallError {
    #[error("Invalid call key '{key}': expected '<address>-<calldata>[-<gas>]'")]
    Shape { key: String },

    #[error("Invalid call target '{target}'")]
    Target { target: String },

    #[error("Invalid call data '{call_data}'")]
    CallData { call_data: String },

    #[error("Invalid gas requirement '{gas}'")]
    GasRequired { gas: String },
}

/// A read-only contract call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Call {
    pub target: Address,
    pub call_data: Bytes,
    pub gas_required: Option<u64>,
}

impl Call {
    pub fn new(target: Address, call_data: impl Into<Bytes>) -> Self {
        Self {
            target,
            call_data: call_data.into(),
            gas_required: None,
        }
    }

    pub fn with_gas_required(mut self, gas_required: u64) -> Self {
        self.gas_required = Some(gas_required);
        self
    }

    /// Build a call from untyped parts, validating the target and calldata.
    pub fn from_parts(
        target: &str,
        call_data: &str,
        gas_required: Option<u64>,
    ) -> Result<Self, InvalidCallError> {
        Ok(Self {
            target: parse_target(target)?,
            call_data: parse_call_data(call_data)?,
            gas_required,
        })
    }

    pub fn key(&self) -> CallKey {
        CallKey::from(self)
    }

    /// Gas budget this call consumes inside a batch.
    pub fn gas_budget(&self) -> u64 {
        self.gas_required.unwrap_or(DEFAULT_GAS_REQUIRED)
    }
}

impl TryFrom<&CallKey> for Call {
    type Error = InvalidCallError;

    fn try_from(key: &CallKey) -> Result<Self, Self::Error> {
        key.to_call()
    }
}

impl FromStr for Call {
    type Err = InvalidCallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(KEY_SEPARATOR);
        let (Some(target), Some(call_data)) = (parts.next(), parts.next()) else {
            return Err(InvalidCallError::Shape { key: s.to_string() });
        };
        let gas = parts.next();
        if parts.next().is_some() {
            return Err(InvalidCallError::Shape { key: s.to_string() });
        }

        let gas_required = gas.map(parse_gas).transpose()?;
        Self::from_parts(target, call_data, gas_required)
    }
}

/// Canonical identity of a [`Call`].
///
/// Format: `<target>-<calldata>[-<gas>]`, target and calldata as lowercase
/// `0x`-prefixed hex, gas as a decimal integer. Two calls share a key exactly
/// when they are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CallKey(String);

impl CallKey {
    /// Validate a key string and return it in canonical form.
    pub fn parse(key: &str) -> Result<Self, InvalidCallError> {
        key.parse::<Call>().map(|call| Self::from(&call))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_call(&self) -> Result<Call, InvalidCallError> {
        self.0.parse()
    }
}

impl From<&Call> for CallKey {
    fn from(call: &Call) -> Self {
        let mut key = format!(
            "{}{KEY_SEPARATOR}{}",
            hex::encode_prefixed(call.target),
            hex::encode_prefixed(&call.call_data)
        );
        if let Some(gas) = call.gas_required {
            key.push(KEY_SEPARATOR);
            key.push_str(&gas.to_string());
        }
        Self(key)
    }
}

impl TryFrom<String> for CallKey {
    type Error = InvalidCallError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CallKey> for String {
    fn from(key: CallKey) -> Self {
        key.0
    }
}

impl fmt::Display for CallKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn strip_hex_prefix(value: &str) -> Option<&str> {
    value
        .strip_prefix("0x")
        .filter(|digits| digits.bytes().all(|b| b.is_ascii_hexdigit()))
}

fn parse_target(target: &str) -> Result<Address, InvalidCallError> {
    let invalid = || InvalidCallError::Target {
        target: target.to_string(),
    };
    let digits = strip_hex_prefix(target).ok_or_else(invalid)?;
    if digits.len() != 40 {
        return Err(invalid());
    }
    digits.parse().map_err(|_| invalid())
}

fn parse_call_data(call_data: &str) -> Result<Bytes, InvalidCallError> {
    let invalid = || InvalidCallError::CallData {
        call_data: call_data.to_string(),
    };
    let digits = strip_hex_prefix(call_data).ok_or_else(invalid)?;
    hex::decode(digits).map(Bytes::from).map_err(|_| invalid())
}

fn parse_gas(gas: &str) -> Result<u64, InvalidCallError> {
    if gas.is_empty() || !gas.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InvalidCallError::GasRequired {
            gas: gas.to_string(),
        });
    }
    gas.parse().map_err(|_| InvalidCallError::GasRequired {
        gas: gas.to_string(),
    })
}
