//! Move addresses, object ids and BCS-encoded call arguments.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const ADDRESS_LENGTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveTypeError {
    #[error("invalid hex in {0:?}")]
    InvalidHex(String),

    #[error("address {0:?} is longer than {ADDRESS_LENGTH} bytes")]
    AddressTooLong(String),

    #[error("object id {0:?} is not a whole number of addresses")]
    MisalignedObjectId(String),

    #[error("BCS encoding failed: {0}")]
    Encode(String),
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

// ---------------------------------------------------------------------------
// AccountAddress
// ---------------------------------------------------------------------------

/// A 32-byte Move account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountAddress([u8; ADDRESS_LENGTH]);

impl AccountAddress {
    pub const ZERO: AccountAddress = AccountAddress([0; ADDRESS_LENGTH]);

    pub fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Full-width `0x` hex form.
    pub fn to_hex_literal(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for AccountAddress {
    type Err = MoveTypeError;

    /// Parses `0x1`, `0x0000…01` or bare hex; short forms are left-padded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = strip_hex_prefix(s.trim());
        if digits.len() > ADDRESS_LENGTH * 2 {
            return Err(MoveTypeError::AddressTooLong(s.to_string()));
        }
        let padded = format!("{digits:0>width$}", width = ADDRESS_LENGTH * 2);
        let mut bytes = [0u8; ADDRESS_LENGTH];
        hex::decode_to_slice(&padded, &mut bytes)
            .map_err(|_| MoveTypeError::InvalidHex(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_literal())
    }
}

// ---------------------------------------------------------------------------
// ObjectId
// ---------------------------------------------------------------------------

/// Object id: a path of addresses, rendered as their concatenated hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(Vec<AccountAddress>);

impl ObjectId {
    pub fn new(path: Vec<AccountAddress>) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &[AccountAddress] {
        &self.0
    }
}

impl FromStr for ObjectId {
    type Err = MoveTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = strip_hex_prefix(s.trim());
        if digits.is_empty() {
            return Ok(Self(Vec::new()));
        }
        // A single short id (`0x5`) is one left-padded address.
        if digits.len() < ADDRESS_LENGTH * 2 {
            return Ok(Self(vec![digits.parse()?]));
        }
        if digits.len() % (ADDRESS_LENGTH * 2) != 0 {
            return Err(MoveTypeError::MisalignedObjectId(s.to_string()));
        }
        let bytes = hex::decode(digits).map_err(|_| MoveTypeError::InvalidHex(s.to_string()))?;
        let path = bytes
            .chunks_exact(ADDRESS_LENGTH)
            .map(|chunk| {
                let mut addr = [0u8; ADDRESS_LENGTH];
                addr.copy_from_slice(chunk);
                AccountAddress(addr)
            })
            .collect();
        Ok(Self(path))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for addr in &self.0 {
            f.write_str(&hex::encode(addr.0))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Call arguments
// ---------------------------------------------------------------------------

/// A typed argument to a Move function call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveArg {
    Address(AccountAddress),
    ObjectId(ObjectId),
    ObjectIds(Vec<ObjectId>),
    U64(u64),
    U128(u128),
    Bool(bool),
    String(String),
}

impl MoveArg {
    /// BCS bytes of the argument.
    pub fn encode(&self) -> Result<Vec<u8>, MoveTypeError> {
        let encoded = match self {
            MoveArg::Address(addr) => bcs::to_bytes(addr),
            MoveArg::ObjectId(id) => bcs::to_bytes(id),
            MoveArg::ObjectIds(ids) => bcs::to_bytes(ids),
            MoveArg::U64(v) => bcs::to_bytes(v),
            MoveArg::U128(v) => bcs::to_bytes(v),
            MoveArg::Bool(v) => bcs::to_bytes(v),
            MoveArg::String(v) => bcs::to_bytes(v),
        };
        encoded.map_err(|e| MoveTypeError::Encode(e.to_string()))
    }

    /// `0x`-prefixed hex of the BCS bytes, as the RPC expects.
    pub fn to_hex(&self) -> Result<String, MoveTypeError> {
        Ok(format!("0x{}", hex::encode(self.encode()?)))
    }
}

/// A view-function invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    /// `address::module::function`
    pub function_id: String,
    pub ty_args: Vec<String>,
    pub args: Vec<MoveArg>,
}

/// Wire form of [`FunctionCall`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionCallView {
    pub function_id: String,
    pub ty_args: Vec<String>,
    pub args: Vec<String>,
}

impl FunctionCall {
    pub fn new(function_id: impl Into<String>, args: Vec<MoveArg>) -> Self {
        Self {
            function_id: function_id.into(),
            ty_args: Vec::new(),
            args,
        }
    }

    pub fn to_view(&self) -> Result<FunctionCallView, MoveTypeError> {
        Ok(FunctionCallView {
            function_id: self.function_id.clone(),
            ty_args: self.ty_args.clone(),
            args: self
                .args
                .iter()
                .map(MoveArg::to_hex)
                .collect::<Result<_, _>>()?,
        })
    }
}
