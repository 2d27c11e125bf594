use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A remote record exactly as Odoo returns it: field name to untyped value.
pub type RawRecord = Map<String, Value>;

/// JSON-RPC 2.0 request envelope posted to `/jsonrpc`.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: CallParams<'a>,
    pub id: u64,
}

#[derive(Debug, Serialize)]
pub struct CallParams<'a> {
    pub service: &'a str,
    pub method: &'a str,
    pub args: Vec<Value>,
}

impl<'a> RpcRequest<'a> {
    pub fn call(id: u64, service: &'a str, method: &'a str, args: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: "call",
            params: CallParams { service, method, args },
            id,
        }
    }
}

/// Response envelope. Exactly one of `result` / `error` is expected.
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    /// `Null` when absent.
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<RpcFault>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RpcFault {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Fields requested from `res.partner` on every read.
pub const PARTNER_FIELDS: &[&str] = &[
    "id",
    "name",
    "email",
    "phone",
    "street",
    "city",
    "zip",
    "country_id",
];
