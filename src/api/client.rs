use crate::api::models::{RawRecord, RpcRequest, RpcResponse};
use crate::error::RpcError;
use crate::utils::{jsonrpc_endpoint, snippet};
use log::{debug, info};
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Thin JSON-RPC transport bound to one Odoo instance.
pub struct RpcClient {
    http: HttpClient,
    endpoint: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let endpoint = jsonrpc_endpoint(base_url);
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport { url: endpoint.clone(), reason: e.to_string() })?;
        Ok(Self { http, endpoint, next_id: AtomicU64::new(1) })
    }

    /// Posts one `call` envelope and unwraps its `result`.
    pub async fn call(&self, service: &str, method: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest::call(id, service, method, args);
        debug!("event=rpc_call module=api status=start service={service} method={method} id={id}");

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport(e.to_string()))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.transport(e.to_string()))?;

        if !status.is_success() {
            // Odoo sometimes reports faults with an error status; prefer the fault.
            if let Ok(RpcResponse { error: Some(fault), .. }) = serde_json::from_str::<RpcResponse>(&text) {
                return Err(RpcError::Remote { message: fault.message, data: fault.data });
            }
            return Err(self.transport(format!(
                "status {} {}. response: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Error"),
                snippet(&text)
            )));
        }

        let envelope: RpcResponse = serde_json::from_str(&text).map_err(|e| RpcError::Malformed {
            url: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if let Some(fault) = envelope.error {
            return Err(RpcError::Remote { message: fault.message, data: fault.data });
        }
        Ok(envelope.result)
    }

    fn transport(&self, reason: String) -> RpcError {
        RpcError::Transport { url: self.endpoint.clone(), reason }
    }

    fn malformed(&self, reason: impl Into<String>) -> RpcError {
        RpcError::Malformed { url: self.endpoint.clone(), reason: reason.into() }
    }
}

/// An authenticated uid, reused for every object call of one run.
pub struct Session {
    client: RpcClient,
    database: String,
    uid: i64,
    password: String,
}

impl Session {
    /// Exchanges credentials for a uid via `common.login`.
    pub async fn connect(
        client: RpcClient,
        database: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, RpcError> {
        let result = client
            .call("common", "login", vec![json!(database), json!(username), json!(password)])
            .await
            .map_err(|err| match err {
                RpcError::Remote { message, data } => {
                    let data = data.map(|d| d.to_string()).unwrap_or_else(|| "null".to_string());
                    RpcError::Auth(format!("{message} data: {data}"))
                }
                other => other,
            });

        let result = match result {
            Ok(value) => value,
            Err(err) => {
                debug!("event=rpc_login module=api status=error db={database} error={err}");
                return Err(err);
            }
        };

        match result.as_i64() {
            Some(uid) if uid > 0 => {
                info!("event=rpc_login module=api status=ok db={database} uid={uid}");
                Ok(Self {
                    client,
                    database: database.to_string(),
                    uid,
                    password: password.to_string(),
                })
            }
            _ => {
                let err = RpcError::Auth(format!("server returned uid {result}"));
                debug!("event=rpc_login module=api status=error db={database} error={err}");
                Err(err)
            }
        }
    }

    pub fn uid(&self) -> i64 {
        self.uid
    }

    /// `object.execute_kw(db, uid, password, model, operation, args, kwargs)`.
    pub async fn execute_kw(
        &self,
        model: &str,
        operation: &str,
        args: Vec<Value>,
        kwargs: Value,
    ) -> Result<Value, RpcError> {
        let call_args = vec![
            json!(self.database),
            json!(self.uid),
            json!(self.password),
            json!(model),
            json!(operation),
            Value::Array(args),
            kwargs,
        ];
        self.client.call("object", "execute_kw", call_args).await
    }

    pub async fn search(&self, model: &str, domain: &[Value]) -> Result<Vec<i64>, RpcError> {
        let result = self
            .execute_kw(model, "search", vec![Value::Array(domain.to_vec())], json!({}))
            .await?;
        let items = result
            .as_array()
            .ok_or_else(|| self.client.malformed(format!("search returned {}", type_name(&result))))?;
        items
            .iter()
            .map(|v| v.as_i64().ok_or_else(|| self.client.malformed(format!("search id {v} is not an integer"))))
            .collect()
    }

    pub async fn read(&self, model: &str, ids: &[i64], fields: &[&str]) -> Result<Vec<RawRecord>, RpcError> {
        let result = self
            .execute_kw(model, "read", vec![json!(ids)], json!({ "fields": fields }))
            .await?;
        let Value::Array(items) = result else {
            return Err(self.client.malformed(format!("read returned {}", type_name(&result))));
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                other => Err(self.client.malformed(format!("read item is {}", type_name(&other)))),
            })
            .collect()
    }

    /// One `search` then one batched `read` of `fields`, regardless of record count.
    pub async fn fetch_all(
        &self,
        model: &str,
        domain: &[Value],
        fields: &[&str],
    ) -> Result<Vec<RawRecord>, RpcError> {
        let ids = self.search(model, domain).await?;
        if ids.is_empty() {
            info!("event=rpc_fetch module=api status=ok model={model} count=0");
            return Ok(Vec::new());
        }
        let records = self.read(model, &ids, fields).await?;
        info!("event=rpc_fetch module=api status=ok model={model} count={}", records.len());
        Ok(records)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
