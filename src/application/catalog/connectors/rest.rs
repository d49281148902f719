use super::{required_str, InvokeError, ToolInvoker};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy)]
pub enum RestOp {
    Get,
    Post,
    Put,
    Delete,
}

impl RestOp {
    fn method(self) -> Method {
        match self {
            RestOp::Get => Method::GET,
            RestOp::Post => Method::POST,
            RestOp::Put => Method::PUT,
            RestOp::Delete => Method::DELETE,
        }
    }
}

/// Generic REST call against an arbitrary URL the model supplies.
pub struct RestTool {
    op: RestOp,
    http: Client,
}

impl RestTool {
    pub fn new(op: RestOp, http: Client) -> Self {
        Self { op, http }
    }
}

#[async_trait]
impl ToolInvoker for RestTool {
    async fn invoke(&self, args: Value) -> Result<Value, InvokeError> {
        let url = required_str(&args, "url")?;
        let mut request = self.http.request(self.op.method(), url);

        if let Some(headers) = args.get("headers").and_then(Value::as_object) {
            for (name, value) in headers {
                if let Some(text) = value.as_str() {
                    request = request.header(name, text);
                }
            }
        }
        if let Some(body) = args.get("body") {
            if !body.is_null() {
                request = request.json(body);
            }
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers: Map<String, Value> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), Value::String(v.to_string())))
            })
            .collect();
        let text = response.text().await?;
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

        Ok(json!({
            "status": status,
            "headers": headers,
            "body": body,
        }))
    }
}
