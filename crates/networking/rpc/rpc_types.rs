use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcRequestId {
    Number(u64),
    String(String),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcRequest {
    pub id: RpcRequestId,
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Vec<Value>>,
}

impl RpcRequest {
    pub fn new(id: RpcRequestId, method: &str, params: Option<Vec<Value>>) -> Self {
        RpcRequest {
            id,
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcErrorMetadata {
    pub code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RpcSuccessResponse {
    pub id: RpcRequestId,
    pub jsonrpc: String,
    pub result: Value,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RpcErrorResponse {
    pub id: RpcRequestId,
    pub jsonrpc: String,
    pub error: RpcErrorMetadata,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum RpcResponse {
    Success(RpcSuccessResponse),
    Error(RpcErrorResponse),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serialization() {
        let request = RpcRequest::new(
            RpcRequestId::Number(7),
            "debug_getRawHeader",
            Some(vec![json!("0x10")]),
        );
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"id": 7, "jsonrpc": "2.0", "method": "debug_getRawHeader", "params": ["0x10"]})
        );
    }

    #[test]
    fn response_variants() {
        let success: RpcResponse =
            serde_json::from_str(r#"{"id":1,"jsonrpc":"2.0","result":"0xc0"}"#).unwrap();
        assert!(matches!(success, RpcResponse::Success(ref s) if s.result == json!("0xc0")));

        let error: RpcResponse = serde_json::from_str(
            r#"{"id":"a","jsonrpc":"2.0","error":{"code":-32601,"message":"the method debug_getRawHeader does not exist/is not available"}}"#,
        )
        .unwrap();
        let RpcResponse::Error(error) = error else {
            panic!("expected an error response");
        };
        assert_eq!(error.id, RpcRequestId::String("a".to_string()));
        assert_eq!(error.error.code, -32601);
        assert_eq!(error.error.data, None);
    }
}
