use std::sync::atomic::{AtomicU64, Ordering};

use ethroot_common::utils::decode_hex;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::{
    rpc_types::{RpcRequest, RpcRequestId, RpcResponse},
    types::block_identifier::BlockIdentifier,
};
use errors::{EthClientError, RpcRequestError};

pub mod errors;

static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
pub struct EthClient {
    client: Client,
    pub urls: Vec<Url>,
}

impl EthClient {
    pub fn new(url: &str) -> Result<EthClient, EthClientError> {
        Self::new_with_multiple_urls(vec![url.to_string()])
    }

    pub fn new_with_multiple_urls(urls: Vec<String>) -> Result<EthClient, EthClientError> {
        let urls = urls
            .iter()
            .map(|url| {
                Url::parse(url)
                    .map_err(|_| EthClientError::ParseUrlError(format!("Failed to parse url {url}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            client: Client::new(),
            urls,
        })
    }

    /// Send a request to the RPC. Tries each URL until one succeeds.
    pub async fn send_request(&self, request: RpcRequest) -> Result<RpcResponse, EthClientError> {
        let mut response = Err(EthClientError::FailedAllRPC);

        for url in self.urls.iter() {
            response = self.send_request_to_url(url, &request).await;
            // Not every node serves the debug namespace, so an error response moves on to the next url
            match &response {
                Ok(RpcResponse::Success(_)) => {
                    debug!(endpoint = %url, method = %request.method, "RPC request successful");
                    return response;
                }
                Ok(RpcResponse::Error(err)) => {
                    debug!(endpoint = %url, error = ?err.error, "RPC server returned an error");
                }
                Err(error) => {
                    warn!(endpoint = %url, %error, "Could not request RPC server");
                }
            }
        }

        response
    }

    async fn send_request_to_url(
        &self,
        rpc_url: &Url,
        request: &RpcRequest,
    ) -> Result<RpcResponse, EthClientError> {
        trace!(endpoint = %rpc_url, ?request, "Sending RPC request");

        self.client
            .post(rpc_url.as_str())
            .header("content-type", "application/json")
            .body(serde_json::ser::to_string(&request).map_err(|error| {
                EthClientError::FailedToSerializeRequestBody(format!("{error}: {request:?}"))
            })?)
            .send()
            .await?
            .json::<RpcResponse>()
            .await
            .inspect_err(|err| trace!(endpoint = %rpc_url, %err, "Failed to deserialize response"))
            .map_err(EthClientError::from)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, EthClientError> {
        let request = RpcRequest::new(
            RpcRequestId::Number(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed)),
            method,
            Some(params),
        );
        let response = self.send_request(request).await?;
        Ok(parse_response(method, response)?)
    }

    /// RLP encoded header, as returned by `debug_getRawHeader`
    pub async fn get_raw_header(&self, block: BlockIdentifier) -> Result<Vec<u8>, EthClientError> {
        const METHOD: &str = "debug_getRawHeader";
        let encoded: String = self.request(METHOD, vec![block.into()]).await?;
        Ok(decode_hex_result(METHOD, &encoded)?)
    }

    /// RLP encoded block, as returned by `debug_getRawBlock`
    pub async fn get_raw_block(&self, block: BlockIdentifier) -> Result<Vec<u8>, EthClientError> {
        const METHOD: &str = "debug_getRawBlock";
        let encoded: String = self.request(METHOD, vec![block.into()]).await?;
        Ok(decode_hex_result(METHOD, &encoded)?)
    }

    /// Consensus encoded receipts of a block, as returned by `debug_getRawReceipts`
    pub async fn get_raw_receipts(
        &self,
        block: BlockIdentifier,
    ) -> Result<Vec<Vec<u8>>, EthClientError> {
        const METHOD: &str = "debug_getRawReceipts";
        let encoded: Vec<String> = self.request(METHOD, vec![block.into()]).await?;
        encoded
            .iter()
            .map(|receipt| decode_hex_result(METHOD, receipt).map_err(EthClientError::from))
            .collect()
    }
}

fn parse_response<T: DeserializeOwned>(
    method: &str,
    response: RpcResponse,
) -> Result<T, RpcRequestError> {
    match response {
        RpcResponse::Success(result) => {
            serde_json::from_value(result.result).map_err(|source| {
                RpcRequestError::SerdeJSONError {
                    method: method.to_string(),
                    source,
                }
            })
        }
        RpcResponse::Error(error_response) => Err(RpcRequestError::RPCError {
            method: method.to_string(),
            message: error_response.error.message,
            data: error_response.error.data,
        }),
    }
}

fn decode_hex_result(method: &str, encoded: &str) -> Result<Vec<u8>, RpcRequestError> {
    decode_hex(encoded).map_err(|source| RpcRequestError::HexError {
        method: method.to_string(),
        source,
    })
}
