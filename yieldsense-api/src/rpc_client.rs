//! Lightweight Solana RPC client
//!
//! Implements only the read methods the services need, on top of a blocking
//! `ureq` agent driven from `spawn_blocking`. This avoids the dependency chain
//! of `solana-client`.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::{account::Account, hash::Hash, pubkey::Pubkey};
use tracing::debug;

use crate::config::RpcConfig;
use crate::core::{ChainReader, LatestBlockhash, NetworkError, ServiceResult};

/// Lightweight RPC client for Solana
pub struct LightRpcClient {
    url: String,
    commitment: String,
    agent: ureq::Agent,
}

/// RPC response wrapper
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// `{ context, value }` envelope used by most account methods
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

/// Account data response from RPC
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    lamports: u64,
    data: (String, String), // (data, encoding)
    owner: String,
    executable: bool,
    rent_epoch: u64,
}

#[derive(Debug, Deserialize)]
struct KeyedAccount {
    pubkey: String,
    account: AccountInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashInfo {
    blockhash: String,
    last_valid_block_height: u64,
}

fn malformed(message: impl Into<String>) -> NetworkError {
    NetworkError::MalformedResponse(message.into())
}

fn parse_response<T>(body: &str) -> Result<T, NetworkError>
where
    T: for<'de> Deserialize<'de>,
{
    let response: RpcResponse<T> =
        serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(NetworkError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    response
        .result
        .ok_or_else(|| malformed("No result in RPC response"))
}

fn decode_account(info: AccountInfo) -> Result<Account, NetworkError> {
    let (encoded, encoding) = info.data;
    if encoding != "base64" {
        return Err(malformed(format!("Unsupported data encoding: {}", encoding)));
    }

    let data = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| malformed(format!("Failed to decode account data: {}", e)))?;
    let owner = info
        .owner
        .parse()
        .map_err(|e| malformed(format!("Failed to parse owner: {}", e)))?;

    Ok(Account {
        lamports: info.lamports,
        data,
        owner,
        executable: info.executable,
        rent_epoch: info.rent_epoch,
    })
}

impl LightRpcClient {
    pub fn new(config: &RpcConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout())
            .timeout_read(config.read_timeout())
            .build();

        Self {
            url: config.url.clone(),
            commitment: config.commitment.clone(),
            agent,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn account_options(&self) -> Value {
        json!({
            "encoding": "base64",
            "commitment": self.commitment,
        })
    }

    /// Make a JSON-RPC call
    async fn call<T>(&self, method: &str, params: Value) -> Result<T, NetworkError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        debug!("RPC call: {}", method);

        // ureq is blocking
        let response_body = tokio::task::spawn_blocking({
            let agent = self.agent.clone();
            let url = self.url.clone();
            let body = request_body.to_string();

            move || -> Result<String, NetworkError> {
                let response = agent
                    .post(&url)
                    .set("Content-Type", "application/json")
                    .send_string(&body)
                    .map_err(|e| NetworkError::Transport(e.to_string()))?;
                response
                    .into_string()
                    .map_err(|e| NetworkError::Transport(e.to_string()))
            }
        })
        .await
        .map_err(|e| NetworkError::Transport(format!("RPC task failed: {}", e)))??;

        parse_response(&response_body)
    }
}

#[async_trait]
impl ChainReader for LightRpcClient {
    async fn get_account(&self, address: &Pubkey) -> ServiceResult<Option<Account>> {
        let params = json!([address.to_string(), self.account_options()]);
        let response: WithContext<Option<AccountInfo>> = self.call("getAccountInfo", params).await?;
        Ok(response.value.map(decode_account).transpose()?)
    }

    async fn get_multiple_accounts(&self, addresses: &[Pubkey]) -> ServiceResult<Vec<Option<Account>>> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = addresses.iter().map(|a| a.to_string()).collect();
        let params = json!([keys, self.account_options()]);
        let response: WithContext<Vec<Option<AccountInfo>>> =
            self.call("getMultipleAccounts", params).await?;

        if response.value.len() != addresses.len() {
            return Err(malformed(format!(
                "Requested {} accounts, received {}",
                addresses.len(),
                response.value.len()
            ))
            .into());
        }

        Ok(response
            .value
            .into_iter()
            .map(|info| info.map(decode_account).transpose())
            .collect::<Result<_, _>>()?)
    }

    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        token_program: &Pubkey,
    ) -> ServiceResult<Vec<(Pubkey, Account)>> {
        let params = json!([
            owner.to_string(),
            { "programId": token_program.to_string() },
            self.account_options()
        ]);
        let response: WithContext<Vec<KeyedAccount>> =
            self.call("getTokenAccountsByOwner", params).await?;

        let mut accounts = Vec::with_capacity(response.value.len());
        for keyed in response.value {
            let pubkey = keyed
                .pubkey
                .parse()
                .map_err(|e| malformed(format!("Failed to parse pubkey: {}", e)))?;
            accounts.push((pubkey, decode_account(keyed.account)?));
        }
        Ok(accounts)
    }

    async fn get_latest_blockhash(&self) -> ServiceResult<LatestBlockhash> {
        let params = json!([{ "commitment": self.commitment }]);
        let response: WithContext<BlockhashInfo> = self.call("getLatestBlockhash", params).await?;

        let blockhash: Hash = response
            .value
            .blockhash
            .parse()
            .map_err(|e| malformed(format!("Failed to parse blockhash: {}", e)))?;

        Ok(LatestBlockhash {
            blockhash,
            last_valid_block_height: response.value.last_valid_block_height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_client_creation() {
        let client = LightRpcClient::new(&RpcConfig::default());
        assert_eq!(client.url(), RpcConfig::default().url);
    }

    #[test]
    fn test_rpc_error_is_surfaced() {
        let body = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"Invalid param"}}"#;
        let err = parse_response::<Value>(body).unwrap_err();
        assert!(matches!(err, NetworkError::Rpc { code: -32602, .. }));
    }

    #[test]
    fn test_missing_account_is_none() {
        let body = r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":1},"value":null}}"#;
        let response: WithContext<Option<AccountInfo>> = parse_response(body).unwrap();
        assert!(response.value.is_none());
    }

    #[test]
    fn test_account_decoding() {
        let owner = Pubkey::new_unique();
        let body = format!(
            r#"{{"jsonrpc":"2.0","id":1,"result":{{"context":{{"slot":1}},"value":[{{"lamports":5,"data":["AQID","base64"],"owner":"{}","executable":false,"rentEpoch":18446744073709551615,"space":3}},null]}}}}"#,
            owner
        );
        let response: WithContext<Vec<Option<AccountInfo>>> = parse_response(&body).unwrap();
        let mut values = response.value.into_iter();
        let account = decode_account(values.next().unwrap().unwrap()).unwrap();
        assert_eq!(account.data, vec![1, 2, 3]);
        assert_eq!(account.owner, owner);
        assert!(values.next().unwrap().is_none());
    }

    #[test]
    fn test_blockhash_parsing() {
        let hash = Hash::new_unique();
        let body = format!(
            r#"{{"jsonrpc":"2.0","id":1,"result":{{"context":{{"slot":1}},"value":{{"blockhash":"{}","lastValidBlockHeight":300}}}}}}"#,
            hash
        );
        let response: WithContext<BlockhashInfo> = parse_response(&body).unwrap();
        assert_eq!(response.value.blockhash, hash.to_string());
        assert_eq!(response.value.last_valid_block_height, 300);
    }

    #[test]
    fn test_rejects_other_encodings() {
        let info = AccountInfo {
            lamports: 0,
            data: ("{}".into(), "jsonParsed".into()),
            owner: Pubkey::new_unique().to_string(),
            executable: false,
            rent_epoch: 0,
        };
        assert!(decode_account(info).is_err());
    }
}
