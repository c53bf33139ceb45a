use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;
use log::{debug, info};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;

use super::{BackendKind, StorageBackend, abi};
use crate::biocode::Biocode;
use crate::config::LedgerOptions;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("JSON-RPC 错误 {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("交易 {0} 执行失败（状态 0x0）")]
    Reverted(String),
    #[error("无法解析节点响应: {0}")]
    Malformed(String),
    #[error("节点没有可用账户")]
    NoAccount,
    #[error("启用 ledger 后端时必须指定合约地址")]
    NoContract,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Receipt {
    transaction_hash: Option<String>,
    /// 拜占庭分叉之前的节点不返回状态
    status: Option<String>,
}

/// 最小的以太坊 JSON-RPC 客户端
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent("biobench/0.1").build()?;
        Ok(Self { client, url: url.into(), next_id: AtomicU64::new(1) })
    }

    /// 发送一次调用，`result` 为 `null` 时按 JSON `null` 反序列化
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        let response: RpcResponse =
            self.client.post(&self.url).json(&body).send().await?.error_for_status()?.json().await?;
        if let Some(e) = response.error {
            return Err(LedgerError::Rpc { code: e.code, message: e.message }.into());
        }
        let result = response.result.unwrap_or(Value::Null);
        serde_json::from_value(result)
            .map_err(|e| LedgerError::Malformed(format!("{}: {}", method, e)).into())
    }
}

/// 通过智能合约存储 biocode 的后端
///
/// 写入发送 `store(bytes)` 交易并等待回执，读取按内部计数器依次调用 `readAt(uint256)`。
/// 读取并不校验取回的是否为刚写入的记录。
pub struct LedgerBackend {
    rpc: RpcClient,
    contract: String,
    account: String,
    store_fn: String,
    read_fn: String,
    poll_interval: Duration,
    warmup: bool,
    read_index: u64,
}

impl LedgerBackend {
    pub async fn open(options: &LedgerOptions) -> Result<Self> {
        let contract = options.contract.clone().ok_or(LedgerError::NoContract)?;
        let rpc = RpcClient::new(&options.rpc_url)?;
        let account = match &options.account {
            Some(account) => account.clone(),
            None => {
                let accounts: Vec<String> = rpc.call("eth_accounts", json!([])).await?;
                accounts.into_iter().next().ok_or(LedgerError::NoAccount)?
            }
        };
        info!("ledger: 节点 {}，合约 {}，账户 {}", options.rpc_url, contract, account);
        Ok(Self {
            rpc,
            contract,
            account,
            store_fn: options.store_fn.clone(),
            read_fn: options.read_fn.clone(),
            poll_interval: options.poll_interval(),
            warmup: !options.no_warmup,
            read_index: 0,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// 下一次读取使用的索引
    pub fn read_index(&self) -> u64 {
        self.read_index
    }

    /// 写入一条不计时的预热记录
    pub async fn warmup(&mut self) -> Result<()> {
        if !self.warmup {
            return Ok(());
        }
        info!("ledger: 写入预热记录");
        self.insert("warmup", &Biocode::from_bits([0, 1, 0])).await
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<Receipt> {
        loop {
            let receipt: Option<Receipt> =
                self.rpc.call("eth_getTransactionReceipt", json!([tx_hash])).await?;
            match receipt {
                Some(receipt) => return Ok(receipt),
                None => tokio::time::sleep(self.poll_interval).await,
            }
        }
    }
}

impl StorageBackend for LedgerBackend {
    /// 合约返回的原始字节串
    type Match = Vec<u8>;

    fn kind(&self) -> BackendKind {
        BackendKind::Ledger
    }

    async fn reset(&mut self) -> Result<()> {
        self.read_index = 0;
        Ok(())
    }

    async fn insert(&mut self, image_path: &str, biocode: &Biocode) -> Result<()> {
        let data = abi::encode_bytes_call(&self.store_fn, &biocode.to_le_i64_bytes());
        let tx = json!({ "from": self.account, "to": self.contract, "data": abi::to_hex(&data) });
        let tx_hash: String = self.rpc.call("eth_sendTransaction", json!([tx])).await?;
        let receipt = self.wait_for_receipt(&tx_hash).await?;
        if receipt.status.as_deref() == Some("0x0") {
            return Err(LedgerError::Reverted(receipt.transaction_hash.unwrap_or(tx_hash)).into());
        }
        debug!("ledger: {} -> {}", image_path, tx_hash);
        Ok(())
    }

    async fn read(&mut self, _image_path: &str, _biocode: &Biocode) -> Result<Option<Vec<u8>>> {
        let data = abi::encode_uint_call(&self.read_fn, self.read_index);
        let call = json!({ "to": self.contract, "data": abi::to_hex(&data) });
        let output: String = self.rpc.call("eth_call", json!([call, "latest"])).await?;
        let bytes = abi::decode_bytes(&abi::from_hex(&output)?)
            .map_err(|e| LedgerError::Malformed(format!("eth_call: {}", e)))?;
        self.read_index += 1;
        Ok(Some(bytes))
    }

    async fn close(self) -> Result<()> {
        Ok(())
    }
}
