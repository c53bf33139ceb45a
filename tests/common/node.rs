use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use biobench::backend::abi::{decode_bytes, encode_bytes, from_hex, selector, to_hex};
use biobench::config::LedgerOptions;
use serde_json::{Value, json};

pub const ACCOUNT: &str = "0x00000000000000000000000000000000000000a1";
pub const CONTRACT: &str = "0x00000000000000000000000000000000000000c0";

/// 内存中的假节点：交易在第一次查询回执时仍处于待定状态
#[derive(Default)]
pub struct FakeChain {
    pub stored: Vec<Vec<u8>>,
    pub pending: Vec<(String, bool)>,
    pub revert: bool,
    pub receipt_queries: usize,
    pub accounts_queries: usize,
}

fn rpc_error(id: &Value, code: i64, message: &str) -> Json<Value> {
    Json(json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } }))
}

async fn handle(State(chain): State<Arc<Mutex<FakeChain>>>, Json(req): Json<Value>) -> Json<Value> {
    let id = req["id"].clone();
    let params = &req["params"];
    let mut chain = chain.lock().unwrap();
    let result = match req["method"].as_str().unwrap_or_default() {
        "eth_accounts" => {
            chain.accounts_queries += 1;
            json!([ACCOUNT])
        }
        "eth_sendTransaction" => {
            let tx = &params[0];
            assert_eq!(tx["from"], ACCOUNT);
            assert_eq!(tx["to"], CONTRACT);
            let data = from_hex(tx["data"].as_str().unwrap()).unwrap();
            assert_eq!(&data[..4], &selector("store(bytes)"));
            let hash = format!("0x{:064x}", chain.pending.len() + 1);
            if !chain.revert {
                chain.stored.push(decode_bytes(&data[4..]).unwrap());
            }
            chain.pending.push((hash.clone(), false));
            json!(hash)
        }
        "eth_getTransactionReceipt" => {
            chain.receipt_queries += 1;
            let hash = params[0].as_str().unwrap().to_owned();
            let revert = chain.revert;
            match chain.pending.iter_mut().find(|(h, _)| *h == hash) {
                Some((_, mined)) if *mined => json!({
                    "transactionHash": hash,
                    "status": (if revert { "0x0" } else { "0x1" }),
                }),
                Some((_, mined)) => {
                    *mined = true;
                    Value::Null
                }
                None => return rpc_error(&id, -32000, "unknown transaction"),
            }
        }
        "eth_call" => {
            let data = from_hex(params[0]["data"].as_str().unwrap()).unwrap();
            assert_eq!(&data[..4], &selector("readAt(uint256)"));
            let index = u64::from_be_bytes(data[28..36].try_into().unwrap()) as usize;
            match chain.stored.get(index) {
                Some(bytes) => json!(to_hex(&encode_bytes(bytes))),
                None => return rpc_error(&id, 3, "execution reverted"),
            }
        }
        method => return rpc_error(&id, -32601, &format!("method {method} not found")),
    };
    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

pub async fn spawn_node() -> Result<(SocketAddr, Arc<Mutex<FakeChain>>)> {
    let chain = Arc::new(Mutex::new(FakeChain::default()));
    let app = Router::new().route("/", post(handle)).with_state(chain.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move { axum::serve(listener, app).await });
    Ok((addr, chain))
}

pub fn ledger_options(addr: SocketAddr) -> LedgerOptions {
    LedgerOptions {
        rpc_url: format!("http://{addr}"),
        contract: Some(CONTRACT.to_owned()),
        account: None,
        store_fn: "store(bytes)".to_owned(),
        read_fn: "readAt(uint256)".to_owned(),
        poll_interval: 5,
        no_warmup: false,
    }
}
