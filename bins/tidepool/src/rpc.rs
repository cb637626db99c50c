//! JSON-RPC client for a Bitcoin-Core-style node.
//!
//! Decodes the node's wire shapes (whole-BTC float fees, optional fields)
//! into the core's fixed-shape records. Fields the node does not report
//! default to zero.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use tidepool_core::block::{Block, TemplateTx};
use tidepool_core::constants::COIN;
use tidepool_core::error::NodeError;
use tidepool_core::mempool::{Mempool, MempoolEntry};
use tidepool_core::traits::NodeClient;

pub struct RpcClient {
    client: Client,
    endpoint: String,
    user: String,
    password: String,
}

impl RpcClient {
    pub fn new(endpoint: &str, user: &str, password: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("build reqwest client"),
            endpoint: endpoint.to_owned(),
            user: user.to_owned(),
            password: password.to_owned(),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, NodeError> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": "tidepool",
            "method": method,
            "params": params,
        });
        let resp: Value = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| NodeError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| NodeError::Transport(e.to_string()))?;

        if let Some(err) = resp.get("error") {
            if !err.is_null() {
                return Err(NodeError::Rpc(err.to_string()));
            }
        }
        serde_json::from_value(resp["result"].clone()).map_err(|e| NodeError::Decode(e.to_string()))
    }
}

/// Whole-BTC float amount to sats.
///
/// The node reports mempool fees as decimal BTC; rounding recovers the
/// exact sat figure for any representable fee.
fn btc_to_sats(btc: f64) -> u64 {
    (btc * COIN as f64).round() as u64
}

#[derive(Debug, Deserialize)]
struct RawFees {
    base: f64,
    #[serde(default)]
    ancestor: f64,
}

/// One verbose entry from `getrawmempool true`. Unmodelled fields
/// (descendant stats, timestamps, replaceability) are ignored.
#[derive(Debug, Deserialize)]
struct RawMempoolEntry {
    fees: RawFees,
    vsize: u64,
    weight: u64,
    #[serde(default)]
    sigops: u64,
    ancestorcount: u64,
    ancestorsize: u64,
    #[serde(default)]
    ancestorsigops: u64,
    depends: Vec<String>,
    spentby: Vec<String>,
}

impl RawMempoolEntry {
    fn into_entry(self) -> MempoolEntry {
        MempoolEntry {
            base_fee: btc_to_sats(self.fees.base),
            vsize: self.vsize,
            weight: self.weight,
            sigops_cost: self.sigops,
            ancestor_count: self.ancestorcount,
            ancestor_size: self.ancestorsize,
            ancestor_fees: btc_to_sats(self.fees.ancestor),
            ancestor_sigops: self.ancestorsigops,
            depends: self.depends.into_iter().collect(),
            spentby: self.spentby.into_iter().collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTemplateTx {
    txid: String,
    #[serde(default)]
    weight: u64,
    #[serde(default)]
    sigops: u64,
}

#[derive(Debug, Deserialize)]
struct RawTemplate {
    height: u64,
    version: i32,
    previousblockhash: String,
    coinbasevalue: u64,
    transactions: Vec<RawTemplateTx>,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    height: u64,
    version: i32,
    #[serde(default)]
    previousblockhash: String,
    weight: u64,
    size: u64,
}

#[derive(Debug, Deserialize)]
struct RawBlockStats {
    totalfee: u64,
}

#[async_trait]
impl NodeClient for RpcClient {
    async fn tip_height(&self) -> Result<u64, NodeError> {
        self.call("getblockcount", json!([])).await
    }

    async fn tip_hash(&self) -> Result<String, NodeError> {
        self.call("getbestblockhash", json!([])).await
    }

    async fn fetch_mempool(&self) -> Result<Mempool, NodeError> {
        let raw: HashMap<String, RawMempoolEntry> =
            self.call("getrawmempool", json!([true])).await?;
        Ok(raw.into_iter().map(|(txid, e)| (txid, e.into_entry())).collect())
    }

    async fn fetch_template(&self) -> Result<Block, NodeError> {
        let raw: RawTemplate = self
            .call("getblocktemplate", json!([{"rules": ["segwit"]}]))
            .await?;
        let candidates: Vec<TemplateTx> = raw
            .transactions
            .into_iter()
            .map(|t| TemplateTx { txid: t.txid, weight: t.weight, sigops: t.sigops })
            .collect();
        Ok(Block::from_template(
            raw.height,
            raw.version,
            raw.previousblockhash,
            raw.coinbasevalue,
            &candidates,
        ))
    }

    async fn fetch_block(&self, hash: &str) -> Result<Block, NodeError> {
        let raw: RawBlock = self.call("getblock", json!([hash])).await?;
        // The fee total is not part of getblock; callers fill it in from
        // fetch_block_fee.
        Ok(Block::mined(raw.height, raw.version, raw.previousblockhash, raw.weight, raw.size, 0))
    }

    async fn fetch_block_fee(&self, height: u64) -> Result<u64, NodeError> {
        let stats: RawBlockStats = self.call("getblockstats", json!([height])).await?;
        Ok(stats.totalfee)
    }
}
