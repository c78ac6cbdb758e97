//! Core Lightning client over the `lightning-rpc` unix socket.
//!
//! Every call opens a fresh connection, writes one JSON-RPC 2.0 request and
//! reads until a complete JSON value has arrived.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use circular_core::{ListedChannel, ListedNode, ListedPeer, Msat, NodeId, NodeInfo, ShortChannelId};
use circular_rebalance::{ClientError, LightningClient, PaymentSecret, Preimage};
use circular_routing::Route;

/// `waitsendpay` error code for "timed out before the payment resolved".
pub const WAITSENDPAY_TIMEOUT: i64 = 2000;

/// Extra time granted on top of `waitsendpay`'s own timeout before the
/// socket read is abandoned.
const TIMEOUT_GRACE: Duration = Duration::from_secs(5);

pub struct ClnRpcClient {
    socket_path: PathBuf,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    #[serde(default)]
    message: String,
}

impl ClnRpcClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Issue one JSON-RPC call and decode its `result`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let bytes = serde_json::to_vec(&request).map_err(|e| ClientError::Decode(e.to_string()))?;

        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(transport)?;
        stream.write_all(&bytes).await.map_err(transport)?;

        let mut buf = Vec::with_capacity(8 * 1024);
        let mut chunk = vec![0u8; 8 * 1024];
        let response: RpcResponse = loop {
            let n = stream.read(&mut chunk).await.map_err(transport)?;
            if n == 0 {
                return Err(ClientError::Transport(format!(
                    "{method}: connection closed before a complete response"
                )));
            }
            buf.extend_from_slice(&chunk[..n]);
            match serde_json::from_slice(&buf) {
                Ok(response) => break response,
                Err(e) if e.is_eof() => continue,
                Err(e) => return Err(ClientError::Decode(format!("{method}: {e}"))),
            }
        };

        if let Some(error) = response.error {
            tracing::debug!(method, code = error.code, message = %error.message, "rpc error");
            return Err(ClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        let result = response.result.unwrap_or(Value::Null);
        serde_json::from_value(result).map_err(|e| ClientError::Decode(format!("{method}: {e}")))
    }

    /// Create an invoice to ourselves that settles with `secret`'s preimage.
    /// Returns the invoice's payment secret, which `sendpay` has to echo.
    pub async fn invoice(&self, amount: Msat, secret: &PaymentSecret) -> Result<String, ClientError> {
        #[derive(Deserialize)]
        struct InvoiceResult {
            payment_hash: String,
            payment_secret: String,
        }

        let label = format!("circular-{}", uuid::Uuid::now_v7());
        let result: InvoiceResult = self
            .call(
                "invoice",
                json!({
                    "amount_msat": amount,
                    "label": label,
                    "description": "circular rebalance",
                    "preimage": secret.preimage().to_hex(),
                }),
            )
            .await?;
        if result.payment_hash != secret.payment_hash_hex() {
            return Err(ClientError::Decode(format!(
                "invoice {label} carries payment hash {}",
                result.payment_hash
            )));
        }
        Ok(result.payment_secret)
    }

    pub async fn sendpay(
        &self,
        route: &Route,
        secret: &PaymentSecret,
        payment_secret: &str,
    ) -> Result<(), ClientError> {
        let _: Value = self
            .call(
                "sendpay",
                json!({
                    "route": route_to_json(route),
                    "payment_hash": secret.payment_hash_hex(),
                    "payment_secret": payment_secret,
                    "amount_msat": route.amount,
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn waitsendpay(
        &self,
        secret: &PaymentSecret,
        timeout: Duration,
    ) -> Result<Preimage, ClientError> {
        #[derive(Deserialize)]
        struct WaitResult {
            payment_preimage: String,
        }

        let result: Result<WaitResult, ClientError> = self
            .call(
                "waitsendpay",
                json!({
                    "payment_hash": secret.payment_hash_hex(),
                    "timeout": timeout.as_secs(),
                }),
            )
            .await;
        match result {
            Ok(r) => Preimage::from_hex(&r.payment_preimage)
                .map_err(|e| ClientError::Decode(format!("waitsendpay preimage: {e}"))),
            Err(ClientError::Rpc { code, .. }) if code == WAITSENDPAY_TIMEOUT => {
                Err(ClientError::Timeout)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl LightningClient for ClnRpcClient {
    async fn get_info(&self) -> Result<NodeInfo, ClientError> {
        self.call("getinfo", json!({})).await
    }

    async fn list_channels(&self) -> Result<Vec<ListedChannel>, ClientError> {
        #[derive(Deserialize)]
        struct ListChannels {
            channels: Vec<ClnChannel>,
        }
        let list: ListChannels = self.call("listchannels", json!({})).await?;
        Ok(list.channels.into_iter().map(ListedChannel::from).collect())
    }

    async fn list_nodes(&self) -> Result<Vec<ListedNode>, ClientError> {
        #[derive(Deserialize)]
        struct ListNodes {
            nodes: Vec<ListedNode>,
        }
        let list: ListNodes = self.call("listnodes", json!({})).await?;
        Ok(list.nodes)
    }

    async fn list_peers(&self) -> Result<Vec<ListedPeer>, ClientError> {
        #[derive(Deserialize)]
        struct ListPeers {
            peers: Vec<ClnPeer>,
        }
        let list: ListPeers = self.call("listpeers", json!({})).await?;
        Ok(list.peers.into_iter().map(ListedPeer::from).collect())
    }

    async fn send_pay(
        &self,
        route: &Route,
        secret: &PaymentSecret,
        timeout: Duration,
    ) -> Result<Preimage, ClientError> {
        let payment_secret = self.invoice(route.amount, secret).await?;
        self.sendpay(route, secret, &payment_secret).await?;
        tokio::time::timeout(timeout + TIMEOUT_GRACE, self.waitsendpay(secret, timeout))
            .await
            .map_err(|_| ClientError::Timeout)?
    }
}

/// `sendpay` route: one entry per hop naming the node the hop pays into.
pub fn route_to_json(route: &Route) -> Value {
    Value::Array(
        route
            .hops()
            .iter()
            .map(|hop| {
                json!({
                    "id": hop.channel.destination,
                    "channel": hop.channel.short_channel_id,
                    "direction": hop.channel.direction().as_u8(),
                    "amount_msat": hop.amount,
                    "delay": hop.delay,
                    "style": "tlv",
                })
            })
            .collect(),
    )
}

fn transport(e: std::io::Error) -> ClientError {
    ClientError::Transport(e.to_string())
}

/// Channel record as `listchannels` reports it. Older releases give sizes in
/// `satoshis` and msat values as `"1000msat"` strings.
#[derive(Debug, Deserialize)]
struct ClnChannel {
    source: NodeId,
    destination: NodeId,
    short_channel_id: ShortChannelId,
    #[serde(default, deserialize_with = "opt_msat")]
    amount_msat: Option<Msat>,
    #[serde(default)]
    satoshis: Option<u64>,
    #[serde(default = "yes")]
    active: bool,
    #[serde(default)]
    last_update: u64,
    base_fee_millisatoshi: Msat,
    fee_per_millionth: u64,
    delay: u32,
    #[serde(default, deserialize_with = "opt_msat")]
    htlc_minimum_msat: Option<Msat>,
    #[serde(default, deserialize_with = "opt_msat")]
    htlc_maximum_msat: Option<Msat>,
}

impl From<ClnChannel> for ListedChannel {
    fn from(c: ClnChannel) -> Self {
        let satoshis = c
            .satoshis
            .or(c.amount_msat.map(|msat| msat / circular_core::MSAT_PER_SAT))
            .unwrap_or(0);
        ListedChannel {
            short_channel_id: c.short_channel_id,
            source: c.source,
            destination: c.destination,
            satoshis,
            base_fee_millisatoshi: c.base_fee_millisatoshi,
            fee_per_millionth: c.fee_per_millionth,
            htlc_minimum_msat: c.htlc_minimum_msat.unwrap_or(0),
            htlc_maximum_msat: c.htlc_maximum_msat,
            delay: c.delay,
            active: c.active,
            last_update: c.last_update,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClnPeer {
    id: NodeId,
    #[serde(default)]
    connected: bool,
    #[serde(default)]
    netaddr: Vec<String>,
    #[serde(default)]
    num_channels: Option<u32>,
    #[serde(default)]
    channels: Option<Vec<Value>>,
}

impl From<ClnPeer> for ListedPeer {
    fn from(p: ClnPeer) -> Self {
        let num_channels = p
            .num_channels
            .or(p.channels.map(|c| c.len() as u32))
            .unwrap_or(0);
        ListedPeer {
            id: p.id,
            connected: p.connected,
            num_channels,
            netaddr: p.netaddr,
        }
    }
}

fn yes() -> bool {
    true
}

fn opt_msat<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Msat>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s
            .strip_suffix("msat")
            .unwrap_or(&s)
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
