//! HTTP client for the assets service.

use std::time::Duration;

use bitcoin::{consensus, Transaction, Txid};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, ORIGIN},
    RequestBuilder, StatusCode,
};
use rgbpp_primitives::{
    bitcoin::BitcoinAddress,
    ledger_tx::VirtualTxResult,
    types::{Byte32, VirtualTransaction},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    errors::{ServiceError, ServiceResult},
    traits::AssetsService,
    types::{
        ApiUtxo, PaymasterInfo, RecommendedFees, RetryOutcome, ServiceJob, SpvProof, Utxo,
    },
};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings of [`AssetsApiClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetsApiConfig {
    /// Service root, without a trailing slash.
    pub base_url: String,

    /// Bearer token, if the deployment requires one.
    #[serde(default)]
    pub token: Option<String>,

    /// Value of the `Origin` header the token was issued for.
    #[serde(default)]
    pub origin: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl AssetsApiConfig {
    /// Creates a config without credentials.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            origin: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the `Origin` header.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Sets the request timeout.
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// How a 404 from an endpoint is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NotFound {
    /// The resource will appear once the service catches up.
    Pending,

    /// A plain error.
    Error,
}

/// [`AssetsService`] over the service's REST API.
#[derive(Debug, Clone)]
pub struct AssetsApiClient {
    config: AssetsApiConfig,
    http: reqwest::Client,
}

impl AssetsApiClient {
    /// Creates a client.
    pub fn new(config: AssetsApiConfig) -> ServiceResult<Self> {
        let http = reqwest::Client::builder()
            .default_headers(default_headers(&config)?)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, http })
    }

    /// The client settings.
    pub const fn config(&self) -> &AssetsApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        not_found: NotFound,
    ) -> ServiceResult<T> {
        debug!(%path, "service request");
        self.execute(self.http.get(self.url(path)).query(query), not_found)
            .await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ServiceResult<T> {
        debug!(%path, "service request");
        self.execute(self.http.post(self.url(path)).json(body), NotFound::Error)
            .await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        not_found: NotFound,
    ) -> ServiceResult<T> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = status_error(status, &body, not_found);
            if !err.is_retryable() {
                warn!(%status, %err, "service request failed");
            }

            return Err(err);
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

fn default_headers(config: &AssetsApiConfig) -> ServiceResult<HeaderMap> {
    let mut headers = HeaderMap::new();

    if let Some(token) = &config.token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ServiceError::Transport(format!("invalid token: {e}")))?;
        headers.insert(AUTHORIZATION, value);
    }

    if let Some(origin) = &config.origin {
        let value = HeaderValue::from_str(origin)
            .map_err(|e| ServiceError::Transport(format!("invalid origin: {e}")))?;
        headers.insert(ORIGIN, value);
    }

    Ok(headers)
}

fn status_error(status: StatusCode, body: &str, not_found: NotFound) -> ServiceError {
    if status == StatusCode::NOT_FOUND && not_found == NotFound::Pending {
        return ServiceError::ProofNotReady;
    }

    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string());

    ServiceError::Status {
        status: status.as_u16(),
        message,
    }
}

/// The virtual transaction in the shape the service's `ckb-tx` endpoint expects.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CkbVirtualResult<'a> {
    ckb_raw_tx: &'a VirtualTransaction,
    need_paymaster_cell: bool,
    sum_inputs_capacity: String,
    commitment: String,
}

impl<'a> From<&'a VirtualTxResult> for CkbVirtualResult<'a> {
    fn from(result: &'a VirtualTxResult) -> Self {
        Self {
            ckb_raw_tx: result.tx.inner(),
            need_paymaster_cell: result.needs_paymaster,
            sum_inputs_capacity: format!("{:#x}", result.sum_inputs_capacity),
            commitment: result.commitment.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SendCkbTxPayload<'a> {
    btc_txid: Txid,
    ckb_virtual_result: CkbVirtualResult<'a>,
}

#[derive(Debug, Serialize)]
struct RetryPayload {
    btc_txid: Txid,
}

#[derive(Debug, Serialize)]
struct SendBtcTxPayload {
    txhex: String,
}

#[derive(Debug, Deserialize)]
struct TxidResponse {
    txid: Txid,
}

#[derive(Debug, Deserialize)]
struct TxHashResponse {
    txhash: Byte32,
}

impl AssetsService for AssetsApiClient {
    async fn get_spv_proof(&self, btc_txid: Txid, confirmations: u32) -> ServiceResult<SpvProof> {
        self.get(
            "/rgbpp/v1/btc-spv/proof",
            &[
                ("btc_txid", btc_txid.to_string()),
                ("confirmations", confirmations.to_string()),
            ],
            NotFound::Pending,
        )
        .await
    }

    async fn get_transaction_job(&self, btc_txid: Txid) -> ServiceResult<ServiceJob> {
        self.get(
            &format!("/rgbpp/v1/transaction/{btc_txid}/job"),
            &[],
            NotFound::Pending,
        )
        .await
    }

    async fn get_transaction_hash(&self, btc_txid: Txid) -> ServiceResult<Byte32> {
        let response: TxHashResponse = self
            .get(
                &format!("/rgbpp/v1/transaction/{btc_txid}"),
                &[],
                NotFound::Error,
            )
            .await?;

        Ok(response.txhash)
    }

    async fn send_rgbpp_ckb_transaction(
        &self,
        btc_txid: Txid,
        result: &VirtualTxResult,
    ) -> ServiceResult<ServiceJob> {
        let payload = SendCkbTxPayload {
            btc_txid,
            ckb_virtual_result: result.into(),
        };

        self.post("/rgbpp/v1/transaction/ckb-tx", &payload).await
    }

    async fn retry_rgbpp_ckb_transaction(&self, btc_txid: Txid) -> ServiceResult<RetryOutcome> {
        self.post("/rgbpp/v1/transaction/retry", &RetryPayload { btc_txid })
            .await
    }

    async fn get_paymaster_info(&self) -> ServiceResult<PaymasterInfo> {
        self.get("/rgbpp/v1/paymaster/info", &[], NotFound::Error)
            .await
    }

    async fn send_btc_transaction(&self, tx: &Transaction) -> ServiceResult<Txid> {
        let payload = SendBtcTxPayload {
            txhex: consensus::encode::serialize_hex(tx),
        };
        let response: TxidResponse = self.post("/bitcoin/v1/transaction", &payload).await?;

        if response.txid != tx.compute_txid() {
            return Err(ServiceError::InvalidResponse(format!(
                "service relayed {} instead of {}",
                response.txid,
                tx.compute_txid()
            )));
        }

        Ok(response.txid)
    }

    async fn get_recommended_fees(&self) -> ServiceResult<RecommendedFees> {
        self.get("/bitcoin/v1/fees/recommended", &[], NotFound::Error)
            .await
    }

    async fn get_utxos(
        &self,
        address: &BitcoinAddress,
        only_confirmed: bool,
    ) -> ServiceResult<Vec<Utxo>> {
        let utxos: Vec<ApiUtxo> = self
            .get(
                &format!("/bitcoin/v1/address/{address}/unspent"),
                &[("only_confirmed", only_confirmed.to_string())],
                NotFound::Error,
            )
            .await?;

        let script_pubkey = address.script_pubkey();

        Ok(utxos
            .into_iter()
            .map(|utxo| utxo.into_utxo(script_pubkey.clone()))
            .collect())
    }
}
