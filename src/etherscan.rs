use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::ledger::{FetchError, LedgerSource, TransactionRecord};
use crate::network::Network;

const WEI_DECIMALS: u32 = 18;
const NO_TRANSACTIONS: &str = "No transactions found";

/// Etherscan-compatible account API client.
#[derive(Debug, Clone)]
pub struct EtherscanClient {
    client: Client,
    api_key: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    message: String,
    result: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    hash: String,
    from: String,
    #[serde(default)]
    to: String,
    value: String,
    #[serde(default)]
    time_stamp: Option<String>,
}

impl EtherscanClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: None,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn url(&self, network: Network) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| network.etherscan_api_url())
    }

    async fn query(
        &self,
        network: Network,
        params: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        let mut request = self.client.get(self.url(network)).query(params);
        if let Some(key) = &self.api_key {
            request = request.query(&[("apikey", key.as_str())]);
        }
        let response = request.send().await.map_err(classify_transport)?;
        if !response.status().is_success() {
            return Err(FetchError::Service(format!(
                "API returned {}",
                response.status()
            )));
        }
        response.text().await.map_err(classify_transport)
    }
}

#[async_trait]
impl LedgerSource for EtherscanClient {
    async fn get_balance(&self, address: &str, network: Network) -> Result<Decimal, FetchError> {
        let body = self
            .query(
                network,
                &[
                    ("module", "account"),
                    ("action", "balance"),
                    ("address", address),
                    ("tag", "latest"),
                ],
            )
            .await?;
        parse_balance(&body)
    }

    async fn get_history(
        &self,
        address: &str,
        network: Network,
    ) -> Result<Vec<TransactionRecord>, FetchError> {
        let body = self
            .query(
                network,
                &[
                    ("module", "account"),
                    ("action", "txlist"),
                    ("address", address),
                    ("sort", "asc"),
                ],
            )
            .await?;
        parse_history(&body, address)
    }
}

fn classify_transport(e: reqwest::Error) -> FetchError {
    if e.is_connect() || e.is_timeout() || e.is_request() {
        FetchError::Connectivity(e.to_string())
    } else if e.is_decode() || e.is_body() {
        FetchError::Decode(e.to_string())
    } else {
        FetchError::Service(e.to_string())
    }
}

fn parse_envelope(body: &str) -> Result<Value, FetchError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    if envelope.status == "1" {
        return Ok(envelope.result);
    }
    if envelope.message.starts_with(NO_TRANSACTIONS) {
        return Err(FetchError::NoTransactions);
    }
    let detail = match envelope.result {
        Value::String(s) if !s.is_empty() => s,
        _ => envelope.message,
    };
    Err(FetchError::Service(detail))
}

fn wei_to_ether(wei: &str) -> Result<Decimal, FetchError> {
    let wei: i128 = wei
        .trim()
        .parse()
        .map_err(|_| FetchError::Decode(format!("invalid wei amount: {wei:?}")))?;
    Decimal::try_from_i128_with_scale(wei, WEI_DECIMALS)
        .map(|d| d.normalize())
        .map_err(|e| FetchError::Decode(e.to_string()))
}

/// Balance in ether from a `balance` response body.
pub fn parse_balance(body: &str) -> Result<Decimal, FetchError> {
    match parse_envelope(body)? {
        Value::String(wei) => wei_to_ether(&wei),
        other => Err(FetchError::Decode(format!(
            "balance result is not a string: {other}"
        ))),
    }
}

/// Transactions in the order the service returned them, oldest first.
pub fn parse_history(body: &str, address: &str) -> Result<Vec<TransactionRecord>, FetchError> {
    let result = parse_envelope(body)?;
    let raw: Vec<RawTransaction> =
        serde_json::from_value(result).map_err(|e| FetchError::Decode(e.to_string()))?;
    raw.into_iter()
        .map(|tx| {
            let timestamp = tx
                .time_stamp
                .as_deref()
                .and_then(|ts| ts.parse::<i64>().ok())
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
            Ok(TransactionRecord {
                sent: tx.from.eq_ignore_ascii_case(address),
                value: wei_to_ether(&tx.value)?,
                hash: tx.hash,
                from: tx.from,
                to: tx.to,
                timestamp,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const ADDRESS: &str = "0xab5801a7d398351b8be11c439e05c5b3259aec9b";

    #[test]
    fn balance_is_converted_from_wei() {
        let body = r#"{"status":"1","message":"OK","result":"1500000000000000000"}"#;
        assert_eq!(parse_balance(body).unwrap(), Decimal::from_str("1.5").unwrap());
    }

    #[test]
    fn garbage_body_is_decode_error() {
        assert!(matches!(
            parse_balance("<html>rate limited</html>"),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn notok_is_service_error() {
        let body = r#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#;
        assert_eq!(
            parse_balance(body),
            Err(FetchError::Service("Invalid API Key".into()))
        );
    }

    #[test]
    fn empty_history_is_reported() {
        let body = r#"{"status":"0","message":"No transactions found","result":[]}"#;
        assert_eq!(parse_history(body, ADDRESS), Err(FetchError::NoTransactions));
    }

    #[test]
    fn history_marks_direction() {
        let body = r#"{"status":"1","message":"OK","result":[
            {"hash":"0x1","from":"0xAB5801A7D398351B8BE11C439E05C5B3259AEC9B","to":"0xbeef","value":"1000000000000000000","timeStamp":"1438269988"},
            {"hash":"0x2","from":"0xbeef","to":"0xab5801a7d398351b8be11c439e05c5b3259aec9b","value":"250000000000000000","timeStamp":"1438270000"}
        ]}"#;
        let history = parse_history(body, ADDRESS).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].sent);
        assert_eq!(history[0].counterparty(), "0xbeef");
        assert!(!history[1].sent);
        assert_eq!(history[1].value, Decimal::from_str("0.25").unwrap());
        assert_eq!(history[0].timestamp.unwrap().timestamp(), 1438269988);
    }

    fn local_client(addr: std::net::SocketAddr) -> EtherscanClient {
        EtherscanClient::new(None, Duration::from_secs(5))
            .unwrap()
            .with_base_url(format!("http://{addr}/api"))
    }

    /// Answers a single request with `response` and closes.
    async fn serve_once(listener: TcpListener, response: String) {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await.unwrap();
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[tokio::test]
    async fn refused_connection_is_connectivity_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = local_client(addr);
        assert!(matches!(
            client.get_balance(ADDRESS, Network::Mainnet).await,
            Err(FetchError::Connectivity(_))
        ));
        assert!(matches!(
            client.get_history(ADDRESS, Network::Mainnet).await,
            Err(FetchError::Connectivity(_))
        ));
    }

    #[tokio::test]
    async fn unavailable_service_is_service_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_once(
            listener,
            http_response("503 Service Unavailable", ""),
        ));

        let result = local_client(addr).get_balance(ADDRESS, Network::Mainnet).await;
        server.await.unwrap();
        assert_eq!(
            result,
            Err(FetchError::Service("API returned 503 Service Unavailable".into()))
        );
    }

    #[tokio::test]
    async fn balance_is_fetched_over_http() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_once(
            listener,
            http_response(
                "200 OK",
                r#"{"status":"1","message":"OK","result":"2000000000000000000"}"#,
            ),
        ));

        let result = local_client(addr).get_balance(ADDRESS, Network::Goerli).await;
        server.await.unwrap();
        assert_eq!(result, Ok(Decimal::TWO));
    }
}
