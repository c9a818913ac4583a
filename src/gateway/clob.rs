//! Polymarket CLOB gateway using L2 API-key auth.
//!
//! Orders go out as fill-or-kill: either the venue crosses the full size
//! at the limit or nothing happens, which keeps settlement a single-step
//! affair. Requests are signed with HMAC-SHA256 over
//! `timestamp + method + path + body` using the URL-safe base64-decoded
//! API secret, matching the venue's L2 header scheme.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE as BASE64_URL_SAFE;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::GatewayConfig;
use crate::domain::{Fill, Proposal, RoundMode, Side};
use crate::error::{GatewayError, Result};

use super::ExecutionGateway;

type HmacSha256 = Hmac<Sha256>;

const ORDER_PATH: &str = "/order";

/// L2 API credentials as issued by the CLOB.
///
/// The secret is wiped on drop; nothing here implements `Debug` so the
/// fields cannot leak through logging.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ApiCredentials {
    api_key: String,
    secret: String,
    passphrase: String,
}

impl ApiCredentials {
    pub fn new(
        api_key: impl Into<String>,
        secret: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            secret: secret.into(),
            passphrase: passphrase.into(),
        }
    }

    /// Read `POLY_API_KEY` / `POLY_API_SECRET` / `POLY_API_PASSPHRASE`.
    /// All three must be present and non-empty.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("POLY_API_KEY").ok()?;
        let secret = std::env::var("POLY_API_SECRET").ok()?;
        let passphrase = std::env::var("POLY_API_PASSPHRASE").ok()?;
        if api_key.is_empty() || secret.is_empty() || passphrase.is_empty() {
            return None;
        }
        Some(Self {
            api_key,
            secret,
            passphrase,
        })
    }
}

pub struct ClobGateway {
    http: Client,
    base_url: String,
    credentials: Option<ApiCredentials>,
}

impl ClobGateway {
    pub fn new(cfg: &GatewayConfig, credentials: Option<ApiCredentials>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.order_timeout_ms))
            .user_agent("gambit/0.1")
            .build()?;
        if credentials.is_none() {
            warn!("no CLOB credentials; gateway degraded to read-only");
        }
        Ok(Self {
            http,
            base_url: cfg.clob_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Construct using credentials from the environment, if any
    pub fn from_env(cfg: &GatewayConfig) -> Result<Self> {
        Self::new(cfg, ApiCredentials::from_env())
    }

    /// HMAC-SHA256 over `timestamp + method + path + body`, keyed by the
    /// decoded secret, emitted as URL-safe base64
    fn sign(
        secret_b64: &str,
        timestamp: &str,
        method: &Method,
        path: &str,
        body: &str,
    ) -> std::result::Result<String, GatewayError> {
        let secret = zeroize::Zeroizing::new(
            BASE64_URL_SAFE
                .decode(secret_b64.as_bytes())
                .map_err(|_| GatewayError::AuthMissing)?,
        );
        let mut mac =
            HmacSha256::new_from_slice(&secret).map_err(|_| GatewayError::AuthMissing)?;
        mac.update(timestamp.as_bytes());
        mac.update(method.as_str().as_bytes());
        mac.update(path.as_bytes());
        mac.update(body.as_bytes());
        Ok(BASE64_URL_SAFE.encode(mac.finalize().into_bytes()))
    }

    fn auth_headers(
        &self,
        method: &Method,
        path: &str,
        body: &str,
    ) -> std::result::Result<HeaderMap, GatewayError> {
        let creds = self.credentials.as_ref().ok_or(GatewayError::AuthMissing)?;
        let timestamp = Utc::now().timestamp().to_string();
        let signature = Self::sign(&creds.secret, &timestamp, method, path, body)?;

        let mut headers = HeaderMap::new();
        let pairs = [
            ("poly_api_key", creds.api_key.as_str()),
            ("poly_signature", signature.as_str()),
            ("poly_timestamp", timestamp.as_str()),
            ("poly_passphrase", creds.passphrase.as_str()),
        ];
        for (name, value) in pairs {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_str(value).map_err(|_| GatewayError::AuthMissing)?,
            );
        }
        Ok(headers)
    }

    /// Share count for the venue order; buys floor to two decimals so the
    /// worst-case cost never exceeds the reserved cash
    fn order_size(proposal: &Proposal) -> Decimal {
        match proposal.side {
            Side::Buy => (proposal.requested_amount / proposal.target_price)
                .round_dp_with_strategy(2, RoundingStrategy::ToZero),
            Side::Sell => proposal.requested_amount,
        }
    }

    /// Map an acknowledged order onto a fill report.
    ///
    /// Derived prices round toward zero: a buy's settled cost must stay at
    /// or under the cash offered, and a sell's credited proceeds must stay
    /// at or under what the venue paid. A "matched" ack carrying a
    /// non-positive quantity or price reports as no fill.
    fn fill_from_ack(proposal: &Proposal, ack: &OrderAck) -> Fill {
        if ack.status.as_deref() != Some("matched") {
            return Fill::unfilled();
        }

        let size = Self::order_size(proposal);
        let (quantity, price) = match proposal.side {
            Side::Buy => {
                // making = cash given, taking = shares received
                let quantity = ack.taking_amount.unwrap_or(size);
                let price = match ack.making_amount {
                    Some(cash) if quantity > Decimal::ZERO => {
                        (cash / quantity).round_dp_with_strategy(6, RoundingStrategy::ToZero)
                    }
                    _ => proposal.target_price,
                };
                (quantity, price)
            }
            Side::Sell => {
                // making = shares given, taking = cash received
                let quantity = ack.making_amount.unwrap_or(size);
                let price = match ack.taking_amount {
                    Some(cash) if quantity > Decimal::ZERO => {
                        (cash / quantity).round_dp_with_strategy(6, RoundingStrategy::ToZero)
                    }
                    _ => proposal.target_price,
                };
                (quantity, price)
            }
        };
        if quantity <= Decimal::ZERO || price <= Decimal::ZERO {
            return Fill::unfilled();
        }

        let fill = Fill::filled(price, quantity);
        match &ack.order_id {
            Some(id) => fill.with_order_id(id.clone()),
            None => fill,
        }
    }
}

#[async_trait]
impl ExecutionGateway for ClobGateway {
    fn mode(&self) -> RoundMode {
        if self.credentials.is_some() {
            RoundMode::Live
        } else {
            RoundMode::ReadOnly
        }
    }

    async fn submit(&self, proposal: &Proposal) -> std::result::Result<Fill, GatewayError> {
        let body = serde_json::json!({
            "market": proposal.market_id,
            "price": proposal.target_price.to_string(),
            "side": proposal.side.as_str(),
            "size": Self::order_size(proposal).to_string(),
            "type": "FOK",
            "client_order_id": proposal.proposal_id.to_string(),
        })
        .to_string();

        let headers = self.auth_headers(&Method::POST, ORDER_PATH, &body)?;
        let url = format!("{}{}", self.base_url, ORDER_PATH);
        debug!(proposal_id = %proposal.proposal_id, %url, "submitting order");

        let response = self
            .http
            .post(&url)
            .headers(headers)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GatewayError::AuthMissing);
        }
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        if status.is_server_error() {
            return Err(GatewayError::Network(format!("venue returned {status}")));
        }
        if !status.is_success() {
            return Err(GatewayError::Rejected(format!("{status}: {text}")));
        }

        let ack: OrderAck = serde_json::from_str(&text)
            .map_err(|e| GatewayError::Rejected(format!("unparseable ack: {e}")))?;
        if !ack.success {
            return Err(GatewayError::Rejected(
                ack.error_msg.unwrap_or_else(|| "order rejected".to_string()),
            ));
        }
        Ok(Self::fill_from_ack(proposal, &ack))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderAck {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error_msg: Option<String>,
    #[serde(default, rename = "orderID")]
    order_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    making_amount: Option<Decimal>,
    #[serde(default)]
    taking_amount: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn gateway(credentials: Option<ApiCredentials>) -> ClobGateway {
        ClobGateway::new(&GatewayConfig::default(), credentials).unwrap()
    }

    fn buy() -> Proposal {
        Proposal::buy("momentum", "token-1", dec!(25), dec!(0.70), dec!(0.8))
    }

    #[test]
    fn test_mode_tracks_credentials() {
        assert_eq!(gateway(None).mode(), RoundMode::ReadOnly);
        let creds = ApiCredentials::new("key", BASE64_URL_SAFE.encode(b"secret"), "pass");
        assert_eq!(gateway(Some(creds)).mode(), RoundMode::Live);
    }

    #[tokio::test]
    async fn test_submit_without_credentials_fails_before_any_network() {
        let err = gateway(None).submit(&buy()).await.unwrap_err();
        assert!(matches!(err, GatewayError::AuthMissing));
    }

    #[test]
    fn test_order_size_floors_buy_shares() {
        // 25 / 0.70 = 35.7142...
        assert_eq!(ClobGateway::order_size(&buy()), dec!(35.71));
        let sell = Proposal::sell("value", "token-1", dec!(12.5), dec!(0.90), dec!(0.6));
        assert_eq!(ClobGateway::order_size(&sell), dec!(12.5));
    }

    #[test]
    fn test_sign_is_deterministic_and_url_safe() {
        let secret = BASE64_URL_SAFE.encode(b"super-secret-bytes");
        let a = ClobGateway::sign(&secret, "1700000000", &Method::POST, "/order", "{}").unwrap();
        let b = ClobGateway::sign(&secret, "1700000000", &Method::POST, "/order", "{}").unwrap();
        assert_eq!(a, b);
        assert!(!a.contains('+') && !a.contains('/'));

        let other = ClobGateway::sign(&secret, "1700000001", &Method::POST, "/order", "{}").unwrap();
        assert_ne!(a, other);

        assert!(ClobGateway::sign("not base64 !!!", "t", &Method::POST, "/order", "").is_err());
    }

    #[test]
    fn test_fill_from_ack_derives_cost_safe_prices() {
        let proposal = buy();
        let ack = OrderAck {
            success: true,
            error_msg: None,
            order_id: Some("0xabc".to_string()),
            status: Some("matched".to_string()),
            making_amount: Some(dec!(25)),
            taking_amount: Some(dec!(35.71)),
        };
        let fill = ClobGateway::fill_from_ack(&proposal, &ack);
        assert!(fill.filled);
        assert_eq!(fill.fill_quantity, dec!(35.71));
        // settled cost stays at or under the cash offered
        assert!(fill.fill_price * fill.fill_quantity <= dec!(25));
        assert_eq!(fill.order_id.as_deref(), Some("0xabc"));
    }

    #[test]
    fn test_fill_from_ack_unmatched_is_no_fill() {
        let ack = OrderAck {
            success: true,
            error_msg: None,
            order_id: None,
            status: Some("unmatched".to_string()),
            making_amount: None,
            taking_amount: None,
        };
        assert!(!ClobGateway::fill_from_ack(&buy(), &ack).filled);
    }

    #[test]
    fn test_fill_from_ack_zero_amounts_are_no_fill() {
        // Matched ack but the venue moved zero shares on a buy
        let ack = OrderAck {
            success: true,
            error_msg: None,
            order_id: Some("0xabc".to_string()),
            status: Some("matched".to_string()),
            making_amount: Some(dec!(25)),
            taking_amount: Some(Decimal::ZERO),
        };
        assert!(!ClobGateway::fill_from_ack(&buy(), &ack).filled);

        // Same on a sell: zero shares given up
        let sell = Proposal::sell("value", "token-1", dec!(10), dec!(0.90), dec!(0.6));
        let ack = OrderAck {
            success: true,
            error_msg: None,
            order_id: None,
            status: Some("matched".to_string()),
            making_amount: Some(Decimal::ZERO),
            taking_amount: Some(dec!(9)),
        };
        assert!(!ClobGateway::fill_from_ack(&sell, &ack).filled);
    }
}
