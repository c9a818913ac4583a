//! Gamma + CLOB market data provider.
//!
//! Discovery comes from the Gamma API; tradable mids come from CLOB
//! order books, cached with a TTL so repeated snapshots inside the cache
//! window do not re-fetch every book. Gamma embeds arrays as JSON-encoded
//! strings (`"[\"0.35\", \"0.65\"]"`), so parsing happens in two stages.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::domain::{MarketSnapshot, MarketView};
use crate::error::{GambitError, Result};

use super::SnapshotProvider;

pub struct GammaProvider {
    http: Client,
    gamma_url: String,
    clob_url: String,
    markets_limit: usize,
    min_volume_usd: Decimal,
    lookback_days: i64,
    price_ttl: Duration,
    mid_cache: DashMap<String, CachedMid>,
}

#[derive(Debug, Clone)]
struct CachedMid {
    book: BookMid,
    fetched: Instant,
}

/// Tradable prices derived from one order book
#[derive(Debug, Clone, PartialEq)]
pub struct BookMid {
    pub mid: Decimal,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
}

impl BookMid {
    /// Best bid is the highest bid, best ask the lowest ask; the mid
    /// averages whichever sides are quoted
    fn from_levels(bids: &[BookLevel], asks: &[BookLevel]) -> Option<Self> {
        let best_bid = bids.iter().filter_map(BookLevel::price_decimal).max();
        let best_ask = asks.iter().filter_map(BookLevel::price_decimal).min();
        let mid = match (best_bid, best_ask) {
            (Some(bid), Some(ask)) => (bid + ask) / Decimal::TWO,
            (Some(bid), None) => bid,
            (None, Some(ask)) => ask,
            (None, None) => return None,
        };
        Some(Self {
            mid,
            best_bid,
            best_ask,
        })
    }
}

impl GammaProvider {
    pub fn new(cfg: &ProviderConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("gambit/0.1")
            .build()?;
        Ok(Self {
            http,
            gamma_url: cfg.gamma_url.trim_end_matches('/').to_string(),
            clob_url: cfg.clob_url.trim_end_matches('/').to_string(),
            markets_limit: cfg.markets_limit,
            min_volume_usd: cfg.min_volume_usd,
            lookback_days: cfg.lookback_days,
            price_ttl: Duration::from_secs(cfg.price_cache_ttl_secs),
            mid_cache: DashMap::new(),
        })
    }

    async fn fetch_gamma_markets(&self) -> Result<Vec<GammaMarket>> {
        let url = format!("{}/markets", self.gamma_url);
        let start_min = (Utc::now() - ChronoDuration::days(self.lookback_days))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();
        // Over-fetch so client-side filters still leave a full universe
        let fetch_limit = (self.markets_limit * 2).to_string();

        let response = self
            .http
            .get(&url)
            .query(&[
                ("active", "true"),
                ("closed", "false"),
                ("order", "volumeNum"),
                ("ascending", "false"),
                ("limit", fetch_limit.as_str()),
                ("start_date_min", start_min.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GambitError::ProviderUnavailable(format!("gamma request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(GambitError::ProviderUnavailable(format!(
                "gamma returned {}",
                response.status()
            )));
        }
        response
            .json::<Vec<GammaMarket>>()
            .await
            .map_err(|e| GambitError::ProviderUnavailable(format!("gamma payload unparseable: {e}")))
    }

    /// Book-derived prices for one token, TTL-cached
    async fn book_mid(&self, token_id: &str) -> Result<Option<BookMid>> {
        if let Some(hit) = self.mid_cache.get(token_id) {
            if hit.fetched.elapsed() < self.price_ttl {
                return Ok(Some(hit.book.clone()));
            }
        }

        let url = format!("{}/book", self.clob_url);
        let response = self
            .http
            .get(&url)
            .query(&[("token_id", token_id)])
            .send()
            .await
            .map_err(|e| GambitError::ProviderUnavailable(format!("book request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(GambitError::ProviderUnavailable(format!(
                "book endpoint returned {}",
                response.status()
            )));
        }
        let book: BookResponse = response
            .json()
            .await
            .map_err(|e| GambitError::ProviderUnavailable(format!("book payload unparseable: {e}")))?;

        let computed = BookMid::from_levels(&book.bids, &book.asks);
        if let Some(found) = &computed {
            self.mid_cache.insert(
                token_id.to_string(),
                CachedMid {
                    book: found.clone(),
                    fetched: Instant::now(),
                },
            );
        }
        Ok(computed)
    }

    /// Filter raw Gamma rows down to the tradeable universe, volume-descending
    fn select_views(&self, raw: Vec<GammaMarket>, now: DateTime<Utc>) -> Vec<MarketView> {
        let mut views: Vec<MarketView> = raw
            .into_iter()
            .filter(|m| m.active && !m.closed)
            .filter_map(GammaMarket::into_view)
            .filter(|v| v.volume_usd >= self.min_volume_usd)
            .filter(|v| v.price > Decimal::ZERO && v.price < Decimal::ONE)
            .filter(|v| v.is_open(now))
            .collect();
        views.sort_by(|a, b| b.volume_usd.cmp(&a.volume_usd));
        views.truncate(self.markets_limit);
        views
    }
}

#[async_trait]
impl SnapshotProvider for GammaProvider {
    async fn snapshot(&self) -> Result<MarketSnapshot> {
        let raw = self.fetch_gamma_markets().await?;
        let now = Utc::now();
        let mut views = self.select_views(raw, now);

        for view in views.iter_mut() {
            match self.book_mid(&view.market_id).await {
                Ok(Some(book)) => {
                    view.price = book.mid;
                    view.best_bid = book.best_bid;
                    view.best_ask = book.best_ask;
                }
                // Empty book; the Gamma price stands
                Ok(None) => {}
                Err(e) => {
                    warn!(market_id = %view.market_id, error = %e, "book fetch failed, keeping gamma price");
                }
            }
        }

        debug!(markets = views.len(), "snapshot assembled");
        Ok(MarketSnapshot::new(views, now))
    }
}

/// One market row as Gamma returns it. Numeric fields arrive as numbers
/// or strings depending on the endpoint's mood, arrays arrive embedded
/// in strings; everything stays optional until conversion.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GammaMarket {
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    condition_id: Option<String>,
    /// JSON-encoded array of outcome labels
    #[serde(default)]
    outcomes: Option<String>,
    /// JSON-encoded array of outcome prices
    #[serde(default)]
    outcome_prices: Option<String>,
    /// JSON-encoded array of CLOB token ids
    #[serde(default)]
    clob_token_ids: Option<String>,
    #[serde(default)]
    volume_num: Option<Decimal>,
    #[serde(default)]
    liquidity_num: Option<Decimal>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    closed: bool,
}

impl GammaMarket {
    /// First outcome token only; the complement is implied in a binary
    /// market and listing both sides would double-count the question
    fn into_view(self) -> Option<MarketView> {
        let question = self.question?;
        let market_id = first_embedded(self.clob_token_ids.as_deref())?;
        let price: Decimal = first_embedded(self.outcome_prices.as_deref())?
            .trim()
            .parse()
            .ok()?;
        let outcome =
            first_embedded(self.outcomes.as_deref()).unwrap_or_else(|| "Yes".to_string());
        let end_date = self
            .end_date
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Some(MarketView {
            market_id,
            condition_id: self.condition_id.unwrap_or_default(),
            question,
            outcome,
            price,
            best_bid: None,
            best_ask: None,
            volume_usd: self.volume_num.unwrap_or(Decimal::ZERO),
            liquidity_usd: self.liquidity_num.unwrap_or(Decimal::ZERO),
            end_date,
        })
    }
}

/// Decode Gamma's JSON-inside-a-string arrays and take the first element
fn first_embedded(raw: Option<&str>) -> Option<String> {
    let parsed: Vec<String> = serde_json::from_str(raw?).ok()?;
    parsed.into_iter().next()
}

#[derive(Debug, Deserialize)]
struct BookResponse {
    #[serde(default)]
    bids: Vec<BookLevel>,
    #[serde(default)]
    asks: Vec<BookLevel>,
}

#[derive(Debug, Deserialize)]
struct BookLevel {
    price: String,
}

impl BookLevel {
    fn price_decimal(&self) -> Option<Decimal> {
        self.price.trim().parse().ok()
    }
}
