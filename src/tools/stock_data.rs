use crate::{Error, Result, Tool};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Default Yahoo Finance API host
pub const YAHOO_FINANCE_URL: &str = "https://query1.finance.yahoo.com";

/// Stock-data toolkit backed by Yahoo Finance
///
/// Exposes up to two functions to the model: `get_current_stock_price` and
/// `get_company_info`. Both are enabled by default.
#[derive(Debug, Clone)]
pub struct StockDataTools {
    pub stock_price: bool,
    pub company_info: bool,
    pub base_url: String,
}

impl Default for StockDataTools {
    fn default() -> Self {
        Self {
            stock_price: true,
            company_info: true,
            base_url: YAHOO_FINANCE_URL.to_string(),
        }
    }
}

impl StockDataTools {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Build the enabled functions, price lookup first
    pub fn functions(&self) -> Result<Vec<Arc<dyn Tool>>> {
        let api = YahooFinance::new(&self.base_url)?;
        let mut functions: Vec<Arc<dyn Tool>> = Vec::new();
        if self.stock_price {
            functions.push(Arc::new(StockPriceTool { api: api.clone() }));
        }
        if self.company_info {
            functions.push(Arc::new(CompanyInfoTool { api }));
        }
        Ok(functions)
    }
}

#[derive(Clone)]
struct YahooFinance {
    client: reqwest::Client,
    base_url: String,
}

impl YahooFinance {
    fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; stu/0.1)")
            .build()
            .map_err(|e| Error::Tool(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Tool(format!("Yahoo Finance request failed: {}", e)))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Tool(format!("Failed to parse Yahoo Finance response: {}", e)))?;

        if !status.is_success() && body.is_null() {
            return Err(Error::Tool(format!(
                "Yahoo Finance returned status {}",
                status.as_u16()
            )));
        }
        Ok(body)
    }

    async fn chart_meta(&self, symbol: &str) -> Result<Value> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=1d",
            self.base_url,
            urlencoding::encode(symbol)
        );
        let body = self.get_json(&url).await?;

        if let Some(description) = body["chart"]["error"]["description"].as_str() {
            return Err(Error::Tool(description.to_string()));
        }

        body["chart"]["result"][0]
            .get("meta")
            .cloned()
            .ok_or_else(|| Error::Tool(format!("No quote data for {}", symbol)))
    }

    async fn quote_summary(&self, symbol: &str) -> Result<Value> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules=assetProfile,price,summaryDetail,financialData,defaultKeyStatistics",
            self.base_url,
            urlencoding::encode(symbol)
        );
        let body = self.get_json(&url).await?;

        if let Some(description) = body["quoteSummary"]["error"]["description"].as_str() {
            return Err(Error::Tool(description.to_string()));
        }

        let result = &body["quoteSummary"]["result"][0];
        if result.is_null() {
            return Err(Error::Tool(format!("No company data for {}", symbol)));
        }
        Ok(result.clone())
    }
}

fn symbol_from(input: &Value) -> Result<String> {
    input
        .get("symbol")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            Error::Tool("Missing 'symbol' field. Example: {\"symbol\": \"AAPL\"}".to_string())
        })
}

fn symbol_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "symbol": {
                "type": "string",
                "description": "The stock ticker symbol, e.g. AAPL"
            }
        },
        "required": ["symbol"],
        "additionalProperties": false
    })
}

/// Yahoo values come either bare or as `{"raw": .., "fmt": ..}`
fn raw(value: &Value) -> Value {
    match value.get("raw") {
        Some(inner) => inner.clone(),
        None => value.clone(),
    }
}

pub struct StockPriceTool {
    api: YahooFinance,
}

#[async_trait]
impl Tool for StockPriceTool {
    fn name(&self) -> &str {
        "get_current_stock_price"
    }

    fn description(&self) -> &str {
        "Get the current stock price for a given ticker symbol."
    }

    fn input_schema(&self) -> Value {
        symbol_schema()
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let symbol = symbol_from(&input)?;
        let meta = self.api.chart_meta(&symbol).await?;

        let price = meta
            .get("regularMarketPrice")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| Error::Tool(format!("Could not fetch current price for {}", symbol)))?;
        let currency = meta.get("currency").and_then(|v| v.as_str()).unwrap_or("");

        Ok(format!("{}: {:.4} {}", symbol, price, currency)
            .trim_end()
            .to_string())
    }
}

#[derive(Debug, Serialize)]
struct CompanyInfo {
    #[serde(rename = "Name")]
    name: Value,
    #[serde(rename = "Symbol")]
    symbol: String,
    #[serde(rename = "Current Stock Price")]
    price: Value,
    #[serde(rename = "Currency")]
    currency: Value,
    #[serde(rename = "Market Cap")]
    market_cap: Value,
    #[serde(rename = "Sector")]
    sector: Value,
    #[serde(rename = "Industry")]
    industry: Value,
    #[serde(rename = "City")]
    city: Value,
    #[serde(rename = "Country")]
    country: Value,
    #[serde(rename = "P/E Ratio")]
    trailing_pe: Value,
    #[serde(rename = "52 Week Low")]
    fifty_two_week_low: Value,
    #[serde(rename = "52 Week High")]
    fifty_two_week_high: Value,
    #[serde(rename = "Analyst Recommendation")]
    recommendation: Value,
    #[serde(rename = "Employees")]
    employees: Value,
    #[serde(rename = "Website")]
    website: Value,
    #[serde(rename = "Summary")]
    summary: Value,
}

pub struct CompanyInfoTool {
    api: YahooFinance,
}

#[async_trait]
impl Tool for CompanyInfoTool {
    fn name(&self) -> &str {
        "get_company_info"
    }

    fn description(&self) -> &str {
        "Get company information and an overview for a given ticker symbol."
    }

    fn input_schema(&self) -> Value {
        symbol_schema()
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let symbol = symbol_from(&input)?;
        let summary = self.api.quote_summary(&symbol).await?;

        let profile = &summary["assetProfile"];
        let price = &summary["price"];
        let detail = &summary["summaryDetail"];
        let financial = &summary["financialData"];

        let name = if price["longName"].is_null() {
            price["shortName"].clone()
        } else {
            price["longName"].clone()
        };

        let info = CompanyInfo {
            name,
            symbol,
            price: raw(&price["regularMarketPrice"]),
            currency: price["currency"].clone(),
            market_cap: raw(&price["marketCap"]),
            sector: profile["sector"].clone(),
            industry: profile["industry"].clone(),
            city: profile["city"].clone(),
            country: profile["country"].clone(),
            trailing_pe: raw(&detail["trailingPE"]),
            fifty_two_week_low: raw(&detail["fiftyTwoWeekLow"]),
            fifty_two_week_high: raw(&detail["fiftyTwoWeekHigh"]),
            recommendation: financial["recommendationKey"].clone(),
            employees: profile["fullTimeEmployees"].clone(),
            website: profile["website"].clone(),
            summary: profile["longBusinessSummary"].clone(),
        };

        serde_json::to_string_pretty(&info)
            .map_err(|e| Error::Tool(format!("Failed to serialize company info: {}", e)))
    }
}
