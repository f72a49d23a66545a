use crate::{Error, Result, Tool};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Default SerpApi host
pub const SERPAPI_URL: &str = "https://serpapi.com";

/// Web-search toolkit backed by SerpApi
///
/// Exposes `search_google` and `search_youtube`. The API key is required at
/// construction; see [`build_toolkits`](crate::build_toolkits).
#[derive(Debug, Clone)]
pub struct SerpApiTools {
    api_key: String,
    base_url: String,
}

impl SerpApiTools {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, SERPAPI_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build the search functions, Google first
    pub fn functions(&self) -> Result<Vec<Arc<dyn Tool>>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Tool(format!("Failed to create HTTP client: {}", e)))?;
        let api = SerpApi {
            client,
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
        };
        Ok(vec![
            Arc::new(GoogleSearchTool { api: api.clone() }),
            Arc::new(YoutubeSearchTool { api }),
        ])
    }
}

#[derive(Clone)]
struct SerpApi {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SerpApi {
    async fn search(&self, params: &[(&str, &str)]) -> Result<Value> {
        let endpoint = format!("{}/search.json", self.base_url);
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("api_key", self.api_key.as_str()));

        let url = url::Url::parse_with_params(&endpoint, &all_params)
            .map_err(|e| Error::Tool(format!("Invalid SerpApi URL: {}", e)))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Tool(format!("SerpApi request failed: {}", e)))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Tool(format!("Failed to parse SerpApi response: {}", e)))?;

        if let Some(error) = body.get("error").and_then(|e| e.as_str()) {
            return Err(Error::Tool(format!("SerpApi error: {}", error)));
        }
        if !status.is_success() {
            return Err(Error::Tool(format!(
                "SerpApi returned status {}",
                status.as_u16()
            )));
        }
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct SearchInput {
    query: String,
    num_results: Option<usize>,
}

fn parse_input(input: Value) -> Result<SearchInput> {
    let params: SearchInput = serde_json::from_value(input).map_err(|e| {
        Error::Tool(format!(
            "Invalid input parameters: {}. Example: {{\"query\": \"ACME earnings\", \"num_results\": 5}}",
            e
        ))
    })?;
    if params.query.trim().is_empty() {
        return Err(Error::Tool("Query must not be empty".to_string()));
    }
    Ok(params)
}

fn search_schema(what: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": format!("The query to search {} for", what)
            },
            "num_results": {
                "type": "integer",
                "minimum": 1,
                "maximum": 20,
                "description": "Number of results to return (default: 5)"
            }
        },
        "required": ["query"],
        "additionalProperties": false
    })
}

fn take(value: &Value, limit: usize) -> Value {
    match value.as_array() {
        Some(items) => Value::Array(items.iter().take(limit).cloned().collect()),
        None => Value::Array(Vec::new()),
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Serialize)]
struct GoogleResponse {
    search_results: Vec<SearchResult>,
    people_also_ask: Value,
    knowledge_graph: Value,
    answer_box: Value,
}

pub struct GoogleSearchTool {
    api: SerpApi,
}

#[async_trait]
impl Tool for GoogleSearchTool {
    fn name(&self) -> &str {
        "search_google"
    }

    fn description(&self) -> &str {
        "Search Google using SerpApi and return organic results, related questions and the knowledge graph."
    }

    fn input_schema(&self) -> Value {
        search_schema("Google")
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let params = parse_input(input)?;
        let limit = params.num_results.unwrap_or(5).clamp(1, 20);
        let num = limit.to_string();

        let body = self
            .api
            .search(&[("engine", "google"), ("q", params.query.as_str()), ("num", num.as_str())])
            .await?;

        let search_results = body["organic_results"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value::<SearchResult>(item.clone()).ok())
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default();

        let response = GoogleResponse {
            search_results,
            people_also_ask: take(&body["related_questions"], limit),
            knowledge_graph: body["knowledge_graph"].clone(),
            answer_box: body["answer_box"].clone(),
        };

        serde_json::to_string_pretty(&response)
            .map_err(|e| Error::Tool(format!("Failed to serialize response: {}", e)))
    }
}

pub struct YoutubeSearchTool {
    api: SerpApi,
}

#[async_trait]
impl Tool for YoutubeSearchTool {
    fn name(&self) -> &str {
        "search_youtube"
    }

    fn description(&self) -> &str {
        "Search YouTube using SerpApi and return matching videos, movies and channels."
    }

    fn input_schema(&self) -> Value {
        search_schema("YouTube")
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let params = parse_input(input)?;
        let limit = params.num_results.unwrap_or(5).clamp(1, 20);

        let body = self
            .api
            .search(&[("engine", "youtube"), ("search_query", params.query.as_str())])
            .await?;

        let response = json!({
            "video_results": take(&body["video_results"], limit),
            "movie_results": take(&body["movie_results"], limit),
            "channel_results": take(&body["channel_results"], limit),
        });

        serde_json::to_string_pretty(&response)
            .map_err(|e| Error::Tool(format!("Failed to serialize response: {}", e)))
    }
}
