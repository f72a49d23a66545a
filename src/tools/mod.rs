//! Toolkits the assistant can be given

pub mod stock_data;
pub mod web_search;

pub use stock_data::{CompanyInfoTool, StockDataTools, StockPriceTool, YAHOO_FINANCE_URL};
pub use web_search::{GoogleSearchTool, SearchResult, SerpApiTools, YoutubeSearchTool, SERPAPI_URL};
