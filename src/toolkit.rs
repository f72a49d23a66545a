//! Tool selection and toolkit construction
//!
//! The set of toolkits is closed: [`ToolKind`] lists every capability the
//! assistant can be given, in the fixed order in which they are registered.

use crate::error::{Error, Result};
use crate::tool::Tool;
use crate::tools::{SerpApiTools, StockDataTools, SERPAPI_URL, YAHOO_FINANCE_URL};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Which toolkits the user has switched on
///
/// Both are enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToolSelection {
    pub stock_data: bool,
    pub web_search: bool,
}

impl Default for ToolSelection {
    fn default() -> Self {
        Self {
            stock_data: true,
            web_search: true,
        }
    }
}

impl ToolSelection {
    /// A selection with every toolkit switched off (plain chat)
    pub fn none() -> Self {
        Self {
            stock_data: false,
            web_search: false,
        }
    }

    /// Whether `kind` is switched on
    pub fn is_enabled(&self, kind: ToolKind) -> bool {
        match kind {
            ToolKind::StockData => self.stock_data,
            ToolKind::WebSearch => self.web_search,
        }
    }

    /// Switch `kind` on or off
    pub fn set(&mut self, kind: ToolKind, enabled: bool) {
        match kind {
            ToolKind::StockData => self.stock_data = enabled,
            ToolKind::WebSearch => self.web_search = enabled,
        }
    }

    /// Enabled kinds in registry order
    pub fn enabled(&self) -> Vec<ToolKind> {
        ToolKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    /// Build a selection from a list of enabled kinds
    pub fn from_kinds(kinds: &[ToolKind]) -> Self {
        let mut selection = Self::none();
        for kind in kinds {
            selection.set(*kind, true);
        }
        selection
    }
}

/// The capabilities an assistant can be given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    StockData,
    WebSearch,
}

impl ToolKind {
    /// Every kind, in registry order
    pub const ALL: [ToolKind; 2] = [ToolKind::StockData, ToolKind::WebSearch];

    /// Checkbox label
    pub fn label(&self) -> &'static str {
        match self {
            ToolKind::StockData => "YFinance (Stock Data)",
            ToolKind::WebSearch => "SerpAPI (Web Search)",
        }
    }

    /// Short name used in the status panel
    pub fn short_name(&self) -> &'static str {
        match self {
            ToolKind::StockData => "YFinance",
            ToolKind::WebSearch => "SerpAPI",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Credentials and endpoints needed to construct toolkits
#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub serpapi_api_key: Option<String>,
    pub serpapi_url: String,
    pub yahoo_finance_url: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            serpapi_api_key: None,
            serpapi_url: SERPAPI_URL.to_string(),
            yahoo_finance_url: YAHOO_FINANCE_URL.to_string(),
        }
    }
}

impl ToolSettings {
    /// Default endpoints with the given SerpApi key
    pub fn with_serpapi_key(api_key: impl Into<String>) -> Self {
        Self {
            serpapi_api_key: Some(api_key.into()),
            ..Self::default()
        }
    }
}

/// One constructed toolkit: a kind and the functions it exposes
#[derive(Clone)]
pub struct Toolkit {
    kind: ToolKind,
    functions: Vec<Arc<dyn Tool>>,
}

impl Toolkit {
    /// Wrap already constructed functions
    pub fn new(kind: ToolKind, functions: Vec<Arc<dyn Tool>>) -> Self {
        Self { kind, functions }
    }

    /// Construct the toolkit for `kind`
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when a credential the toolkit needs is missing.
    pub fn build(kind: ToolKind, settings: &ToolSettings) -> Result<Self> {
        let functions = match kind {
            ToolKind::StockData => {
                StockDataTools::with_base_url(settings.yahoo_finance_url.clone()).functions()?
            }
            ToolKind::WebSearch => {
                let api_key = settings
                    .serpapi_api_key
                    .as_deref()
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .ok_or_else(|| {
                        Error::Config(
                            "SERPAPI_API_KEY is required for the web search tool".to_string(),
                        )
                    })?;
                SerpApiTools::with_base_url(api_key, settings.serpapi_url.clone()).functions()?
            }
        };
        Ok(Self::new(kind, functions))
    }

    /// The capability this toolkit provides
    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    /// Functions exposed to the model, in registration order
    pub fn functions(&self) -> &[Arc<dyn Tool>] {
        &self.functions
    }
}

impl fmt::Debug for Toolkit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.functions.iter().map(|t| t.name()).collect();
        f.debug_struct("Toolkit")
            .field("kind", &self.kind)
            .field("functions", &names)
            .finish()
    }
}

/// Build one toolkit per enabled kind, in registry order
///
/// Fails as a whole if any toolkit cannot be built; a partial tool set is
/// never returned.
pub fn build_toolkits(selection: &ToolSelection, settings: &ToolSettings) -> Result<Vec<Toolkit>> {
    let toolkits = selection
        .enabled()
        .into_iter()
        .map(|kind| Toolkit::build(kind, settings))
        .collect::<Result<Vec<_>>>()?;
    debug!(
        toolkits = ?toolkits.iter().map(Toolkit::kind).collect::<Vec<_>>(),
        "built toolkits"
    );
    Ok(toolkits)
}
