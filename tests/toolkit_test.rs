use stu::chat_ui::tool_status_lines;
use stu::{build_toolkits, Error, ToolKind, ToolSelection, ToolSettings, Toolkit};

#[test]
fn test_selection_defaults_and_kinds() {
    let selection = ToolSelection::default();
    assert!(selection.is_enabled(ToolKind::StockData));
    assert!(selection.is_enabled(ToolKind::WebSearch));
    assert_eq!(selection.enabled(), vec![ToolKind::StockData, ToolKind::WebSearch]);

    assert!(ToolSelection::none().enabled().is_empty());

    // Registry order does not depend on the order kinds were given in.
    let reversed = ToolSelection::from_kinds(&[ToolKind::WebSearch, ToolKind::StockData]);
    assert_eq!(reversed, selection);
    assert_eq!(reversed.enabled(), vec![ToolKind::StockData, ToolKind::WebSearch]);

    let mut selection = ToolSelection::none();
    selection.set(ToolKind::WebSearch, true);
    assert_eq!(selection.enabled(), vec![ToolKind::WebSearch]);
}

#[test]
fn test_build_toolkits_in_registry_order() {
    let settings = ToolSettings::with_serpapi_key("test-key");
    let toolkits = build_toolkits(&ToolSelection::default(), &settings).unwrap();

    let kinds: Vec<ToolKind> = toolkits.iter().map(Toolkit::kind).collect();
    assert_eq!(kinds, vec![ToolKind::StockData, ToolKind::WebSearch]);

    let names: Vec<&str> = toolkits
        .iter()
        .flat_map(|toolkit| toolkit.functions().iter().map(|f| f.name()))
        .collect();
    assert_eq!(
        names,
        vec![
            "get_current_stock_price",
            "get_company_info",
            "search_google",
            "search_youtube"
        ]
    );
}

#[test]
fn test_empty_selection_builds_nothing() {
    let toolkits = build_toolkits(&ToolSelection::none(), &ToolSettings::default()).unwrap();
    assert!(toolkits.is_empty());
}

#[test]
fn test_web_search_needs_api_key() {
    for settings in [ToolSettings::default(), ToolSettings::with_serpapi_key("   ")] {
        let err = Toolkit::build(ToolKind::WebSearch, &settings).unwrap_err();
        match err {
            Error::Config(message) => assert!(message.contains("SERPAPI_API_KEY")),
            other => panic!("expected a config error, got {:?}", other),
        }
    }

    // Stock data alone needs no credentials.
    let stock_only = ToolSelection {
        stock_data: true,
        web_search: false,
    };
    assert_eq!(
        build_toolkits(&stock_only, &ToolSettings::default())
            .unwrap()
            .len(),
        1
    );

    // One failing toolkit fails the whole build.
    assert!(build_toolkits(&ToolSelection::default(), &ToolSettings::default()).is_err());
}

#[test]
fn test_kind_labels() {
    assert_eq!(ToolKind::StockData.label(), "YFinance (Stock Data)");
    assert_eq!(ToolKind::WebSearch.label(), "SerpAPI (Web Search)");
    assert_eq!(ToolKind::WebSearch.to_string(), "SerpAPI");
}

#[test]
fn test_tool_status_lines() {
    colored::control::set_override(false);
    let lines = tool_status_lines(&ToolSelection {
        stock_data: true,
        web_search: false,
    });
    assert_eq!(lines, vec!["- YFinance: Enabled", "- SerpAPI: Disabled"]);
}
