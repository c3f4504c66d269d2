#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for mt5agent-skills.
//!
//! These tests drive the registry and the built-in catalog end-to-end
//! against the scriptable mock client: catalog completeness, category
//! queries, fail-closed validation, result invariants, dry-run isolation,
//! and the trading flows that fan out over positions.

use std::sync::Arc;

use serde_json::json;

use mt5agent_client::{mock, ConnectionManager, MockConnector, MockMt5, Mt5Config};
use mt5agent_core::{AccountInfo, Mt5AgentError, OrderSide, SkillCategory};
use mt5agent_skills::{GetAccountInfoSkill, SkillRegistry};

fn demo_config() -> Mt5Config {
    Mt5Config::new(123_456, "secret", "Demo-Server")
}

fn account() -> AccountInfo {
    AccountInfo {
        login: 123_456,
        trade_mode: 0,
        name: "Test Account".to_string(),
        server: "Demo-Server".to_string(),
        currency: "USD".to_string(),
        company: "MetaQuotes".to_string(),
        leverage: 100,
        balance: 10_000.0,
        credit: 0.0,
        equity: 10_050.0,
        profit: 50.0,
        margin: 200.0,
        margin_free: 9_850.0,
        margin_level: 5_025.0,
        trade_allowed: true,
    }
}

async fn connected_manager(api: Arc<MockMt5>) -> Arc<ConnectionManager> {
    let manager = Arc::new(ConnectionManager::new(Arc::new(MockConnector::new(api))));
    manager.configure(demo_config()).await;
    manager.connect().await.unwrap();
    manager
}

async fn connected_registry(api: Arc<MockMt5>) -> SkillRegistry {
    SkillRegistry::with_builtins(connected_manager(api).await).unwrap()
}

// ---------------------------------------------------------------------------
// 1. Catalog completeness and category queries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn builtin_catalog_registers_expected_skills() {
    let registry = connected_registry(Arc::new(MockMt5::new())).await;
    assert_eq!(registry.skill_count(), 19);

    let expected = [
        "get_account_info",
        "get_terminal_info",
        "get_symbols",
        "get_symbol_info",
        "get_tick",
        "get_latest_rates",
        "get_rates_range",
        "get_latest_ticks",
        "get_orders",
        "get_positions",
        "place_market_order",
        "close_positions",
        "update_sltp",
        "get_history_orders",
        "get_history_deals",
        "calculate_margin",
        "calculate_profit",
        "calculate_max_volume",
        "calculate_spread",
    ];
    for name in &expected {
        assert!(
            registry.get(name).is_some(),
            "Expected skill '{name}' to be registered"
        );
    }
}

#[tokio::test]
async fn categories_are_distinct_in_first_seen_order() {
    let registry = connected_registry(Arc::new(MockMt5::new())).await;
    assert_eq!(
        registry.categories(),
        vec![
            SkillCategory::Account,
            SkillCategory::MarketData,
            SkillCategory::Trading,
            SkillCategory::Analysis,
        ]
    );
}

#[tokio::test]
async fn category_listing_is_an_exact_filter_over_all_skills() {
    let registry = connected_registry(Arc::new(MockMt5::new())).await;
    let all: Vec<&str> = registry.list_skills().iter().map(|d| d.name.as_str()).collect();

    let trading = registry.list_skills_by_category(SkillCategory::Trading);
    assert_eq!(trading.len(), 7);
    for descriptor in &trading {
        assert_eq!(descriptor.category, SkillCategory::Trading);
        assert!(all.contains(&descriptor.name.as_str()));
    }
}

#[tokio::test]
async fn tool_definitions_project_every_skill() {
    let registry = connected_registry(Arc::new(MockMt5::new())).await;
    let tools = registry.tool_definitions();
    assert_eq!(tools.len(), registry.skill_count());

    for tool in &tools {
        let value = serde_json::to_value(tool).unwrap();
        assert_eq!(value["type"], "function");
        assert!(value["function"]["name"].is_string());
        assert!(value["function"]["description"].is_string());
        assert!(value["function"]["parameters"].is_object());
    }
}

// ---------------------------------------------------------------------------
// 2. Registration misuse
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_registration_fails_and_keeps_original() {
    let api = Arc::new(MockMt5::new().with_account(account()));
    let manager = connected_manager(api).await;
    let mut registry = SkillRegistry::with_builtins(manager.clone()).unwrap();

    let err = registry
        .register(Arc::new(GetAccountInfoSkill::new(manager)))
        .unwrap_err();
    assert!(matches!(err, Mt5AgentError::DuplicateSkill(_)));
    assert_eq!(registry.skill_count(), 19);

    // The original registration still executes.
    let result = registry.execute("get_account_info", json!({})).await;
    assert!(result.success);
    assert_eq!(result.data.unwrap()["balance"], 10_000.0);
}

#[tokio::test]
async fn unregister_removes_skills_and_rejects_unknown_names() {
    let mut registry = connected_registry(Arc::new(MockMt5::new())).await;

    let err = registry.unregister("no_such_skill").unwrap_err();
    assert!(matches!(err, Mt5AgentError::SkillNotFound(_)));

    registry.unregister("get_tick").unwrap();
    assert!(registry.get("get_tick").is_none());
    assert_eq!(registry.skill_count(), 18);
}

// ---------------------------------------------------------------------------
// 3. Execution policy: failure results, never raised errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn executing_unknown_skill_reports_failure_naming_it() {
    let registry = connected_registry(Arc::new(MockMt5::new())).await;
    let result = registry.execute("warp_drive", json!({})).await;

    assert!(!result.success);
    assert!(result.data.is_none());
    assert!(result.error.unwrap().contains("warp_drive"));
}

#[tokio::test]
async fn results_carry_exactly_one_of_data_and_error() {
    let api = Arc::new(MockMt5::new().with_symbols(&["EURUSD", "GBPUSD"]));
    let registry = connected_registry(api).await;

    let ok = registry.execute("get_symbols", json!({})).await;
    assert!(ok.success);
    assert!(ok.data.is_some());
    assert!(ok.error.is_none());

    // Unknown symbol: the platform reports absence, the skill a failure.
    let failed = registry
        .execute("get_symbol_info", json!({"symbol": "XAUUSD"}))
        .await;
    assert!(!failed.success);
    assert!(failed.data.is_none());
    assert!(failed.error.unwrap().contains("XAUUSD"));
}

#[tokio::test]
async fn skill_calls_without_connection_become_failure_results() {
    let manager = Arc::new(ConnectionManager::new(Arc::new(MockConnector::new(
        Arc::new(MockMt5::new()),
    ))));
    let registry = SkillRegistry::with_builtins(manager).unwrap();

    let result = registry.execute("get_account_info", json!({})).await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("connect"));
}

#[tokio::test]
async fn external_client_failure_becomes_failure_result() {
    let api = Arc::new(MockMt5::new().failing("terminal gone away"));
    let registry = connected_registry(api).await;

    let result = registry.execute("get_positions", json!({})).await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("terminal gone away"));
}

// ---------------------------------------------------------------------------
// 4. Fail-closed validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_request_fields_are_rejected() {
    let registry = connected_registry(Arc::new(MockMt5::new())).await;
    let result = registry
        .execute("get_tick", json!({"symbol": "EURUSD", "shout": true}))
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("shout"));
}

#[tokio::test]
async fn range_constraints_are_reported_as_failures() {
    let registry = connected_registry(Arc::new(MockMt5::new())).await;

    let result = registry
        .execute("get_latest_rates", json!({"symbol": "EURUSD", "count": 0}))
        .await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("between 1 and 10000"));

    let result = registry
        .execute(
            "get_latest_ticks",
            json!({"symbol": "EURUSD", "seconds": 90_000}),
        )
        .await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("between 1 and 86400"));
}

#[tokio::test]
async fn missing_required_fields_are_rejected() {
    let registry = connected_registry(Arc::new(MockMt5::new())).await;
    let result = registry
        .execute("place_market_order", json!({"symbol": "EURUSD"}))
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("volume"));
}

// ---------------------------------------------------------------------------
// 5. Market data flows
// ---------------------------------------------------------------------------

#[tokio::test]
async fn symbols_listing_reports_count_and_honors_group() {
    let api = Arc::new(MockMt5::new().with_symbols(&["EURUSD", "GBPUSD", "EURJPY"]));
    let registry = connected_registry(api).await;

    let all = registry.execute("get_symbols", json!({})).await;
    let data = all.data.unwrap();
    assert_eq!(data["count"], 3);

    let jpy = registry
        .execute("get_symbols", json!({"group": "*JPY*"}))
        .await;
    let data = jpy.data.unwrap();
    assert_eq!(data["count"], 1);
    assert_eq!(data["symbols"][0], "EURJPY");
}

#[tokio::test]
async fn empty_rate_series_is_a_failure_naming_the_symbol() {
    let registry = connected_registry(Arc::new(MockMt5::new())).await;
    let result = registry
        .execute("get_latest_rates", json!({"symbol": "EURUSD"}))
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("EURUSD"));
}

// ---------------------------------------------------------------------------
// 6. Trading flows
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dry_run_orders_validate_without_mutating_anything() {
    let api = Arc::new(MockMt5::new());
    let registry = connected_registry(api.clone()).await;

    let result = registry
        .execute(
            "place_market_order",
            json!({"symbol": "EURUSD", "volume": 0.1, "order_side": "BUY", "dry_run": true}),
        )
        .await;

    assert!(result.success);
    let data = result.data.unwrap();
    assert_eq!(data["dry_run"], true);
    assert_eq!(data["retcode"], 0);

    assert_eq!(api.checked_orders().len(), 1);
    assert!(api.sent_orders().is_empty());
}

#[tokio::test]
async fn live_orders_are_sent_and_succeed_on_done_retcode() {
    let api = Arc::new(MockMt5::new());
    let registry = connected_registry(api.clone()).await;

    let result = registry
        .execute(
            "place_market_order",
            json!({"symbol": "EURUSD", "volume": 0.5, "order_side": "SELL", "sl": 1.12, "tp": 1.08}),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.data.unwrap()["retcode"], 10_009);

    let sent = api.sent_orders();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].volume, 0.5);
    assert_eq!(sent[0].side, OrderSide::Sell);
    assert_eq!(sent[0].sl, Some(1.12));
}

#[tokio::test]
async fn closing_with_no_open_positions_succeeds_with_zero_count() {
    let registry = connected_registry(Arc::new(MockMt5::new())).await;
    let result = registry.execute("close_positions", json!({})).await;

    assert!(result.success);
    let data = result.data.unwrap();
    assert_eq!(data["closed_count"], 0);
    assert_eq!(data["results"], json!([]));
}

#[tokio::test]
async fn close_positions_honors_magic_filter() {
    let api = Arc::new(MockMt5::new().with_positions(vec![
        mock::position(1, "EURUSD", OrderSide::Buy, 0.1, 7),
        mock::position(2, "EURUSD", OrderSide::Sell, 0.2, 9),
    ]));
    let registry = connected_registry(api.clone()).await;

    let result = registry.execute("close_positions", json!({"magic": 7})).await;

    assert!(result.success);
    assert_eq!(result.data.unwrap()["closed_count"], 1);
    assert_eq!(api.closed_tickets(), vec![1]);
}

#[tokio::test]
async fn close_positions_honors_symbol_list() {
    let api = Arc::new(MockMt5::new().with_positions(vec![
        mock::position(1, "EURUSD", OrderSide::Buy, 0.1, 0),
        mock::position(2, "GBPUSD", OrderSide::Buy, 0.1, 0),
    ]));
    let registry = connected_registry(api.clone()).await;

    let result = registry
        .execute("close_positions", json!({"symbols": ["GBPUSD"]}))
        .await;

    assert!(result.success);
    assert_eq!(result.data.unwrap()["closed_count"], 1);
    assert_eq!(api.closed_tickets(), vec![2]);
}

#[tokio::test]
async fn update_sltp_requires_at_least_one_level() {
    let registry = connected_registry(Arc::new(MockMt5::new())).await;
    let result = registry
        .execute("update_sltp", json!({"symbol": "EURUSD"}))
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("At least one"));
}

#[tokio::test]
async fn update_sltp_modifies_every_position_of_the_symbol() {
    let api = Arc::new(MockMt5::new().with_positions(vec![
        mock::position(1, "EURUSD", OrderSide::Buy, 0.1, 0),
        mock::position(2, "EURUSD", OrderSide::Buy, 0.3, 0),
        mock::position(3, "GBPUSD", OrderSide::Sell, 0.1, 0),
    ]));
    let registry = connected_registry(api.clone()).await;

    let result = registry
        .execute("update_sltp", json!({"symbol": "EURUSD", "sl": 1.08}))
        .await;

    assert!(result.success);
    assert_eq!(result.data.unwrap()["updated_count"], 2);
    assert_eq!(
        api.modified_sltp(),
        vec![(1, Some(1.08), None), (2, Some(1.08), None)]
    );
}

#[tokio::test]
async fn history_filters_pass_through_to_the_client() {
    let api = Arc::new(MockMt5::new().with_history_deals(vec![]));
    let registry = connected_registry(api).await;

    let result = registry
        .execute(
            "get_history_deals",
            json!({"date_from": "2024-05-01T00:00:00Z", "date_to": "2024-06-01T00:00:00Z"}),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.data.unwrap()["count"], 0);

    let backwards = registry
        .execute(
            "get_history_orders",
            json!({"date_from": "2024-06-01T00:00:00Z", "date_to": "2024-05-01T00:00:00Z"}),
        )
        .await;
    assert!(!backwards.success);
}

// ---------------------------------------------------------------------------
// 7. Analysis flows
// ---------------------------------------------------------------------------

#[tokio::test]
async fn spread_is_composed_from_tick_and_point() {
    let api = Arc::new(
        MockMt5::new()
            .with_tick("EURUSD", mock::tick(1.1000, 1.1002))
            .with_symbol_info(mock::symbol_info("EURUSD", 1.1000, 1.1002, 0.0001)),
    );
    let registry = connected_registry(api).await;

    let result = registry
        .execute("calculate_spread", json!({"symbol": "EURUSD"}))
        .await;

    assert!(result.success);
    let data = result.data.unwrap();
    assert_eq!(data["bid"], 1.1000);
    assert_eq!(data["ask"], 1.1002);
    assert!((data["spread_points"].as_f64().unwrap() - 0.0002).abs() < 1e-9);
    assert!((data["spread_pips"].as_f64().unwrap() - 2.0).abs() < 1e-6);
}

#[tokio::test]
async fn margin_price_defaults_to_the_market_side() {
    let api = Arc::new(
        MockMt5::new()
            .with_tick("EURUSD", mock::tick(1.2000, 1.2002))
            .with_margin(123.45),
    );
    let registry = connected_registry(api).await;

    let buy = registry
        .execute(
            "calculate_margin",
            json!({"symbol": "EURUSD", "volume": 0.1, "order_side": "BUY"}),
        )
        .await;
    assert!(buy.success);
    let data = buy.data.unwrap();
    assert_eq!(data["price"], 1.2002);
    assert_eq!(data["required_margin"], 123.45);

    let sell = registry
        .execute(
            "calculate_margin",
            json!({"symbol": "EURUSD", "volume": 0.1, "order_side": "SELL"}),
        )
        .await;
    assert_eq!(sell.data.unwrap()["price"], 1.2000);
}

#[tokio::test]
async fn profit_and_max_volume_are_delegated_to_the_platform() {
    let api = Arc::new(MockMt5::new().with_profit(-42.0).with_volume_by_margin(2.5));
    let registry = connected_registry(api).await;

    let profit = registry
        .execute(
            "calculate_profit",
            json!({
                "symbol": "EURUSD",
                "volume": 1.0,
                "order_side": "BUY",
                "price_open": 1.1000,
                "price_close": 1.0958
            }),
        )
        .await;
    assert!(profit.success);
    assert_eq!(profit.data.unwrap()["profit"], -42.0);

    let volume = registry
        .execute(
            "calculate_max_volume",
            json!({"symbol": "EURUSD", "margin": 1_000.0, "order_side": "BUY"}),
        )
        .await;
    assert!(volume.success);
    assert_eq!(volume.data.unwrap()["max_volume"], 2.5);
}
