//! End-to-end pipeline tests: queue -> worker -> scheduler -> engine -> broker,
//! with the broker replaced by the scripted mock transport.

use std::sync::Arc;
use std::time::Duration;

use relay_broker::{
    BrokerClient, BrokerConfig, Credentials, MockTransport, OrderReply, Withdrawable,
};
use relay_core::{parse_alert, OrderSide, Signal, SignalAction};
use relay_executor::{BatchConfig, ExecutionConfig, Relay};
use rust_decimal_macros::dec;

fn setup(batch: BatchConfig) -> (Arc<MockTransport>, Relay) {
    let mock = Arc::new(MockTransport::new());
    let broker = Arc::new(BrokerClient::new(
        mock.clone(),
        Credentials::new("key", "secret", "81234567"),
        &BrokerConfig::default(),
    ));
    let relay = Relay::new(broker, batch, ExecutionConfig::default()).unwrap();
    (mock, relay)
}

fn affordable(mock: &MockTransport, ticker: &str) {
    mock.set_withdrawable(
        ticker,
        Withdrawable {
            available_cash: dec!(10000000),
            max_quantity: 1000,
        },
    );
}

fn buy(ticker: &str, score: f64) -> Signal {
    Signal::new(ticker, SignalAction::Buy, dec!(50000)).with_score(score)
}

fn order_tickers(mock: &MockTransport) -> Vec<String> {
    mock.order_bodies().into_iter().map(|o| o.stk_cd).collect()
}

#[tokio::test(start_paused = true)]
async fn test_window_executes_top_ranked_buys_without_further_traffic() {
    let (mock, relay) = setup(BatchConfig::default());
    for t in ["A", "B", "C", "D", "E"] {
        affordable(&mock, t);
    }

    for (t, s) in [("A", 10.0), ("B", 50.0), ("C", 30.0), ("D", 40.0), ("E", 20.0)] {
        relay.submit(buy(t, s));
    }

    // Before the window closes nothing is sent.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(mock.orders().is_empty());

    // No new signals arrive; the deadline check alone triggers the flush.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(order_tickers(&mock), vec!["B", "D", "C"]);
    assert!(mock
        .order_bodies()
        .iter()
        .all(|o| o.side == OrderSide::Buy && o.ord_qty == "20"));
    assert_eq!(relay.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_exit_mid_window_executes_before_flush() {
    let (mock, relay) = setup(BatchConfig::default());
    affordable(&mock, "A");
    mock.set_holding("HELD", 10);

    relay.submit(buy("A", 5.0));
    tokio::time::sleep(Duration::from_secs(2)).await;

    let exit = r#"{"ticker":"KRX:HELD","action":"Profit Target 1","price":12000}"#;
    relay.submit(parse_alert(exit).unwrap());
    tokio::time::sleep(Duration::from_secs(1)).await;

    let bodies = mock.order_bodies();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0].side, OrderSide::Sell);
    assert_eq!(bodies[0].stk_cd, "HELD");
    assert_eq!(bodies[0].ord_qty, "5");

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(order_tickers(&mock), vec!["HELD", "A"]);
}

#[tokio::test(start_paused = true)]
async fn test_threshold_filters_low_scores() {
    let batch = BatchConfig {
        score_threshold: 50.0,
        ..BatchConfig::default()
    };
    let (mock, relay) = setup(batch);
    for t in ["HIGH", "LOW"] {
        affordable(&mock, t);
    }

    relay.submit(buy("LOW", 40.0));
    relay.submit(buy("HIGH", 90.0));
    tokio::time::sleep(Duration::from_secs(15)).await;

    assert_eq!(order_tickers(&mock), vec!["HIGH"]);
}

#[tokio::test(start_paused = true)]
async fn test_expired_token_is_refreshed_once_inside_the_pipeline() {
    let (mock, relay) = setup(BatchConfig::default());
    mock.set_holding("HELD", 3);
    mock.push_order_reply(Ok(OrderReply::refused("8005", "token이 유효하지 않습니다")));

    relay.submit(Signal::new("HELD", SignalAction::FinalExit, dec!(0)));
    tokio::time::sleep(Duration::from_secs(1)).await;

    let orders = mock.orders();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].0, "mock-token-1");
    assert_eq!(orders[1].0, "mock-token-2");
    assert_eq!(mock.token_requests(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_worker_restarted_after_shutdown_keeps_queue() {
    let (mock, relay) = setup(BatchConfig::default());
    mock.set_holding("HELD", 4);

    relay.start();
    relay.shutdown();
    assert!(!relay.is_worker_alive());

    relay.submit(Signal::new("HELD", SignalAction::FinalExit, dec!(0)));
    assert!(relay.is_worker_alive());
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(order_tickers(&mock), vec!["HELD"]);
}
