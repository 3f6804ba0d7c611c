mod support;

use std::sync::Arc;
use std::time::Duration;

use stockwatch_core::{MarketDataError, SearchPhase, SearchPipeline, WatchlistStore};
use support::{stock, FakeProvider};
use tokio::time::{sleep, Instant};

const DEBOUNCE: Duration = Duration::from_millis(300);

fn pipeline(provider: FakeProvider) -> (Arc<WatchlistStore>, Arc<FakeProvider>, SearchPipeline) {
    let store = Arc::new(WatchlistStore::in_memory());
    let provider = Arc::new(provider);
    let pipeline = SearchPipeline::new(Arc::clone(&store), provider.clone(), DEBOUNCE);
    (store, provider, pipeline)
}

#[tokio::test(start_paused = true)]
async fn rapid_keystrokes_collapse_into_one_lookup() {
    let (store, provider, pipeline) =
        pipeline(FakeProvider::new().with_search("AAPL", vec![stock("AAPL", 150.0, 1.5)]));
    let start = Instant::now();

    pipeline.input("A");
    for query in ["AA", "AAP", "AAPL"] {
        sleep(Duration::from_millis(50)).await;
        pipeline.input(query);
    }
    sleep(Duration::from_millis(400)).await;

    let calls = provider.search_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "AAPL");
    let fired_after = calls[0].1 - start;
    assert!(
        fired_after >= Duration::from_millis(450) && fired_after < Duration::from_millis(460),
        "lookup fired after {fired_after:?}"
    );
    assert_eq!(pipeline.phase(), SearchPhase::Results);
    assert_eq!(store.snapshot().search_results().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn lookup_waits_for_quiet_window() {
    let (_store, provider, pipeline) = pipeline(FakeProvider::new());

    pipeline.input("MSFT");
    sleep(Duration::from_millis(299)).await;
    assert!(provider.search_calls().is_empty());
    assert_eq!(pipeline.phase(), SearchPhase::Debouncing);

    sleep(Duration::from_millis(10)).await;
    assert_eq!(provider.searched_queries(), vec!["MSFT"]);
}

#[tokio::test(start_paused = true)]
async fn blank_query_clears_without_calling_provider() {
    let (store, provider, pipeline) =
        pipeline(FakeProvider::new().with_search("AAPL", vec![stock("AAPL", 150.0, 1.5)]));

    pipeline.input("AAPL");
    sleep(Duration::from_millis(400)).await;
    assert_eq!(store.snapshot().search_results().len(), 1);

    pipeline.input("   ");
    sleep(Duration::from_millis(400)).await;

    assert_eq!(provider.search_calls().len(), 1);
    assert_eq!(pipeline.phase(), SearchPhase::Idle);
    assert_eq!(pipeline.query(), "   ");
    assert!(store.snapshot().search_results().is_empty());
    assert!(!store.snapshot().search_loading());
}

#[tokio::test(start_paused = true)]
async fn loading_flag_is_set_while_lookup_runs() {
    let (store, _provider, pipeline) = pipeline(FakeProvider::new().with_search_delayed(
        "AAPL",
        Ok(vec![stock("AAPL", 150.0, 1.5)]),
        Duration::from_secs(1),
    ));

    pipeline.input("AAPL");
    sleep(Duration::from_millis(350)).await;
    assert_eq!(pipeline.phase(), SearchPhase::Loading);
    assert!(store.snapshot().search_loading());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(pipeline.phase(), SearchPhase::Results);
    assert!(!store.snapshot().search_loading());
}

#[tokio::test(start_paused = true)]
async fn provider_failure_degrades_to_empty_results() {
    let (store, _provider, pipeline) = pipeline(
        FakeProvider::new()
            .with_search_failure("AAPL", MarketDataError::rate_limited("Note: 5 calls per minute")),
    );

    pipeline.input("AAPL");
    sleep(Duration::from_millis(400)).await;

    let state = store.snapshot();
    assert_eq!(pipeline.phase(), SearchPhase::Failed);
    assert!(state.search_results().is_empty());
    assert!(!state.search_loading());
    assert_eq!(state.error(), None);
}

#[tokio::test(start_paused = true)]
async fn unknown_symbol_ends_in_empty_phase() {
    let (store, _provider, pipeline) = pipeline(FakeProvider::new());

    pipeline.input("ZZZZ");
    sleep(Duration::from_millis(400)).await;

    assert_eq!(pipeline.phase(), SearchPhase::Empty);
    assert!(store.snapshot().search_results().is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_superseded_completion_is_discarded() {
    let (store, provider, pipeline) = pipeline(
        FakeProvider::new()
            .with_search_delayed(
                "AAPL",
                Ok(vec![stock("AAPL", 150.0, 1.5)]),
                Duration::from_secs(1),
            )
            .with_search("MSFT", vec![stock("MSFT", 300.0, -3.0)]),
    );

    pipeline.input("AAPL");
    sleep(Duration::from_millis(350)).await;
    pipeline.input("MSFT");
    sleep(Duration::from_millis(400)).await;
    sleep(Duration::from_secs(1)).await;

    assert_eq!(provider.searched_queries(), vec!["AAPL", "MSFT"]);
    let state = store.snapshot();
    assert_eq!(state.search_results().len(), 1);
    assert_eq!(state.search_results()[0].symbol.as_str(), "MSFT");
    assert_eq!(pipeline.phase(), SearchPhase::Results);
}

#[tokio::test]
async fn selecting_a_result_adds_it_and_ends_the_session() {
    let (store, _provider, pipeline) =
        pipeline(FakeProvider::new().with_search("AAPL", vec![stock("AAPL", 150.0, 1.5)]));

    let results = pipeline.search_now("AAPL").await.expect("lookup succeeds");
    pipeline.select(results[0].clone());

    let state = store.snapshot();
    assert_eq!(state.watchlist().len(), 1);
    assert_eq!(state.portfolio_value(), 150.0);
    assert!(state.search_results().is_empty());
    assert_eq!(pipeline.query(), "");
    assert_eq!(pipeline.phase(), SearchPhase::Idle);
}

#[tokio::test]
async fn search_now_returns_provider_error_and_clears_results() {
    let (store, _provider, pipeline) = pipeline(
        FakeProvider::new().with_search_failure("AAPL", MarketDataError::network("offline")),
    );

    let error = pipeline.search_now("AAPL").await.expect_err("lookup fails");

    assert_eq!(error.message(), "offline");
    assert!(store.snapshot().search_results().is_empty());
    assert_eq!(pipeline.phase(), SearchPhase::Failed);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_pipeline_cancels_pending_lookup() {
    let (_store, provider, pipeline) = pipeline(FakeProvider::new());

    pipeline.input("AAPL");
    drop(pipeline);
    sleep(Duration::from_secs(1)).await;

    assert!(provider.search_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_during_lookup_clears_loading_for_good() {
    let (store, provider, pipeline) = pipeline(FakeProvider::new().with_search_delayed(
        "AAPL",
        Ok(vec![stock("AAPL", 150.0, 1.5)]),
        Duration::from_secs(1),
    ));

    pipeline.input("AAPL");
    sleep(Duration::from_millis(350)).await;
    assert!(store.snapshot().search_loading());

    pipeline.cancel();
    assert!(!store.snapshot().search_loading());

    sleep(Duration::from_secs(2)).await;
    assert_eq!(provider.searched_queries(), vec!["AAPL"]);
    assert_eq!(pipeline.phase(), SearchPhase::Idle);
    assert!(!store.snapshot().search_loading());
    assert!(store.snapshot().search_results().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_racing_a_starting_lookup_never_leaves_loading_set() {
    for round in 0..50 {
        let store = Arc::new(WatchlistStore::in_memory());
        let provider =
            Arc::new(FakeProvider::new().with_search("AAPL", vec![stock("AAPL", 150.0, 1.5)]));
        let pipeline = Arc::new(SearchPipeline::new(
            Arc::clone(&store),
            provider,
            Duration::ZERO,
        ));

        pipeline.input("AAPL");
        let canceller = Arc::clone(&pipeline);
        tokio::spawn(async move { canceller.cancel() })
            .await
            .expect("cancel task completes");
        sleep(Duration::from_millis(20)).await;

        assert!(
            !store.snapshot().search_loading(),
            "loading flag left set in round {round}"
        );
    }
}
