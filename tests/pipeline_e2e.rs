// tests/pipeline_e2e.rs
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_yaml::Value;

use sov_herald::dedup::SeenStore;
use sov_herald::directory::NameDirectory;
use sov_herald::feed::types::NotificationHeader;
use sov_herald::feed::{NotificationFeed, SourceError};
use sov_herald::merge::NotificationKind;
use sov_herald::pipeline::{Pipeline, Stage};
use sov_herald::sde::ReferenceData;

struct MockFeed {
    headers: Vec<NotificationHeader>,
    bodies: HashMap<u64, Value>,
    fail_headers: bool,
    requested_ids: Mutex<Vec<BTreeSet<u64>>>,
}

impl MockFeed {
    fn new(headers: Vec<NotificationHeader>, bodies: HashMap<u64, Value>) -> Self {
        Self {
            headers,
            bodies,
            fail_headers: false,
            requested_ids: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl NotificationFeed for MockFeed {
    async fn fetch_headers(&self) -> Result<Vec<NotificationHeader>, SourceError> {
        if self.fail_headers {
            return Err(SourceError::Api {
                code: 520,
                message: "backend down".to_string(),
            });
        }
        Ok(self.headers.clone())
    }

    async fn fetch_bodies(&self, ids: &BTreeSet<u64>) -> Result<HashMap<u64, Value>, SourceError> {
        self.requested_ids.lock().unwrap().push(ids.clone());
        Ok(self
            .bodies
            .iter()
            .filter(|(id, _)| ids.contains(id))
            .map(|(id, v)| (*id, v.clone()))
            .collect())
    }
}

struct MockDirectory {
    names: HashMap<i64, String>,
    calls: AtomicUsize,
}

#[async_trait]
impl NameDirectory for MockDirectory {
    async fn resolve(&self, ids: &BTreeSet<i64>) -> Result<HashMap<i64, String>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .names
            .iter()
            .filter(|(id, _)| ids.contains(id))
            .map(|(id, name)| (*id, name.clone()))
            .collect())
    }
}

#[derive(Default)]
struct FakeSde {
    systems: HashMap<i64, String>,
    types: HashMap<i64, String>,
    celestials: HashMap<i64, String>,
}

impl ReferenceData for FakeSde {
    fn solar_system_name(&self, id: i64) -> Option<String> {
        self.systems.get(&id).cloned()
    }
    fn type_name(&self, id: i64) -> Option<String> {
        self.types.get(&id).cloned()
    }
    fn celestial_name(&self, id: i64) -> Option<String> {
        self.celestials.get(&id).cloned()
    }
    fn station_name(&self, _id: i64) -> Option<String> {
        None
    }
}

fn header(id: u64, type_id: u32) -> NotificationHeader {
    NotificationHeader {
        id,
        type_id,
        sender_id: 1000,
        sent_date: "2014-05-01 10:08:00".to_string(),
        sender_name: Some("CONCORD".to_string()),
        read: false,
    }
}

fn tower_body() -> Value {
    serde_yaml::from_str(
        "allianceID: 100\ncorpID: 200\ntypeID: 300\nsolarSystemID: 400\nmoonID: 500\n",
    )
    .unwrap()
}

fn fixture_sde() -> Arc<FakeSde> {
    Arc::new(FakeSde {
        systems: [(400i64, "J100000".to_string())].into_iter().collect(),
        types: [(300i64, "Tower".to_string())].into_iter().collect(),
        celestials: [(500i64, "Moon 1".to_string())].into_iter().collect(),
    })
}

fn fixture_directory() -> Arc<MockDirectory> {
    Arc::new(MockDirectory {
        names: [(100i64, "Alpha".to_string()), (200i64, "Beta".to_string())]
            .into_iter()
            .collect(),
        calls: AtomicUsize::new(0),
    })
}

fn all_kinds() -> HashSet<NotificationKind> {
    NotificationKind::ALL.into_iter().collect()
}

#[tokio::test]
async fn announces_once_then_dedups_across_cycles() {
    let feed = Arc::new(MockFeed::new(
        vec![header(1, 45)],
        [(1u64, tower_body())].into_iter().collect(),
    ));
    let directory = fixture_directory();
    let seen = SeenStore::open_in_memory().await.unwrap();
    let pipeline = Pipeline::new(
        feed.clone(),
        directory.clone(),
        seen,
        fixture_sde(),
        all_kinds(),
    );

    let first = pipeline.run_cycle().await.unwrap();
    assert_eq!(
        first,
        vec![
            "[2014-05-01 10:08:00] Control tower anchored in J100000: Tower [Alpha] <Beta> at Moon 1."
                .to_string()
        ]
    );
    assert_eq!(directory.calls.load(Ordering::SeqCst), 1);

    // Same feed contents next cycle: nothing is new.
    let second = pipeline.run_cycle().await.unwrap();
    assert!(second.is_empty());
}

#[tokio::test]
async fn unsupported_kind_never_reaches_merge_or_body_fetch() {
    // typeID 16 is not in the supported set even though a body exists.
    let feed = Arc::new(MockFeed::new(
        vec![header(1, 16), header(2, 45)],
        [(1u64, tower_body()), (2u64, tower_body())]
            .into_iter()
            .collect(),
    ));
    let seen = SeenStore::open_in_memory().await.unwrap();
    let pipeline = Pipeline::new(
        feed.clone(),
        fixture_directory(),
        seen,
        fixture_sde(),
        all_kinds(),
    );

    let messages = pipeline.run_cycle().await.unwrap();
    assert_eq!(messages.len(), 1);

    let requested = feed.requested_ids.lock().unwrap().clone();
    assert_eq!(requested, vec![[2u64].into_iter().collect::<BTreeSet<_>>()]);
}

#[tokio::test]
async fn header_without_body_is_dropped_silently() {
    let feed = Arc::new(MockFeed::new(
        vec![header(1, 45), header(2, 45)],
        [(2u64, tower_body())].into_iter().collect(),
    ));
    let seen = SeenStore::open_in_memory().await.unwrap();
    let pipeline = Pipeline::new(
        feed,
        fixture_directory(),
        seen,
        fixture_sde(),
        all_kinds(),
    );

    let messages = pipeline.run_cycle().await.unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Control tower anchored"));
}

#[tokio::test]
async fn ordering_follows_header_listing() {
    let feed = Arc::new(MockFeed::new(
        vec![header(9, 48), header(3, 38)],
        [
            (9u64, serde_yaml::from_str("solarSystemID: 400").unwrap()),
            (3u64, serde_yaml::from_str("solarSystemID: 400").unwrap()),
        ]
        .into_iter()
        .collect(),
    ));
    let seen = SeenStore::open_in_memory().await.unwrap();
    let pipeline = Pipeline::new(
        feed,
        fixture_directory(),
        seen,
        fixture_sde(),
        all_kinds(),
    );

    let messages = pipeline.run_cycle().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("SBU anchored"));
    assert!(messages[1].contains("Sovereignty claim failed"));
}

#[tokio::test]
async fn header_failure_aborts_the_cycle_at_the_first_stage() {
    let mut feed = MockFeed::new(vec![], HashMap::new());
    feed.fail_headers = true;
    let seen = SeenStore::open_in_memory().await.unwrap();
    let pipeline = Pipeline::new(
        Arc::new(feed),
        fixture_directory(),
        seen,
        fixture_sde(),
        all_kinds(),
    );

    let err = pipeline.run_cycle().await.unwrap_err();
    assert_eq!(err.stage, Stage::FetchHeaders);
}

#[tokio::test]
async fn empty_feed_completes_with_zero_messages() {
    let feed = Arc::new(MockFeed::new(vec![], HashMap::new()));
    let seen = SeenStore::open_in_memory().await.unwrap();
    let pipeline = Pipeline::new(
        feed.clone(),
        fixture_directory(),
        seen,
        fixture_sde(),
        all_kinds(),
    );

    let messages = pipeline.run_cycle().await.unwrap();
    assert!(messages.is_empty());

    // Empty id set still reaches fetch_bodies, which must not error.
    let requested = feed.requested_ids.lock().unwrap().clone();
    assert_eq!(requested, vec![BTreeSet::new()]);
}

#[tokio::test]
async fn try_run_cycle_runs_when_idle() {
    let feed = Arc::new(MockFeed::new(vec![], HashMap::new()));
    let seen = SeenStore::open_in_memory().await.unwrap();
    let pipeline = Pipeline::new(
        feed,
        fixture_directory(),
        seen,
        fixture_sde(),
        all_kinds(),
    );

    let outcome = pipeline.try_run_cycle().await;
    assert!(matches!(outcome, Some(Ok(ref v)) if v.is_empty()));
}
