//! Sampling cache behaviour across batches, participants and restarts.

use std::collections::HashSet;
use std::sync::Arc;

use bugsurvey_core::{SamplingCache, SamplingPolicy};
use bugsurvey_state::fakes::{FailingEventLog, MemoryEventLog};
use bugsurvey_state::{ClassificationEvent, Item, ItemId, Label, ParticipantId, Pools};
use chrono::Utc;

fn pools(synthetic: usize, real: usize) -> Pools {
    let make = |prefix: &str, n: usize, label: Label| {
        (0..n)
            .map(|i| Item::new(format!("{prefix}{i}"), label, serde_json::json!({ "n": i })))
            .collect::<Vec<_>>()
    };
    Pools::new(
        make("syn-", synthetic, Label::Synthetic),
        make("real-", real, Label::Real),
    )
}

fn cache(synthetic: usize, real: usize, seed: u64) -> SamplingCache {
    SamplingCache::new(
        pools(synthetic, real),
        SamplingPolicy {
            seed: Some(seed),
            ..SamplingPolicy::default()
        },
    )
}

fn ids(items: &[Item]) -> Vec<ItemId> {
    items.iter().map(|i| i.id.clone()).collect()
}

fn answered(participant: &str, item: &str, label: Label) -> ClassificationEvent {
    ClassificationEvent::new(
        ParticipantId::from(participant),
        ItemId::from(item),
        label,
        label,
        500,
        Utc::now(),
    )
}

#[tokio::test]
async fn no_repeats_until_pool_is_exhausted() {
    let cache = cache(10, 10, 7);
    let p = ParticipantId::from("alice");
    let mut served = HashSet::new();

    for round in 0..5 {
        let batch = cache.request_batch(&p, 4).await;
        assert_eq!(batch.len(), 4, "round {round}");
        for id in ids(&batch) {
            assert!(served.insert(id), "item repeated before reset");
        }
        assert_eq!(cache.seen_count(&p).await, served.len());
    }
    assert_eq!(served.len(), 20);
}

#[tokio::test]
async fn batch_after_exhaustion_is_full_and_distinct() {
    let cache = cache(10, 10, 9);
    let p = ParticipantId::from("bob");
    for _ in 0..6 {
        assert_eq!(cache.request_batch(&p, 3).await.len(), 3);
    }
    assert_eq!(cache.seen_count(&p).await, 18);

    let batch = cache.request_batch(&p, 3).await;
    assert_eq!(batch.len(), 3);
    let distinct: HashSet<ItemId> = ids(&batch).into_iter().collect();
    assert_eq!(distinct.len(), 3);
    assert_eq!(cache.seen_count(&p).await, 3);
}

#[tokio::test]
async fn ids_shared_across_pools_still_reset() {
    let make = |label: Label| {
        (0..5)
            .map(|i| Item::new(format!("x{i}"), label, serde_json::json!({})))
            .collect::<Vec<_>>()
    };
    let cache = SamplingCache::new(
        Pools::new(make(Label::Synthetic), make(Label::Real)),
        SamplingPolicy {
            seed: Some(21),
            ..SamplingPolicy::default()
        },
    );
    assert_eq!(cache.pool_counts().total, 5);
    assert_eq!(cache.label_of(&ItemId::from("x3")), Some(Label::Synthetic));

    let p = ParticipantId::from("mia");
    for round in 0..3 {
        assert_eq!(cache.request_batch(&p, 5).await.len(), 5, "round {round}");
    }
}

#[tokio::test]
async fn oversized_request_returns_whole_pool() {
    let cache = cache(2, 1, 1);
    let p = ParticipantId::from("carol");
    let batch = cache.request_batch(&p, 10).await;
    assert_eq!(batch.len(), 3);
    let distinct: HashSet<ItemId> = ids(&batch).into_iter().collect();
    assert_eq!(distinct.len(), 3);
}

#[tokio::test]
async fn empty_pool_and_zero_count_give_empty_batches() {
    let empty = SamplingCache::new(Pools::default(), SamplingPolicy::default());
    let p = ParticipantId::from("dave");
    assert!(empty.request_batch(&p, 5).await.is_empty());

    let cache = cache(3, 3, 2);
    assert!(cache.request_batch(&p, 0).await.is_empty());
    assert_eq!(cache.seen_count(&p).await, 0);
}

#[tokio::test]
async fn participants_are_independent() {
    let cache = cache(4, 4, 3);
    let a = ParticipantId::from("a");
    let b = ParticipantId::from("b");
    cache.request_batch(&a, 6).await;
    assert_eq!(cache.seen_count(&a).await, 6);
    assert_eq!(cache.seen_count(&b).await, 0);
    assert_eq!(cache.request_batch(&b, 8).await.len(), 8);
}

#[tokio::test]
async fn counts_envelope_reports_pool_and_seen() {
    let cache = cache(3, 5, 4);
    let p = ParticipantId::from("erin");
    let batch = cache.request_batch_with_counts(&p, 2).await;
    assert_eq!(batch.items.len(), 2);
    assert_eq!(batch.counts.total, 8);
    assert_eq!(batch.counts.synthetic, 3);
    assert_eq!(batch.counts.real, 5);
    assert_eq!(batch.counts.returned, 2);
    assert_eq!(batch.counts.seen, 2);
}

#[tokio::test]
async fn mark_seen_is_idempotent_and_excludes_item() {
    let cache = cache(1, 2, 5);
    let p = ParticipantId::from("frank");
    let skip = ItemId::from("syn-0");
    cache.mark_seen(&p, &skip).await;
    cache.mark_seen(&p, &skip).await;
    assert_eq!(cache.seen_count(&p).await, 1);

    let batch = cache.request_batch(&p, 2).await;
    assert_eq!(batch.len(), 2);
    assert!(!ids(&batch).contains(&skip));
}

#[tokio::test]
async fn history_seeds_seen_set() {
    let log = Arc::new(MemoryEventLog::with_events(vec![
        answered("gina", "syn-0", Label::Synthetic),
        answered("gina", "real-1", Label::Real),
        answered("gina", "retired-item", Label::Real),
        answered("hank", "syn-1", Label::Synthetic),
    ]));
    let cache = cache(2, 3, 6).with_history(log);
    let p = ParticipantId::from("gina");

    assert_eq!(cache.seen_count(&p).await, 2);
    let batch = ids(&cache.request_batch(&p, 3).await);
    assert_eq!(batch.len(), 3);
    assert!(!batch.contains(&ItemId::from("syn-0")));
    assert!(!batch.contains(&ItemId::from("real-1")));
    assert_eq!(cache.seen_count(&p).await, 5);
}

#[tokio::test]
async fn unreadable_history_starts_empty() {
    let cache = cache(2, 2, 8).with_history(Arc::new(FailingEventLog));
    let p = ParticipantId::from("ivy");
    assert_eq!(cache.seen_count(&p).await, 0);
    assert_eq!(cache.request_batch(&p, 2).await.len(), 2);
}

#[tokio::test]
async fn sample_leaves_seen_sets_alone() {
    let cache = cache(3, 3, 10);
    assert_eq!(cache.sample(4).len(), 4);
    assert_eq!(cache.sample(100).len(), 6);
    assert_eq!(cache.seen_count(&ParticipantId::from("jo")).await, 0);
}

#[tokio::test]
async fn same_seed_same_batches() {
    let first = cache(5, 5, 42);
    let second = cache(5, 5, 42);
    let p = ParticipantId::from("kim");
    assert_eq!(
        ids(&first.request_batch(&p, 5).await),
        ids(&second.request_batch(&p, 5).await)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_for_one_participant_never_overlap() {
    let cache = Arc::new(cache(10, 10, 12));
    let p = ParticipantId::from("lee");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let p = p.clone();
            tokio::spawn(async move { ids(&cache.request_batch(&p, 5).await) })
        })
        .collect();

    let mut all = HashSet::new();
    for handle in handles {
        for id in handle.await.unwrap() {
            assert!(all.insert(id), "two concurrent batches shared an item");
        }
    }
    assert_eq!(all.len(), 20);
    assert_eq!(cache.seen_count(&p).await, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_participants_each_get_full_batches() {
    let cache = Arc::new(cache(6, 6, 13));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                let p = ParticipantId(format!("worker-{i}"));
                let batch = cache.request_batch(&p, 12).await;
                (batch.len(), cache.seen_count(&p).await)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), (12, 12));
    }
}
