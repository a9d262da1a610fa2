//! Per-participant sampling cache.
//!
//! Hands out batches of items a participant has not seen yet, drawn in a fresh
//! uniformly random order on every request. Once a participant has seen most
//! of the combined pool (see [`SamplingPolicy::reset_threshold`]) and a batch
//! comes up short, their seen-set is cleared so they keep receiving items.
//!
//! Each participant's seen-set and RNG live behind their own async mutex; the
//! shared map lock is only held long enough to find or create that slot.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};

use bugsurvey_state::{CorpusSource, EventLog, Item, ItemId, Label, ParticipantId, Pools};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tracing::warn;

use crate::domain::LabelLookup;
use crate::metrics::METRICS;
use crate::obs;

/// Batch and exhaustion-reset tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingPolicy {
    /// Batch size used when the caller does not ask for one.
    pub default_batch_size: usize,
    /// Fraction of the combined pool a participant must have seen before a
    /// short batch clears their seen-set.
    pub reset_threshold: f64,
    /// After a reset, keep the ids already picked in the same request marked
    /// as seen so the refill pass cannot pick them twice.
    pub reseed_with_batch: bool,
    /// Fixed RNG seed; `None` seeds from OS entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            default_batch_size: 10,
            reset_threshold: 0.8,
            reseed_with_batch: true,
            seed: None,
        }
    }
}

/// Sizes of the pools behind the cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCounts {
    pub total: usize,
    pub synthetic: usize,
    pub real: usize,
}

/// Bookkeeping returned next to a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub total: usize,
    pub returned: usize,
    pub synthetic: usize,
    pub real: usize,
    /// Size of the participant's seen-set after the request
    pub seen: usize,
}

/// A batch of items plus its bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub items: Vec<Item>,
    pub counts: BatchCounts,
}

struct SeenState {
    ids: HashSet<ItemId>,
    seeded: bool,
    /// Shuffles this participant's batches
    rng: StdRng,
}

impl SeenState {
    fn new(rng: StdRng) -> Self {
        Self {
            ids: HashSet::new(),
            seeded: false,
            rng,
        }
    }
}

type Slot = Arc<AsyncMutex<SeenState>>;

/// Sampling cache over the two immutable pools.
pub struct SamplingCache {
    /// Synthetic pool followed by the real pool, one entry per distinct id
    items: Vec<Item>,
    index: HashMap<ItemId, usize>,
    counts: PoolCounts,
    policy: SamplingPolicy,
    /// Only for [`SamplingCache::sample`]; participants own their RNG
    anonymous_rng: Mutex<StdRng>,
    history: Option<Arc<dyn EventLog>>,
    participants: Mutex<HashMap<ParticipantId, Slot>>,
}

impl SamplingCache {
    /// Build the cache. An id that appears more than once (within a pool or
    /// across both) keeps its first occurrence; later copies are dropped.
    pub fn new(pools: Pools, policy: SamplingPolicy) -> Self {
        let mut items: Vec<Item> = Vec::with_capacity(pools.total());
        let mut index: HashMap<ItemId, usize> = HashMap::with_capacity(pools.total());
        for item in pools.synthetic.into_iter().chain(pools.real) {
            if let Some(&first) = index.get(&item.id) {
                warn!(
                    item = %item.id,
                    kept = %items[first].label,
                    dropped = %item.label,
                    "duplicate item id in corpus, keeping the first copy"
                );
                continue;
            }
            index.insert(item.id.clone(), items.len());
            items.push(item);
        }

        let synthetic = items
            .iter()
            .filter(|item| item.label == Label::Synthetic)
            .count();
        let counts = PoolCounts {
            total: items.len(),
            synthetic,
            real: items.len() - synthetic,
        };
        Self {
            anonymous_rng: Mutex::new(rng_for(policy.seed, None)),
            items,
            index,
            counts,
            policy,
            history: None,
            participants: Mutex::new(HashMap::new()),
        }
    }

    /// Build a cache from a corpus source (loads the pools once).
    pub fn from_source(source: &dyn CorpusSource, policy: SamplingPolicy) -> Self {
        Self::new(source.load_pools(), policy)
    }

    /// Seed each participant's seen-set from the items they already classified.
    pub fn with_history(mut self, log: Arc<dyn EventLog>) -> Self {
        self.history = Some(log);
        self
    }

    pub fn policy(&self) -> &SamplingPolicy {
        &self.policy
    }

    pub fn pool_counts(&self) -> PoolCounts {
        self.counts
    }

    /// Look up an item by id in either pool
    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    /// True label of a known item
    pub fn label_of(&self, id: &ItemId) -> Option<Label> {
        self.item(id).map(|item| item.label)
    }

    /// Serve up to `n` items the participant has not seen, marking them seen.
    ///
    /// Shorter than `n` only when the combined pool itself cannot supply `n`
    /// distinct items.
    pub async fn request_batch(&self, participant: &ParticipantId, n: usize) -> Vec<Item> {
        self.serve(participant, n).await.0
    }

    /// [`Self::request_batch`] plus the pool and seen-set counts.
    pub async fn request_batch_with_counts(&self, participant: &ParticipantId, n: usize) -> Batch {
        let (items, seen) = self.serve(participant, n).await;
        Batch {
            counts: BatchCounts {
                total: self.counts.total,
                returned: items.len(),
                synthetic: self.counts.synthetic,
                real: self.counts.real,
                seen,
            },
            items,
        }
    }

    async fn serve(&self, participant: &ParticipantId, n: usize) -> (Vec<Item>, usize) {
        let slot = self.slot(participant);
        let mut state = slot.lock().await;
        self.ensure_seeded(participant, &mut state).await;
        if n == 0 || self.items.is_empty() {
            return (Vec::new(), state.ids.len());
        }

        let order = permutation(self.items.len(), &mut state.rng);
        let picked = self.select(participant, &order, &mut state.ids, n);
        let seen = state.ids.len();
        drop(state);

        METRICS.inc_batches_served();
        METRICS.add_items_served(picked.len() as u64);
        obs::emit_batch_served(participant.as_str(), n, picked.len(), seen);

        let items = picked.into_iter().map(|i| self.items[i].clone()).collect();
        (items, seen)
    }

    /// Mark an item seen without serving it. Idempotent.
    pub async fn mark_seen(&self, participant: &ParticipantId, item: &ItemId) {
        let slot = self.slot(participant);
        let mut state = slot.lock().await;
        self.ensure_seeded(participant, &mut state).await;
        state.ids.insert(item.clone());
    }

    /// Size of the participant's seen-set
    pub async fn seen_count(&self, participant: &ParticipantId) -> usize {
        let slot = self.slot(participant);
        let mut state = slot.lock().await;
        self.ensure_seeded(participant, &mut state).await;
        state.ids.len()
    }

    /// Up to `n` random items without touching any seen-set.
    pub fn sample(&self, n: usize) -> Vec<Item> {
        permutation(self.items.len(), &mut *lock(&self.anonymous_rng))
            .into_iter()
            .take(n)
            .map(|i| self.items[i].clone())
            .collect()
    }

    /// Two-pass selection over `order`; see the module docs for the reset rule.
    fn select(
        &self,
        participant: &ParticipantId,
        order: &[usize],
        seen: &mut HashSet<ItemId>,
        n: usize,
    ) -> Vec<usize> {
        let mut picked = Vec::with_capacity(n.min(order.len()));
        fill(&self.items, order, seen, n, &mut picked);

        let exhausted = seen.len() as f64 >= self.items.len() as f64 * self.policy.reset_threshold;
        if picked.len() < n && exhausted {
            METRICS.inc_seen_resets();
            obs::emit_seen_reset(participant.as_str(), seen.len(), self.items.len());
            seen.clear();
            if self.policy.reseed_with_batch {
                seen.extend(picked.iter().map(|&i| self.items[i].id.clone()));
            }
            fill(&self.items, order, seen, n, &mut picked);
        }
        picked
    }

    fn slot(&self, participant: &ParticipantId) -> Slot {
        lock(&self.participants)
            .entry(participant.clone())
            .or_insert_with(|| {
                let rng = rng_for(self.policy.seed, Some(participant));
                Arc::new(AsyncMutex::new(SeenState::new(rng)))
            })
            .clone()
    }

    async fn ensure_seeded(&self, participant: &ParticipantId, state: &mut SeenState) {
        if state.seeded {
            return;
        }
        state.seeded = true;
        let Some(log) = &self.history else {
            return;
        };
        match log.read_participant(participant).await {
            Ok(events) => state.ids.extend(
                events
                    .into_iter()
                    .map(|e| e.item_id)
                    .filter(|id| self.index.contains_key(id)),
            ),
            Err(e) => warn!(
                participant = %participant,
                error = %e,
                "could not read answer history, starting with an empty seen-set"
            ),
        }
    }
}

impl LabelLookup for SamplingCache {
    fn label_of(&self, id: &ItemId) -> Option<Label> {
        SamplingCache::label_of(self, id)
    }
}

/// RNG for one participant (or the anonymous sampler when `None`).
///
/// With a fixed seed the stream depends only on the seed and the participant
/// id, so seeded runs are reproducible regardless of request interleaving.
fn rng_for(seed: Option<u64>, participant: Option<&ParticipantId>) -> StdRng {
    let Some(seed) = seed else {
        return StdRng::from_entropy();
    };
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    participant.hash(&mut hasher);
    StdRng::seed_from_u64(hasher.finish())
}

fn permutation(len: usize, rng: &mut StdRng) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(rng);
    order
}

/// Append unseen items from `order` to `picked` until it holds `n`.
fn fill(
    items: &[Item],
    order: &[usize],
    seen: &mut HashSet<ItemId>,
    n: usize,
    picked: &mut Vec<usize>,
) {
    for &i in order {
        if picked.len() >= n {
            break;
        }
        if seen.insert(items[i].id.clone()) {
            picked.push(i);
        }
    }
}

/// Lock a std mutex, recovering the data if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
