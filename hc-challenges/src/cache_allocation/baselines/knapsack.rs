use crate::cache_allocation::{Challenge, Solution};
use anyhow::Result;
use log::{debug, info};
use serde_json::{Map, Value};

/// Lowest latency at which each endpoint can currently fetch each video,
/// stored row major as endpoint x video. Values only ever decrease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickestLatency {
    num_videos: usize,
    latencies: Vec<u32>,
}

impl QuickestLatency {
    /// Every video starts out served by the origin.
    pub fn new(challenge: &Challenge) -> Self {
        let num_videos = challenge.num_videos();
        let mut latencies = Vec::with_capacity(challenge.num_endpoints() * num_videos);
        for endpoint in &challenge.endpoints {
            latencies.extend(std::iter::repeat(endpoint.origin_latency).take(num_videos));
        }
        Self {
            num_videos,
            latencies,
        }
    }

    pub fn get(&self, endpoint: usize, video: usize) -> u32 {
        self.latencies[endpoint * self.num_videos + video]
    }

    /// Records that `cache` now holds `video`.
    pub fn store(&mut self, challenge: &Challenge, cache: usize, video: usize) {
        for (endpoint, &latency) in challenge.cache_latencies(cache).iter().enumerate() {
            let quickest = &mut self.latencies[endpoint * self.num_videos + video];
            *quickest = (*quickest).min(latency);
        }
    }
}

/// Latency saved across all endpoints by placing each video on `cache`,
/// given what the caches decided so far already provide.
pub fn knapsack_values(challenge: &Challenge, quickest: &QuickestLatency, cache: usize) -> Vec<u64> {
    let latencies = challenge.cache_latencies(cache);
    (0..challenge.num_videos())
        .map(|video| {
            challenge
                .demands(video)
                .iter()
                .map(|demand| {
                    let current = quickest.get(demand.endpoint, video);
                    let improved = latencies[demand.endpoint].min(current);
                    demand.count * (current - improved) as u64
                })
                .sum()
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Knapsack {
    pub best_value: u64,
    /// Selected item indices in ascending order.
    pub items: Vec<usize>,
}

/// Exact 0/1 knapsack over `0..=capacity`.
///
/// Each item records, per weight, whether taking it matches or beats the
/// table without it. Backtracking from the last item credits those
/// decisions, so on equal value the later item is kept and the earlier one
/// left out. Items with no value or that cannot fit are never selected.
pub fn solve_knapsack(weights: &[usize], values: &[u64], capacity: usize) -> Knapsack {
    let candidates: Vec<usize> = (0..weights.len())
        .filter(|&i| values[i] > 0 && weights[i] <= capacity)
        .collect();

    let words = capacity / 64 + 1;
    let mut dp = vec![0u64; capacity + 1];
    let mut taken = vec![0u64; candidates.len() * words];
    for (row, &item) in candidates.iter().enumerate() {
        let weight = weights[item];
        let value = values[item];
        let decisions = &mut taken[row * words..(row + 1) * words];
        for w in (weight..=capacity).rev() {
            let with_item = dp[w - weight] + value;
            if with_item >= dp[w] {
                dp[w] = with_item;
                decisions[w / 64] |= 1 << (w % 64);
            }
        }
    }

    let mut items = Vec::new();
    let mut w = capacity;
    for (row, &item) in candidates.iter().enumerate().rev() {
        if (taken[row * words + w / 64] >> (w % 64)) & 1 == 1 {
            items.push(item);
            w -= weights[item];
        }
    }
    items.reverse();

    Knapsack {
        best_value: dp[capacity],
        items,
    }
}

/// Fills `cache` with the most valuable videos and lowers the quickest
/// latencies accordingly. Caches must be assigned in id order.
pub fn assign_cache(challenge: &Challenge, quickest: &mut QuickestLatency, cache: usize) -> Knapsack {
    let values = knapsack_values(challenge, quickest, cache);
    let knapsack = solve_knapsack(&challenge.video_sizes, &values, challenge.capacity);
    for &video in &knapsack.items {
        quickest.store(challenge, cache, video);
    }
    knapsack
}

pub fn solve_challenge(
    challenge: &Challenge,
    save_solution: &dyn Fn(&Solution) -> Result<()>,
    _hyperparameters: &Option<Map<String, Value>>,
) -> Result<()> {
    let num_caches = challenge.num_caches;
    info!(
        "Assigning {} videos to {} caches of capacity {}",
        challenge.num_videos(),
        num_caches,
        challenge.capacity
    );

    let mut quickest = QuickestLatency::new(challenge);
    let mut caches = Vec::with_capacity(num_caches);
    for cache in 0..num_caches {
        let knapsack = assign_cache(challenge, &mut quickest, cache);
        debug!(
            "Cache {}: {} videos worth {}",
            cache,
            knapsack.items.len(),
            knapsack.best_value
        );
        caches.push(knapsack.items);

        if (cache + 1) * 1000 % num_caches == 0 {
            info!("Completion: {:.1}%", (cache + 1) as f64 * 100.0 / num_caches as f64);
        }
    }

    save_solution(&Solution { caches })
}
