pub mod baselines;
use anyhow::{anyhow, Context, Result};
use hc_utils::IntLines;
use log::{debug, warn};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    collections::{BTreeMap, HashSet},
    fmt,
    fs::File,
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

impl_kv_string_serde! {
    Track {
        videos: usize,
        endpoints: usize,
        requests: usize,
        caches: usize,
        capacity: usize,
    }
}

/// The input files published for the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Small,
    Med1,
    Med2,
    Big,
}

pub const DEFAULT_SCENARIO: Scenario = Scenario::Big;

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Small,
        Scenario::Med1,
        Scenario::Med2,
        Scenario::Big,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Small => "small",
            Scenario::Med1 => "med1",
            Scenario::Med2 => "med2",
            Scenario::Big => "big",
        }
    }

    pub fn input_path(&self) -> PathBuf {
        Path::new("input")
            .join("hashcode2017")
            .join(format!("{}.in", self.name()))
    }

    pub fn output_path(&self) -> PathBuf {
        Path::new("output")
            .join("hashcode2017")
            .join(format!("{}.out", self.name()))
    }
}

impl FromStr for Scenario {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Scenario::ALL.iter().map(|s| s.name()).collect();
                anyhow!("Unknown scenario '{}', expected one of {}", s, names.join(", "))
            })
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Video ids stored on each cache server, indexed by cache id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Solution {
    pub caches: Vec<Vec<usize>>,
}

impl Solution {
    pub fn new() -> Self {
        Self { caches: Vec::new() }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        write!(writer, "{}", self.caches.len())?;
        for (cache, videos) in self.caches.iter().enumerate() {
            write!(writer, "\n{}", cache)?;
            for video in videos {
                write!(writer, " {}", video)?;
            }
        }
        Ok(())
    }

    pub fn write_file(&self, path: &Path) -> Result<()> {
        crate::write_file(path, |buffer| self.write(buffer))
    }

    /// Parses a submission. Cache descriptions may come in any order and
    /// caches that are not described stay empty.
    pub fn read<R: BufRead>(reader: R, challenge: &Challenge) -> Result<Self> {
        let mut lines = IntLines::new(reader);
        let [num_described] = lines
            .next_array::<usize, 1>()
            .context("Failed to read number of cache descriptions")?;
        if num_described > challenge.num_caches {
            return Err(anyhow!(
                "Solution describes {} caches but there are only {}",
                num_described,
                challenge.num_caches
            ));
        }

        let mut caches = vec![Vec::new(); challenge.num_caches];
        let mut described = vec![false; challenge.num_caches];
        for _ in 0..num_described {
            let ids = lines.next_line::<usize>()?;
            let (&cache, videos) = ids
                .split_first()
                .ok_or_else(|| anyhow!("Line {}: missing cache id", lines.line_no()))?;
            if cache >= challenge.num_caches {
                return Err(anyhow!(
                    "Line {}: cache ({}) is out of bounds",
                    lines.line_no(),
                    cache
                ));
            }
            if described[cache] {
                return Err(anyhow!(
                    "Line {}: cache ({}) is described more than once",
                    lines.line_no(),
                    cache
                ));
            }
            described[cache] = true;
            caches[cache] = videos.to_vec();
        }

        Ok(Self { caches })
    }

    pub fn from_file(path: &Path, challenge: &Challenge) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        Self::read(BufReader::new(file), challenge)
            .with_context(|| format!("Failed to parse solution {:?}", path))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub origin_latency: u32,
    /// Latency to each connected cache server. Missing caches are unreachable.
    pub cache_latencies: BTreeMap<usize, u32>,
}

/// Aggregated requests for one video coming from one endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Demand {
    pub endpoint: usize,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub num_caches: usize,
    pub capacity: usize,
    pub video_sizes: Vec<usize>,
    pub endpoints: Vec<Endpoint>,
    // demand per video, sorted by endpoint
    demands: Vec<Vec<Demand>>,
    // latency[cache][endpoint], u32::MAX where unreachable
    latencies: Vec<Vec<u32>>,
}

impl Challenge {
    /// Builds a scenario from raw request triples `(video, endpoint, count)`.
    /// Triples sharing a video and endpoint are summed.
    pub fn new(
        num_caches: usize,
        capacity: usize,
        video_sizes: Vec<usize>,
        endpoints: Vec<Endpoint>,
        requests: impl IntoIterator<Item = (usize, usize, u64)>,
    ) -> Result<Self> {
        let mut latencies = vec![vec![u32::MAX; endpoints.len()]; num_caches];
        for (endpoint_id, endpoint) in endpoints.iter().enumerate() {
            for (&cache, &latency) in &endpoint.cache_latencies {
                if cache >= num_caches {
                    return Err(anyhow!(
                        "Endpoint ({}) connects to cache ({}) which is out of bounds",
                        endpoint_id,
                        cache
                    ));
                }
                latencies[cache][endpoint_id] = latency;
            }
        }

        let mut aggregated = BTreeMap::<(usize, usize), u64>::new();
        for (video, endpoint, count) in requests {
            if video >= video_sizes.len() {
                return Err(anyhow!("Request for video ({}) is out of bounds", video));
            }
            if endpoint >= endpoints.len() {
                return Err(anyhow!(
                    "Request from endpoint ({}) is out of bounds",
                    endpoint
                ));
            }
            *aggregated.entry((video, endpoint)).or_default() += count;
        }

        let mut demands = vec![Vec::new(); video_sizes.len()];
        for ((video, endpoint), count) in aggregated {
            if count > 0 {
                demands[video].push(Demand { endpoint, count });
            }
        }

        if num_caches == 0 || capacity == 0 {
            warn!("No cache space available, every request will be served by the origin");
        }

        Ok(Self {
            num_caches,
            capacity,
            video_sizes,
            endpoints,
            demands,
            latencies,
        })
    }

    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = IntLines::new(reader);
        let [num_videos, num_endpoints, num_requests, num_caches, capacity] = lines
            .next_array::<usize, 5>()
            .context("Failed to read header")?;
        let video_sizes = lines
            .next_exact::<usize>(num_videos)
            .context("Failed to read video sizes")?;

        let mut endpoints = Vec::with_capacity(num_endpoints);
        for endpoint in 0..num_endpoints {
            let [origin_latency, num_connections] = lines
                .next_array::<u32, 2>()
                .with_context(|| format!("Failed to read endpoint {}", endpoint))?;
            let mut cache_latencies = BTreeMap::new();
            for _ in 0..num_connections {
                let [cache, latency] = lines
                    .next_array::<u32, 2>()
                    .with_context(|| format!("Failed to read connection of endpoint {}", endpoint))?;
                cache_latencies.insert(cache as usize, latency);
            }
            endpoints.push(Endpoint {
                origin_latency,
                cache_latencies,
            });
        }

        let mut requests = Vec::with_capacity(num_requests);
        for _ in 0..num_requests {
            let [video, endpoint, count] = lines
                .next_array::<u64, 3>()
                .context("Failed to read request")?;
            requests.push((video as usize, endpoint as usize, count));
        }
        debug!(
            "Parsed {} videos, {} endpoints, {} request lines, {} caches",
            num_videos, num_endpoints, num_requests, num_caches
        );

        Self::new(num_caches, capacity, video_sizes, endpoints, requests)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        Self::read(BufReader::new(file)).with_context(|| format!("Failed to parse {:?}", path))
    }

    /// Writes the scenario in the input format, one line per aggregated request.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let num_requests: usize = self.demands.iter().map(Vec::len).sum();
        writeln!(
            writer,
            "{} {} {} {} {}",
            self.num_videos(),
            self.num_endpoints(),
            num_requests,
            self.num_caches,
            self.capacity
        )?;
        let sizes: Vec<String> = self.video_sizes.iter().map(|s| s.to_string()).collect();
        writeln!(writer, "{}", sizes.join(" "))?;
        for endpoint in &self.endpoints {
            writeln!(
                writer,
                "{} {}",
                endpoint.origin_latency,
                endpoint.cache_latencies.len()
            )?;
            for (cache, latency) in &endpoint.cache_latencies {
                writeln!(writer, "{} {}", cache, latency)?;
            }
        }
        for (video, demands) in self.demands.iter().enumerate() {
            for demand in demands {
                writeln!(writer, "{} {} {}", video, demand.endpoint, demand.count)?;
            }
        }
        Ok(())
    }

    pub fn write_file(&self, path: &Path) -> Result<()> {
        crate::write_file(path, |buffer| self.write(buffer))
    }

    pub fn generate_instance(seed: &[u8; 32], track: &Track) -> Result<Self> {
        if track.requests > 0 && (track.videos == 0 || track.endpoints == 0) {
            return Err(anyhow!("Requests need at least one video and one endpoint"));
        }
        let mut rng = SmallRng::from_seed(seed.clone());

        let video_sizes: Vec<usize> = (0..track.videos)
            .map(|_| rng.gen_range(1..=track.capacity.max(1)))
            .collect();

        let mut endpoints = Vec::with_capacity(track.endpoints);
        for _ in 0..track.endpoints {
            let origin_latency = rng.gen_range(2..=4000);
            let mut cache_latencies = BTreeMap::new();
            for cache in 0..track.caches {
                if rng.gen_bool(0.5) {
                    cache_latencies.insert(cache, rng.gen_range(1..origin_latency));
                }
            }
            endpoints.push(Endpoint {
                origin_latency,
                cache_latencies,
            });
        }

        let requests: Vec<(usize, usize, u64)> = (0..track.requests)
            .map(|_| {
                (
                    rng.gen_range(0..track.videos),
                    rng.gen_range(0..track.endpoints),
                    rng.gen_range(1..=1000),
                )
            })
            .collect();

        Self::new(
            track.caches,
            track.capacity,
            video_sizes,
            endpoints,
            requests,
        )
    }

    pub fn num_videos(&self) -> usize {
        self.video_sizes.len()
    }

    pub fn num_endpoints(&self) -> usize {
        self.endpoints.len()
    }

    pub fn demands(&self, video: usize) -> &[Demand] {
        &self.demands[video]
    }

    /// Latency from `cache` to every endpoint, `u32::MAX` where unreachable.
    pub fn cache_latencies(&self, cache: usize) -> &[u32] {
        &self.latencies[cache]
    }

    pub fn latency(&self, cache: usize, endpoint: usize) -> Option<u32> {
        self.endpoints[endpoint].cache_latencies.get(&cache).copied()
    }

    pub fn total_requests(&self) -> u64 {
        self.demands
            .iter()
            .flat_map(|demands| demands.iter().map(|d| d.count))
            .sum()
    }

    /// Sum of `count * (origin - best)` over every aggregated request, where
    /// best is the quickest cache holding the video that the endpoint reaches.
    pub fn evaluate_total_saving(&self, solution: &Solution) -> Result<u64> {
        if solution.caches.len() > self.num_caches {
            return Err(anyhow!(
                "Number of caches ({}) exceeds available caches ({})",
                solution.caches.len(),
                self.num_caches
            ));
        }

        let mut holders = vec![Vec::new(); self.num_videos()];
        for (cache, videos) in solution.caches.iter().enumerate() {
            let mut seen = HashSet::with_capacity(videos.len());
            let mut total_size = 0;
            for &video in videos {
                if video >= self.num_videos() {
                    return Err(anyhow!(
                        "Cache ({}) stores video ({}) which is out of bounds",
                        cache,
                        video
                    ));
                }
                if !seen.insert(video) {
                    return Err(anyhow!(
                        "Cache ({}) stores video ({}) more than once",
                        cache,
                        video
                    ));
                }
                total_size += self.video_sizes[video];
                holders[video].push(cache);
            }
            if total_size > self.capacity {
                return Err(anyhow!(
                    "Total size ({}) of cache ({}) exceeded capacity ({})",
                    total_size,
                    cache,
                    self.capacity
                ));
            }
        }

        let mut total_saving = 0u64;
        for (video, demands) in self.demands.iter().enumerate() {
            for demand in demands {
                let origin = self.endpoints[demand.endpoint].origin_latency;
                let best = holders[video]
                    .iter()
                    .filter_map(|&cache| self.latency(cache, demand.endpoint))
                    .fold(origin, u32::min);
                total_saving += demand.count * (origin - best) as u64;
            }
        }
        Ok(total_saving)
    }

    /// Contest score: average saving per request in microseconds, rounded down.
    pub fn evaluate_solution(&self, solution: &Solution) -> Result<u64> {
        let total_saving = self.evaluate_total_saving(solution)?;
        let total_requests = self.total_requests();
        if total_requests == 0 {
            return Ok(0);
        }
        Ok(total_saving * 1000 / total_requests)
    }

    pub fn verify_solution(&self, solution: &Solution) -> Result<()> {
        self.evaluate_total_saving(solution).map(|_| ())
    }

    pub fn compute_greedy_baseline(&self) -> Result<Solution> {
        let solution = RefCell::new(Solution::new());
        let save_solution_fn = |s: &Solution| -> Result<()> {
            *solution.borrow_mut() = s.clone();
            Ok(())
        };
        baselines::solve_challenge(self, &save_solution_fn, &None)?;
        Ok(solution.into_inner())
    }
}
