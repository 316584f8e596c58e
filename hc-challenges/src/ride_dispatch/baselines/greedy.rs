use super::pool::ActivePool;
use crate::ride_dispatch::{Car, Challenge, Ride, Solution};
use anyhow::{anyhow, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ranks a feasible ride for a free car. Higher is better.
pub trait ScoreFn {
    fn score(&self, challenge: &Challenge, car: &Car, ride: &Ride) -> f64;
}

/// `(distance + bonus)^exponent / journey time`: points earned per step the
/// car is busy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BonusRate {
    pub exponent: f64,
}

impl ScoreFn for BonusRate {
    fn score(&self, challenge: &Challenge, car: &Car, ride: &Ride) -> f64 {
        let bonus = if car.starts_on_time(ride) {
            challenge.bonus
        } else {
            0
        };
        ((ride.distance + bonus) as f64).powf(self.exponent) / car.journey_time(ride) as f64
    }
}

/// Prefers the ride the car can start soonest, ignoring what it pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeastWasted;

impl ScoreFn for LeastWasted {
    fn score(&self, _challenge: &Challenge, car: &Car, ride: &Ride) -> f64 {
        -((car.journey_time(ride) - ride.distance) as f64)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    BonusRate,
    LeastWasted,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub score_fn: ScoreKind,
    pub score_exponent: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            score_fn: ScoreKind::BonusRate,
            score_exponent: 1.0,
        }
    }
}

impl Config {
    /// Overlays the given hyperparameters on the defaults. Unknown keys are
    /// ignored.
    pub fn initialize(hyperparameters: &Option<Map<String, Value>>) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;
        if let (Value::Object(obj), Some(map)) = (&mut merged, hyperparameters) {
            for (k, v) in map {
                obj.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(merged).map_err(|e| anyhow!("Invalid hyperparameters: {}", e))
    }

    pub fn score_fn(&self) -> Box<dyn ScoreFn> {
        match self.score_fn {
            ScoreKind::BonusRate => Box::new(BonusRate {
                exponent: self.score_exponent,
            }),
            ScoreKind::LeastWasted => Box::new(LeastWasted),
        }
    }
}

/// Steps through the simulation handing each free car, in id order, the
/// best scoring ride it can still finish in time.
pub fn dispatch(challenge: &Challenge, score_fn: &dyn ScoreFn) -> Solution {
    let rides = &challenge.rides;
    let mut cars = vec![Car::new(); challenge.num_vehicles];
    let mut assigned = vec![Vec::new(); challenge.num_vehicles];
    let mut pool = ActivePool::new(rides);

    'simulation: for step in 0..challenge.steps {
        let expired = pool.expire(rides, step);
        if expired > 0 {
            debug!("Step {}: {} rides expired, {} active", step, expired, pool.len());
        }
        if pool.is_empty() {
            info!("No rides left at step {}", step);
            break;
        }

        for (vehicle, car) in cars.iter_mut().enumerate() {
            if pool.is_empty() {
                info!("No rides left at step {}", step);
                break 'simulation;
            }
            if car.free_at > step {
                continue;
            }
            car.free_at = step;

            let mut best = None;
            let mut best_score = f64::NEG_INFINITY;
            for index in pool.iter() {
                let ride = &rides[index];
                if !car.can_complete(ride) {
                    continue;
                }
                let score = score_fn.score(challenge, car, ride);
                if score > best_score {
                    best_score = score;
                    best = Some(index);
                }
            }

            if let Some(index) = best {
                let ride = &rides[index];
                car.take(ride);
                assigned[vehicle].push(ride.id);
                pool.remove(index);
            }
        }
    }

    Solution { rides: assigned }
}

pub fn solve_challenge(
    challenge: &Challenge,
    save_solution: &dyn Fn(&Solution) -> Result<()>,
    hyperparameters: &Option<Map<String, Value>>,
) -> Result<()> {
    let config = Config::initialize(hyperparameters)?;
    info!(
        "Dispatching {} rides to {} vehicles over {} steps ({:?})",
        challenge.rides.len(),
        challenge.num_vehicles,
        challenge.steps,
        config
    );

    let solution = dispatch(challenge, config.score_fn().as_ref());
    let total: usize = solution.rides.iter().map(Vec::len).sum();
    info!("Assigned {} of {} rides", total, challenge.rides.len());

    save_solution(&solution)
}
