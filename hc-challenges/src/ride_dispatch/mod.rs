pub mod baselines;
use anyhow::{anyhow, Context, Result};
use hc_utils::IntLines;
use log::debug;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    fmt,
    fs::File,
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

impl_kv_string_serde! {
    Track {
        rows: i64,
        cols: i64,
        vehicles: usize,
        rides: usize,
        bonus: i64,
        steps: i64,
    }
}

/// The input files published for the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    A,
    B,
    C,
    D,
    E,
}

pub const DEFAULT_SCENARIO: Scenario = Scenario::A;

impl Scenario {
    pub const ALL: [Scenario; 5] = [Scenario::A, Scenario::B, Scenario::C, Scenario::D, Scenario::E];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::A => "a_example",
            Scenario::B => "b_should_be_easy",
            Scenario::C => "c_no_hurry",
            Scenario::D => "d_metropolis",
            Scenario::E => "e_high_bonus",
        }
    }

    pub fn input_path(&self) -> PathBuf {
        Path::new("input")
            .join("hashcode2018")
            .join(format!("{}.in", self.name()))
    }

    pub fn output_path(&self) -> PathBuf {
        Path::new("output")
            .join("hashcode2018")
            .join(format!("{}.output", self.name()))
    }
}

impl FromStr for Scenario {
    type Err = anyhow::Error;

    /// Accepts the file name (`c_no_hurry`) or just its letter (`c`).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == s || scenario.name()[..1] == s)
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

/// A grid intersection.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub row: i64,
    pub col: i64,
}

impl Position {
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }

    pub fn distance(&self, other: &Position) -> i64 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Ride {
    pub id: usize,
    pub start: Position,
    pub end: Position,
    pub earliest_start: i64,
    pub latest_finish: i64,
    pub distance: i64,
}

impl Ride {
    pub fn new(
        id: usize,
        start: Position,
        end: Position,
        earliest_start: i64,
        latest_finish: i64,
    ) -> Self {
        Self {
            id,
            start,
            end,
            earliest_start,
            latest_finish,
            distance: start.distance(&end),
        }
    }
}

/// A vehicle's position and the step from which it can take new work.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Car {
    pub position: Position,
    pub free_at: i64,
}

impl Car {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn distance_to_start(&self, ride: &Ride) -> i64 {
        self.position.distance(&ride.start)
    }

    /// Steps from `free_at` until the ride is finished, including any wait
    /// for its earliest start.
    pub fn journey_time(&self, ride: &Ride) -> i64 {
        self.distance_to_start(ride)
            .max(ride.earliest_start - self.free_at)
            + ride.distance
    }

    pub fn can_complete(&self, ride: &Ride) -> bool {
        self.free_at + self.journey_time(ride) <= ride.latest_finish
    }

    /// Whether the car reaches the start no later than the earliest start.
    pub fn starts_on_time(&self, ride: &Ride) -> bool {
        self.free_at + self.distance_to_start(ride) <= ride.earliest_start
    }

    pub fn take(&mut self, ride: &Ride) {
        self.free_at += self.journey_time(ride);
        self.position = ride.end;
    }
}

/// Ride ids given to each vehicle, in the order they were assigned.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Solution {
    pub rides: Vec<Vec<usize>>,
}

impl Solution {
    pub fn new() -> Self {
        Self { rides: Vec::new() }
    }

    /// One line per vehicle, no newline after the last one.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        for (vehicle, rides) in self.rides.iter().enumerate() {
            if vehicle > 0 {
                writeln!(writer)?;
            }
            write!(writer, "{}", rides.len())?;
            for ride in rides {
                write!(writer, " {}", ride)?;
            }
        }
        Ok(())
    }

    pub fn write_file(&self, path: &Path) -> Result<()> {
        crate::write_file(path, |buffer| self.write(buffer))
    }

    pub fn read<R: BufRead>(reader: R, challenge: &Challenge) -> Result<Self> {
        let mut lines = IntLines::new(reader);
        let mut rides = Vec::with_capacity(challenge.num_vehicles);
        for vehicle in 0..challenge.num_vehicles {
            let ids = lines
                .next_line::<usize>()
                .with_context(|| format!("Failed to read rides of vehicle {}", vehicle))?;
            let (&count, ids) = ids
                .split_first()
                .ok_or_else(|| anyhow!("Line {}: missing ride count", lines.line_no()))?;
            if count != ids.len() {
                return Err(anyhow!(
                    "Line {}: declares {} rides but lists {}",
                    lines.line_no(),
                    count,
                    ids.len()
                ));
            }
            rides.push(ids.to_vec());
        }
        Ok(Self { rides })
    }

    pub fn from_file(path: &Path, challenge: &Challenge) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        Self::read(BufReader::new(file), challenge)
            .with_context(|| format!("Failed to parse solution {:?}", path))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub rows: i64,
    pub cols: i64,
    pub num_vehicles: usize,
    pub bonus: i64,
    pub steps: i64,
    /// Rides in input order, `rides[i].id == i`.
    pub rides: Vec<Ride>,
}

impl Challenge {
    pub fn new(
        rows: i64,
        cols: i64,
        num_vehicles: usize,
        bonus: i64,
        steps: i64,
        rides: Vec<Ride>,
    ) -> Result<Self> {
        for (field, value) in [("rows", rows), ("cols", cols), ("bonus", bonus), ("steps", steps)] {
            if value < 0 {
                return Err(anyhow!("{} ({}) must not be negative", field, value));
            }
        }
        for (index, ride) in rides.iter().enumerate() {
            if ride.id != index {
                return Err(anyhow!("Ride at position {} has id {}", index, ride.id));
            }
            if ride.earliest_start < 0 || ride.latest_finish < 0 {
                return Err(anyhow!("Ride ({}) has a negative time window", ride.id));
            }
        }
        Ok(Self {
            rows,
            cols,
            num_vehicles,
            bonus,
            steps,
            rides,
        })
    }

    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = IntLines::new(reader);
        let [rows, cols, num_vehicles, num_rides, bonus, steps] = lines
            .next_array::<i64, 6>()
            .context("Failed to read header")?;
        let num_vehicles = usize::try_from(num_vehicles)
            .map_err(|_| anyhow!("Fleet size ({}) must not be negative", num_vehicles))?;
        let num_rides = usize::try_from(num_rides)
            .map_err(|_| anyhow!("Ride count ({}) must not be negative", num_rides))?;

        let mut rides = Vec::with_capacity(num_rides);
        for id in 0..num_rides {
            let [a, b, x, y, s, f] = lines
                .next_array::<i64, 6>()
                .with_context(|| format!("Failed to read ride {}", id))?;
            rides.push(Ride::new(id, Position::new(a, b), Position::new(x, y), s, f));
        }
        debug!(
            "Parsed {}x{} grid, {} vehicles, {} rides, bonus {}, {} steps",
            rows, cols, num_vehicles, num_rides, bonus, steps
        );

        Self::new(rows, cols, num_vehicles, bonus, steps, rides)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        Self::read(BufReader::new(file)).with_context(|| format!("Failed to parse {:?}", path))
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(
            writer,
            "{} {} {} {} {} {}",
            self.rows,
            self.cols,
            self.num_vehicles,
            self.rides.len(),
            self.bonus,
            self.steps
        )?;
        for ride in &self.rides {
            writeln!(
                writer,
                "{} {} {} {} {} {}",
                ride.start.row,
                ride.start.col,
                ride.end.row,
                ride.end.col,
                ride.earliest_start,
                ride.latest_finish
            )?;
        }
        Ok(())
    }

    pub fn write_file(&self, path: &Path) -> Result<()> {
        crate::write_file(path, |buffer| self.write(buffer))
    }

    /// Rides are placed uniformly on the grid with a window that always
    /// leaves room to drive the ride itself.
    pub fn generate_instance(seed: &[u8; 32], track: &Track) -> Result<Self> {
        if track.rows <= 0 || track.cols <= 0 {
            return Err(anyhow!("Grid must have at least one row and column"));
        }
        if track.steps <= 0 {
            return Err(anyhow!("Simulation must have at least one step"));
        }
        let mut rng = SmallRng::from_seed(seed.clone());

        let mut rides = Vec::with_capacity(track.rides);
        for id in 0..track.rides {
            let start = Position::new(rng.gen_range(0..track.rows), rng.gen_range(0..track.cols));
            let end = Position::new(rng.gen_range(0..track.rows), rng.gen_range(0..track.cols));
            let distance = start.distance(&end);
            let earliest_start = rng.gen_range(0..track.steps);
            let slack = rng.gen_range(0..=track.steps / 4);
            let latest_finish = (earliest_start + distance + slack).min(track.steps);
            rides.push(Ride::new(id, start, end, earliest_start, latest_finish));
        }

        Self::new(
            track.rows,
            track.cols,
            track.vehicles,
            track.bonus,
            track.steps,
            rides,
        )
    }

    /// Replays every vehicle. A ride finishing by its deadline (and within
    /// the simulation) earns its distance, plus the bonus when it started
    /// exactly at its earliest start. Late rides are legal but earn nothing.
    pub fn evaluate_total_score(&self, solution: &Solution) -> Result<u64> {
        if solution.rides.len() != self.num_vehicles {
            return Err(anyhow!(
                "Number of vehicles ({}) does not match fleet size ({})",
                solution.rides.len(),
                self.num_vehicles
            ));
        }

        let mut assigned = vec![false; self.rides.len()];
        let mut total_score = 0u64;
        for (vehicle, rides) in solution.rides.iter().enumerate() {
            let mut car = Car::new();
            for &id in rides {
                if id >= self.rides.len() {
                    return Err(anyhow!(
                        "Vehicle ({}) is given ride ({}) which is out of bounds",
                        vehicle,
                        id
                    ));
                }
                if assigned[id] {
                    return Err(anyhow!("Ride ({}) is assigned more than once", id));
                }
                assigned[id] = true;

                let ride = &self.rides[id];
                let on_time = car.starts_on_time(ride);
                car.take(ride);
                if car.free_at <= ride.latest_finish && car.free_at <= self.steps {
                    total_score += ride.distance as u64;
                    if on_time {
                        total_score += self.bonus as u64;
                    }
                }
            }
        }
        Ok(total_score)
    }

    pub fn evaluate_solution(&self, solution: &Solution) -> Result<u64> {
        self.evaluate_total_score(solution)
    }

    pub fn verify_solution(&self, solution: &Solution) -> Result<()> {
        self.evaluate_total_score(solution).map(|_| ())
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
