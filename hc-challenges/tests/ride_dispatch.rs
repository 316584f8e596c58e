use hc_challenges::ride_dispatch::{
    baselines::{
        greedy::{dispatch, BonusRate, Config, LeastWasted, ScoreFn, ScoreKind},
        pool::ActivePool,
    },
    Car, Challenge, Position, Ride, Scenario, Solution, Track,
};
use serde_json::json;

// The worked example from the problem statement.
const A_EXAMPLE: &str = "3 4 2 3 2 10
0 0 1 3 2 9
1 2 1 0 0 9
2 0 2 2 0 9
";

fn ride(id: usize, start: (i64, i64), end: (i64, i64), s: i64, f: i64) -> Ride {
    Ride::new(
        id,
        Position::new(start.0, start.1),
        Position::new(end.0, end.1),
        s,
        f,
    )
}

fn generated(seed: u8) -> Challenge {
    let track: Track = "rows=40,cols=40,vehicles=8,rides=120,bonus=15,steps=300"
        .parse()
        .unwrap();
    Challenge::generate_instance(&[seed; 32], &track).unwrap()
}

#[test]
fn test_single_ride() {
    let challenge = Challenge::read("1 1 1 1 0 10\n0 0 0 2 0 10\n".as_bytes()).unwrap();
    let solution = challenge.compute_greedy_baseline().unwrap();
    assert_eq!(solution.rides, vec![vec![0]]);

    let mut output = Vec::new();
    solution.write(&mut output).unwrap();
    assert_eq!(String::from_utf8(output).unwrap(), "1 0");
}

#[test]
fn test_statement_example() {
    let challenge = Challenge::read(A_EXAMPLE.as_bytes()).unwrap();
    assert_eq!(challenge.rides[0].distance, 4);

    let solution = challenge.compute_greedy_baseline().unwrap();
    assert_eq!(solution.rides, vec![vec![0], vec![2, 1]]);
    assert_eq!(challenge.evaluate_solution(&solution).unwrap(), 10);

    let mut output = Vec::new();
    solution.write(&mut output).unwrap();
    assert_eq!(String::from_utf8(output).unwrap(), "1 0\n2 2 1");
}

#[test]
fn test_car_timing() {
    let mut car = Car::new();
    let ride = ride(0, (0, 3), (0, 7), 5, 9);
    assert_eq!(car.distance_to_start(&ride), 3);
    assert_eq!(car.journey_time(&ride), 9);
    assert!(car.starts_on_time(&ride));
    assert!(car.can_complete(&ride));

    car.free_at = 2;
    assert_eq!(car.journey_time(&ride), 7);
    assert!(car.starts_on_time(&ride));
    car.free_at = 3;
    assert!(!car.starts_on_time(&ride));
    assert!(!car.can_complete(&ride));

    car.take(&ride);
    assert_eq!(car.free_at, 10);
    assert_eq!(car.position, Position::new(0, 7));
}

#[test]
fn test_pool_order_and_removal() {
    let rides = vec![
        ride(0, (0, 0), (0, 1), 1, 50),
        ride(1, (0, 0), (0, 1), 5, 20),
        ride(2, (0, 0), (0, 1), 5, 10),
        ride(3, (0, 0), (0, 1), 0, 30),
    ];
    let mut pool = ActivePool::new(&rides);
    assert_eq!(pool.iter().collect::<Vec<_>>(), vec![1, 2, 0, 3]);

    pool.remove(2);
    assert_eq!(pool.iter().collect::<Vec<_>>(), vec![1, 0, 3]);
    pool.remove(1);
    assert_eq!(pool.iter().collect::<Vec<_>>(), vec![0, 3]);
    pool.remove(3);
    pool.remove(3);
    assert_eq!(pool.iter().collect::<Vec<_>>(), vec![0]);
    assert_eq!(pool.len(), 1);
}

#[test]
fn test_pool_expiry() {
    let rides = vec![
        ride(0, (0, 0), (0, 1), 0, 50),
        ride(1, (0, 0), (0, 1), 0, 20),
        ride(2, (0, 0), (0, 1), 0, 10),
        ride(3, (0, 0), (0, 1), 0, 20),
    ];
    let mut pool = ActivePool::new(&rides);
    assert_eq!(pool.expire(&rides, 9), 0);
    assert_eq!(pool.expire(&rides, 10), 1);

    pool.remove(3);
    assert_eq!(pool.expire(&rides, 20), 1);
    assert_eq!(pool.iter().collect::<Vec<_>>(), vec![0]);
    assert_eq!(pool.expire(&rides, 100), 1);
    assert!(pool.is_empty());
}

#[test]
fn test_unreachable_rides_are_skipped() {
    // Ride 0 cannot be reached before its deadline, ride 1 can.
    let rides = vec![ride(0, (0, 9), (0, 9), 0, 5), ride(1, (0, 1), (0, 3), 0, 5)];
    let challenge = Challenge::new(1, 10, 1, 0, 10, rides).unwrap();
    let solution = dispatch(&challenge, &BonusRate { exponent: 1.0 });
    assert_eq!(solution.rides, vec![vec![1]]);
}

#[test]
fn test_terminates_once_pool_is_empty() {
    let rides = vec![ride(0, (0, 0), (0, 2), 0, 10)];
    let challenge = Challenge::new(1, 3, 2, 0, 1_000_000_000_000, rides).unwrap();
    let solution = dispatch(&challenge, &BonusRate { exponent: 1.0 });
    assert_eq!(solution.rides, vec![vec![0], vec![]]);

    let rides = vec![ride(0, (0, 50), (0, 51), 0, 5)];
    let challenge = Challenge::new(1, 60, 1, 0, 1_000_000_000_000, rides).unwrap();
    let solution = dispatch(&challenge, &BonusRate { exponent: 1.0 });
    assert_eq!(solution.rides, vec![Vec::<usize>::new()]);
}

#[test]
fn test_terminates_without_vehicles() {
    let challenge = Challenge::read("10 10 0 0 0 3000000000\n".as_bytes()).unwrap();
    let solution = dispatch(&challenge, &BonusRate { exponent: 1.0 });
    assert!(solution.rides.is_empty());

    let rides = vec![ride(0, (0, 0), (0, 2), 0, 5)];
    let challenge = Challenge::new(1, 3, 0, 0, 1_000_000_000_000, rides).unwrap();
    let solution = dispatch(&challenge, &LeastWasted);
    assert!(solution.rides.is_empty());
}

#[test]
fn test_generated_dispatch_is_feasible() {
    for seed in 0..5 {
        let challenge = generated(seed);
        let solution = challenge.compute_greedy_baseline().unwrap();
        assert_eq!(solution.rides.len(), challenge.num_vehicles);

        let mut seen = vec![false; challenge.rides.len()];
        let mut expected = 0;
        for rides in &solution.rides {
            let mut car = Car::new();
            for &id in rides {
                assert!(!seen[id], "ride {} assigned twice", id);
                seen[id] = true;

                let ride = &challenge.rides[id];
                assert!(car.can_complete(ride));
                expected += ride.distance as u64;
                if car.starts_on_time(ride) {
                    expected += challenge.bonus as u64;
                }
                car.take(ride);
                assert!(car.free_at <= challenge.steps);
            }
        }
        assert_eq!(challenge.evaluate_solution(&solution).unwrap(), expected);
    }
}

#[test]
fn test_determinism() {
    let first = generated(9).compute_greedy_baseline().unwrap();
    let second = generated(9).compute_greedy_baseline().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_round_trip() {
    let challenge = generated(3);
    let solution = challenge.compute_greedy_baseline().unwrap();

    let mut output = Vec::new();
    solution.write(&mut output).unwrap();
    assert!(!output.ends_with(b"\n"));
    let parsed = Solution::read(output.as_slice(), &challenge).unwrap();
    assert_eq!(parsed, solution);

    let mut input = Vec::new();
    challenge.write(&mut input).unwrap();
    assert_eq!(Challenge::read(input.as_slice()).unwrap(), challenge);
}

#[test]
fn test_score_functions() {
    // Ride 0 pays a bonus but leaves the car waiting, ride 1 starts at once.
    let input = "1 10 1 2 10 1
0 3 0 7 5 100
0 1 0 2 0 100
";
    let challenge = Challenge::read(input.as_bytes()).unwrap();
    let car = Car::new();
    let rate = BonusRate { exponent: 1.0 };
    assert!((rate.score(&challenge, &car, &challenge.rides[0]) - 14.0 / 9.0).abs() < 1e-12);
    assert!((rate.score(&challenge, &car, &challenge.rides[1]) - 0.5).abs() < 1e-12);
    assert_eq!(LeastWasted.score(&challenge, &car, &challenge.rides[0]), -5.0);
    assert_eq!(LeastWasted.score(&challenge, &car, &challenge.rides[1]), -1.0);
    let squared = BonusRate { exponent: 2.0 };
    assert!((squared.score(&challenge, &car, &challenge.rides[0]) - 196.0 / 9.0).abs() < 1e-9);

    assert_eq!(dispatch(&challenge, &rate).rides, vec![vec![0]]);
    assert_eq!(dispatch(&challenge, &LeastWasted).rides, vec![vec![1]]);
}

#[test]
fn test_equal_scores_keep_pool_order() {
    let rides = vec![ride(0, (0, 1), (0, 2), 0, 10), ride(1, (0, 1), (0, 2), 0, 10)];
    let challenge = Challenge::new(1, 3, 1, 0, 1, rides).unwrap();
    let solution = dispatch(&challenge, &BonusRate { exponent: 1.0 });
    assert_eq!(solution.rides, vec![vec![0]]);
}

#[test]
fn test_config() {
    let config = Config::initialize(&None).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.score_fn, ScoreKind::BonusRate);
    assert_eq!(config.score_exponent, 1.0);

    let hyperparameters = json!({"score_fn": "least_wasted", "unused": 3})
        .as_object()
        .cloned();
    let config = Config::initialize(&hyperparameters).unwrap();
    assert_eq!(config.score_fn, ScoreKind::LeastWasted);
    assert_eq!(config.score_exponent, 1.0);

    let hyperparameters = json!({"score_exponent": "steep"}).as_object().cloned();
    assert!(Config::initialize(&hyperparameters).is_err());
    let hyperparameters = json!({"score_fn": "random"}).as_object().cloned();
    assert!(Config::initialize(&hyperparameters).is_err());
}

#[test]
fn test_hyperparameters_reach_solver() {
    let input = "1 10 1 2 10 1
0 3 0 7 5 100
0 1 0 2 0 100
";
    let challenge = Challenge::read(input.as_bytes()).unwrap();
    let hyperparameters = json!({"score_fn": "least_wasted"}).as_object().cloned();
    let solution = std::cell::RefCell::new(Solution::new());
    let save_solution_fn = |s: &Solution| -> anyhow::Result<()> {
        *solution.borrow_mut() = s.clone();
        Ok(())
    };
    hc_challenges::ride_dispatch::baselines::solve_challenge(
        &challenge,
        &save_solution_fn,
        &hyperparameters,
    )
    .unwrap();
    assert_eq!(solution.into_inner().rides, vec![vec![1]]);
}

#[test]
fn test_malformed_input() {
    let err = Challenge::read("3 4 2 3 2\n".as_bytes()).unwrap_err();
    assert_eq!(err.to_string(), "Failed to read header");
    assert!(Challenge::read("3 4 -1 0 2 10\n".as_bytes()).is_err());
    assert!(Challenge::read("3 4 1 2 2 10\n0 0 1 1 0 5\n".as_bytes()).is_err());
    assert!(Challenge::read("3 4 1 1 2 10\n0 0 1 x 0 5\n".as_bytes()).is_err());
}

#[test]
fn test_invalid_solutions() {
    let challenge = Challenge::read(A_EXAMPLE.as_bytes()).unwrap();

    assert!(Solution::read("1 0".as_bytes(), &challenge).is_err());
    assert!(Solution::read("2 0\n0".as_bytes(), &challenge).is_err());
    let parsed = Solution::read("1 0\n0".as_bytes(), &challenge).unwrap();
    assert_eq!(parsed.rides, vec![vec![0], vec![]]);

    let reused = Solution {
        rides: vec![vec![0], vec![0]],
    };
    let err = challenge.verify_solution(&reused).unwrap_err();
    assert_eq!(err.to_string(), "Ride (0) is assigned more than once");

    let unknown = Solution {
        rides: vec![vec![3], vec![]],
    };
    assert!(challenge.verify_solution(&unknown).is_err());

    let wrong_fleet = Solution {
        rides: vec![vec![0]],
    };
    assert!(challenge.verify_solution(&wrong_fleet).is_err());
}

#[test]
fn test_late_rides_earn_nothing() {
    let challenge = Challenge::read(A_EXAMPLE.as_bytes()).unwrap();
    // Ride 0 ends at step 6, ride 2 would then finish at step 12.
    let solution = Solution {
        rides: vec![vec![0, 2], vec![1]],
    };
    assert_eq!(challenge.evaluate_solution(&solution).unwrap(), 6 + 2);
}

#[test]
fn test_track_and_scenario_parsing() {
    let track: Track = "rows=3,cols=4,vehicles=2,rides=3,bonus=2,steps=10"
        .parse()
        .unwrap();
    assert_eq!(track.steps, 10);
    assert!("rows=3,cols=4".parse::<Track>().is_err());

    assert_eq!("c".parse::<Scenario>().unwrap(), Scenario::C);
    assert_eq!("D_Metropolis".parse::<Scenario>().unwrap(), Scenario::D);
    assert!("f".parse::<Scenario>().is_err());
    assert_eq!(
        Scenario::E.output_path(),
        std::path::Path::new("output/hashcode2018/e_high_bonus.output")
    );

    let bad = "rows=0,cols=4,vehicles=2,rides=3,bonus=2,steps=10"
        .parse::<Track>()
        .unwrap();
    assert!(Challenge::generate_instance(&[0; 32], &bad).is_err());
}
