pub mod greedy;
pub mod pool;
pub use greedy::solve_challenge;
