pub mod knapsack;
pub use knapsack::solve_challenge;
