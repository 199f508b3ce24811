pub mod leaderboard;
pub mod session;
