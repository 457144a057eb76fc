use std::time::{Duration, Instant};

/// Per-session statistics kept by a front-end across restarts
pub struct GameMetrics {
    pub start_time: Instant,
    pub elapsed_time: Duration,
    pub high_score: u32,
    pub games_played: u32,
    pub total_score: u64,
    pub total_ticks: u64,
}

impl GameMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            elapsed_time: Duration::ZERO,
            high_score: 0,
            games_played: 0,
            total_score: 0,
            total_ticks: 0,
        }
    }

    pub fn update(&mut self) {
        self.elapsed_time = self.start_time.elapsed();
    }

    pub fn on_game_start(&mut self) {
        self.start_time = Instant::now();
        self.elapsed_time = Duration::ZERO;
    }

    pub fn on_game_over(&mut self, final_score: u32, ticks: u64) {
        self.games_played += 1;
        self.total_score += u64::from(final_score);
        self.total_ticks += ticks;
        self.high_score = self.high_score.max(final_score);
    }

    pub fn average_score(&self) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        self.total_score as f64 / f64::from(self.games_played)
    }

    pub fn format_time(&self) -> String {
        let total_secs = self.elapsed_time.as_secs();
        let minutes = total_secs / 60;
        let seconds = total_secs % 60;
        format!("{:02}:{:02}", minutes, seconds)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "games: {}, high score: {}, average score: {:.2}, ticks: {}",
            self.games_played,
            self.high_score,
            self.average_score(),
            self.total_ticks
        )
    }
}

impl Default for GameMetrics {
    fn default() -> Self {
        Self::new()
    }
}
