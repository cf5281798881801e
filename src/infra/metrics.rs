//! Evaluation metrics for episode rollouts.

use std::collections::VecDeque;

/// Moving average calculator
#[derive(Debug, Clone)]
pub struct MovingAverage {
    values: VecDeque<f32>,
    window_size: usize,
    sum: f32,
}

impl MovingAverage {
    pub fn new(window_size: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(window_size),
            window_size,
            sum: 0.0,
        }
    }

    pub fn push(&mut self, value: f32) {
        if self.values.len() >= self.window_size {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
            }
        }
        self.values.push_back(value);
        self.sum += value;
    }

    pub fn average(&self) -> f32 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum / self.values.len() as f32
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Episode-level evaluation tracker
#[derive(Debug)]
pub struct EpisodeMetrics {
    /// Mean per-agent episode returns
    pub returns: MovingAverage,
    /// Physics ticks consumed by the inner rollout
    pub inner_ticks: MovingAverage,
    /// Fraction of episodes where every agent arrived before the horizon
    pub completion_rate: MovingAverage,
    episodes: usize,
}

impl EpisodeMetrics {
    pub fn new(window_size: usize) -> Self {
        Self {
            returns: MovingAverage::new(window_size),
            inner_ticks: MovingAverage::new(window_size),
            completion_rate: MovingAverage::new(window_size),
            episodes: 0,
        }
    }

    /// Record one finished episode.
    pub fn record_episode(&mut self, mean_return: f32, inner_ticks: usize, completed: bool) {
        self.returns.push(mean_return);
        self.inner_ticks.push(inner_ticks as f32);
        self.completion_rate.push(if completed { 1.0 } else { 0.0 });
        self.episodes += 1;
    }

    pub fn episodes(&self) -> usize {
        self.episodes
    }

    /// Log a summary of the recorded episodes.
    pub fn log_summary(&self) {
        tracing::info!(
            "episodes: {} | mean return: {:.3} | mean inner ticks: {:.1} | completion rate: {:.0}%",
            self.episodes,
            self.returns.average(),
            self.inner_ticks.average(),
            self.completion_rate.average() * 100.0
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average_window() {
        let mut avg = MovingAverage::new(2);
        assert!(avg.is_empty());
        avg.push(1.0);
        avg.push(3.0);
        assert!((avg.average() - 2.0).abs() < 1e-6);
        avg.push(5.0);
        // 1.0 fell out of the window
        assert_eq!(avg.len(), 2);
        assert!((avg.average() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_episode_metrics_counts() {
        let mut metrics = EpisodeMetrics::new(10);
        metrics.record_episode(-1.0, 50, true);
        metrics.record_episode(-3.0, 150, false);
        assert_eq!(metrics.episodes(), 2);
        assert!((metrics.returns.average() + 2.0).abs() < 1e-6);
        assert!((metrics.completion_rate.average() - 0.5).abs() < 1e-6);
    }
}
