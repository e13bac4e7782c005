//! Smoothing filters for sensor streams.

use std::collections::VecDeque;
use std::ops::{Add, Div};

use nalgebra::Vector3;

/// Arithmetic mean of the last `N` samples.
///
/// The history starts zero-filled, so the first readings are pulled toward
/// zero until the window has been refilled.
#[derive(Debug, Clone)]
pub struct RunningAverage<T> {
    history: VecDeque<T>,
    sum: T,
}

pub trait Sample: Copy + Default + Add<Output = Self> + Div<f64, Output = Self> {}

impl<T> Sample for T where T: Copy + Default + Add<Output = T> + Div<f64, Output = T> {}

impl<T: Sample> RunningAverage<T> {
    /// A window of `steps` samples. Zero is treated as one.
    pub fn new(steps: usize) -> Self {
        let steps = steps.max(1);
        Self {
            history: std::iter::repeat(T::default()).take(steps).collect(),
            sum: T::default(),
        }
    }

    pub fn steps(&self) -> usize {
        self.history.len()
    }

    /// Push a sample, evicting the oldest, and return the new mean.
    pub fn update(&mut self, sample: T) -> T {
        self.history.pop_front();
        self.history.push_back(sample);
        // Recomputed instead of running add/subtract to keep float drift out
        self.sum = self.history.iter().fold(T::default(), |acc, value| acc + *value);
        self.average()
    }

    pub fn average(&self) -> T {
        self.sum / self.history.len() as f64
    }

    pub fn reset(&mut self) {
        self.history.iter_mut().for_each(|value| *value = T::default());
        self.sum = T::default();
    }
}

pub type VectorAverage = RunningAverage<Vector3<f64>>;

/// Exponential low-pass: `y = retain * y + (1 - retain) * x`.
#[derive(Debug, Clone, Copy)]
pub struct LowPassFilter<T> {
    retain: f64,
    value: T,
}

impl<T> LowPassFilter<T>
where
    T: Sample + std::ops::Mul<f64, Output = T>,
{
    pub fn new(retain: f64) -> Self {
        Self {
            retain,
            value: T::default(),
        }
    }

    pub fn update(&mut self, sample: T) -> T {
        self.value = self.value * self.retain + sample * (1.0 - self.retain);
        self.value
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = T::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn starts_from_zero_history() {
        let mut average = RunningAverage::<f64>::new(4);
        assert_relative_eq!(average.update(8.0), 2.0);
        assert_relative_eq!(average.update(8.0), 4.0);
        assert_relative_eq!(average.update(8.0), 6.0);
        assert_relative_eq!(average.update(8.0), 8.0);
    }

    #[test]
    fn follows_a_ramp_one_window_behind() {
        let mut average = RunningAverage::<f64>::new(3);
        let means: Vec<f64> = (1..=5).map(|i| average.update(i as f64)).collect();
        assert_relative_eq!(means[0], 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(means[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(means[2], 2.0, epsilon = 1e-12);
        assert_relative_eq!(means[4], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn evicts_the_oldest_sample() {
        let mut average = RunningAverage::<f64>::new(2);
        average.update(1.0);
        average.update(3.0);
        assert_relative_eq!(average.update(5.0), 4.0);
        assert_eq!(average.steps(), 2);
    }

    #[test]
    fn averages_vectors_per_component() {
        let mut average = VectorAverage::new(2);
        average.update(Vector3::new(2.0, -4.0, 9.8));
        let mean = average.update(Vector3::new(4.0, 0.0, 9.8));
        assert_relative_eq!(mean, Vector3::new(3.0, -2.0, 9.8), epsilon = 1e-12);
    }

    #[test]
    fn zero_steps_behaves_like_one() {
        let mut average = RunningAverage::<f64>::new(0);
        assert_relative_eq!(average.update(7.5), 7.5);
    }

    #[test]
    fn low_pass_converges_toward_a_constant_input() {
        let mut filter = LowPassFilter::<f64>::new(0.9);
        assert_relative_eq!(filter.update(10.0), 1.0, epsilon = 1e-12);
        for _ in 0..200 {
            filter.update(10.0);
        }
        assert_relative_eq!(filter.value(), 10.0, epsilon = 1e-6);
        filter.reset();
        assert_relative_eq!(filter.value(), 0.0);
    }
}
