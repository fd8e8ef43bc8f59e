use rand::rngs::ThreadRng;
use rand::Rng;

use crate::config::LevelConfig;
use crate::error::Result;
use crate::stimulus::{AudioKey, VisualCoordinate};

/// Draws the stimulus streams for a session and injects lag-N repeats
#[derive(Debug, Clone)]
pub struct SequenceGenerator<R: Rng = ThreadRng> {
    rng: R,
}

impl SequenceGenerator<ThreadRng> {
    pub fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }
}

impl Default for SequenceGenerator<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> SequenceGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Grid cells drawn uniformly from every cell except the center control
    pub fn generate_visual(&mut self, config: &LevelConfig) -> Result<Vec<VisualCoordinate>> {
        config.validate()?;
        let cells = config.grid.stimulus_cells();
        let mut sequence = self.draw(&cells, config.sequence_len());
        self.inject_repeats(&mut sequence, config.n_back, config.repeat_probability);
        Ok(sequence)
    }

    pub fn generate_audio(&mut self, config: &LevelConfig) -> Result<Vec<AudioKey>> {
        config.validate()?;
        let mut sequence = self.draw(&config.audio_keys, config.sequence_len());
        self.inject_repeats(&mut sequence, config.n_back, config.repeat_probability);
        Ok(sequence)
    }

    fn draw<T: Clone>(&mut self, alphabet: &[T], len: usize) -> Vec<T> {
        (0..len)
            .map(|_| alphabet[self.rng.gen_range(0..alphabet.len())].clone())
            .collect()
    }

    /// One left-to-right pass. Copies see earlier overwrites, so repeat chains can form.
    fn inject_repeats<T: Clone>(&mut self, sequence: &mut [T], n_back: usize, probability: f64) {
        for i in n_back..sequence.len() {
            if self.rng.gen::<f64>() < probability {
                sequence[i] = sequence[i - n_back].clone();
            }
        }
    }
}
