// Randomness as a capability - patterns never read a global source

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A source of values in `[0, 1)`.
///
/// Every probabilistic pattern takes one of these at construction so tests
/// can pin behavior with a fixed sequence or a replayable seed.
pub type RandomSource = Box<dyn FnMut() -> f64 + Send>;

/// Replayable source: the same seed always yields the same sequence.
pub fn seeded_random(seed: u64) -> RandomSource {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Box::new(move || rng.r#gen::<f64>())
}

/// Entropy-seeded default used when a caller does not supply a source.
pub fn entropy_random() -> RandomSource {
    let mut rng = ChaCha8Rng::from_entropy();
    Box::new(move || rng.r#gen::<f64>())
}

/// Cycles through the given values forever. Test helper.
///
/// An empty input degenerates to a constant 0.0 source.
pub fn fixed_random(values: Vec<f64>) -> RandomSource {
    let mut index = 0;
    Box::new(move || {
        if values.is_empty() {
            return 0.0;
        }
        let value = values[index % values.len()];
        index += 1;
        value
    })
}
