use std::io;

use rand::Rng;
use rand_distr::{Distribution, Normal};

/// A sparse gradient batch that gets resampled in place every step.
#[derive(Debug)]
pub struct Batch {
    pub grad: Vec<f32>,
    pub indices: Vec<i32>,
    rows: i32,
    normal: Normal<f32>,
}

impl Batch {
    /// Creates a new `Batch`.
    ///
    /// # Arguments
    /// * `size` - The amount of indices per batch.
    /// * `cols` - The length of every gradient row.
    /// * `rows` - The amount of rows indices are drawn from.
    /// * `std_dev` - The standard deviation of the gradient values.
    ///
    /// # Returns
    /// An `InvalidInput` error if there are no rows to index or `std_dev` isn't valid.
    pub fn new(size: usize, cols: usize, rows: usize, std_dev: f32) -> io::Result<Self> {
        let rows = match i32::try_from(rows) {
            Ok(rows) if rows > 0 => rows,
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("cannot draw indices from {rows} rows"),
                ));
            }
        };

        if !(std_dev >= 0.) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("gradient std_dev must be non-negative, got {std_dev}"),
            ));
        }

        let normal = Normal::new(0., std_dev)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        Ok(Self {
            grad: vec![0.; size * cols],
            indices: vec![0; size],
            rows,
            normal,
        })
    }

    /// Draws new indices uniformly, repeats included, and new gradient values.
    pub fn sample<R: Rng>(&mut self, rng: &mut R) {
        for index in self.indices.iter_mut() {
            *index = rng.random_range(0..self.rows);
        }

        for value in self.grad.iter_mut() {
            *value = self.normal.sample(rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn samples_in_range() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut batch = Batch::new(64, 3, 10, 1.).unwrap();

        batch.sample(&mut rng);

        assert_eq!(batch.grad.len(), 192);
        assert!(batch.indices.iter().all(|i| (0..10).contains(i)));
    }

    #[test]
    fn rejects_empty_table() {
        assert!(Batch::new(4, 2, 0, 1.).is_err());
    }

    #[test]
    fn rejects_bad_std_dev() {
        for std_dev in [-1., f32::NAN, f32::INFINITY] {
            let err = Batch::new(4, 2, 3, std_dev).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput, "std_dev {std_dev}");
        }

        assert!(Batch::new(4, 2, 3, 0.).is_ok());
    }
}
