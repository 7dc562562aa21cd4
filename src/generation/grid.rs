//! The hypercube grid used for the generation of unweighted events.
use crate::core::{Error, Result};

use num_traits::{Float, FromPrimitive};
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use std::convert::TryFrom;

/// Divides the unit hypercube $[0,1)^d$ into `bins^d` cells of equal volume and keeps, for every
/// cell, the largest weight seen so far and the number of times it was selected.
///
/// Cell `j` has the per-axis indices $n_k = \lfloor j / \mathrm{bins}^k \rfloor \bmod
/// \mathrm{bins}$. Ceilings only ever grow until the grid is [`reset`](Grid::reset).
#[derive(Clone, Debug)]
pub struct Grid<T> {
    dim: usize,
    bins: usize,
    max_values: Vec<T>,
    hits: Vec<usize>,
    global_max: T,
    prepared: bool,
}

impl<T: Float + FromPrimitive> Grid<T> {
    /// Creates an empty grid with `bins` bins along each of the `dim` axes.
    pub fn new(dim: usize, bins: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::configuration("the grid needs at least one dimension"));
        }
        if bins == 0 {
            return Err(Error::configuration("the grid needs at least one bin per axis"));
        }

        let size = u32::try_from(dim)
            .ok()
            .and_then(|exp| bins.checked_pow(exp))
            .ok_or_else(|| {
                Error::configuration(format!("{}^{} cells do not fit into memory", bins, dim))
            })?;

        tracing::debug!(dim, bins, cells = size, "created generation grid");

        Ok(Self {
            dim,
            bins,
            max_values: vec![T::zero(); size],
            hits: vec![0; size],
            global_max: T::zero(),
            prepared: false,
        })
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of bins along each axis.
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Number of cells.
    pub fn size(&self) -> usize {
        self.max_values.len()
    }

    /// Returns the cell containing `point`. Coordinates outside of $[0,1)$ are clamped onto the
    /// first or last bin of their axis.
    pub fn cell_of(&self, point: &[T]) -> usize {
        assert_eq!(point.len(), self.dim);

        let bins = self.bins_as_float();
        let (cell, _) = point.iter().fold((0, 1), |(cell, stride), &x| {
            let n = (x * bins)
                .floor()
                .to_usize()
                .unwrap_or(0)
                .min(self.bins - 1);
            (cell + n * stride, stride * self.bins)
        });

        cell
    }

    /// Returns the per-axis bin indices of `cell`.
    pub fn coordinates(&self, cell: usize) -> Vec<usize> {
        assert!(cell < self.size(), "cell {} out of range", cell);

        let mut rest = cell;
        (0..self.dim)
            .map(|_| {
                let n = rest % self.bins;
                rest /= self.bins;
                n
            })
            .collect()
    }

    /// Draws a uniformly distributed point inside `cell` and writes it into `point`.
    pub fn shoot<R: Rng>(&self, rng: &mut R, cell: usize, point: &mut [T])
    where
        Standard: Distribution<T>,
    {
        assert!(cell < self.size(), "cell {} out of range", cell);
        assert_eq!(point.len(), self.dim);

        let bins = self.bins_as_float();
        let mut rest = cell;

        for x in point.iter_mut() {
            let n = T::from_usize(rest % self.bins).unwrap_or_else(T::zero);
            rest /= self.bins;

            *x = (rng.gen::<T>() + n) / bins;
            // rounding may land on the upper boundary
            if *x >= T::one() {
                *x = T::one() - T::epsilon();
            }
        }
    }

    /// The largest weight seen in `cell`.
    pub fn max_value(&self, cell: usize) -> T {
        self.max_values[cell]
    }

    /// The largest weight seen in any cell.
    pub fn global_max(&self) -> T {
        self.global_max
    }

    /// How often `cell` was selected during generation.
    pub fn hits(&self, cell: usize) -> usize {
        self.hits[cell]
    }

    /// Records one selection of `cell`.
    pub fn increment(&mut self, cell: usize) {
        self.hits[cell] += 1;
    }

    /// Raises the ceiling of `cell`, and the global one, to `weight` if it is larger. Ceilings are
    /// never lowered; non-finite weights are ignored.
    pub fn set_value(&mut self, cell: usize, weight: T) {
        if !weight.is_finite() {
            return;
        }
        if weight > self.max_values[cell] {
            self.max_values[cell] = weight;
        }
        if weight > self.global_max {
            self.global_max = weight;
        }
    }

    /// Clears all ceilings and hit counters and marks the grid as unprepared.
    pub fn reset(&mut self) {
        self.max_values.iter_mut().for_each(|v| *v = T::zero());
        self.hits.iter_mut().for_each(|h| *h = 0);
        self.global_max = T::zero();
        self.prepared = false;
    }

    /// Whether the grid has been warmed up.
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub(crate) fn set_prepared(&mut self, prepared: bool) {
        self.prepared = prepared;
    }

    fn bins_as_float(&self) -> T {
        T::from_usize(self.bins).unwrap_or_else(T::nan)
    }
}
