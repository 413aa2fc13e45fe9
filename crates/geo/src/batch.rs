//! Nearest-first ranking of located items with optional parallelism.
//!
//! Backs the "stations near you" listing: every item is measured from a
//! single origin and the results are sorted closest first.

use crate::{haversine_distance, Coordinate};
use serde::Serialize;

/// Anything with a fixed position.
pub trait Located {
    /// The item's coordinate, or `None` if it has no usable location.
    fn location(&self) -> Option<Coordinate>;
}

impl Located for Coordinate {
    fn location(&self) -> Option<Coordinate> {
        Some(*self)
    }
}

/// An item paired with its distance from the origin.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Ranked<'a, T> {
    /// The ranked item
    pub item: &'a T,
    /// Distance from the origin in kilometers (Infinity if the item has no valid location)
    pub distance_km: f64,
}

/// Measures every item from `origin` and returns them sorted closest first.
///
/// Items without a valid location sort last with an infinite distance.
///
/// # Example
/// ```
/// use velo_geo::{rank_by_distance, Coordinate};
///
/// let origin = Coordinate::new(51.2194, 4.4025);
/// let points = vec![Coordinate::new(51.25, 4.45), Coordinate::new(51.22, 4.40)];
///
/// let ranked = rank_by_distance(&origin, &points, Some(1));
/// assert_eq!(ranked.len(), 1);
/// assert_eq!(*ranked[0].item, points[1]);
/// ```
pub fn rank_by_distance<'a, T>(
    origin: &Coordinate,
    items: &'a [T],
    max_results: Option<usize>,
) -> Vec<Ranked<'a, T>>
where
    T: Located + Sync,
{
    let mut results = measure_all(origin, items);

    results.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

    if let Some(max) = max_results {
        results.truncate(max);
    }

    results
}

/// Items within `radius_km` of `origin`, sorted closest first.
pub fn within_radius<'a, T>(origin: &Coordinate, items: &'a [T], radius_km: f64) -> Vec<Ranked<'a, T>>
where
    T: Located + Sync,
{
    let mut results = measure_all(origin, items);

    results.retain(|r| r.distance_km <= radius_km);
    results.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

    results
}

fn measure_all<'a, T>(origin: &Coordinate, items: &'a [T]) -> Vec<Ranked<'a, T>>
where
    T: Located + Sync,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        items.par_iter().map(|item| measure(origin, item)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        items.iter().map(|item| measure(origin, item)).collect()
    }
}

#[inline]
fn measure<'a, T: Located>(origin: &Coordinate, item: &'a T) -> Ranked<'a, T> {
    let distance_km = item
        .location()
        .filter(Coordinate::is_valid)
        .map_or(f64::INFINITY, |coord| haversine_distance(origin, &coord));

    Ranked { item, distance_km }
}
