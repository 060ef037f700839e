//! Property-based test generators using proptest.
//!
//! Provides strategies for generating book collections that maintain
//! `updatedAt >= createdAt`. Instants are drawn from a coarse grid so that
//! equal timestamps, and timestamps equal to the reference, are common.

use booksync_core::{Document, Timestamp, CREATED_AT, UPDATED_AT};
use proptest::prelude::*;

/// 2024-01-01T00:00:00Z in Unix milliseconds.
const BASE_MILLIS: i64 = 1_704_067_200_000;
/// Grid step: six hours.
const STEP_MILLIS: i64 = 6 * 60 * 60 * 1000;
/// Number of grid points.
const GRID: i64 = 40;

fn grid_point(step: i64) -> Timestamp {
    Timestamp::from_millis(BASE_MILLIS + step * STEP_MILLIS).expect("grid point in range")
}

/// Strategy for timestamps on the grid.
pub fn timestamp_strategy() -> impl Strategy<Value = Timestamp> {
    (0..GRID).prop_map(grid_point)
}

/// Strategy for a `(createdAt, updatedAt)` pair with `updatedAt >= createdAt`.
pub fn lifetime_strategy() -> impl Strategy<Value = (Timestamp, Timestamp)> {
    (0..GRID)
        .prop_flat_map(|created| (Just(created), created..GRID))
        .prop_map(|(created, updated)| (grid_point(created), grid_point(updated)))
}

/// Strategy for a collection of up to `max` book documents with unique ids.
pub fn book_collection_strategy(max: usize) -> impl Strategy<Value = Vec<Document>> {
    prop::collection::vec(lifetime_strategy(), 0..=max).prop_map(|lifetimes| {
        lifetimes
            .into_iter()
            .enumerate()
            .map(|(i, (created, updated))| {
                Document::new(format!("book-{i:03}"))
                    .with_field("title", format!("Book {i}"))
                    .with_field(CREATED_AT, created)
                    .with_field(UPDATED_AT, updated)
            })
            .collect()
    })
}
