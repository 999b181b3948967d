//! # Dog Walking Game Simulation Engine
//!
//! This library contains the complete game model and per-tick simulation for
//! the multiplayer dog walking game. It is shared between the server binary
//! and the test suites and has no I/O of its own: the HTTP layer, persistence
//! and the retirement database all live in the `server` crate and drive this
//! engine through plain method calls.
//!
//! ## Core Components
//!
//! ### Geometry (`geometry`)
//! Integer grid points, continuous positions, speed vectors and axis-aligned
//! road segments. A road owns a rectangular *catchment* region in which a dog
//! counts as being on the road; all movement is clamped to catchments.
//!
//! ### Map (`map`)
//! Immutable static data loaded from the config file: roads, buildings,
//! offices, the loot type catalog and the per-map dog speed and bag capacity.
//! Roads are additionally indexed by their cross-axis coordinate to drive the
//! movement clamping loop.
//!
//! ### Loot (`loot`, `loot_generator`)
//! Scattered items a dog can pick up into its fixed-capacity bag, and the
//! probabilistic generator that decides how many new items appear each tick
//! based on the deficit between players and items on the ground.
//!
//! ### Dogs (`dog`)
//! The mutable avatar state: position, commanded speed and direction, bag,
//! score and the idle clock that eventually retires an inactive dog.
//!
//! ### Collision Detection (`collision`)
//! Sweeps each dog's per-tick path segment against the static items and
//! offices, producing time-ordered gather events. The provider is a small
//! trait so tests can feed synthetic scenes.
//!
//! ### Sessions (`session`, `game`)
//! One `GameSession` per map runs the tick pipeline: generate loot, move
//! every dog, detect collisions, apply pickups and deposits in time order,
//! then harvest retired dogs. `Game` is the root registry of maps, sessions
//! and global configuration.
//!
//! ## Determinism
//!
//! Every random decision (loot types, loot positions, random spawn points)
//! is drawn from a session-owned RNG injected at construction, so tests can
//! seed it and replay exact tick sequences.

pub mod collision;
pub mod dog;
pub mod game;
pub mod geometry;
pub mod loot;
pub mod loot_generator;
pub mod map;
pub mod session;

/// Half-width of a road catchment perpendicular to the segment
pub const ROAD_HALF_WIDTH: f64 = 0.4;

/// Tolerance used by point-on-road tests and movement clamping
pub const EPSILON: f64 = 1e-6;

/// Collection radius of a moving dog
pub const DOG_HALF_WIDTH: f64 = 0.3;

/// Collection radius of a loot item (dogs must touch its center)
pub const LOOT_HALF_WIDTH: f64 = 0.0;

/// Deposit radius of an office
pub const OFFICE_HALF_WIDTH: f64 = 0.25;
