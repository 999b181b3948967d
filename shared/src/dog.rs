//! Dog avatar: road-clamped movement, bag, score and the idle clock

use serde::{Deserialize, Serialize};

use crate::geometry::{Direction, Position, Speed};
use crate::loot::{Bag, BagItem, LootId};
use crate::map::Map;
use crate::EPSILON;

/// Dog identifier, allocated monotonically within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DogId(pub u64);

/// Mutable avatar state of one player
#[derive(Debug, Clone, PartialEq)]
pub struct Dog {
    id: DogId,
    name: String,
    position: Position,
    default_speed: f64,
    speed: Speed,
    direction: Direction,
    bag: Bag,
    score: u64,
    in_game_ms: u64,
    idle_ms: u64,
}

impl Dog {
    pub fn new(id: DogId, name: impl Into<String>, position: Position, bag_capacity: usize) -> Self {
        Dog {
            id,
            name: name.into(),
            position,
            default_speed: 1.0,
            speed: Speed::zero(),
            direction: Direction::North,
            bag: Bag::new(bag_capacity),
            score: 0,
            in_game_ms: 0,
            idle_ms: 0,
        }
    }

    /// Rebuilds a dog from persisted state
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: DogId,
        name: String,
        position: Position,
        default_speed: f64,
        speed: Speed,
        direction: Direction,
        bag_capacity: usize,
        bag_items: Vec<BagItem>,
        score: u64,
        in_game_ms: u64,
        idle_ms: u64,
    ) -> Self {
        Dog {
            id,
            name,
            position,
            default_speed,
            speed,
            direction,
            bag: Bag::restore(bag_capacity, bag_items),
            score,
            in_game_ms,
            idle_ms,
        }
    }

    pub fn id(&self) -> DogId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn default_speed(&self) -> f64 {
        self.default_speed
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn bag(&self) -> &Bag {
        &self.bag
    }

    pub fn in_game_ms(&self) -> u64 {
        self.in_game_ms
    }

    pub fn idle_ms(&self) -> u64 {
        self.idle_ms
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn set_default_speed(&mut self, speed: f64) {
        self.default_speed = speed;
    }

    pub fn set_speed(&mut self, speed: Speed) {
        self.speed = speed;
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Halts the dog; the commanded direction is kept
    pub fn stop(&mut self) {
        self.speed = Speed::zero();
    }

    pub fn add_to_bag(&mut self, id: LootId, type_index: usize) -> bool {
        self.bag.add_item(id, type_index)
    }

    pub fn clear_bag(&mut self) {
        self.bag.clear();
    }

    pub fn increase_score(&mut self, points: u64) {
        self.score += points;
    }

    /// Moves the dog for `dt` seconds, clamped to the road network
    ///
    /// Starting from the current position, each road whose catchment contains
    /// the point reached so far pulls the target position into its own
    /// catchment, one axis at a time. Horizontal roads are visited first in
    /// index order, then vertical ones. If no chain of roads reaches the
    /// target the dog halts at the clamped point.
    ///
    /// Returns the swept segment `(start, stop)` for collision detection.
    pub fn advance(&mut self, dt: f64, map: &Map) -> (Position, Position) {
        let start = self.position;
        let next = Position {
            x: start.x + self.speed.x * dt,
            y: start.y + self.speed.y * dt,
        };
        let mut clamped = start;

        let roads = map.roads();
        let index_order = map
            .horizontal_roads_by_y()
            .iter()
            .chain(map.vertical_roads_by_x().iter());

        for entry in index_order {
            if clamped == next {
                break;
            }
            let road = &roads[entry.road_idx];
            if !road.is_point_on(clamped) {
                continue;
            }
            let bounds = road.catchment();
            if road.is_horizontal() {
                clamp_axis(&mut clamped.y, next.y, bounds.min_y, bounds.max_y);
                clamp_axis(&mut clamped.x, next.x, bounds.min_x, bounds.max_x);
            } else {
                clamp_axis(&mut clamped.x, next.x, bounds.min_x, bounds.max_x);
                clamp_axis(&mut clamped.y, next.y, bounds.min_y, bounds.max_y);
            }
        }

        if clamped != next {
            self.stop();
        }
        self.position = clamped;
        (start, clamped)
    }

    /// Advances the play and idle clocks for one tick
    ///
    /// Returns true once the dog has been idle for at least `retirement_ms`.
    /// Idle time is judged on the speed before movement, so a dog halted by
    /// clamping during this tick starts counting on the next one.
    pub fn track_idle(&mut self, delta_ms: u64, retirement_ms: u64) -> bool {
        self.in_game_ms += delta_ms;
        if self.speed.is_zero() {
            self.idle_ms += delta_ms;
        } else {
            self.idle_ms = 0;
        }
        self.idle_ms >= retirement_ms
    }
}

/// Pulls one axis of the clamped position toward `target` within `[min, max]`
///
/// An axis that already reached its target is left untouched.
fn clamp_axis(current: &mut f64, target: f64, min: f64, max: f64) {
    if *current == target {
        return;
    }
    if target > max + EPSILON {
        *current = max;
    } else if target < min - EPSILON {
        *current = min;
    } else {
        *current = target;
    }
}
