//! Grid points, continuous positions and axis-aligned road segments

use serde::{Deserialize, Serialize};

use crate::{EPSILON, ROAD_HALF_WIDTH};

/// Integer grid coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Continuous world coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl From<Point> for Position {
    fn from(point: Point) -> Self {
        Position {
            x: f64::from(point.x),
            y: f64::from(point.y),
        }
    }
}

/// Velocity vector in map units per second
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Speed {
    pub x: f64,
    pub y: f64,
}

impl Speed {
    pub fn zero() -> Self {
        Speed { x: 0.0, y: 0.0 }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Last commanded facing of a dog
///
/// `None` means the dog was told to stop; the previous facing is not kept,
/// but the state endpoint still renders it as "U".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    West,
    East,
    None,
}

impl Direction {
    /// Wire representation used by the game state endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::North => "U",
            Direction::South => "D",
            Direction::West => "L",
            Direction::East => "R",
            Direction::None => "U",
        }
    }
}

/// Axis-aligned bounds of a road catchment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

/// Oriented horizontal or vertical road segment with integer endpoints
///
/// Invariant: either both endpoints share `y` (horizontal) or both share `x`
/// (vertical). The constructors make any other shape unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Road {
    start: Point,
    end: Point,
}

impl Road {
    pub fn horizontal(start: Point, end_x: i32) -> Self {
        Road {
            start,
            end: Point {
                x: end_x,
                y: start.y,
            },
        }
    }

    pub fn vertical(start: Point, end_y: i32) -> Self {
        Road {
            start,
            end: Point {
                x: start.x,
                y: end_y,
            },
        }
    }

    pub fn is_horizontal(&self) -> bool {
        self.start.y == self.end.y
    }

    pub fn is_vertical(&self) -> bool {
        self.start.x == self.end.x
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    /// Catchment rectangle of the road
    ///
    /// Spans the exact segment extent along the road axis and
    /// `ROAD_HALF_WIDTH` to either side across it.
    pub fn catchment(&self) -> Bounds {
        if self.is_horizontal() {
            Bounds {
                min_x: f64::from(self.start.x.min(self.end.x)),
                max_x: f64::from(self.start.x.max(self.end.x)),
                min_y: f64::from(self.start.y) - ROAD_HALF_WIDTH,
                max_y: f64::from(self.start.y) + ROAD_HALF_WIDTH,
            }
        } else {
            Bounds {
                min_x: f64::from(self.start.x) - ROAD_HALF_WIDTH,
                max_x: f64::from(self.start.x) + ROAD_HALF_WIDTH,
                min_y: f64::from(self.start.y.min(self.end.y)),
                max_y: f64::from(self.start.y.max(self.end.y)),
            }
        }
    }

    /// True when `pos` lies within the catchment, with a small tolerance
    pub fn is_point_on(&self, pos: Position) -> bool {
        let bounds = self.catchment();
        pos.x >= bounds.min_x - EPSILON
            && pos.x <= bounds.max_x + EPSILON
            && pos.y >= bounds.min_y - EPSILON
            && pos.y <= bounds.max_y + EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_road_endpoints() {
        let road = Road::horizontal(Point { x: 0, y: 3 }, 10);
        assert!(road.is_horizontal());
        assert!(!road.is_vertical());
        assert_eq!(road.start(), Point { x: 0, y: 3 });
        assert_eq!(road.end(), Point { x: 10, y: 3 });
    }

    #[test]
    fn test_vertical_road_endpoints() {
        let road = Road::vertical(Point { x: 5, y: 0 }, -4);
        assert!(road.is_vertical());
        assert_eq!(road.end(), Point { x: 5, y: -4 });
    }

    #[test]
    fn test_catchment_spans_segment_and_half_width() {
        let road = Road::horizontal(Point { x: 0, y: 0 }, 10);
        let bounds = road.catchment();
        assert_eq!(bounds.min_x, 0.0);
        assert_eq!(bounds.max_x, 10.0);
        assert_eq!(bounds.min_y, -ROAD_HALF_WIDTH);
        assert_eq!(bounds.max_y, ROAD_HALF_WIDTH);
    }

    #[test]
    fn test_catchment_with_reversed_endpoints() {
        let road = Road::horizontal(Point { x: 10, y: 0 }, 0);
        let bounds = road.catchment();
        assert_eq!(bounds.min_x, 0.0);
        assert_eq!(bounds.max_x, 10.0);
    }

    #[test]
    fn test_point_on_road_inside_and_outside() {
        let road = Road::horizontal(Point { x: 0, y: 0 }, 10);
        assert!(road.is_point_on(Position { x: 5.0, y: 0.0 }));
        assert!(road.is_point_on(Position { x: 5.0, y: 0.4 }));
        assert!(!road.is_point_on(Position { x: 5.0, y: 0.41 }));
        assert!(!road.is_point_on(Position { x: -0.5, y: 0.0 }));
    }

    #[test]
    fn test_point_on_road_tolerance() {
        let road = Road::horizontal(Point { x: 0, y: 0 }, 10);
        assert!(road.is_point_on(Position {
            x: 10.0 + 1e-7,
            y: 0.0
        }));
        assert!(!road.is_point_on(Position { x: 10.01, y: 0.0 }));
    }

    #[test]
    fn test_direction_strings() {
        assert_eq!(Direction::North.as_str(), "U");
        assert_eq!(Direction::South.as_str(), "D");
        assert_eq!(Direction::West.as_str(), "L");
        assert_eq!(Direction::East.as_str(), "R");
        assert_eq!(Direction::None.as_str(), "U");
    }
}
