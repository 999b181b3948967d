//! Collision detection between moving gatherers and static items
//!
//! A gatherer is a disk swept along a line segment during one tick; an item
//! is a static disk. The detector reports every pass where the gatherer's
//! center comes close enough to the item's center, together with the moment
//! of closest approach on the segment.

use crate::geometry::Position;

/// Static collectible disk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Item {
    pub position: Position,
    pub radius: f64,
}

/// Moving collector disk travelling from `start` to `end` during the tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gatherer {
    pub start: Position,
    pub end: Position,
    pub radius: f64,
}

/// Indexed access to the colliding sets, so callers keep their own storage
pub trait GathererProvider {
    fn items_count(&self) -> usize;
    fn item(&self, idx: usize) -> Item;
    fn gatherers_count(&self) -> usize;
    fn gatherer(&self, idx: usize) -> Gatherer;
}

/// A gatherer reaching an item at parameter `time` along its segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatherEvent {
    pub gatherer_id: usize,
    pub item_id: usize,
    pub sq_distance: f64,
    pub time: f64,
}

struct Projection {
    sq_distance: f64,
    ratio: f64,
}

/// Closest approach of the segment `start -> end` to `point`
///
/// `ratio` is the unclamped segment parameter of the closest point;
/// `sq_distance` is the squared distance at that parameter.
fn project_point(start: Position, end: Position, point: Position) -> Projection {
    let vx = end.x - start.x;
    let vy = end.y - start.y;
    let ux = point.x - start.x;
    let uy = point.y - start.y;

    let u_dot_v = ux * vx + uy * vy;
    let u_len2 = ux * ux + uy * uy;
    let v_len2 = vx * vx + vy * vy;

    Projection {
        sq_distance: u_len2 - (u_dot_v * u_dot_v) / v_len2,
        ratio: u_dot_v / v_len2,
    }
}

/// Finds every (gatherer, item) pass within collection range
///
/// Events are ordered by time ascending; ties break by squared distance
/// ascending and then by discovery order. A gatherer that did not move
/// contributes no events.
pub fn find_gather_events(provider: &dyn GathererProvider) -> Vec<GatherEvent> {
    let mut events = Vec::new();

    for gatherer_id in 0..provider.gatherers_count() {
        let gatherer = provider.gatherer(gatherer_id);
        if gatherer.start == gatherer.end {
            continue;
        }

        for item_id in 0..provider.items_count() {
            let item = provider.item(item_id);
            let projection = project_point(gatherer.start, gatherer.end, item.position);
            let reach = gatherer.radius + item.radius;

            if projection.ratio >= 0.0
                && projection.ratio <= 1.0
                && projection.sq_distance < reach * reach
            {
                events.push(GatherEvent {
                    gatherer_id,
                    item_id,
                    sq_distance: projection.sq_distance,
                    time: projection.ratio,
                });
            }
        }
    }

    events.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then(a.sq_distance.total_cmp(&b.sq_distance))
    });
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    struct TestProvider {
        items: Vec<Item>,
        gatherers: Vec<Gatherer>,
    }

    impl GathererProvider for TestProvider {
        fn items_count(&self) -> usize {
            self.items.len()
        }

        fn item(&self, idx: usize) -> Item {
            self.items[idx]
        }

        fn gatherers_count(&self) -> usize {
            self.gatherers.len()
        }

        fn gatherer(&self, idx: usize) -> Gatherer {
            self.gatherers[idx]
        }
    }

    fn pos(x: f64, y: f64) -> Position {
        Position { x, y }
    }

    #[test]
    fn test_detects_all_collision_events() {
        let provider = TestProvider {
            items: vec![
                Item {
                    position: pos(1.0, 0.0),
                    radius: 0.3,
                },
                Item {
                    position: pos(1.0, 2.0),
                    radius: 0.3,
                },
            ],
            gatherers: vec![
                Gatherer {
                    start: pos(0.0, 0.0),
                    end: pos(2.0, 0.0),
                    radius: 0.6,
                },
                Gatherer {
                    start: pos(0.0, 2.0),
                    end: pos(2.0, 2.0),
                    radius: 0.6,
                },
            ],
        };

        let events = find_gather_events(&provider);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_does_not_detect_out_of_reach_items() {
        let provider = TestProvider {
            items: vec![
                Item {
                    position: pos(1.0, 0.0),
                    radius: 0.3,
                },
                Item {
                    position: pos(1.0, 1.0),
                    radius: 0.3,
                },
            ],
            gatherers: vec![Gatherer {
                start: pos(0.0, 0.0),
                end: pos(2.0, 0.0),
                radius: 0.6,
            }],
        };

        let events = find_gather_events(&provider);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].item_id, 0);
    }

    #[test]
    fn test_events_are_in_chronological_order() {
        let provider = TestProvider {
            items: vec![
                Item {
                    position: pos(3.0, 0.0),
                    radius: 0.3,
                },
                Item {
                    position: pos(1.0, 0.0),
                    radius: 0.3,
                },
            ],
            gatherers: vec![Gatherer {
                start: pos(0.0, 0.0),
                end: pos(4.0, 0.0),
                radius: 0.6,
            }],
        };

        let events = find_gather_events(&provider);
        assert_eq!(events.len(), 2);
        assert!(events.windows(2).all(|pair| pair[0].time <= pair[1].time));
        assert_eq!(events[0].item_id, 1);
        assert_eq!(events[1].item_id, 0);
    }

    #[test]
    fn test_event_carries_correct_data() {
        let provider = TestProvider {
            items: vec![Item {
                position: pos(1.0, 0.0),
                radius: 0.3,
            }],
            gatherers: vec![Gatherer {
                start: pos(0.0, 0.0),
                end: pos(2.0, 0.0),
                radius: 0.6,
            }],
        };

        let events = find_gather_events(&provider);
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.gatherer_id, 0);
        assert_eq!(event.item_id, 0);
        assert_approx_eq!(event.time, 0.5, 1e-10);
        assert_approx_eq!(event.sq_distance, 0.0, 1e-10);
    }

    #[test]
    fn test_stationary_gatherer_produces_no_events() {
        let provider = TestProvider {
            items: vec![Item {
                position: pos(0.0, 0.0),
                radius: 0.3,
            }],
            gatherers: vec![Gatherer {
                start: pos(0.0, 0.0),
                end: pos(0.0, 0.0),
                radius: 0.6,
            }],
        };

        assert!(find_gather_events(&provider).is_empty());
    }

    #[test]
    fn test_simultaneous_events_break_ties_by_distance() {
        // Both items are closest at the segment midpoint; the nearer one wins
        let provider = TestProvider {
            items: vec![
                Item {
                    position: pos(2.0, 0.3),
                    radius: 0.0,
                },
                Item {
                    position: pos(2.0, 0.0),
                    radius: 0.0,
                },
            ],
            gatherers: vec![Gatherer {
                start: pos(0.0, 0.0),
                end: pos(4.0, 0.0),
                radius: 0.5,
            }],
        };

        let events = find_gather_events(&provider);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].item_id, 1);
        assert_eq!(events[1].item_id, 0);
    }

    #[test]
    fn test_item_behind_segment_is_ignored() {
        let provider = TestProvider {
            items: vec![Item {
                position: pos(-1.0, 0.0),
                radius: 0.3,
            }],
            gatherers: vec![Gatherer {
                start: pos(0.0, 0.0),
                end: pos(2.0, 0.0),
                radius: 0.6,
            }],
        };

        assert!(find_gather_events(&provider).is_empty());
    }
}
