//! Per-map simulation session and the tick pipeline

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::Rng;

use crate::collision::{find_gather_events, Gatherer, GathererProvider, Item};
use crate::dog::{Dog, DogId};
use crate::geometry::Position;
use crate::loot::{Loot, LootId};
use crate::loot_generator::{LootGenerator, LootGeneratorConfig};
use crate::map::{Map, MapId};
use crate::{DOG_HALF_WIDTH, LOOT_HALF_WIDTH, OFFICE_HALF_WIDTH};

/// Swept path of one dog during a tick
#[derive(Debug, Clone, Copy)]
struct Movement {
    dog_id: DogId,
    start: Position,
    stop: Position,
}

/// What a collision target resolves to
#[derive(Debug, Clone, Copy)]
enum Target {
    Loot(LootId),
    Office,
}

/// Collision scene for one tick: dog paths vs loot and offices
struct TickProvider<'a> {
    movements: &'a [Movement],
    objects: &'a [(Item, Target)],
}

impl GathererProvider for TickProvider<'_> {
    fn items_count(&self) -> usize {
        self.objects.len()
    }

    fn item(&self, idx: usize) -> Item {
        self.objects[idx].0
    }

    fn gatherers_count(&self) -> usize {
        self.movements.len()
    }

    fn gatherer(&self, idx: usize) -> Gatherer {
        let movement = &self.movements[idx];
        Gatherer {
            start: movement.start,
            end: movement.stop,
            radius: DOG_HALF_WIDTH,
        }
    }
}

/// Pending pickup or deposit, ordered by collision time
#[derive(Debug, Clone)]
enum CollectionEvent {
    Collect {
        dog_id: DogId,
        loot_id: LootId,
        time: f64,
    },
    Deposit {
        dog_id: DogId,
        time: f64,
    },
}

impl CollectionEvent {
    fn time(&self) -> f64 {
        match self {
            CollectionEvent::Collect { time, .. } => *time,
            CollectionEvent::Deposit { time, .. } => *time,
        }
    }
}

/// Per-map simulation container
///
/// Owns the dogs and loot items living on one map and runs the tick
/// pipeline. Dog and loot ids are allocated monotonically and never reused
/// within a session; both collections iterate in id order, which keeps every
/// tick deterministic for a given RNG state.
#[derive(Debug)]
pub struct GameSession {
    id: MapId,
    dogs: BTreeMap<DogId, Dog>,
    loots: BTreeMap<LootId, Loot>,
    next_dog_id: u64,
    next_loot_id: u64,
    loot_generator: LootGenerator,
    retirement_ms: u64,
    rng: StdRng,
}

impl GameSession {
    pub fn new(
        id: MapId,
        loot_config: LootGeneratorConfig,
        retirement_ms: u64,
        rng: StdRng,
    ) -> Self {
        GameSession {
            id,
            dogs: BTreeMap::new(),
            loots: BTreeMap::new(),
            next_dog_id: 0,
            next_loot_id: 0,
            loot_generator: LootGenerator::new(loot_config),
            retirement_ms,
            rng,
        }
    }

    /// Rebuilds a session from persisted state
    pub fn restore(
        id: MapId,
        dogs: Vec<Dog>,
        loots: Vec<Loot>,
        next_dog_id: u64,
        next_loot_id: u64,
        loot_config: LootGeneratorConfig,
        retirement_ms: u64,
        rng: StdRng,
    ) -> Self {
        GameSession {
            id,
            dogs: dogs.into_iter().map(|dog| (dog.id(), dog)).collect(),
            loots: loots.into_iter().map(|loot| (loot.id(), loot)).collect(),
            next_dog_id,
            next_loot_id,
            loot_generator: LootGenerator::new(loot_config),
            retirement_ms,
            rng,
        }
    }

    pub fn id(&self) -> &MapId {
        &self.id
    }

    pub fn dogs(&self) -> &BTreeMap<DogId, Dog> {
        &self.dogs
    }

    pub fn loots(&self) -> &BTreeMap<LootId, Loot> {
        &self.loots
    }

    pub fn dog(&self, id: DogId) -> Option<&Dog> {
        self.dogs.get(&id)
    }

    pub fn dog_mut(&mut self, id: DogId) -> Option<&mut Dog> {
        self.dogs.get_mut(&id)
    }

    pub fn next_dog_id(&self) -> u64 {
        self.next_dog_id
    }

    pub fn next_loot_id(&self) -> u64 {
        self.next_loot_id
    }

    pub fn retirement_ms(&self) -> u64 {
        self.retirement_ms
    }

    /// Creates a dog for a joining player and returns its id
    ///
    /// Without randomization the dog spawns at the start point of the first
    /// road; with it, at a uniform point within the catchment of a uniformly
    /// chosen road.
    pub fn add_dog(&mut self, name: &str, map: &Map, randomize: bool) -> DogId {
        let id = DogId(self.next_dog_id);
        self.next_dog_id += 1;

        let position = if randomize {
            self.random_road_position(map)
        } else {
            map.roads()
                .first()
                .map(|road| road.start().into())
                .unwrap_or(Position { x: 0.0, y: 0.0 })
        };

        self.dogs
            .insert(id, Dog::new(id, name, position, map.bag_capacity()));
        id
    }

    pub fn remove_dog(&mut self, id: DogId) -> Option<Dog> {
        self.dogs.remove(&id)
    }

    /// Places a loot item directly, allocating the next id
    pub fn spawn_loot(&mut self, position: Position, type_index: usize) -> LootId {
        let id = LootId(self.next_loot_id);
        self.next_loot_id += 1;
        self.loots.insert(id, Loot::new(id, position, type_index));
        id
    }

    /// Runs one tick of the simulation
    ///
    /// Generates loot, moves every dog, applies pickups and deposits in
    /// collision-time order and returns the ids of dogs whose idle time
    /// crossed the retirement threshold. Retired dogs stay in the session
    /// until the caller removes them.
    pub fn update(&mut self, map: &Map, delta_ms: u64) -> Vec<DogId> {
        self.generate_loot(map, delta_ms);

        let dt = delta_ms as f64 / 1000.0;
        let retirement_ms = self.retirement_ms;
        let mut retired = Vec::new();
        let mut movements = Vec::with_capacity(self.dogs.len());

        for (id, dog) in self.dogs.iter_mut() {
            if dog.track_idle(delta_ms, retirement_ms) {
                retired.push(*id);
            }
            let (start, stop) = dog.advance(dt, map);
            movements.push(Movement {
                dog_id: *id,
                start,
                stop,
            });
        }

        self.apply_collisions(map, &movements);
        retired
    }

    /// Generates new loot for this tick and scatters it over the roads
    pub fn generate_loot(&mut self, map: &Map, delta_ms: u64) {
        if map.type_count() == 0 {
            return;
        }

        let count =
            self.loot_generator
                .generate(delta_ms as f64, self.loots.len(), self.dogs.len());

        for _ in 0..count {
            let type_index = self.rng.gen_range(0..map.type_count());
            let position = self.random_road_position(map);
            self.spawn_loot(position, type_index);
        }
    }

    fn random_road_position(&mut self, map: &Map) -> Position {
        let roads = map.roads();
        if roads.is_empty() {
            return Position { x: 0.0, y: 0.0 };
        }

        let road = &roads[self.rng.gen_range(0..roads.len())];
        let bounds = road.catchment();
        Position {
            x: self.rng.gen_range(bounds.min_x..=bounds.max_x),
            y: self.rng.gen_range(bounds.min_y..=bounds.max_y),
        }
    }

    fn apply_collisions(&mut self, map: &Map, movements: &[Movement]) {
        if movements.is_empty() {
            return;
        }

        // Loot first (in id order), then offices, with stable indices
        let mut objects: Vec<(Item, Target)> = Vec::new();
        for (id, loot) in &self.loots {
            objects.push((
                Item {
                    position: loot.position(),
                    radius: LOOT_HALF_WIDTH,
                },
                Target::Loot(*id),
            ));
        }
        for office in map.offices() {
            objects.push((
                Item {
                    position: office.position.into(),
                    radius: OFFICE_HALF_WIDTH,
                },
                Target::Office,
            ));
        }

        let provider = TickProvider {
            movements,
            objects: &objects,
        };

        let mut events: Vec<CollectionEvent> = find_gather_events(&provider)
            .into_iter()
            .map(|event| {
                let dog_id = movements[event.gatherer_id].dog_id;
                match objects[event.item_id].1 {
                    Target::Loot(loot_id) => CollectionEvent::Collect {
                        dog_id,
                        loot_id,
                        time: event.time,
                    },
                    Target::Office => CollectionEvent::Deposit {
                        dog_id,
                        time: event.time,
                    },
                }
            })
            .collect();

        // Stable sort preserves the detector's tie-breaking
        events.sort_by(|a, b| a.time().total_cmp(&b.time()));

        for event in events {
            match event {
                CollectionEvent::Collect {
                    dog_id, loot_id, ..
                } => {
                    // The item may have been taken earlier this tick
                    let Some(loot) = self.loots.get(&loot_id) else {
                        continue;
                    };
                    let type_index = loot.type_index();
                    let Some(dog) = self.dogs.get_mut(&dog_id) else {
                        continue;
                    };
                    if dog.add_to_bag(loot_id, type_index) {
                        self.loots.remove(&loot_id);
                    }
                }
                CollectionEvent::Deposit { dog_id, .. } => {
                    let Some(dog) = self.dogs.get_mut(&dog_id) else {
                        continue;
                    };
                    if !dog.bag().is_empty() {
                        let points: u64 = dog
                            .bag()
                            .items()
                            .iter()
                            .map(|item| map.points_for_type(item.type_index))
                            .sum();
                        dog.increase_score(points);
                        dog.clear_bag();
                    }
                }
            }
        }
    }
}
