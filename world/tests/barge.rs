use std::time::Duration;

use harbor_core::{
    BargePart, ChunkCoord, Command, Event, Facing, Flat, ObjectId, ShapeInfo, TileCoord,
    TileRect, Turn, NUM_CHUNKS, NUM_TILES,
};
use harbor_world::{self as world, ireg::BargeRecord, query, World};

const TICK: Duration = Duration::from_millis(100);

fn harbor(flat: Flat) -> World {
    let mut world = World::new();
    let mut events = Vec::new();
    for cx in 0..4 {
        for cy in 0..4 {
            world::apply(
                &mut world,
                Command::LoadChunk {
                    chunk: ChunkCoord::new(cx, cy),
                    flat: Some(flat),
                },
                &mut events,
            );
        }
    }
    world
}

fn run(world: &mut World, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
    events
}

fn launch(world: &mut World, tile: TileCoord, xtiles: u8, ytiles: u8, facing: Facing) -> ObjectId {
    let events = run(
        world,
        Command::SpawnBarge {
            shape: 961,
            xtiles,
            ytiles,
            facing,
            tile,
        },
    );
    events
        .iter()
        .find_map(|event| match event {
            Event::BargeSpawned { barge, .. } => Some(*barge),
            _ => None,
        })
        .expect("barge spawned")
}

fn spawn(world: &mut World, shape: ShapeInfo, tile: TileCoord) -> ObjectId {
    let events = run(
        world,
        Command::SpawnObject {
            shape,
            frame: 0,
            tile,
        },
    );
    events
        .iter()
        .find_map(|event| match event {
            Event::ObjectSpawned { object, .. } => Some(*object),
            _ => None,
        })
        .expect("object spawned")
}

fn crate_shape() -> ShapeInfo {
    ShapeInfo::new(400, 1, 1, 1)
}

fn rock_shape() -> ShapeInfo {
    ShapeInfo::new(500, 1, 1, 2).solid()
}

fn tile_of(world: &World, object: ObjectId) -> TileCoord {
    query::object(world, object).expect("object exists").tile
}

fn barge_tile(world: &World, barge: ObjectId) -> TileCoord {
    query::barge(world, barge).expect("barge exists").tile
}

#[test]
fn turning_right_carries_riders_into_the_rotated_footprint() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(10, 10, 0), 3, 2, Facing::North);
    let bow = spawn(&mut world, crate_shape(), TileCoord::new(10, 10, 0));
    let stern = spawn(&mut world, crate_shape(), TileCoord::new(9, 9, 0));
    let _ = run(&mut world, Command::Gather { barge });

    let events = run(
        &mut world,
        Command::TurnBarge {
            barge,
            turn: Turn::Right,
        },
    );

    assert!(events.contains(&Event::BargeTurned {
        barge,
        turn: Turn::Right,
        facing: Facing::East,
    }));
    let snapshot = query::barge(&world, barge).expect("barge exists");
    assert_eq!(snapshot.tile, TileCoord::new(10, 10, 0));
    assert_eq!((snapshot.xtiles, snapshot.ytiles), (2, 3));
    assert_eq!(snapshot.facing, Facing::East);
    assert_eq!(snapshot.center, TileCoord::new(9, 9, 0));
    assert_eq!(snapshot.riders, vec![bow, stern]);

    assert_eq!(tile_of(&world, bow), TileCoord::new(9, 10, 0));
    assert_eq!(tile_of(&world, stern), TileCoord::new(10, 9, 0));
    for rider in [bow, stern] {
        let tile = tile_of(&world, rider);
        assert!(snapshot.footprint.has_world_point(tile.x(), tile.y()));
        let frame = query::object(&world, rider).expect("rider exists").frame;
        assert_eq!(frame, 32);
    }
}

#[test]
fn four_right_turns_restore_the_vehicle() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(20, 20, 0), 4, 4, Facing::South);
    let rider = spawn(&mut world, crate_shape(), TileCoord::new(18, 19, 0));
    let _ = run(&mut world, Command::Gather { barge });
    let before = query::barge(&world, barge).expect("barge exists");
    let rider_before = tile_of(&world, rider);

    for _ in 0..4 {
        let _ = run(
            &mut world,
            Command::TurnBarge {
                barge,
                turn: Turn::Right,
            },
        );
    }

    assert_eq!(query::barge(&world, barge), Some(before));
    assert_eq!(tile_of(&world, rider), rider_before);
}

#[test]
fn blocked_rotation_changes_nothing() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(10, 10, 0), 3, 2, Facing::North);
    let bow = spawn(&mut world, crate_shape(), TileCoord::new(10, 10, 0));
    let stern = spawn(&mut world, crate_shape(), TileCoord::new(9, 9, 0));
    let _rock = spawn(&mut world, rock_shape(), TileCoord::new(9, 8, 0));
    let _ = run(&mut world, Command::Gather { barge });
    let before = query::barge(&world, barge).expect("barge exists");
    let riders_before = [query::object(&world, bow), query::object(&world, stern)];

    let events = run(
        &mut world,
        Command::TurnBarge {
            barge,
            turn: Turn::Right,
        },
    );

    assert!(events.contains(&Event::TurnRejected {
        barge,
        turn: Turn::Right,
    }));
    assert_eq!(query::barge(&world, barge), Some(before));
    assert_eq!(
        [query::object(&world, bow), query::object(&world, stern)],
        riders_before
    );
}

#[test]
fn half_turns_check_the_swept_strip_too() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(10, 10, 0), 3, 2, Facing::North);
    let _rock = spawn(&mut world, rock_shape(), TileCoord::new(11, 10, 0));

    let events = run(
        &mut world,
        Command::TurnBarge {
            barge,
            turn: Turn::Around,
        },
    );

    assert!(events.contains(&Event::TurnRejected {
        barge,
        turn: Turn::Around,
    }));
    assert_eq!(barge_tile(&world, barge), TileCoord::new(10, 10, 0));
}

#[test]
fn turning_left_carries_riders_into_the_rotated_footprint() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(10, 10, 0), 3, 2, Facing::North);
    let bow = spawn(&mut world, crate_shape(), TileCoord::new(10, 10, 0));
    let stern = spawn(&mut world, crate_shape(), TileCoord::new(9, 9, 0));
    let _ = run(&mut world, Command::Gather { barge });

    let events = run(
        &mut world,
        Command::TurnBarge {
            barge,
            turn: Turn::Left,
        },
    );

    assert!(events.contains(&Event::BargeTurned {
        barge,
        turn: Turn::Left,
        facing: Facing::West,
    }));
    let snapshot = query::barge(&world, barge).expect("barge exists");
    assert_eq!(snapshot.tile, TileCoord::new(10, 11, 0));
    assert_eq!((snapshot.xtiles, snapshot.ytiles), (2, 3));
    assert_eq!(snapshot.facing, Facing::West);
    assert_eq!(snapshot.center, TileCoord::new(9, 10, 0));

    assert_eq!(tile_of(&world, bow), TileCoord::new(10, 9, 0));
    assert_eq!(tile_of(&world, stern), TileCoord::new(9, 10, 0));
    for rider in [bow, stern] {
        let tile = tile_of(&world, rider);
        assert!(snapshot.footprint.has_world_point(tile.x(), tile.y()));
        let frame = query::object(&world, rider).expect("rider exists").frame;
        assert_eq!(frame, 32);
    }
}

#[test]
fn rejected_turn_does_not_gather_a_turtle() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(10, 10, 0), 3, 2, Facing::North);
    let _turtle = spawn(
        &mut world,
        ShapeInfo::new(700, 1, 1, 1).barge_part(BargePart::Turtle),
        TileCoord::new(10, 10, 0),
    );
    let _rock = spawn(&mut world, rock_shape(), TileCoord::new(9, 8, 0));
    let before = query::barge(&world, barge).expect("barge exists");
    assert!(!before.gathered);

    let events = run(
        &mut world,
        Command::TurnBarge {
            barge,
            turn: Turn::Right,
        },
    );

    assert!(events.contains(&Event::TurnRejected {
        barge,
        turn: Turn::Right,
    }));
    assert_eq!(query::barge(&world, barge), Some(before));
}

#[test]
fn flying_vehicles_turn_over_low_obstacles_only() {
    let mut world = harbor(Flat::Water);
    let carpet = launch(&mut world, TileCoord::new(10, 10, 3), 3, 2, Facing::North);
    let _rock = spawn(&mut world, rock_shape(), TileCoord::new(9, 8, 0));

    let events = run(
        &mut world,
        Command::TurnBarge {
            barge: carpet,
            turn: Turn::Right,
        },
    );
    assert!(events.contains(&Event::BargeTurned {
        barge: carpet,
        turn: Turn::Right,
        facing: Facing::East,
    }));

    let _spire = spawn(
        &mut world,
        ShapeInfo::new(501, 1, 1, 6).solid(),
        TileCoord::new(8, 10, 0),
    );
    let before = query::barge(&world, carpet).expect("barge exists");
    let events = run(
        &mut world,
        Command::TurnBarge {
            barge: carpet,
            turn: Turn::Left,
        },
    );
    assert!(events.contains(&Event::TurnRejected {
        barge: carpet,
        turn: Turn::Left,
    }));
    assert_eq!(query::barge(&world, carpet), Some(before));
}

#[test]
fn flying_vehicles_cross_any_terrain_but_not_tall_obstacles() {
    let mut world = harbor(Flat::Water);
    let _ = run(
        &mut world,
        Command::PaintTerrain {
            area: TileRect::new(11, 0, 10, 30),
            flat: Some(Flat::Land),
        },
    );
    let carpet = launch(&mut world, TileCoord::new(10, 10, 3), 3, 2, Facing::East);
    let _ = run(&mut world, Command::Gather { barge: carpet });
    assert_eq!(
        query::barge(&world, carpet).expect("barge exists").boat,
        Some(true)
    );

    let ashore = TileCoord::new(11, 10, 3);
    let events = run(
        &mut world,
        Command::StepBarge {
            barge: carpet,
            tile: ashore,
            force: false,
        },
    );
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::StepBlocked { .. })));
    assert_eq!(barge_tile(&world, carpet), ashore);

    let _rock = spawn(&mut world, rock_shape(), TileCoord::new(12, 10, 0));
    assert!(query::can_step(&world, carpet, TileCoord::new(12, 10, 0)));

    let _tower = spawn(
        &mut world,
        ShapeInfo::new(502, 1, 1, 5).solid(),
        TileCoord::new(13, 9, 0),
    );
    let toward = TileCoord::new(13, 10, 3);
    let _ = run(
        &mut world,
        Command::StepBarge {
            barge: carpet,
            tile: TileCoord::new(12, 10, 3),
            force: false,
        },
    );
    let events = run(
        &mut world,
        Command::StepBarge {
            barge: carpet,
            tile: toward,
            force: false,
        },
    );
    assert!(events.contains(&Event::StepBlocked {
        barge: carpet,
        toward
    }));
    assert_eq!(barge_tile(&world, carpet), TileCoord::new(12, 10, 3));
}

#[test]
fn ice_rafts_keep_their_facing() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(10, 10, 0), 2, 2, Facing::North);
    let _raft = spawn(
        &mut world,
        ShapeInfo::new(600, 1, 1, 1).barge_part(BargePart::Raft),
        TileCoord::new(10, 10, 0),
    );
    let _ = run(&mut world, Command::Gather { barge });

    let _ = run(
        &mut world,
        Command::TurnBarge {
            barge,
            turn: Turn::Left,
        },
    );

    let snapshot = query::barge(&world, barge).expect("barge exists");
    assert!(snapshot.ice_raft);
    assert_eq!(snapshot.facing, Facing::North);
}

#[test]
fn blocked_step_leaves_the_vehicle_in_place() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(10, 10, 0), 3, 2, Facing::East);
    let rider = spawn(&mut world, crate_shape(), TileCoord::new(9, 10, 0));
    let _rock = spawn(&mut world, rock_shape(), TileCoord::new(11, 10, 0));
    let _ = run(&mut world, Command::Gather { barge });
    let before = query::barge(&world, barge).expect("barge exists");
    let rider_before = query::object(&world, rider);

    let toward = TileCoord::new(11, 10, 0);
    let events = run(
        &mut world,
        Command::StepBarge {
            barge,
            tile: toward,
            force: false,
        },
    );

    assert_eq!(events, vec![Event::StepBlocked { barge, toward }]);
    assert_eq!(query::barge(&world, barge), Some(before));
    assert_eq!(query::object(&world, rider), rider_before);
}

#[test]
fn obstacles_wider_than_a_chunk_block_steps() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(5, 5, 0), 2, 2, Facing::East);
    let _reef = spawn(
        &mut world,
        ShapeInfo::new(510, 30, 1, 2).solid(),
        TileCoord::new(35, 5, 0),
    );

    let toward = TileCoord::new(6, 5, 0);
    let events = run(
        &mut world,
        Command::StepBarge {
            barge,
            tile: toward,
            force: false,
        },
    );

    assert!(events.contains(&Event::StepBlocked { barge, toward }));
    assert_eq!(barge_tile(&world, barge), TileCoord::new(5, 5, 0));
    assert!(query::can_step(&world, barge, TileCoord::new(5, 6, 0)));
    assert!(!query::can_step(&world, barge, TileCoord::new(20, 5, 0)));
}

#[test]
fn boats_cannot_step_ashore_unless_forced() {
    let mut world = harbor(Flat::Water);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::PaintTerrain {
            area: TileRect::new(11, 0, 10, 30),
            flat: Some(Flat::Land),
        },
        &mut events,
    );
    let barge = launch(&mut world, TileCoord::new(10, 10, 0), 2, 2, Facing::East);

    let toward = TileCoord::new(11, 10, 0);
    let blocked = run(
        &mut world,
        Command::StepBarge {
            barge,
            tile: toward,
            force: false,
        },
    );
    assert!(blocked.contains(&Event::StepBlocked { barge, toward }));
    assert_eq!(query::barge(&world, barge).and_then(|s| s.boat), Some(true));

    let forced = run(
        &mut world,
        Command::StepBarge {
            barge,
            tile: toward,
            force: true,
        },
    );
    assert!(forced.contains(&Event::BargeMoved {
        barge,
        from: TileCoord::new(10, 10, 0),
        to: toward,
    }));
}

#[test]
fn step_moves_riders_and_fires_eggs() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(12, 10, 0), 2, 2, Facing::East);
    let rider = spawn(&mut world, crate_shape(), TileCoord::new(11, 9, 0));
    let egg = spawn(
        &mut world,
        ShapeInfo::new(275, 1, 1, 0).egg(1),
        TileCoord::new(14, 10, 0),
    );
    let actor = spawn(&mut world, crate_shape(), TileCoord::new(12, 10, 0));
    let _ = run(&mut world, Command::SetMainActor { actor: Some(actor) });

    let events = run(
        &mut world,
        Command::StepBarge {
            barge,
            tile: TileCoord::new(13, 10, 0),
            force: false,
        },
    );

    assert!(events.contains(&Event::EggActivated { egg, actor }));
    assert_eq!(barge_tile(&world, barge), TileCoord::new(13, 10, 0));
    assert_eq!(tile_of(&world, rider), TileCoord::new(12, 9, 0));
    assert_eq!(tile_of(&world, actor), TileCoord::new(13, 10, 0));
}

#[test]
fn travel_takes_one_step_then_two_per_tick() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(10, 10, 0), 3, 2, Facing::East);
    let _ = run(&mut world, Command::SetMovingBarge { barge: Some(barge) });

    let events = run(
        &mut world,
        Command::TravelTo {
            barge,
            destination: TileCoord::new(20, 10, 0),
            speed: TICK,
        },
    );
    assert!(events.contains(&Event::TravelStarted {
        barge,
        destination: TileCoord::new(20, 10, 0),
    }));
    assert!(query::in_queue(&world, barge));

    let _ = run(&mut world, Command::Tick { now: Duration::ZERO });
    assert_eq!(barge_tile(&world, barge), TileCoord::new(11, 10, 0));

    let _ = run(&mut world, Command::Tick { now: TICK });
    assert_eq!(barge_tile(&world, barge), TileCoord::new(13, 10, 0));

    let _ = run(&mut world, Command::Tick { now: TICK * 2 });
    assert_eq!(barge_tile(&world, barge), TileCoord::new(15, 10, 0));
}

#[test]
fn travel_halts_at_the_end_of_the_path() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(10, 10, 0), 3, 2, Facing::East);
    let _ = run(&mut world, Command::SetMovingBarge { barge: Some(barge) });
    let _ = run(
        &mut world,
        Command::TravelTo {
            barge,
            destination: TileCoord::new(12, 10, 0),
            speed: TICK,
        },
    );

    let _ = run(&mut world, Command::Tick { now: Duration::ZERO });
    let events = run(&mut world, Command::Tick { now: TICK });

    assert!(events.contains(&Event::BargeHalted { barge }));
    assert_eq!(barge_tile(&world, barge), TileCoord::new(12, 10, 0));
    let snapshot = query::barge(&world, barge).expect("barge exists");
    assert_eq!(snapshot.frame_time, Duration::ZERO);
    assert!(!query::in_queue(&world, barge));
}

#[test]
fn idle_vehicles_ignore_ticks() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(10, 10, 0), 3, 2, Facing::East);
    let _ = run(
        &mut world,
        Command::TravelTo {
            barge,
            destination: TileCoord::new(20, 10, 0),
            speed: TICK,
        },
    );

    let _ = run(&mut world, Command::Tick { now: TICK });

    assert_eq!(barge_tile(&world, barge), TileCoord::new(10, 10, 0));
    assert!(!query::in_queue(&world, barge));
}

#[test]
fn travelling_turns_toward_the_destination() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(20, 20, 0), 2, 2, Facing::North);

    let events = run(
        &mut world,
        Command::TravelTo {
            barge,
            destination: TileCoord::new(20, 30, 0),
            speed: TICK,
        },
    );

    assert!(events.contains(&Event::BargeTurned {
        barge,
        turn: Turn::Around,
        facing: Facing::South,
    }));
}

#[test]
fn travel_starts_even_when_the_turn_is_blocked() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(10, 10, 0), 3, 2, Facing::North);
    let _rock = spawn(&mut world, rock_shape(), TileCoord::new(9, 8, 0));
    let destination = TileCoord::new(30, 10, 0);

    let events = run(
        &mut world,
        Command::TravelTo {
            barge,
            destination,
            speed: TICK,
        },
    );

    assert!(events.contains(&Event::TurnRejected {
        barge,
        turn: Turn::Right,
    }));
    assert!(events.contains(&Event::TravelStarted { barge, destination }));
    assert!(query::in_queue(&world, barge));
    assert_eq!(
        query::barge(&world, barge).expect("barge exists").facing,
        Facing::North
    );
}

#[test]
fn travelling_nowhere_is_rejected() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(20, 20, 0), 2, 2, Facing::North);
    let here = TileCoord::new(20, 20, 0);

    let events = run(
        &mut world,
        Command::TravelTo {
            barge,
            destination: here,
            speed: TICK,
        },
    );

    assert!(events.contains(&Event::TravelRejected {
        barge,
        destination: here,
    }));
    assert!(!query::in_queue(&world, barge));
}

#[test]
fn wheels_turn_once_per_tick() {
    let mut world = harbor(Flat::Land);
    let barge = launch(&mut world, TileCoord::new(10, 10, 0), 3, 2, Facing::East);
    let wheel = spawn(
        &mut world,
        ShapeInfo::new(700, 1, 1, 1).barge_part(BargePart::Wheel),
        TileCoord::new(9, 10, 0),
    );
    let _ = run(&mut world, Command::AddToBarge { barge, object: wheel });
    let _ = run(&mut world, Command::SetMovingBarge { barge: Some(barge) });
    let _ = run(
        &mut world,
        Command::TravelTo {
            barge,
            destination: TileCoord::new(20, 10, 0),
            speed: TICK,
        },
    );

    let _ = run(&mut world, Command::Tick { now: Duration::ZERO });
    assert_eq!(query::object(&world, wheel).map(|w| w.frame), Some(1));

    let _ = run(&mut world, Command::Tick { now: TICK });
    assert_eq!(query::object(&world, wheel).map(|w| w.frame), Some(2));
    assert_eq!(tile_of(&world, wheel), TileCoord::new(12, 10, 0));
    assert_eq!(
        query::object(&world, wheel).and_then(|w| w.owner),
        Some(barge)
    );
}

#[test]
fn moves_wrap_around_the_world_edge() {
    let mut world = harbor(Flat::Water);
    let edge = NUM_CHUNKS - 1;
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::LoadChunk {
            chunk: ChunkCoord::new(edge, 0),
            flat: Some(Flat::Water),
        },
        &mut events,
    );
    let barge = launch(&mut world, TileCoord::new(0, 10, 0), 2, 2, Facing::East);
    let rider = spawn(&mut world, crate_shape(), TileCoord::new(NUM_TILES - 1, 10, 0));

    let _ = run(
        &mut world,
        Command::MoveBarge {
            barge,
            tile: TileCoord::new(1, 10, 0),
        },
    );

    assert_eq!(barge_tile(&world, barge), TileCoord::new(1, 10, 0));
    assert_eq!(tile_of(&world, rider), TileCoord::new(0, 10, 0));

    let _ = run(
        &mut world,
        Command::MoveBarge {
            barge,
            tile: TileCoord::new(-1, 10, 0),
        },
    );
    assert_eq!(barge_tile(&world, barge), TileCoord::new(NUM_TILES - 1, 10, 0));
    assert_eq!(tile_of(&world, rider), TileCoord::new(NUM_TILES - 2, 10, 0));
}

#[test]
fn moving_outside_resident_terrain_defers_gathering() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(500, 500, 0), 2, 2, Facing::East);

    let _ = run(
        &mut world,
        Command::MoveBarge {
            barge,
            tile: TileCoord::new(10, 10, 0),
        },
    );

    let snapshot = query::barge(&world, barge).expect("barge exists");
    assert_eq!(snapshot.tile, TileCoord::new(10, 10, 0));
    assert_eq!(snapshot.center, TileCoord::new(9, 9, 0));
    assert!(!snapshot.gathered);
}

#[test]
fn ireg_round_trip_keeps_permanent_parts() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(300, 40, 2), 3, 2, Facing::West);
    let mast = spawn(&mut world, ShapeInfo::new(251, 1, 1, 4), TileCoord::new(299, 40, 2));
    let sail = spawn(
        &mut world,
        ShapeInfo::new(252, 2, 1, 3).barge_part(BargePart::Sails),
        TileCoord::new(300, 39, 2),
    );
    let _loose = spawn(&mut world, crate_shape(), TileCoord::new(298, 39, 2));
    for object in [mast, sail] {
        let _ = run(&mut world, Command::AddToBarge { barge, object });
    }
    let _ = run(&mut world, Command::Gather { barge });

    let record = query::ireg_record(&world, barge).expect("barge exists");
    let bytes = record.encode();
    assert_eq!(Some(bytes.len()), query::ireg_size(&world, barge));

    let restored = BargeRecord::decode(&bytes).expect("record decodes");
    assert_eq!(restored, record);
    assert_eq!((restored.xtiles, restored.ytiles), (3, 2));
    assert_eq!(restored.facing, Facing::West);
    assert_eq!(restored.barge.lift, 2);
    assert!(!restored.moving);
    assert_eq!(restored.parts.len(), 2);
    assert_eq!(
        (restored.parts[0].x, restored.parts[0].y, restored.parts[0].shape),
        ((299 & 0xff) as u8, 40, 251)
    );
    assert_eq!(
        (restored.parts[1].x, restored.parts[1].y, restored.parts[1].shape),
        ((300 & 0xff) as u8, 39, 252)
    );
}

#[test]
fn moving_barge_has_no_ireg_size() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(10, 10, 0), 2, 2, Facing::North);
    let _ = run(&mut world, Command::SetMovingBarge { barge: Some(barge) });
    assert_eq!(query::ireg_size(&world, barge), None);
    assert!(query::ireg_record(&world, barge).expect("record").moving);
}

#[test]
fn gathering_twice_yields_the_same_riders() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(30, 30, 0), 5, 3, Facing::North);
    for tile in [
        TileCoord::new(30, 30, 0),
        TileCoord::new(27, 28, 1),
        TileCoord::new(29, 29, 4),
    ] {
        let _ = spawn(&mut world, crate_shape(), tile);
    }

    let _ = run(&mut world, Command::Gather { barge });
    let first = query::barge(&world, barge).expect("barge exists");
    let _ = run(&mut world, Command::Gather { barge });
    let second = query::barge(&world, barge).expect("barge exists");

    assert_eq!(first.riders.len(), 3);
    assert_eq!(first, second);
}

#[test]
fn footprint_covers_the_tiles_up_and_left_of_the_anchor() {
    let mut world = harbor(Flat::Water);
    for (x, y, xtiles, ytiles) in [(10, 10, 3, 2), (0, 0, 4, 4), (NUM_TILES - 1, 5, 1, 7)] {
        let barge = launch(&mut world, TileCoord::new(x, y, 0), xtiles, ytiles, Facing::North);
        let footprint = query::barge(&world, barge).expect("barge exists").footprint;
        let (w, h) = (i32::from(xtiles), i32::from(ytiles));

        assert_eq!((footprint.w(), footprint.h()), (w, h));
        assert!(footprint.has_world_point(x, y));
        assert!(footprint.has_world_point(x - w + 1, y - h + 1));
        assert!(!footprint.has_world_point(x + 1, y));
        assert!(!footprint.has_world_point(x, y + 1));
        assert_eq!(footprint.area(), w * h);
    }
}

#[test]
fn leaving_barge_mode_uses_open_sails() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(10, 10, 0), 3, 3, Facing::North);
    let sail = spawn(
        &mut world,
        ShapeInfo::new(252, 1, 1, 3).barge_part(BargePart::Sails),
        TileCoord::new(9, 9, 0),
    );
    let _ = run(&mut world, Command::SetMovingBarge { barge: Some(barge) });

    let events = run(&mut world, Command::SetMovingBarge { barge: None });

    assert_eq!(
        events,
        vec![
            Event::SailsActivated { barge, sail },
            Event::BargeModeEnded { barge },
        ]
    );
    assert!(!query::barge(&world, barge).expect("barge exists").gathered);

    let _ = run(&mut world, Command::SetMovingBarge { barge: Some(barge) });
    let again = run(&mut world, Command::SetMovingBarge { barge: None });
    assert!(again.contains(&Event::SailsActivated { barge, sail }));
    assert!(again.contains(&Event::BargeModeEnded { barge }));
}

#[test]
fn landing_needs_dry_clear_ground() {
    let mut world = harbor(Flat::Land);
    let carpet = launch(&mut world, TileCoord::new(10, 10, 3), 2, 2, Facing::North);
    assert!(query::okay_to_land(&world, carpet));

    let _ = spawn(&mut world, rock_shape(), TileCoord::new(9, 9, 0));
    assert!(!query::okay_to_land(&world, carpet));

    let lake = launch(&mut world, TileCoord::new(30, 30, 3), 2, 2, Facing::North);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::PaintTerrain {
            area: TileRect::new(29, 29, 1, 1),
            flat: Some(Flat::Water),
        },
        &mut events,
    );
    assert!(!query::okay_to_land(&world, lake));
}

#[test]
fn vehicles_never_accept_drops() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(10, 10, 0), 2, 2, Facing::North);
    let rider = spawn(&mut world, crate_shape(), TileCoord::new(10, 10, 0));
    let _ = run(&mut world, Command::Gather { barge });

    assert!(query::contains(&world, barge, rider));
    assert!(!query::accepts_drop(&world, barge, rider));
}

#[test]
fn released_parts_leave_the_world() {
    let mut world = harbor(Flat::Water);
    let barge = launch(&mut world, TileCoord::new(10, 10, 0), 2, 2, Facing::North);
    let part = spawn(&mut world, crate_shape(), TileCoord::new(10, 10, 0));
    let _ = run(&mut world, Command::AddToBarge { barge, object: part });

    let events = run(&mut world, Command::RemoveFromBarge { barge, object: part });

    assert_eq!(
        events,
        vec![
            Event::RiderReleased {
                barge,
                object: part
            },
            Event::ObjectRemoved { object: part },
        ]
    );
    assert!(query::object(&world, part).is_none());
    assert!(!query::contains(&world, barge, part));
}
