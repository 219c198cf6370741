//! Object registry, resident terrain and the spatial queries built on them.

use std::collections::BTreeMap;

use harbor_core::{
    delta, wrap, ChunkCoord, Flat, MoveClass, ObjectId, ShapeInfo, TileCoord, TileRect,
    NUM_TILES, TILES_PER_CHUNK,
};

const CHUNK_AREA: usize = (TILES_PER_CHUNK * TILES_PER_CHUNK) as usize;

/// A single object owned by the world registry.
#[derive(Clone, Debug)]
pub(crate) struct WorldObject {
    pub(crate) id: ObjectId,
    pub(crate) info: ShapeInfo,
    pub(crate) frame: u8,
    pub(crate) tile: TileCoord,
    pub(crate) owner: Option<ObjectId>,
}

impl WorldObject {
    /// Tiles covered by the object, anchored at its lower-right corner.
    pub(crate) fn footprint(&self) -> TileRect {
        let (xtiles, ytiles) = self.info.footprint(self.frame);
        TileRect::new(
            self.tile.x() - xtiles + 1,
            self.tile.y() - ytiles + 1,
            xtiles,
            ytiles,
        )
    }

    /// Lift of the object's upper surface.
    pub(crate) fn top(&self) -> i32 {
        self.tile.z() + i32::from(self.info.ztiles)
    }

    fn overlaps(&self, area: TileRect) -> bool {
        self.footprint()
            .tiles()
            .any(|(x, y)| area.has_world_point(x, y))
    }
}

#[derive(Clone, Debug)]
struct ChunkTerrain {
    flats: Vec<Option<Flat>>,
}

impl ChunkTerrain {
    fn filled(flat: Option<Flat>) -> Self {
        Self {
            flats: vec![flat; CHUNK_AREA],
        }
    }

    fn slot(x: i32, y: i32) -> usize {
        let local_x = wrap(x) % TILES_PER_CHUNK;
        let local_y = wrap(y) % TILES_PER_CHUNK;
        (local_y * TILES_PER_CHUNK + local_x) as usize
    }
}

/// Region of the world shown to the player.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Viewport {
    view: Option<TileRect>,
    margin: i32,
}

impl Viewport {
    pub(crate) fn new(view: Option<TileRect>, margin: i32) -> Self {
        Self { view, margin }
    }

    pub(crate) fn view(&self) -> Option<TileRect> {
        self.view
    }

    /// Recentres the view on `tile` when it strays into the margin. Returns
    /// the new view when it moved.
    fn scroll_if_needed(&mut self, tile: TileCoord) -> Option<TileRect> {
        let view = self.view?;
        let inner = TileRect::new(
            view.x() + self.margin,
            view.y() + self.margin,
            (view.w() - 2 * self.margin).max(1),
            (view.h() - 2 * self.margin).max(1),
        );
        if inner.has_world_point(tile.x(), tile.y()) {
            return None;
        }

        let scrolled = TileRect::new(
            wrap(tile.x() - view.w() / 2),
            wrap(tile.y() - view.h() / 2),
            view.w(),
            view.h(),
        );
        self.view = Some(scrolled);
        Some(scrolled)
    }
}

/// Authoritative store of world objects and terrain.
#[derive(Debug)]
pub(crate) struct GameMap {
    objects: BTreeMap<ObjectId, WorldObject>,
    placements: BTreeMap<ChunkCoord, Vec<ObjectId>>,
    terrain: BTreeMap<ChunkCoord, ChunkTerrain>,
    next_object_id: u32,
    main_actor: Option<ObjectId>,
    viewport: Viewport,
    /// Widest footprint ever attached. Objects are filed under the chunk of
    /// their anchor but extend up and to the left of it, so spatial scans
    /// look this far past an area's lower-right edge.
    widest: i32,
}

impl GameMap {
    pub(crate) fn new(viewport: Viewport) -> Self {
        Self {
            objects: BTreeMap::new(),
            placements: BTreeMap::new(),
            terrain: BTreeMap::new(),
            next_object_id: 1,
            main_actor: None,
            viewport,
            widest: 1,
        }
    }

    pub(crate) fn allocate_id(&mut self) -> ObjectId {
        let id = ObjectId::new(self.next_object_id);
        self.next_object_id = self.next_object_id.saturating_add(1);
        id
    }

    /// Actor credited with egg activations.
    pub(crate) fn main_actor(&self) -> Option<ObjectId> {
        self.main_actor
    }

    pub(crate) fn set_main_actor(&mut self, actor: Option<ObjectId>) {
        self.main_actor = actor;
    }

    pub(crate) fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub(crate) fn scroll_if_needed(&mut self, tile: TileCoord) -> Option<TileRect> {
        self.viewport.scroll_if_needed(tile)
    }

    pub(crate) fn load_chunk(&mut self, chunk: ChunkCoord, flat: Option<Flat>) {
        let _ = self.terrain.insert(chunk, ChunkTerrain::filled(flat));
    }

    pub(crate) fn unload_chunk(&mut self, chunk: ChunkCoord) {
        let _ = self.terrain.remove(&chunk);
    }

    /// Repaints every resident tile inside the area.
    pub(crate) fn paint(&mut self, area: TileRect, flat: Option<Flat>) {
        for (x, y) in area.tiles() {
            let chunk = TileCoord::new(x, y, 0).chunk();
            if let Some(terrain) = self.terrain.get_mut(&chunk) {
                terrain.flats[ChunkTerrain::slot(x, y)] = flat;
            }
        }
    }

    pub(crate) fn is_resident(&self, chunk: ChunkCoord) -> bool {
        self.terrain.contains_key(&chunk)
    }

    /// Terrain of a tile. The outer `None` means the tile is not resident;
    /// the inner one means the tile has no valid flat.
    pub(crate) fn flat_at(&self, x: i32, y: i32) -> Option<Option<Flat>> {
        let chunk = TileCoord::new(x, y, 0).chunk();
        self.terrain
            .get(&chunk)
            .map(|terrain| terrain.flats[ChunkTerrain::slot(x, y)])
    }

    pub(crate) fn object(&self, id: ObjectId) -> Option<&WorldObject> {
        self.objects.get(&id)
    }

    pub(crate) fn object_mut(&mut self, id: ObjectId) -> Option<&mut WorldObject> {
        self.objects.get_mut(&id)
    }

    /// Hands an object to the registry and files it under its anchor chunk.
    pub(crate) fn attach(&mut self, mut object: WorldObject) {
        object.tile = object.tile.wrapped();
        let span = object.info.xtiles.max(object.info.ytiles);
        self.widest = self.widest.max(i32::from(span));
        self.placements
            .entry(object.tile.chunk())
            .or_default()
            .push(object.id);
        let _ = self.objects.insert(object.id, object);
    }

    /// Takes an object out of the world, returning ownership to the caller.
    pub(crate) fn detach(&mut self, id: ObjectId) -> Option<WorldObject> {
        let object = self.objects.remove(&id)?;
        self.unfile(id, object.tile.chunk());
        Some(object)
    }

    /// Moves an object in place, keeping its position in the chunk list when
    /// it stays inside the same chunk.
    pub(crate) fn relocate(&mut self, id: ObjectId, tile: TileCoord) {
        let tile = tile.wrapped();
        let Some(object) = self.objects.get_mut(&id) else {
            return;
        };
        let from = object.tile.chunk();
        object.tile = tile;
        let to = tile.chunk();
        if from != to {
            self.unfile(id, from);
            self.placements.entry(to).or_default().push(id);
        }
    }

    fn unfile(&mut self, id: ObjectId, chunk: ChunkCoord) {
        if let Some(list) = self.placements.get_mut(&chunk) {
            list.retain(|filed| *filed != id);
            if list.is_empty() {
                let _ = self.placements.remove(&chunk);
            }
        }
    }

    /// Objects filed under a chunk, in insertion order.
    pub(crate) fn objects_in(&self, chunk: ChunkCoord) -> impl Iterator<Item = &WorldObject> + '_ {
        self.placements
            .get(&chunk)
            .into_iter()
            .flatten()
            .filter_map(|id| self.objects.get(id))
    }

    fn candidates(&self, area: TileRect) -> impl Iterator<Item = &WorldObject> + '_ {
        let reach = TileRect::new(
            area.x(),
            area.y(),
            (area.w() + self.widest).min(NUM_TILES),
            (area.h() + self.widest).min(NUM_TILES),
        );
        ChunkIntersect::new(reach).flat_map(move |(chunk, _)| self.objects_in(chunk))
    }

    /// Decides whether a mover `height` lifts tall standing at `lift` fits
    /// inside `area`.
    ///
    /// Returns the lift the mover would end up at, which is higher than
    /// `lift` when it climbs onto a low obstacle, or `None` when the area is
    /// blocked. Unloaded tiles always block. Objects for which `ignore`
    /// returns `true` are transparent.
    pub(crate) fn blocked_lift<F>(
        &self,
        area: TileRect,
        lift: i32,
        height: i32,
        class: MoveClass,
        ignore: F,
    ) -> Option<i32>
    where
        F: Fn(ObjectId) -> bool,
    {
        for (x, y) in area.tiles() {
            let flat = self.flat_at(x, y)?;
            if !class.accepts(flat) {
                return None;
            }
        }

        if !class.collides() {
            return Some(lift);
        }

        let obstacles: Vec<&WorldObject> = self
            .candidates(area)
            .filter(|object| object.info.solid && !ignore(object.id) && object.overlaps(area))
            .collect();

        let mut floor = lift;
        for obstacle in &obstacles {
            let top = obstacle.top();
            if top <= lift || obstacle.tile.z() >= lift + height {
                continue;
            }
            if class.climbs() && top <= lift + 1 {
                floor = floor.max(top);
                continue;
            }
            return None;
        }

        if floor != lift
            && obstacles
                .iter()
                .any(|obstacle| obstacle.top() > floor && obstacle.tile.z() < floor + height)
        {
            return None;
        }

        Some(floor)
    }

    /// Reports whether any solid object lies beneath `lift` inside the area.
    pub(crate) fn solid_below<F>(&self, area: TileRect, lift: i32, ignore: F) -> bool
    where
        F: Fn(ObjectId) -> bool,
    {
        self.candidates(area).any(|object| {
            object.info.solid
                && !ignore(object.id)
                && object.tile.z() < lift
                && object.overlaps(area)
        })
    }

    /// Eggs in `chunk` whose trigger zone contains `to` but not `from`.
    pub(crate) fn eggs_triggered(
        &self,
        chunk: ChunkCoord,
        to: TileCoord,
        from: TileCoord,
    ) -> Vec<ObjectId> {
        self.objects_in(chunk)
            .filter_map(|object| {
                let radius = i32::from(object.info.egg?);
                let within = |tile: TileCoord| {
                    delta(object.tile.x(), tile.x()).abs() <= radius
                        && delta(object.tile.y(), tile.y()).abs() <= radius
                };
                (within(to) && !within(from)).then_some(object.id)
            })
            .collect()
    }
}

/// Splits a tile rectangle into the pieces that fall inside each chunk,
/// following the rectangle across the world edge.
///
/// Each item pairs a chunk with the part of the rectangle inside it,
/// expressed in wrapped world coordinates.
#[derive(Clone, Debug)]
pub(crate) struct ChunkIntersect {
    origin_x: i32,
    width: i32,
    row_y: i32,
    rows_left: i32,
    x: i32,
    columns_left: i32,
}

impl ChunkIntersect {
    pub(crate) fn new(rect: TileRect) -> Self {
        let width = rect.w().clamp(0, NUM_TILES);
        let height = rect.h().clamp(0, NUM_TILES);
        Self {
            origin_x: wrap(rect.x()),
            width,
            row_y: wrap(rect.y()),
            rows_left: if width == 0 { 0 } else { height },
            x: wrap(rect.x()),
            columns_left: width,
        }
    }

    fn row_height(&self) -> i32 {
        let chunk_end = (self.row_y / TILES_PER_CHUNK + 1) * TILES_PER_CHUNK;
        (chunk_end - self.row_y).min(self.rows_left)
    }
}

impl Iterator for ChunkIntersect {
    type Item = (ChunkCoord, TileRect);

    fn next(&mut self) -> Option<Self::Item> {
        if self.rows_left <= 0 {
            return None;
        }

        let row_height = self.row_height();
        let chunk_end = (self.x / TILES_PER_CHUNK + 1) * TILES_PER_CHUNK;
        let span = (chunk_end - self.x).min(self.columns_left);
        let item = (
            ChunkCoord::new(self.x / TILES_PER_CHUNK, self.row_y / TILES_PER_CHUNK),
            TileRect::new(self.x, self.row_y, span, row_height),
        );

        self.columns_left -= span;
        self.x = wrap(self.x + span);
        if self.columns_left <= 0 {
            self.rows_left -= row_height;
            self.row_y = wrap(self.row_y + row_height);
            self.x = self.origin_x;
            self.columns_left = self.width;
        }

        Some(item)
    }
}
