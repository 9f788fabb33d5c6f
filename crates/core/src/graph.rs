//! Working graph of placed tile proxies and the doorway connections between them.
//!
//! Tiles live in a slotmap arena and connections in a separate edge table, so
//! backtracking is just "drop the last connection, drop the last tile".

use std::hash::Hasher;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use xxhash_rust::xxh3::Xxh3;

use crate::catalog::Catalog;
use crate::error::GraphError;
use crate::flow::ProposedConnection;
use crate::random::RandomStream;
use crate::template::{DoorwayProxy, TileProxy};
use crate::types::{ArchetypeId, KeyId, LineId, NodeId, TileId, TileSetId};

/// Two doorways closer than this (squared distance) are considered coincident.
const COINCIDENT_DISTANCE_SQUARED: f32 = 1e-5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DoorwayRef {
    pub tile: TileId,
    pub index: usize,
}

impl DoorwayRef {
    pub fn new(tile: TileId, index: usize) -> Self {
        Self { tile, index }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub a: DoorwayRef,
    pub b: DoorwayRef,
}

impl Connection {
    pub fn involves(&self, tile: TileId) -> bool {
        self.a.tile == tile || self.b.tile == tile
    }

    /// The doorway on the other side from `doorway`, if it is part of this connection.
    pub fn partner(&self, doorway: DoorwayRef) -> Option<DoorwayRef> {
        if self.a == doorway {
            Some(self.b)
        } else if self.b == doorway {
            Some(self.a)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedTile {
    pub required: bool,
    pub locked: bool,
    pub lock_key: Option<KeyId>,
}

/// Flow bookkeeping attached to every placed tile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TilePlacement {
    pub on_main_path: bool,
    pub path_depth: u32,
    pub branch_depth: u32,
    pub normalized_path_depth: f32,
    pub normalized_branch_depth: f32,
    pub archetype: Option<ArchetypeId>,
    pub tile_set: Option<TileSetId>,
    pub node: Option<NodeId>,
    pub line: Option<LineId>,
    pub injection: Option<InjectedTile>,
    pub branch_id: Option<u32>,
    /// Doorway used to attach this tile to its predecessor.
    pub entrance: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedTile {
    pub proxy: TileProxy,
    pub placement: TilePlacement,
}

#[derive(Clone, Debug, Default)]
pub struct ProxyGraph {
    tiles: SlotMap<TileId, PlacedTile>,
    all: Vec<TileId>,
    main_path: Vec<TileId>,
    branch_path: Vec<TileId>,
    connections: Vec<Connection>,
}

impl ProxyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn add_tile(&mut self, tile: PlacedTile) -> TileId {
        let on_main_path = tile.placement.on_main_path;
        let id = self.tiles.insert(tile);
        self.all.push(id);
        if on_main_path {
            self.main_path.push(id);
        } else {
            self.branch_path.push(id);
        }
        id
    }

    /// Removes a tile along with every connection touching it.
    pub fn remove_tile(&mut self, id: TileId) -> Option<PlacedTile> {
        if !self.tiles.contains_key(id) {
            return None;
        }
        let incident: Vec<Connection> =
            self.connections.iter().copied().filter(|connection| connection.involves(id)).collect();
        for connection in incident {
            self.remove_connection(connection.a);
        }
        self.all.retain(|tile| *tile != id);
        self.main_path.retain(|tile| *tile != id);
        self.branch_path.retain(|tile| *tile != id);
        self.tiles.remove(id)
    }

    pub fn make_connection(&mut self, a: DoorwayRef, b: DoorwayRef) -> Result<(), GraphError> {
        if a == b {
            return Err(GraphError::SelfConnection);
        }
        for doorway in [a, b] {
            match self.doorway(doorway) {
                None => return Err(GraphError::MissingDoorway(doorway)),
                Some(proxy) if proxy.is_used() => return Err(GraphError::DoorwayInUse(doorway)),
                Some(_) => {}
            }
        }
        self.set_partner(a, Some(b));
        self.set_partner(b, Some(a));
        self.connections.push(Connection { a, b });
        Ok(())
    }

    /// Removes the connection that `doorway` takes part in.
    pub fn remove_connection(&mut self, doorway: DoorwayRef) -> Option<Connection> {
        let position =
            self.connections.iter().position(|connection| connection.partner(doorway).is_some())?;
        let connection = self.connections.remove(position);
        self.set_partner(connection.a, None);
        self.set_partner(connection.b, None);
        Some(connection)
    }

    pub fn remove_last_connection(&mut self) -> Option<Connection> {
        let connection = self.connections.pop()?;
        self.set_partner(connection.a, None);
        self.set_partner(connection.b, None);
        Some(connection)
    }

    fn set_partner(&mut self, doorway: DoorwayRef, partner: Option<DoorwayRef>) {
        if let Some(proxy) = self
            .tiles
            .get_mut(doorway.tile)
            .and_then(|tile| tile.proxy.doorways.get_mut(doorway.index))
        {
            proxy.connected = partner;
        }
    }

    pub fn tile(&self, id: TileId) -> Option<&PlacedTile> {
        self.tiles.get(id)
    }

    pub fn tile_mut(&mut self, id: TileId) -> Option<&mut PlacedTile> {
        self.tiles.get_mut(id)
    }

    pub fn doorway(&self, doorway: DoorwayRef) -> Option<&DoorwayProxy> {
        self.tiles.get(doorway.tile).and_then(|tile| tile.proxy.doorway(doorway.index))
    }

    /// Every placed tile in placement order.
    pub fn all_tiles(&self) -> &[TileId] {
        &self.all
    }

    pub fn main_path(&self) -> &[TileId] {
        &self.main_path
    }

    pub fn branch_path(&self) -> &[TileId] {
        &self.branch_path
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn unused_doorways(&self, id: TileId) -> impl Iterator<Item = DoorwayRef> + '_ {
        self.tiles
            .get(id)
            .into_iter()
            .flat_map(move |tile| {
                tile.proxy.unused_doorways().map(move |d| DoorwayRef::new(id, d.index))
            })
    }

    pub fn used_doorways(&self, id: TileId) -> impl Iterator<Item = DoorwayRef> + '_ {
        self.tiles
            .get(id)
            .into_iter()
            .flat_map(move |tile| {
                tile.proxy.used_doorways().map(move |d| DoorwayRef::new(id, d.index))
            })
    }

    /// Tiles directly connected to `id`, in connection order.
    pub fn neighbours(&self, id: TileId) -> Vec<TileId> {
        self.connections
            .iter()
            .filter_map(|connection| {
                if connection.a.tile == id {
                    Some(connection.b.tile)
                } else if connection.b.tile == id {
                    Some(connection.a.tile)
                } else {
                    None
                }
            })
            .collect()
    }

    /// The tile this one was attached to, found through its entrance doorway.
    pub fn predecessor(&self, id: TileId) -> Option<TileId> {
        let entrance = self.tiles.get(id)?.placement.entrance?;
        self.doorway(DoorwayRef::new(id, entrance))?.connected.map(|partner| partner.tile)
    }

    pub fn are_connected(&self, a: TileId, b: TileId) -> bool {
        self.connections.iter().any(|connection| connection.involves(a) && connection.involves(b))
    }

    /// Connects coincident unused doorways on different tiles after layout.
    ///
    /// A tile's own connection chance replaces `global_chance`; when both tiles
    /// carry one the lower wins. Returns the number of connections made.
    pub fn connect_overlapping_doorways(
        &mut self,
        global_chance: f32,
        restrict_to_same_section: bool,
        catalog: &Catalog,
        random: &mut RandomStream,
    ) -> usize {
        let order = self.all.clone();
        let mut made = 0;
        for (offset, &first) in order.iter().enumerate() {
            for &second in &order[offset + 1..] {
                made += self.connect_tile_pair(
                    first,
                    second,
                    global_chance,
                    restrict_to_same_section,
                    catalog,
                    random,
                );
            }
        }
        made
    }

    fn connect_tile_pair(
        &mut self,
        first: TileId,
        second: TileId,
        global_chance: f32,
        restrict_to_same_section: bool,
        catalog: &Catalog,
        random: &mut RandomStream,
    ) -> usize {
        let (Some(a), Some(b)) = (self.tiles.get(first), self.tiles.get(second)) else {
            return 0;
        };
        if restrict_to_same_section
            && (a.placement.line.is_none() || a.placement.line != b.placement.line)
        {
            return 0;
        }
        let (Some(template_a), Some(template_b)) =
            (catalog.template(a.proxy.prefab), catalog.template(b.proxy.prefab))
        else {
            return 0;
        };
        let chance = match (template_a.connection_chance, template_b.connection_chance) {
            (Some(x), Some(y)) => x.min(y),
            (Some(x), None) | (None, Some(x)) => x,
            (None, None) => global_chance,
        };
        if chance <= 0.0 {
            return 0;
        }

        let doorway_count_a = a.proxy.doorways.len();
        let doorway_count_b = b.proxy.doorways.len();
        let mut made = 0;
        for index_a in 0..doorway_count_a {
            for index_b in 0..doorway_count_b {
                let a_ref = DoorwayRef::new(first, index_a);
                let b_ref = DoorwayRef::new(second, index_b);
                let (Some(door_a), Some(door_b)) = (self.doorway(a_ref), self.doorway(b_ref)) else {
                    continue;
                };
                if door_a.is_used()
                    || door_b.is_used()
                    || door_a.facing != door_b.facing.opposite()
                    || (door_a.position - door_b.position).length_squared()
                        >= COINCIDENT_DISTANCE_SQUARED
                {
                    continue;
                }
                let proposal = ProposedConnection {
                    previous_tile: template_a,
                    previous_doorway: &template_a.doorways[index_a],
                    next_tile: template_b,
                    next_doorway: &template_b.doorways[index_b],
                };
                if !catalog.rules().can_connect(&proposal) {
                    continue;
                }
                if random.next_double() < f64::from(chance)
                    && self.make_connection(a_ref, b_ref).is_ok()
                {
                    made += 1;
                }
            }
        }
        made
    }

    /// Placement-order index of `id`.
    pub fn ordinal(&self, id: TileId) -> Option<usize> {
        self.all.iter().position(|tile| *tile == id)
    }

    /// Stable byte encoding of the layout, independent of arena key values.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend((self.all.len() as u32).to_le_bytes());
        for &id in &self.all {
            let Some(tile) = self.tiles.get(id) else {
                continue;
            };
            let proxy = &tile.proxy;
            let placement = &tile.placement;
            bytes.extend(proxy.prefab.0.to_le_bytes());
            bytes.push(proxy.rotation.turns());
            for value in [proxy.position.x, proxy.position.y, proxy.position.z] {
                bytes.extend(value.to_bits().to_le_bytes());
            }
            bytes.push(u8::from(placement.on_main_path));
            bytes.extend(placement.path_depth.to_le_bytes());
            bytes.extend(placement.branch_depth.to_le_bytes());
            for id in [
                placement.archetype.map(|id| id.0),
                placement.tile_set.map(|id| id.0),
                placement.node.map(|id| id.0),
                placement.line.map(|id| id.0),
                placement.branch_id,
            ] {
                bytes.extend(id.unwrap_or(u32::MAX).to_le_bytes());
            }
        }
        bytes.extend((self.connections.len() as u32).to_le_bytes());
        for connection in &self.connections {
            for doorway in [connection.a, connection.b] {
                let ordinal = self.ordinal(doorway.tile).map_or(u32::MAX, |index| index as u32);
                bytes.extend(ordinal.to_le_bytes());
                bytes.extend((doorway.index as u32).to_le_bytes());
            }
        }
        bytes
    }

    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Xxh3::new();
        hasher.write(&self.canonical_bytes());
        hasher.finish()
    }
}
