//! Static board layouts.
//!
//! A [`BoardConfig`] is the plain adjacency data a [`Board`](crate::board::Board)
//! is built from. Layouts come from any [`BoardLoader`]: [`StandardBoard`]
//! derives the beginner layout from hex coordinates, and
//! [`BoardConfig::from_json`] accepts externally authored data.

use crate::board::{District, PortKind, Resource, RoadId, TileId, TileType, VertexId};
use crate::hex::{EdgeCoord, EdgeDirection, HexCoord, VertexCoord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while loading or validating a layout
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed layout JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{kind} {id} refers to missing {target} {target_id}")]
    DanglingReference {
        kind: &'static str,
        id: usize,
        target: &'static str,
        target_id: usize,
    },

    #[error("{kind} adjacency between {a} and {b} is not symmetric")]
    Asymmetric { kind: &'static str, a: usize, b: usize },

    #[error("table lengths disagree: {0}")]
    LengthMismatch(&'static str),

    #[error("tile {0} has an invalid number token")]
    InvalidNumber(TileId),

    #[error("vertex {0} touches more than one port")]
    SharedPortVertex(VertexId),

    #[error("a game needs 2 to 4 players, got {0}")]
    PlayerCount(usize),
}

/// One tile of a layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSpec {
    pub tile_type: TileType,
    pub number: Option<u8>,
    /// Corner vertices, clockwise from the top
    pub vertices: Vec<VertexId>,
}

/// One port of a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    pub kind: PortKind,
    pub vertices: [VertexId; 2],
}

/// Adjacency tables for a board, indexed by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub tiles: Vec<TileSpec>,
    pub vertex_vertices: Vec<Vec<VertexId>>,
    pub vertex_roads: Vec<Vec<RoadId>>,
    pub vertex_tiles: Vec<Vec<TileId>>,
    pub road_roads: Vec<Vec<RoadId>>,
    pub road_vertices: Vec<[VertexId; 2]>,
    pub ports: Vec<PortSpec>,
    #[serde(default)]
    pub districts: Vec<(VertexId, District)>,
    pub robber_tile: TileId,
}

/// Source of board layouts
pub trait BoardLoader {
    fn load(&self) -> Result<BoardConfig, ConfigError>;
}

impl BoardConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: BoardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decorate `vertex` with a district
    pub fn with_district(mut self, vertex: VertexId, district: District) -> Self {
        self.districts.retain(|(v, _)| *v != vertex);
        self.districts.push((vertex, district));
        self
    }

    /// Check every id is in range and every adjacency list is mirrored
    pub fn validate(&self) -> Result<(), ConfigError> {
        let vertex_count = self.vertex_vertices.len();
        let road_count = self.road_vertices.len();
        let tile_count = self.tiles.len();

        if self.vertex_roads.len() != vertex_count || self.vertex_tiles.len() != vertex_count {
            return Err(ConfigError::LengthMismatch("vertex tables"));
        }
        if self.road_roads.len() != road_count {
            return Err(ConfigError::LengthMismatch("road tables"));
        }
        if self.robber_tile >= tile_count {
            return Err(ConfigError::DanglingReference {
                kind: "robber",
                id: 0,
                target: "tile",
                target_id: self.robber_tile,
            });
        }

        let check = |kind, id, target, target_id: usize, count: usize| {
            if target_id < count {
                Ok(())
            } else {
                Err(ConfigError::DanglingReference {
                    kind,
                    id,
                    target,
                    target_id,
                })
            }
        };

        for (v, neighbours) in self.vertex_vertices.iter().enumerate() {
            for &n in neighbours {
                check("vertex", v, "vertex", n, vertex_count)?;
                if !self.vertex_vertices[n].contains(&v) {
                    return Err(ConfigError::Asymmetric { kind: "vertex", a: v, b: n });
                }
            }
            for &r in &self.vertex_roads[v] {
                check("vertex", v, "road", r, road_count)?;
                if !self.road_vertices[r].contains(&v) {
                    return Err(ConfigError::Asymmetric { kind: "vertex-road", a: v, b: r });
                }
            }
            for &t in &self.vertex_tiles[v] {
                check("vertex", v, "tile", t, tile_count)?;
                if !self.tiles[t].vertices.contains(&v) {
                    return Err(ConfigError::Asymmetric { kind: "vertex-tile", a: v, b: t });
                }
            }
        }

        for (r, ends) in self.road_vertices.iter().enumerate() {
            for &v in ends {
                check("road", r, "vertex", v, vertex_count)?;
                if !self.vertex_roads[v].contains(&r) {
                    return Err(ConfigError::Asymmetric { kind: "vertex-road", a: v, b: r });
                }
            }
            if ends[0] == ends[1] {
                return Err(ConfigError::Asymmetric { kind: "road", a: r, b: r });
            }
            for &n in &self.road_roads[r] {
                check("road", r, "road", n, road_count)?;
                if !self.road_roads[n].contains(&r) {
                    return Err(ConfigError::Asymmetric { kind: "road", a: r, b: n });
                }
            }
        }

        for (t, tile) in self.tiles.iter().enumerate() {
            for &v in &tile.vertices {
                check("tile", t, "vertex", v, vertex_count)?;
            }
            let valid = match (tile.tile_type, tile.number) {
                (TileType::Desert, None) => true,
                (TileType::Resource(_), Some(n)) => (2..=12).contains(&n) && n != 7,
                _ => false,
            };
            if !valid {
                return Err(ConfigError::InvalidNumber(t));
            }
        }

        let mut port_vertices = vec![false; vertex_count];
        for (p, port) in self.ports.iter().enumerate() {
            for &v in &port.vertices {
                check("port", p, "vertex", v, vertex_count)?;
                if std::mem::replace(&mut port_vertices[v], true) {
                    return Err(ConfigError::SharedPortVertex(v));
                }
            }
        }
        for (i, &(v, _)) in self.districts.iter().enumerate() {
            check("district", i, "vertex", v, vertex_count)?;
        }

        Ok(())
    }
}

/// The beginner layout: 19 tiles in rows of 3-4-5-4-3, read top to bottom
/// and west to east. Tile 0 is the ore 10 in the top-left corner.
const BEGINNER_TILES: [(TileType, Option<u8>); 19] = [
    (TileType::Resource(Resource::Ore), Some(10)),
    (TileType::Resource(Resource::Wool), Some(2)),
    (TileType::Resource(Resource::Lumber), Some(9)),
    (TileType::Resource(Resource::Grain), Some(12)),
    (TileType::Resource(Resource::Brick), Some(6)),
    (TileType::Resource(Resource::Wool), Some(4)),
    (TileType::Resource(Resource::Brick), Some(10)),
    (TileType::Resource(Resource::Grain), Some(9)),
    (TileType::Resource(Resource::Lumber), Some(11)),
    (TileType::Desert, None),
    (TileType::Resource(Resource::Lumber), Some(3)),
    (TileType::Resource(Resource::Ore), Some(8)),
    (TileType::Resource(Resource::Lumber), Some(8)),
    (TileType::Resource(Resource::Ore), Some(3)),
    (TileType::Resource(Resource::Grain), Some(4)),
    (TileType::Resource(Resource::Wool), Some(5)),
    (TileType::Resource(Resource::Brick), Some(5)),
    (TileType::Resource(Resource::Grain), Some(6)),
    (TileType::Resource(Resource::Wool), Some(11)),
];

/// Ports as (tile, outward edge, kind)
const BEGINNER_PORTS: [(TileId, EdgeDirection, PortKind); 9] = [
    (0, EdgeDirection::NorthWest, PortKind::Any),
    (1, EdgeDirection::NorthEast, PortKind::Specific(Resource::Wool)),
    (6, EdgeDirection::East, PortKind::Any),
    (11, EdgeDirection::SouthEast, PortKind::Any),
    (15, EdgeDirection::SouthEast, PortKind::Specific(Resource::Brick)),
    (17, EdgeDirection::SouthWest, PortKind::Specific(Resource::Lumber)),
    (16, EdgeDirection::West, PortKind::Any),
    (7, EdgeDirection::West, PortKind::Specific(Resource::Grain)),
    (3, EdgeDirection::NorthWest, PortKind::Specific(Resource::Ore)),
];

/// The classic beginner board: 19 tiles, 54 vertices, 72 roads, 9 ports
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardBoard;

impl StandardBoard {
    /// Derive the adjacency tables from the hex grid. Vertex and road ids
    /// are assigned in order of first appearance, walking tiles in id order.
    pub fn config() -> BoardConfig {
        let hexes = HexCoord::rows_within(2);
        let tile_ids: HashMap<HexCoord, TileId> =
            hexes.iter().enumerate().map(|(id, hex)| (*hex, id)).collect();

        let mut vertex_ids: HashMap<VertexCoord, VertexId> = HashMap::new();
        let mut vertex_coords: Vec<VertexCoord> = Vec::new();
        let mut road_ids: HashMap<EdgeCoord, RoadId> = HashMap::new();
        let mut road_coords: Vec<EdgeCoord> = Vec::new();

        for hex in &hexes {
            for vertex in hex.vertices() {
                vertex_ids.entry(vertex).or_insert_with(|| {
                    vertex_coords.push(vertex);
                    vertex_coords.len() - 1
                });
            }
            for edge in hex.edges() {
                road_ids.entry(edge).or_insert_with(|| {
                    road_coords.push(edge);
                    road_coords.len() - 1
                });
            }
        }

        // Every end of a land edge is a corner of that land hex
        let road_vertices: Vec<[VertexId; 2]> = road_coords
            .iter()
            .map(|edge| edge.endpoints().map(|v| vertex_ids[&v]))
            .collect();

        // Roads are visited in id order, so each list comes out sorted
        let mut vertex_roads: Vec<Vec<RoadId>> = vec![Vec::new(); vertex_coords.len()];
        for (road, ends) in road_vertices.iter().enumerate() {
            for &v in ends {
                vertex_roads[v].push(road);
            }
        }

        let vertex_vertices: Vec<Vec<VertexId>> = vertex_roads
            .iter()
            .enumerate()
            .map(|(v, roads)| {
                let mut neighbours: Vec<VertexId> = roads
                    .iter()
                    .map(|&r| {
                        let [a, b] = road_vertices[r];
                        if a == v {
                            b
                        } else {
                            a
                        }
                    })
                    .collect();
                neighbours.sort_unstable();
                neighbours
            })
            .collect();

        let vertex_tiles: Vec<Vec<TileId>> = vertex_coords
            .iter()
            .map(|vertex| {
                let mut tiles: Vec<TileId> = vertex
                    .touching_hexes()
                    .iter()
                    .filter_map(|hex| tile_ids.get(hex).copied())
                    .collect();
                tiles.sort_unstable();
                tiles
            })
            .collect();

        let road_roads: Vec<Vec<RoadId>> = road_vertices
            .iter()
            .enumerate()
            .map(|(r, ends)| {
                let mut roads: Vec<RoadId> = ends
                    .iter()
                    .flat_map(|&v| vertex_roads[v].iter().copied())
                    .filter(|&other| other != r)
                    .collect();
                roads.sort_unstable();
                roads.dedup();
                roads
            })
            .collect();

        let tiles = hexes
            .iter()
            .zip(BEGINNER_TILES)
            .map(|(hex, (tile_type, number))| TileSpec {
                tile_type,
                number,
                vertices: hex.vertices().iter().map(|v| vertex_ids[v]).collect(),
            })
            .collect();

        let ports = BEGINNER_PORTS
            .iter()
            .map(|&(tile, direction, kind)| {
                let edge = EdgeCoord::new(hexes[tile], direction);
                PortSpec {
                    kind,
                    vertices: road_vertices[road_ids[&edge]],
                }
            })
            .collect();

        let robber_tile = BEGINNER_TILES
            .iter()
            .position(|(tile_type, _)| *tile_type == TileType::Desert)
            .unwrap_or_default();

        BoardConfig {
            tiles,
            vertex_vertices,
            vertex_roads,
            vertex_tiles,
            road_roads,
            road_vertices,
            ports,
            districts: Vec::new(),
            robber_tile,
        }
    }
}

impl BoardLoader for StandardBoard {
    fn load(&self) -> Result<BoardConfig, ConfigError> {
        Ok(Self::config())
    }
}
