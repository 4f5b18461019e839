//! Axial hex coordinates (q, r) used to derive board topology.
//!
//! The rules engine itself works on dense integer ids. This module only exists so
//! that a layout can be described as a set of hexes and turned into the vertex,
//! road and tile adjacency tables of a [`BoardConfig`](crate::layout::BoardConfig).
//!
//! Hexes are pointy-topped. Every corner is the North or South corner of exactly
//! one hex, which gives each vertex a unique representation without any
//! canonicalisation step.

use serde::{Deserialize, Serialize};

/// Which pole of its owning hex a corner is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexDirection {
    North,
    South,
}

/// Side of a hex, declared clockwise from NorthEast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeDirection {
    NorthEast,
    East,
    SouthEast,
    SouthWest,
    West,
    NorthWest,
}

impl EdgeDirection {
    pub const ALL: [EdgeDirection; 6] = [
        EdgeDirection::NorthEast,
        EdgeDirection::East,
        EdgeDirection::SouthEast,
        EdgeDirection::SouthWest,
        EdgeDirection::West,
        EdgeDirection::NorthWest,
    ];

    pub fn opposite(self) -> Self {
        Self::ALL[(self as usize + 3) % 6]
    }

    /// Axial step to the hex across this side
    fn offset(self) -> (i32, i32) {
        match self {
            EdgeDirection::NorthEast => (1, -1),
            EdgeDirection::East => (1, 0),
            EdgeDirection::SouthEast => (0, 1),
            EdgeDirection::SouthWest => (-1, 1),
            EdgeDirection::West => (-1, 0),
            EdgeDirection::NorthWest => (0, -1),
        }
    }
}

/// Axial hex position. `q` grows eastwards, `r` grows south-eastwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Third cube coordinate, `-q - r`
    pub const fn s(&self) -> i32 {
        -self.q - self.r
    }

    pub fn neighbor(&self, direction: EdgeDirection) -> HexCoord {
        let (dq, dr) = direction.offset();
        HexCoord::new(self.q + dq, self.r + dr)
    }

    /// Steps between two hexes
    pub fn distance_to(&self, other: &HexCoord) -> u32 {
        self.q
            .abs_diff(other.q)
            .max(self.r.abs_diff(other.r))
            .max(self.s().abs_diff(other.s()))
    }

    /// The six corners clockwise from North.
    ///
    /// Corners other than North and South are expressed as the North/South
    /// corner of the neighboring hex that owns them. Side `EdgeDirection::ALL[i]`
    /// runs from corner `i` to corner `i + 1`.
    pub fn vertices(&self) -> [VertexCoord; 6] {
        use EdgeDirection::*;
        use VertexDirection::*;
        [
            VertexCoord::new(*self, North),
            VertexCoord::new(self.neighbor(NorthEast), South),
            VertexCoord::new(self.neighbor(SouthEast), North),
            VertexCoord::new(*self, South),
            VertexCoord::new(self.neighbor(SouthWest), North),
            VertexCoord::new(self.neighbor(NorthWest), South),
        ]
    }

    /// The six sides in `EdgeDirection::ALL` order
    pub fn edges(&self) -> [EdgeCoord; 6] {
        EdgeDirection::ALL.map(|dir| EdgeCoord::new(*self, dir))
    }

    /// Hexes within `radius` steps of the origin in reading order: rows top to
    /// bottom, each row west to east.
    pub fn rows_within(radius: i32) -> Vec<HexCoord> {
        let origin = HexCoord::default();
        (-radius..=radius)
            .flat_map(|r| (-radius..=radius).map(move |q| HexCoord::new(q, r)))
            .filter(|hex| hex.distance_to(&origin) <= radius.unsigned_abs())
            .collect()
    }
}

/// A corner, named by the hex it is the North or South pole of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexCoord {
    pub hex: HexCoord,
    pub direction: VertexDirection,
}

impl VertexCoord {
    pub const fn new(hex: HexCoord, direction: VertexDirection) -> Self {
        Self { hex, direction }
    }

    /// The three hexes meeting at this corner, land or not
    pub fn touching_hexes(&self) -> [HexCoord; 3] {
        let (west, east) = match self.direction {
            VertexDirection::North => (EdgeDirection::NorthWest, EdgeDirection::NorthEast),
            VertexDirection::South => (EdgeDirection::SouthWest, EdgeDirection::SouthEast),
        };
        [self.hex, self.hex.neighbor(west), self.hex.neighbor(east)]
    }
}

/// A side shared by two hexes.
///
/// Each side can be named from either hex; [`EdgeCoord::new`] always picks the
/// hex with the smaller `(q, r)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeCoord {
    pub hex: HexCoord,
    pub direction: EdgeDirection,
}

impl EdgeCoord {
    pub fn new(hex: HexCoord, direction: EdgeDirection) -> Self {
        let other = hex.neighbor(direction);
        if (hex.q, hex.r) <= (other.q, other.r) {
            Self { hex, direction }
        } else {
            Self {
                hex: other,
                direction: direction.opposite(),
            }
        }
    }

    /// The two corners at the ends of this side
    pub fn endpoints(&self) -> [VertexCoord; 2] {
        let corners = self.hex.vertices();
        let i = self.direction as usize;
        [corners[i], corners[(i + 1) % 6]]
    }
}
