//! Board collaborator trait.
//!
//! The planners never own the board; they read a snapshot of it through this
//! trait for the duration of a single planning pass. Implementations must not
//! mutate observable state while a pass is running.

/// Index of a tile on the board.
///
/// Tile ids are dense indices in `0..board.tile_count()`, usable directly as
/// slice indices for per-tile side tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub u32);

impl TileId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Identifies a player. Unowned tiles have no player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerId(pub u8);

/// Read-only view of the game board.
///
/// # Example
///
/// ```
/// use muster_core::{Board, PlayerId, TileId};
///
/// struct Line {
///     army: Vec<i64>,
///     adj: Vec<Vec<TileId>>,
/// }
///
/// impl Board for Line {
///     fn tile_count(&self) -> usize { self.army.len() }
///     fn neighbors(&self, tile: TileId) -> &[TileId] { &self.adj[tile.index()] }
///     fn owner(&self, _tile: TileId) -> Option<PlayerId> { Some(PlayerId(0)) }
///     fn army(&self, tile: TileId) -> i64 { self.army[tile.index()] }
///     fn is_obstacle(&self, _tile: TileId) -> bool { false }
///     fn is_fortified(&self, _tile: TileId) -> bool { false }
/// }
/// ```
pub trait Board {
    /// Number of tiles; tile ids are `0..tile_count()`.
    fn tile_count(&self) -> usize;

    /// Tiles reachable from `tile` in one move, obstacles included.
    fn neighbors(&self, tile: TileId) -> &[TileId];

    /// Owning player, or `None` for neutral tiles.
    fn owner(&self, tile: TileId) -> Option<PlayerId>;

    /// Force magnitude currently on the tile.
    fn army(&self, tile: TileId) -> i64;

    /// Impassable terrain.
    fn is_obstacle(&self, tile: TileId) -> bool;

    /// Fortified (city-like) tile: entering it while unclaimed costs its
    /// garrison, and searches can be told to refuse pathing through it.
    fn is_fortified(&self, tile: TileId) -> bool;

    /// Whether two players are on the same team. Defaults to free-for-all.
    fn same_team(&self, a: PlayerId, b: PlayerId) -> bool {
        a == b
    }

    /// True when `tile` is owned by `player` or a teammate.
    fn is_friendly(&self, tile: TileId, player: PlayerId) -> bool {
        self.owner(tile)
            .is_some_and(|owner| self.same_team(owner, player))
    }
}
