//! Rectangular grid boards for tests.

use muster_core::{Board, PlayerId, TileId};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A 4-connected rectangular board with per-tile ownership, army,
/// obstacle and fortification state.
#[derive(Debug, Clone)]
pub struct GridBoard {
    width: u32,
    height: u32,
    owner: Vec<Option<PlayerId>>,
    army: Vec<i64>,
    obstacle: Vec<bool>,
    fortified: Vec<bool>,
    adjacency: Vec<Vec<TileId>>,
}

impl GridBoard {
    /// All-neutral open board.
    pub fn open(width: u32, height: u32) -> Self {
        let count = (width * height) as usize;
        let mut adjacency = vec![Vec::with_capacity(4); count];
        for y in 0..height {
            for x in 0..width {
                let idx = (y * width + x) as usize;
                if x > 0 {
                    adjacency[idx].push(TileId(y * width + x - 1));
                }
                if x + 1 < width {
                    adjacency[idx].push(TileId(y * width + x + 1));
                }
                if y > 0 {
                    adjacency[idx].push(TileId((y - 1) * width + x));
                }
                if y + 1 < height {
                    adjacency[idx].push(TileId((y + 1) * width + x));
                }
            }
        }
        Self {
            width,
            height,
            owner: vec![None; count],
            army: vec![0; count],
            obstacle: vec![false; count],
            fortified: vec![false; count],
            adjacency,
        }
    }

    /// Board fully owned by `player`, with armies drawn from `1..=max_army`
    /// by a seeded RNG. Deterministic per seed.
    pub fn random_owned(seed: u64, width: u32, height: u32, player: PlayerId, max_army: i64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut board = Self::open(width, height);
        for idx in 0..board.owner.len() {
            board.owner[idx] = Some(player);
            board.army[idx] = rng.random_range(1..=max_army);
        }
        board
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile(&self, x: u32, y: u32) -> TileId {
        debug_assert!(x < self.width && y < self.height);
        TileId(y * self.width + x)
    }

    pub fn coords(&self, tile: TileId) -> (u32, u32) {
        (tile.0 % self.width, tile.0 / self.width)
    }

    /// Gives `tile` to `player` with the given army.
    pub fn claim(&mut self, tile: TileId, player: PlayerId, army: i64) {
        self.owner[tile.index()] = Some(player);
        self.army[tile.index()] = army;
    }

    pub fn set_owner(&mut self, tile: TileId, owner: Option<PlayerId>) {
        self.owner[tile.index()] = owner;
    }

    pub fn set_army(&mut self, tile: TileId, army: i64) {
        self.army[tile.index()] = army;
    }

    pub fn set_obstacle(&mut self, tile: TileId, obstacle: bool) {
        self.obstacle[tile.index()] = obstacle;
    }

    pub fn set_fortified(&mut self, tile: TileId, fortified: bool) {
        self.fortified[tile.index()] = fortified;
    }
}

impl Board for GridBoard {
    fn tile_count(&self) -> usize {
        self.owner.len()
    }

    fn neighbors(&self, tile: TileId) -> &[TileId] {
        &self.adjacency[tile.index()]
    }

    fn owner(&self, tile: TileId) -> Option<PlayerId> {
        self.owner[tile.index()]
    }

    fn army(&self, tile: TileId) -> i64 {
        self.army[tile.index()]
    }

    fn is_obstacle(&self, tile: TileId) -> bool {
        self.obstacle[tile.index()]
    }

    fn is_fortified(&self, tile: TileId) -> bool {
        self.fortified[tile.index()]
    }
}
