//! Immutable board catalog: tile types, color groups, rent table, house costs.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Type of tile on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileType {
    Go,
    Property,
    Railroad,
    Utility,
    Chance,
    CommunityChest,
    Tax,
    FreeParking,
    Jail,
    GoToJail,
}

/// Color group for properties. Railroad/Utility are included so ownership
/// counts (for rent multipliers) can share the same lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorGroup {
    Brown,
    LightBlue,
    Pink,
    Orange,
    Red,
    Yellow,
    Green,
    DarkBlue,
    Railroad,
    Utility,
}

impl ColorGroup {
    pub fn color_hex(&self) -> &'static str {
        match self {
            ColorGroup::Brown => "#8B4513",
            ColorGroup::LightBlue => "#87CEEB",
            ColorGroup::Pink => "#FF69B4",
            ColorGroup::Orange => "#FFA500",
            ColorGroup::Red => "#FF0000",
            ColorGroup::Yellow => "#FFD700",
            ColorGroup::Green => "#228B22",
            ColorGroup::DarkBlue => "#00008B",
            ColorGroup::Railroad => "#333333",
            ColorGroup::Utility => "#CCCCCC",
        }
    }

    pub fn house_cost(&self) -> i64 {
        match self {
            ColorGroup::Brown | ColorGroup::LightBlue => 50,
            ColorGroup::Pink | ColorGroup::Orange => 100,
            ColorGroup::Red | ColorGroup::Yellow => 150,
            ColorGroup::Green | ColorGroup::DarkBlue => 200,
            ColorGroup::Railroad | ColorGroup::Utility => 0,
        }
    }
}

/// A tile on the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub index: u8,
    pub name: String,
    pub tile_type: TileType,
    pub group: Option<ColorGroup>,
    pub price: i64,
    /// `[base, 1 house, 2, 3, 4, hotel]`, only set for colored properties.
    pub rent_table: Vec<i64>,
}

impl Tile {
    fn go() -> Self {
        Self {
            index: 0,
            name: "START".into(),
            tile_type: TileType::Go,
            group: None,
            price: 0,
            rent_table: vec![],
        }
    }

    fn property(index: u8, name: &str, group: ColorGroup, price: i64, rent_table: Vec<i64>) -> Self {
        Self {
            index,
            name: name.into(),
            tile_type: TileType::Property,
            group: Some(group),
            price,
            rent_table,
        }
    }

    fn railroad(index: u8, name: &str) -> Self {
        Self {
            index,
            name: name.into(),
            tile_type: TileType::Railroad,
            group: Some(ColorGroup::Railroad),
            price: 200,
            rent_table: vec![],
        }
    }

    fn utility(index: u8, name: &str) -> Self {
        Self {
            index,
            name: name.into(),
            tile_type: TileType::Utility,
            group: Some(ColorGroup::Utility),
            price: 150,
            rent_table: vec![],
        }
    }

    fn chance(index: u8) -> Self {
        Self {
            index,
            name: "Chance".into(),
            tile_type: TileType::Chance,
            group: None,
            price: 0,
            rent_table: vec![],
        }
    }

    fn community_chest(index: u8) -> Self {
        Self {
            index,
            name: "Treasure".into(),
            tile_type: TileType::CommunityChest,
            group: None,
            price: 0,
            rent_table: vec![],
        }
    }

    fn tax(index: u8, name: &str) -> Self {
        Self {
            index,
            name: name.into(),
            tile_type: TileType::Tax,
            group: None,
            price: 0,
            rent_table: vec![],
        }
    }

    fn jail() -> Self {
        Self {
            index: 10,
            name: "Just Visiting / In Prison".into(),
            tile_type: TileType::Jail,
            group: None,
            price: 0,
            rent_table: vec![],
        }
    }

    fn free_parking() -> Self {
        Self {
            index: 20,
            name: "Vacation".into(),
            tile_type: TileType::FreeParking,
            group: None,
            price: 0,
            rent_table: vec![],
        }
    }

    fn go_to_jail() -> Self {
        Self {
            index: 30,
            name: "Go to Prison".into(),
            tile_type: TileType::GoToJail,
            group: None,
            price: 0,
            rent_table: vec![],
        }
    }

    pub fn mortgage_value(&self) -> i64 {
        self.price / 2
    }

    pub fn is_ownable(&self) -> bool {
        matches!(
            self.tile_type,
            TileType::Property | TileType::Railroad | TileType::Utility
        )
    }
}

/// The complete 40-tile board.
pub static BOARD: Lazy<Vec<Tile>> = Lazy::new(|| {
    vec![
        Tile::go(),
        Tile::property(1, "Salvador", ColorGroup::Brown, 60, vec![2, 10, 30, 90, 160, 250]),
        Tile::community_chest(2),
        Tile::property(3, "Rio", ColorGroup::Brown, 60, vec![4, 20, 60, 180, 320, 450]),
        Tile::tax(4, "Income Tax"),
        Tile::railroad(5, "Reading Railroad"),
        Tile::property(6, "Tel Aviv", ColorGroup::LightBlue, 100, vec![6, 30, 90, 270, 400, 550]),
        Tile::chance(7),
        Tile::property(8, "Haifa", ColorGroup::LightBlue, 100, vec![6, 30, 90, 270, 400, 550]),
        Tile::property(9, "Jerusalem", ColorGroup::LightBlue, 120, vec![8, 40, 100, 300, 450, 600]),
        Tile::jail(),
        Tile::property(11, "Venice", ColorGroup::Pink, 140, vec![10, 50, 150, 450, 625, 750]),
        Tile::utility(12, "Electric Company"),
        Tile::property(13, "Milan", ColorGroup::Pink, 140, vec![10, 50, 150, 450, 625, 750]),
        Tile::property(14, "Rome", ColorGroup::Pink, 160, vec![12, 60, 180, 500, 700, 900]),
        Tile::railroad(15, "Pennsylvania Railroad"),
        Tile::property(16, "Frankfurt", ColorGroup::Orange, 180, vec![14, 70, 200, 550, 750, 950]),
        Tile::community_chest(17),
        Tile::property(18, "Munich", ColorGroup::Orange, 180, vec![14, 70, 200, 550, 750, 950]),
        Tile::property(19, "Berlin", ColorGroup::Orange, 200, vec![16, 80, 220, 600, 800, 1000]),
        Tile::free_parking(),
        Tile::property(21, "Shenzhen", ColorGroup::Red, 220, vec![18, 90, 250, 700, 875, 1050]),
        Tile::chance(22),
        Tile::property(23, "Beijing", ColorGroup::Red, 220, vec![18, 90, 250, 700, 875, 1050]),
        Tile::property(24, "Shanghai", ColorGroup::Red, 240, vec![20, 100, 300, 750, 925, 1100]),
        Tile::railroad(25, "B. & O. Railroad"),
        Tile::property(26, "Lyon", ColorGroup::Yellow, 260, vec![22, 110, 330, 800, 975, 1150]),
        Tile::property(27, "Toulouse", ColorGroup::Yellow, 260, vec![22, 110, 330, 800, 975, 1150]),
        Tile::utility(28, "Water Works"),
        Tile::property(29, "Paris", ColorGroup::Yellow, 280, vec![24, 120, 360, 850, 1025, 1200]),
        Tile::go_to_jail(),
        Tile::property(31, "Liverpool", ColorGroup::Green, 300, vec![26, 130, 390, 900, 1100, 1275]),
        Tile::property(32, "Manchester", ColorGroup::Green, 300, vec![26, 130, 390, 900, 1100, 1275]),
        Tile::community_chest(33),
        Tile::property(34, "London", ColorGroup::Green, 320, vec![28, 150, 450, 1000, 1200, 1400]),
        Tile::railroad(35, "Short Line"),
        Tile::chance(36),
        Tile::property(37, "San Francisco", ColorGroup::DarkBlue, 350, vec![35, 175, 500, 1100, 1300, 1500]),
        Tile::tax(38, "Luxury Tax"),
        Tile::property(39, "New York", ColorGroup::DarkBlue, 400, vec![50, 200, 600, 1400, 1700, 2000]),
    ]
});

pub fn get_tile(idx: u8) -> Option<&'static Tile> {
    BOARD.get(idx as usize)
}

pub fn get_group_tiles(group: ColorGroup) -> Vec<&'static Tile> {
    BOARD
        .iter()
        .filter(|t| t.group == Some(group))
        .collect()
}

pub fn railroad_tiles() -> Vec<&'static Tile> {
    BOARD
        .iter()
        .filter(|t| t.tile_type == TileType::Railroad)
        .collect()
}

pub fn utility_tiles() -> Vec<&'static Tile> {
    BOARD
        .iter()
        .filter(|t| t.tile_type == TileType::Utility)
        .collect()
}

/// Map a board position to (x, y) on an 11x11 clockwise layout, GO at origin.
pub fn pos_to_xy(pos: u8) -> (i32, i32) {
    let pos = pos as i32;
    match pos {
        0..=10 => (pos, 0),
        11..=20 => (10, pos - 10),
        21..=30 => (10 - (pos - 20), 10),
        31..=39 => (0, 10 - (pos - 30)),
        _ => (0, 0),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TileMeta {
    pub index: u8,
    pub name: String,
    pub tile_type: TileType,
    pub group: Option<ColorGroup>,
    pub price: i64,
    pub color: Option<&'static str>,
    pub x: i32,
    pub y: i32,
}

/// Build the `/board_meta` response payload.
pub fn board_meta() -> Vec<TileMeta> {
    BOARD
        .iter()
        .map(|t| {
            let (x, y) = pos_to_xy(t.index);
            TileMeta {
                index: t.index,
                name: t.name.clone(),
                tile_type: t.tile_type,
                group: t.group,
                price: t.price,
                color: t.group.map(|g| g.color_hex()),
                x,
                y,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_has_forty_tiles_with_corners_in_place() {
        assert_eq!(BOARD.len(), 40);
        assert_eq!(BOARD[0].tile_type, TileType::Go);
        assert_eq!(BOARD[10].tile_type, TileType::Jail);
        assert_eq!(BOARD[20].tile_type, TileType::FreeParking);
        assert_eq!(BOARD[30].tile_type, TileType::GoToJail);
    }

    #[test]
    fn brown_group_has_two_members_at_correct_house_cost() {
        let tiles = get_group_tiles(ColorGroup::Brown);
        assert_eq!(tiles.iter().map(|t| t.index).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(ColorGroup::Brown.house_cost(), 50);
    }

    #[test]
    fn pos_to_xy_matches_clockwise_layout() {
        assert_eq!(pos_to_xy(0), (0, 0));
        assert_eq!(pos_to_xy(10), (10, 0));
        assert_eq!(pos_to_xy(20), (10, 10));
        assert_eq!(pos_to_xy(30), (0, 10));
        assert_eq!(pos_to_xy(15), (10, 5));
    }

    #[test]
    fn mortgage_value_is_half_price() {
        assert_eq!(get_tile(1).unwrap().mortgage_value(), 30);
        assert_eq!(get_tile(39).unwrap().mortgage_value(), 200);
    }

    #[test]
    fn railroads_and_utilities_present() {
        assert_eq!(railroad_tiles().len(), 4);
        assert_eq!(utility_tiles().len(), 2);
    }
}
