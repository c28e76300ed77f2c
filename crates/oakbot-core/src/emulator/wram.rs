//! WRAM map for Pokémon Red/Blue and typed readers over the port.

use std::collections::BTreeSet;

use agent_goap::WorldModel;

use super::{EmulatorError, EmulatorPort};

/// Current map id.
pub const ADDR_MAP_ID: u16 = 0xD35E;
/// Player Y tile, then X tile.
pub const ADDR_PLAYER_Y: u16 = 0xD361;
pub const ADDR_PLAYER_X: u16 = 0xD362;
/// Badge bitmask, one bit per gym in order.
pub const ADDR_BADGES: u16 = 0xD356;
/// Non-zero while a battle is active.
pub const ADDR_BATTLE_FLAG: u16 = 0xD057;
/// Party size, then the species list.
pub const ADDR_PARTY_COUNT: u16 = 0xD163;
/// First party member's current HP (big-endian u16) and max HP.
pub const ADDR_PARTY1_HP: u16 = 0xD16C;
pub const ADDR_PARTY1_MAX_HP: u16 = 0xD18D;
/// First party member's level.
pub const ADDR_PARTY1_LEVEL: u16 = 0xD18C;
/// Money, three BCD bytes.
pub const ADDR_MONEY: u16 = 0xD347;
/// Bag item count.
pub const ADDR_ITEM_COUNT: u16 = 0xD31D;

const BADGE_NAMES: [&str; 8] = [
    "boulder", "cascade", "thunder", "rainbow", "soul", "marsh", "volcano", "earth",
];

/// One tick's decoded WRAM window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldReading {
    pub map_id: u8,
    pub player_x: u8,
    pub player_y: u8,
    pub badges: u8,
    pub in_battle: bool,
    pub party_count: u8,
    pub lead_level: u8,
    pub lead_hp_pct: u8,
    pub money: u32,
    pub item_count: u8,
}

impl WorldReading {
    pub fn badge_count(&self) -> u32 {
        self.badges.count_ones()
    }

    pub fn badge_names(&self) -> BTreeSet<String> {
        BADGE_NAMES
            .iter()
            .enumerate()
            .filter(|(i, _)| self.badges & (1 << i) != 0)
            .map(|(_, name)| name.to_string())
            .collect()
    }

    pub fn position(&self) -> (u8, u8, u8) {
        (self.map_id, self.player_x, self.player_y)
    }

    /// Projects the reading into the planner's world model.
    pub fn to_world_model(&self) -> WorldModel {
        WorldModel {
            badges: self.badge_names(),
            location: format!("map_{:03}", self.map_id),
            max_party_level: self.lead_level,
            money: self.money,
            items: Default::default(),
            party_hp_pct: self.lead_hp_pct,
        }
    }
}

/// Reads and decodes the WRAM window the kernel cares about.
pub fn read_world(port: &dyn EmulatorPort) -> Result<WorldReading, EmulatorError> {
    let map_id = read_u8(port, ADDR_MAP_ID)?;
    let player_y = read_u8(port, ADDR_PLAYER_Y)?;
    let player_x = read_u8(port, ADDR_PLAYER_X)?;
    let badges = read_u8(port, ADDR_BADGES)?;
    let in_battle = read_u8(port, ADDR_BATTLE_FLAG)? != 0;
    let party_count = read_u8(port, ADDR_PARTY_COUNT)?;
    let lead_level = read_u8(port, ADDR_PARTY1_LEVEL)?;
    let money = decode_bcd(&port.read_wram(ADDR_MONEY, 3)?);
    let item_count = read_u8(port, ADDR_ITEM_COUNT)?;

    let lead_hp_pct = if party_count == 0 {
        100
    } else {
        let hp = read_u16_be(port, ADDR_PARTY1_HP)?;
        let max_hp = read_u16_be(port, ADDR_PARTY1_MAX_HP)?;
        if max_hp == 0 {
            100
        } else {
            ((hp as u32 * 100) / max_hp as u32).min(100) as u8
        }
    };

    Ok(WorldReading {
        map_id,
        player_x,
        player_y,
        badges,
        in_battle,
        party_count,
        lead_level,
        lead_hp_pct,
        money,
        item_count,
    })
}

fn read_u8(port: &dyn EmulatorPort, addr: u16) -> Result<u8, EmulatorError> {
    Ok(port.read_wram(addr, 1)?[0])
}

fn read_u16_be(port: &dyn EmulatorPort, addr: u16) -> Result<u16, EmulatorError> {
    let bytes = port.read_wram(addr, 2)?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// The cartridge stores money as packed BCD, most significant byte first.
fn decode_bcd(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| {
        acc * 100 + ((b >> 4) as u32) * 10 + (b & 0x0F) as u32
    })
}

#[cfg(test)]
mod tests {
    use super::decode_bcd;

    #[test]
    fn bcd_money_decodes() {
        assert_eq!(decode_bcd(&[0x00, 0x30, 0x00]), 3000);
        assert_eq!(decode_bcd(&[0x09, 0x99, 0x99]), 99999);
        assert_eq!(decode_bcd(&[0x00, 0x00, 0x00]), 0);
    }
}
