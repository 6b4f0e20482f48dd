//! Compiled-in registry of board memory layouts

use std::fmt;
use std::str::FromStr;

use crate::error::{FwImageError, Result};

/// Supported hardware targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Board {
    Xs2,
    Xs5,
    Rs,
    RsPro,
    LsSr71,
    Xs2_8,
    Xm,
    Pb42,
}

/// Memory layout constants of one board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardProfile {
    /// Registry key
    pub name: &'static str,
    /// Flash address the kernel partition starts at
    pub kernel_start: u32,
    /// Kernel load and entry address
    pub kernel_entry: u32,
    /// Byte budget shared by all partitions
    pub max_length: u32,
}

impl Board {
    /// All boards in registry order
    pub const ALL: [Board; 8] = [
        Board::Xs2,
        Board::Xs5,
        Board::Rs,
        Board::RsPro,
        Board::LsSr71,
        Board::Xs2_8,
        Board::Xm,
        Board::Pb42,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Board::Xs2 => "XS2",
            Board::Xs5 => "XS5",
            Board::Rs => "RS",
            Board::RsPro => "RSPRO",
            Board::LsSr71 => "LS-SR71",
            Board::Xs2_8 => "XS2-8",
            Board::Xm => "XM",
            Board::Pb42 => "PB42",
        }
    }

    pub fn profile(self) -> BoardProfile {
        let (kernel_start, kernel_entry, max_length) = match self {
            Board::Xs2 => (0x0004_0000, 0x8004_1000, 0x006A_0000),
            Board::Xs5 => (0xBE03_0000, 0x8004_1000, 0x0039_0000),
            Board::Rs => (0xBF03_0000, 0x8006_0000, 0x00B0_0000),
            Board::RsPro => (0xBF03_0000, 0x8005_0100, 0x00B0_0000),
            Board::LsSr71 => (0xBF03_0000, 0x8006_0000, 0x0064_0000),
            Board::Xs2_8 => (0xA803_0000, 0x8004_1000, 0x006C_0000),
            Board::Xm => (0x9F05_0000, 0x8000_2000, 0x006A_0000),
            Board::Pb42 => (0xBF03_0000, 0x8006_0000, 0x00B0_0000),
        };

        BoardProfile {
            name: self.name(),
            kernel_start,
            kernel_entry,
            max_length,
        }
    }

    /// Find a board by its exact, case-sensitive name.
    pub fn lookup(name: &str) -> Result<Board> {
        Self::ALL
            .into_iter()
            .find(|board| board.name() == name)
            .ok_or_else(|| FwImageError::UnknownBoard {
                name: name.to_string(),
            })
    }
}

impl FromStr for Board {
    type Err = FwImageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::lookup(s)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for BoardProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<8} kernel 0x{:08x} entry 0x{:08x} max 0x{:08x}",
            self.name, self.kernel_start, self.kernel_entry, self.max_length
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_every_board() {
        for board in Board::ALL {
            assert_eq!(Board::lookup(board.name()).unwrap(), board);
            assert_eq!(board.profile().name, board.name());
        }
    }

    #[test]
    fn test_lookup_is_exact() {
        // Prefixes and case variants must not match another entry.
        for name in ["XS", "xs2", "XS2-", "XS2-88", "RSPR", "RSPROX", "", "LS"] {
            let err = Board::lookup(name).unwrap_err();
            assert!(matches!(err, FwImageError::UnknownBoard { .. }), "{name}");
        }
    }

    #[test]
    fn test_xs2_8_is_not_xs2() {
        assert_eq!(Board::lookup("XS2-8").unwrap(), Board::Xs2_8);
        assert_eq!(Board::lookup("XS2").unwrap(), Board::Xs2);
    }

    #[test]
    fn test_profile_values() {
        let xs5 = Board::Xs5.profile();
        assert_eq!(xs5.kernel_start, 0xbe03_0000);
        assert_eq!(xs5.kernel_entry, 0x8004_1000);
        assert_eq!(xs5.max_length, 0x0039_0000);

        let rspro = "RSPRO".parse::<Board>().unwrap().profile();
        assert_eq!(rspro.kernel_entry, 0x8005_0100);
        assert_eq!(rspro.max_length, 0x00b0_0000);
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = Board::ALL.iter().map(|b| b.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Board::ALL.len());
    }
}
