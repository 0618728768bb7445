//! Enumerated DTED header metadata fields.
//!
//! Every code names a fixed-width text field inside one of the three header
//! records. Values are written left-aligned and space padded.

use std::fmt;
use std::str::FromStr;

/// The header record a metadata field lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    /// User header label (80 bytes).
    Uhl,
    /// Data set identification (648 bytes).
    Dsi,
    /// Accuracy description (2700 bytes).
    Acc,
}

/// Number of metadata codes; the upper bound of buffered metadata per stream.
pub const METADATA_CODE_COUNT: usize = 22;

/// Metadata fields that can be set on a point stream and read from a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataCode {
    VerticalAccuracyUhl,
    SecurityCodeUhl,
    UniqueRefUhl,
    DataEdition,
    MatchMergeVersion,
    MaintenanceDate,
    MatchMergeDate,
    MaintenanceDescription,
    Producer,
    VerticalDatum,
    HorizontalDatum,
    DigitizingSystem,
    CompilationDate,
    VerticalAccuracyAcc,
    SecurityCodeDsi,
    UniqueRefDsi,
    HorizontalAccuracy,
    RelHorizontalAccuracy,
    RelVerticalAccuracy,
    PartialCell,
    SecurityControl,
    SecurityHandling,
}

impl MetadataCode {
    /// All codes, in declaration order.
    pub const ALL: [MetadataCode; METADATA_CODE_COUNT] = [
        MetadataCode::VerticalAccuracyUhl,
        MetadataCode::SecurityCodeUhl,
        MetadataCode::UniqueRefUhl,
        MetadataCode::DataEdition,
        MetadataCode::MatchMergeVersion,
        MetadataCode::MaintenanceDate,
        MetadataCode::MatchMergeDate,
        MetadataCode::MaintenanceDescription,
        MetadataCode::Producer,
        MetadataCode::VerticalDatum,
        MetadataCode::HorizontalDatum,
        MetadataCode::DigitizingSystem,
        MetadataCode::CompilationDate,
        MetadataCode::VerticalAccuracyAcc,
        MetadataCode::SecurityCodeDsi,
        MetadataCode::UniqueRefDsi,
        MetadataCode::HorizontalAccuracy,
        MetadataCode::RelHorizontalAccuracy,
        MetadataCode::RelVerticalAccuracy,
        MetadataCode::PartialCell,
        MetadataCode::SecurityControl,
        MetadataCode::SecurityHandling,
    ];

    /// Record, byte offset and width of the field.
    pub fn location(&self) -> (Record, usize, usize) {
        use MetadataCode::*;
        match self {
            VerticalAccuracyUhl => (Record::Uhl, 28, 4),
            SecurityCodeUhl => (Record::Uhl, 32, 3),
            UniqueRefUhl => (Record::Uhl, 35, 12),
            SecurityCodeDsi => (Record::Dsi, 3, 1),
            SecurityControl => (Record::Dsi, 4, 2),
            SecurityHandling => (Record::Dsi, 6, 27),
            UniqueRefDsi => (Record::Dsi, 64, 15),
            DataEdition => (Record::Dsi, 87, 2),
            MatchMergeVersion => (Record::Dsi, 89, 1),
            MaintenanceDate => (Record::Dsi, 90, 4),
            MatchMergeDate => (Record::Dsi, 94, 4),
            MaintenanceDescription => (Record::Dsi, 98, 4),
            Producer => (Record::Dsi, 102, 8),
            VerticalDatum => (Record::Dsi, 141, 3),
            HorizontalDatum => (Record::Dsi, 144, 5),
            DigitizingSystem => (Record::Dsi, 149, 10),
            CompilationDate => (Record::Dsi, 159, 4),
            PartialCell => (Record::Dsi, 289, 2),
            HorizontalAccuracy => (Record::Acc, 3, 4),
            VerticalAccuracyAcc => (Record::Acc, 7, 4),
            RelHorizontalAccuracy => (Record::Acc, 11, 4),
            RelVerticalAccuracy => (Record::Acc, 15, 4),
        }
    }

    /// Stable key used on the command line and in listings.
    pub fn name(&self) -> &'static str {
        use MetadataCode::*;
        match self {
            VerticalAccuracyUhl => "DTED_VerticalAccuracy_UHL",
            SecurityCodeUhl => "DTED_SecurityCode_UHL",
            UniqueRefUhl => "DTED_UniqueRef_UHL",
            DataEdition => "DTED_DataEdition",
            MatchMergeVersion => "DTED_MatchMergeVersion",
            MaintenanceDate => "DTED_MaintenanceDate",
            MatchMergeDate => "DTED_MatchMergeDate",
            MaintenanceDescription => "DTED_MaintenanceDescription",
            Producer => "DTED_Producer",
            VerticalDatum => "DTED_VerticalDatum",
            HorizontalDatum => "DTED_HorizontalDatum",
            DigitizingSystem => "DTED_DigitizingSystem",
            CompilationDate => "DTED_CompilationDate",
            VerticalAccuracyAcc => "DTED_VerticalAccuracy_ACC",
            SecurityCodeDsi => "DTED_SecurityCode_DSI",
            UniqueRefDsi => "DTED_UniqueRef_DSI",
            HorizontalAccuracy => "DTED_HorizontalAccuracy",
            RelHorizontalAccuracy => "DTED_RelHorizontalAccuracy",
            RelVerticalAccuracy => "DTED_RelVerticalAccuracy",
            PartialCell => "DTED_PartialCellIndicator",
            SecurityControl => "DTED_SecurityControl",
            SecurityHandling => "DTED_SecurityHandling",
        }
    }
}

impl fmt::Display for MetadataCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetadataCode {
    type Err = String;

    /// Accepts the full key (`DTED_Producer`) or the key without the prefix,
    /// case-insensitively.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        MetadataCode::ALL
            .iter()
            .copied()
            .find(|code| {
                let name = code.name();
                name.eq_ignore_ascii_case(wanted)
                    || name
                        .strip_prefix("DTED_")
                        .is_some_and(|short| short.eq_ignore_ascii_case(wanted))
            })
            .ok_or_else(|| format!("unknown DTED metadata code: {}", s))
    }
}
