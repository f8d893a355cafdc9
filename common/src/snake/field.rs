use std::fmt;
use std::str::FromStr;

use crate::proto;

/// What a single cell shows. The string form is what the view layer keys its
/// styles on, so it must stay lower-case and stable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CellTag {
    #[default]
    Empty,
    Head,
    Body,
    Food,
    Wall,
}

impl CellTag {
    pub const ALL: [CellTag; 5] = [
        CellTag::Empty,
        CellTag::Head,
        CellTag::Body,
        CellTag::Food,
        CellTag::Wall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CellTag::Empty => "empty",
            CellTag::Head => "head",
            CellTag::Body => "body",
            CellTag::Food => "food",
            CellTag::Wall => "wall",
        }
    }
}

impl fmt::Display for CellTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCellTag(pub String);

impl fmt::Display for UnknownCellTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown cell tag: {:?}", self.0)
    }
}

impl std::error::Error for UnknownCellTag {}

impl FromStr for CellTag {
    type Err = UnknownCellTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| UnknownCellTag(s.to_string()))
    }
}

/// A full picture of the board, row by row. Snapshots are never patched; a new
/// one replaces the old one wholesale.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldSnapshot {
    rows: Vec<Vec<CellTag>>,
}

impl FieldSnapshot {
    pub fn new(rows: Vec<Vec<CellTag>>) -> Self {
        Self { rows }
    }

    pub fn filled(width: usize, height: usize, tag: CellTag) -> Self {
        Self {
            rows: vec![vec![tag; width]; height],
        }
    }

    pub fn rows(&self) -> &[Vec<CellTag>] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<CellTag> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    pub fn count(&self, tag: CellTag) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .filter(|cell| **cell == tag)
            .count()
    }

    pub fn to_proto(&self) -> proto::FieldResponse {
        proto::FieldResponse {
            rows: self
                .rows
                .iter()
                .map(|row| proto::FieldRow {
                    cells: row.iter().map(|cell| cell.as_str().to_string()).collect(),
                })
                .collect(),
        }
    }
}

/// Why a board received from the wire was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidField {
    UnknownTag(UnknownCellTag),
    RaggedRow {
        row: usize,
        width: usize,
        expected: usize,
    },
}

impl fmt::Display for InvalidField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidField::UnknownTag(e) => write!(f, "{}", e),
            InvalidField::RaggedRow { row, width, expected } => write!(
                f,
                "row {} has {} cells, expected {}",
                row, width, expected
            ),
        }
    }
}

impl std::error::Error for InvalidField {}

impl From<UnknownCellTag> for InvalidField {
    fn from(e: UnknownCellTag) -> Self {
        InvalidField::UnknownTag(e)
    }
}

impl TryFrom<proto::FieldResponse> for FieldSnapshot {
    type Error = InvalidField;

    fn try_from(response: proto::FieldResponse) -> Result<Self, Self::Error> {
        let expected = response.rows.first().map_or(0, |row| row.cells.len());
        let mut rows = Vec::with_capacity(response.rows.len());
        for (index, row) in response.rows.into_iter().enumerate() {
            if row.cells.len() != expected {
                return Err(InvalidField::RaggedRow {
                    row: index,
                    width: row.cells.len(),
                    expected,
                });
            }
            let cells = row
                .cells
                .iter()
                .map(|cell| cell.parse::<CellTag>())
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(cells);
        }
        Ok(Self { rows })
    }
}
