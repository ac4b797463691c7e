//! Page geometry: words, layout blocks, and detected tables.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in page points (72 dpi), serialized as `[x0, y0, x1, y1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center_x(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn center_y(&self) -> f64 {
        (self.y0 + self.y1) / 2.0
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Multiply every coordinate by `factor` (raster pixels to points and back).
    pub fn scale(&self, factor: f64) -> BBox {
        BBox {
            x0: self.x0 * factor,
            y0: self.y0 * factor,
            x1: self.x1 * factor,
            y1: self.y1 * factor,
        }
    }
}

impl From<[f64; 4]> for BBox {
    fn from(v: [f64; 4]) -> Self {
        BBox::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.x0, b.y0, b.x1, b.y1]
    }
}

/// A single recognized or native word with its position on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub bbox: BBox,
    pub text: String,
    pub block_id: u32,
    pub line_id: u32,
    pub word_id: u32,
}

impl Word {
    pub fn new(bbox: BBox, text: impl Into<String>) -> Self {
        Self {
            bbox,
            text: text.into(),
            block_id: 0,
            line_id: 0,
            word_id: 0,
        }
    }

    /// Set block/line/word indices.
    pub fn at(mut self, block_id: u32, line_id: u32, word_id: u32) -> Self {
        self.block_id = block_id;
        self.line_id = line_id;
        self.word_id = word_id;
        self
    }
}

/// A layout block of native text (a paragraph or a text frame).
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub bbox: BBox,
    pub text: String,
}

/// Table detection strategy that produced a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFlavor {
    /// Cell boundaries taken from ruling lines drawn on the page.
    Lattice,
    /// Cell boundaries inferred from whitespace gaps between words.
    Stream,
}

impl TableFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableFlavor::Lattice => "lattice",
            TableFlavor::Stream => "stream",
        }
    }
}

impl std::fmt::Display for TableFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Grid of cell strings, row 0 being the header.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub page: usize,
    pub flavor: TableFlavor,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(|r| r.as_slice())
    }

    /// Rows after the header.
    pub fn body(&self) -> &[Vec<String>] {
        if self.rows.is_empty() {
            &[]
        } else {
            &self.rows[1..]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_serializes_as_array() {
        let b = BBox::new(1.0, 2.0, 3.5, 4.0);
        assert_eq!(serde_json::to_string(&b).unwrap(), "[1.0,2.0,3.5,4.0]");
        let back: BBox = serde_json::from_str("[1,2,3.5,4]").unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn test_bbox_union_and_scale() {
        let a = BBox::new(10.0, 10.0, 20.0, 20.0);
        let b = BBox::new(15.0, 5.0, 30.0, 18.0);
        assert_eq!(a.union(&b), BBox::new(10.0, 5.0, 30.0, 20.0));
        assert_eq!(a.scale(0.5), BBox::new(5.0, 5.0, 10.0, 10.0));
    }

    #[test]
    fn test_table_body_skips_header() {
        let t = Table {
            page: 0,
            flavor: TableFlavor::Stream,
            rows: vec![vec!["Unit".into()], vec!["101".into()]],
        };
        assert_eq!(t.header().unwrap()[0], "Unit");
        assert_eq!(t.body().len(), 1);
    }
}
