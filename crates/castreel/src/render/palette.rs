use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Up to 256 RGB entries addressed by 8-bit index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<[u8; 3]>,
}

impl Palette {
    pub const MAX_COLORS: usize = 256;

    /// Build from RGB triples, truncating past 256 entries.
    pub fn new(mut colors: Vec<[u8; 3]>) -> Self {
        colors.truncate(Self::MAX_COLORS);
        if colors.is_empty() {
            colors.push([0, 0, 0]);
        }
        Self { colors }
    }

    /// Build from a packed `RGBRGB...` byte table, as stored in GIF colour maps.
    pub fn from_rgb_bytes(bytes: &[u8]) -> Self {
        Self::new(bytes.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect())
    }

    pub fn grayscale() -> Self {
        Self::new((0..=255u8).map(|v| [v, v, v]).collect())
    }

    /// 6x6x6 colour cube followed by a 40-step grey ramp.
    pub fn system() -> Self {
        let mut colors = Vec::with_capacity(Self::MAX_COLORS);
        for r in 0..6u8 {
            for g in 0..6u8 {
                for b in 0..6u8 {
                    colors.push([r * 51, g * 51, b * 51]);
                }
            }
        }
        for i in 0..40u32 {
            let v = (i * 255 / 39) as u8;
            colors.push([v, v, v]);
        }
        Self::new(colors)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Colour at `index`; out-of-range indices read as black.
    pub fn color(&self, index: u8) -> [u8; 3] {
        self.colors.get(index as usize).copied().unwrap_or([0, 0, 0])
    }

    /// Index of the closest entry by squared RGB distance. Ties go to the lowest index.
    pub fn nearest(&self, rgb: [u8; 3]) -> u8 {
        let mut best = 0usize;
        let mut best_dist = u32::MAX;
        for (i, c) in self.colors.iter().enumerate() {
            let dr = i32::from(c[0]) - i32::from(rgb[0]);
            let dg = i32::from(c[1]) - i32::from(rgb[1]);
            let db = i32::from(c[2]) - i32::from(rgb[2]);
            let dist = (dr * dr + dg * dg + db * db) as u32;
            if dist < best_dist {
                best = i;
                best_dist = dist;
                if dist == 0 {
                    break;
                }
            }
        }
        best as u8
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::system()
    }
}

/// Memoizing nearest-colour lookup against a fixed palette snapshot.
pub struct Quantizer<'a> {
    palette: &'a Palette,
    cache: FxHashMap<[u8; 3], u8>,
}

impl<'a> Quantizer<'a> {
    pub fn new(palette: &'a Palette) -> Self {
        Self {
            palette,
            cache: FxHashMap::default(),
        }
    }

    pub fn index_of(&mut self, rgb: [u8; 3]) -> u8 {
        let palette = self.palette;
        *self.cache.entry(rgb).or_insert_with(|| palette.nearest(rgb))
    }
}
