use serde::{Deserialize, Serialize};

use crate::{
    error::SimResult,
    sim::field::{Grid, ObstacleMask},
};

/// JSON-friendly form of an [`ObstacleMask`]: row-major flags stored as bytes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SerialMask {
    data: Vec<u8>,
    nrows: usize,
    ncols: usize,
}

impl SerialMask {
    pub fn from_mask(mask: &ObstacleMask) -> Self {
        let grid = mask.grid();

        Self {
            data: mask.as_slice().iter().map(|b| (*b) as u8).collect(),
            nrows: grid.height(),
            ncols: grid.width(),
        }
    }

    /// Rebuild the mask, validating that the stored shape matches the data.
    pub fn to_mask(&self) -> SimResult<ObstacleMask> {
        let grid = Grid::new(self.ncols, self.nrows)?;
        ObstacleMask::from_flags(grid, self.data.iter().map(|b| *b != 0).collect())
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use crate::{error::SimError, preprocessing::serial_mask::SerialMask};
    use crate::sim::field::{Grid, ObstacleMask};

    #[test]
    pub fn test_save_load() {
        let mut rng = rand::rng();

        let grid = Grid::new(7, 5).unwrap();
        let flags = (0..grid.len()).map(|_| rng.random_bool(0.5)).collect();
        let original_mask = ObstacleMask::from_flags(grid, flags).unwrap();

        let serial_mask = SerialMask::from_mask(&original_mask);

        let serialized = serde_json::to_string(&serial_mask).unwrap();

        let deserialized: SerialMask = serde_json::from_str(&serialized).unwrap();

        let final_mask = deserialized.to_mask().unwrap();

        assert_eq!(original_mask, final_mask);
    }

    #[test]
    pub fn test_rejects_truncated_data() {
        let serialized = r#"{"data":[0,1,0,1],"nrows":3,"ncols":3}"#;
        let deserialized: SerialMask = serde_json::from_str(serialized).unwrap();

        assert!(matches!(
            deserialized.to_mask(),
            Err(SimError::LengthMismatch { .. })
        ));
    }
}
