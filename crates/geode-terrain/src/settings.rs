//! Tessellator tuning parameters.

use crate::TerrainError;

/// Controls mesh density and how eagerly tiles refine.
#[derive(Clone, Debug, PartialEq)]
pub struct TessellatorSettings {
    /// Cells along each side of a tile mesh.
    pub density: u32,
    /// Deepest level a top-level tile may be subdivided to.
    pub max_level: u32,
    /// Orders of magnitude between eye distance and cell size before splitting.
    pub log10_resolution_target: f64,
    pub num_lat_subdivisions: u32,
    pub num_lon_subdivisions: u32,
    /// Add a ring of skirt vertices around each mesh to hide cracks.
    pub make_skirts: bool,
}

impl Default for TessellatorSettings {
    fn default() -> Self {
        Self {
            density: 20,
            max_level: 12,
            log10_resolution_target: 1.3,
            num_lat_subdivisions: 5,
            num_lon_subdivisions: 10,
            make_skirts: true,
        }
    }
}

impl TessellatorSettings {
    pub fn validate(&self) -> Result<(), TerrainError> {
        if self.density == 0 {
            return Err(TerrainError::InvalidSettings("density must be positive".into()));
        }
        if self.num_lat_subdivisions == 0 || self.num_lon_subdivisions == 0 {
            return Err(TerrainError::InvalidSettings(
                "top-level subdivisions must be positive".into(),
            ));
        }
        if !self.log10_resolution_target.is_finite() {
            return Err(TerrainError::InvalidSettings(
                "resolution target must be finite".into(),
            ));
        }
        Ok(())
    }
}
