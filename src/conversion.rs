pub mod converter;
pub mod elevation;
pub mod ellipsoid;

/// Geographic longitude/latitude in degrees with ellipsoidal heights.
pub const WGS84_SRID: u32 = 4326;
/// Earth-centred, earth-fixed cartesian coordinates.
pub const WGS84_CARTESIAN_SRID: u32 = 4978;
/// World Mercator on the WGS84 ellipsoid.
pub const WORLD_MERCATOR_SRID: u32 = 3395;
/// Spherical Web Mercator.
pub const WEB_MERCATOR_SRID: u32 = 3857;

pub use converter::CoordinateConverter;
pub use elevation::{ElevationCorrector, ElevationPipeline, OffsetElevationCorrector};
pub use ellipsoid::EllipsoidConverter;
