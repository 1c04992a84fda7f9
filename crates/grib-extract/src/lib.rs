//! Grid extraction for GFS wind fields.
//!
//! Decodes one GRIB2 file for one forecast lead time, keeps the 10 m above
//! ground wind components and turns them into flat [`WindRecord`]s:
//!
//! - [`GridDecoder`] hides the binary decoder ([`GribDecoder`] in production)
//! - [`join_components`] performs the ordered outer join of U and V
//! - [`GridExtractor`] stamps cycle/lead metadata and normalizes longitudes
//!
//! [`WindRecord`]: gfs_common::WindRecord

pub mod decoder;
pub mod error;
mod extractor;
pub mod join;

pub use decoder::{read_reference_time, GribDecoder, GridDecoder, GridValue, WindComponents};
pub use error::{ExtractError, Result};
pub use extractor::GridExtractor;
pub use join::{join_components, JoinedCell};
