//! Image payload codec.
//!
//! Converts between the base64 image payloads exchanged with browsers and
//! decoded RGB rasters.
//!
//! # Accepted payloads
//!
//! ```text
//! "iVBORw0KGgoAAAANSUhEUgAA..."                        raw base64
//! "data:image/jpeg;base64,/9j/4AAQSkZJRgABAQ..."       data URI
//! { "image": "data:image/png;base64,iVBORw0K..." }     JSON object
//! ```

mod raster;

pub use raster::{decode, decode_str, encode, strip_data_uri_prefix, PNG_DATA_URI_PREFIX};
