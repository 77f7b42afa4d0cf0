//! Deterministic output naming.

use crate::time::{isoformat, TimeWindow};

/// Container extension of the final animation.
pub const ANIMATION_EXTENSION: &str = "gif";

/// File name of the animation produced for one run.
///
/// `<product>.<collection>.<start>.<end>.gif`, with `:` replaced by `_` in
/// the collection id and by `-` in the timestamps so the name is portable.
/// Timestamps are written in UTC without an offset, so the same instant
/// always gives the same name however it was typed.
pub fn animation_file_name(product: &str, collection_id: &str, window: &TimeWindow) -> String {
    [
        product.to_string(),
        collection_id.replace(':', "_"),
        isoformat(&window.start).replace(':', "-"),
        isoformat(&window.end).replace(':', "-"),
        ANIMATION_EXTENSION.to_string(),
    ]
    .join(".")
}
