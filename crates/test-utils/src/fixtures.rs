//! Common test fixtures: scenario constants, archives, images and areas.

use std::io::{Cursor, Write};
use std::path::Path;

use image::{Rgba, RgbaImage};
use projection::{AreaDefinition, Projection};
use sat_common::TimeWindow;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// High Rate SEVIRI collection id.
pub const HRSEVIRI: &str = "EO:EUM:DAT:MSG:HRSEVIRI";

/// Product name used throughout the scenario tests.
pub const NATURAL_COLOR: &str = "natural_color";

pub const SCENARIO_START: &str = "2015-04-14T09:00:00";
pub const SCENARIO_END: &str = "2015-04-14T13:00:00";

/// Two products inside the scenario window, in archive search order.
pub const SCENARIO_PRODUCTS: [&str; 2] = [
    "MSG3-SEVI-MSG15-0100-NA-20150414091241.462000000Z-NA",
    "MSG3-SEVI-MSG15-0100-NA-20150414124241.396000000Z-NA",
];

/// Animation name expected for the scenario.
pub const SCENARIO_ANIMATION: &str =
    "natural_color.EO_EUM_DAT_MSG_HRSEVIRI.2015-04-14T09-00-00.2015-04-14T13-00-00.gif";

pub fn scenario_window() -> TimeWindow {
    TimeWindow::parse(SCENARIO_START, SCENARIO_END).expect("scenario window is valid")
}

/// Small plate carrée area, cheap to render.
pub fn small_area() -> AreaDefinition {
    AreaDefinition::new(
        "test_small",
        Projection::Latlon,
        64,
        32,
        [-20.0, 30.0, 44.0, 62.0].into(),
    )
    .expect("small area is valid")
}

/// Zip archive bytes holding the given members, in order.
pub fn zip_bytes(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in members {
        if name.ends_with('/') {
            zip.add_directory(*name, options).expect("add directory");
        } else {
            zip.start_file(*name, options).expect("start zip member");
            zip.write_all(content).expect("write zip member");
        }
    }
    zip.finish().expect("finish zip").into_inner()
}

/// Write a zip archive with the given members to `path`.
pub fn write_zip(path: &Path, members: &[(&str, &[u8])]) {
    std::fs::write(path, zip_bytes(members)).expect("write zip fixture");
}

/// Archive bytes shaped like a SEVIRI native product.
///
/// Holds a manifest, the `<identifier>.nat` payload and an empty directory
/// entry.
pub fn seviri_archive_bytes(identifier: &str) -> Vec<u8> {
    let payload_name = format!("{}.nat", identifier);
    let payload = format!("FORMAT NAME : NATIVE {}", identifier);
    zip_bytes(&[
        ("manifest.xml", b"<manifest/>".as_slice()),
        ("EOPMetadata/", b"".as_slice()),
        (payload_name.as_str(), payload.as_bytes()),
    ])
}

/// Write a solid-colour PNG.
pub fn write_png(path: &Path, width: u32, height: u32, color: [u8; 4]) {
    RgbaImage::from_pixel(width, height, Rgba(color))
        .save(path)
        .expect("write png fixture");
}
