//! Track builder: turns a parsed GPX tree into track segments
//!
//! Tracks are `trk` elements anywhere below the root, each holding `trkseg`
//! children that in turn hold `trkpt` children in document order. Elements are
//! matched by local name so namespaced documents work unchanged.

use crate::segment::{GeoPoint, TrackSegment};
use crate::xml::{self, Node};
use crate::Result;

/// Build every non-empty track segment found under `root`
///
/// Points with missing or non-numeric coordinates are skipped with a warning,
/// and a segment left without valid points is dropped. A document without
/// track data yields an empty vector.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn build(root: &Node) -> Vec<TrackSegment> {
    let mut segments = Vec::new();

    for track in root.descendants_named("trk") {
        let track_name = track
            .child("name")
            .map(|name| name.text())
            .filter(|name| !name.is_empty());

        for trkseg in track.children_named("trkseg") {
            let points: Vec<GeoPoint> = trkseg
                .children_named("trkpt")
                .filter_map(read_point)
                .collect();

            // Zero valid points leaves nothing to build
            let Ok(segment) = TrackSegment::new(points) else {
                tracing::debug!("Dropping segment at line {} without valid points", trkseg.line());
                continue;
            };

            segments.push(match track_name {
                Some(name) => segment.named(name),
                None => segment,
            });
        }
    }

    tracing::trace!("Built {} segments from <{}>", segments.len(), root.name());
    segments
}

/// Parse `bytes` and build its track segments in one step
pub fn build_from_bytes(bytes: &[u8]) -> Result<Vec<TrackSegment>> {
    let root = xml::parse(bytes)?;
    Ok(build(&root))
}

fn read_point(trkpt: &Node) -> Option<GeoPoint> {
    let latitude = parse_finite(trkpt.attribute("lat"));
    let longitude = parse_finite(trkpt.attribute("lon"));

    let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
        tracing::warn!(
            "Skipping track point at line {} with invalid coordinates: lat={:?}, lon={:?}",
            trkpt.line(),
            trkpt.attribute("lat"),
            trkpt.attribute("lon")
        );
        return None;
    };

    let elevation = trkpt
        .child("ele")
        .and_then(|ele| parse_finite(Some(ele.text())))
        .or_else(|| parse_finite(trkpt.attribute("ele")));

    Some(GeoPoint {
        latitude,
        longitude,
        elevation,
    })
}

fn parse_finite(value: Option<&str>) -> Option<f64> {
    value?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}
