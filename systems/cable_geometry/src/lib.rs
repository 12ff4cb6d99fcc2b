#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure cable geometry: hub port selection, length clamping, quadratic Bézier
//! sampling and snap-to-device detection.
//!
//! Every function in this crate is deterministic and free of side effects so
//! the world can recompute the dragged cable from scratch each tick.

use cable_rush_core::{CableStatus, DeviceId, DeviceSnapshot, DeviceView};
use glam::Vec3;
use serde::{Deserialize, Serialize};

const MIN_CURVE_POINTS: usize = 3;

/// Tunable parameters that shape a cable.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CableSettings {
    /// Longest distance a cable may span from its hub port.
    pub max_cable_distance: f32,
    /// Radius around the cable end searched for connectable devices.
    pub connection_radius: f32,
    /// Offset along the hub's forward axis of the front port.
    pub front_offset: f32,
    /// Offset along the hub's forward axis of the back port.
    pub back_offset: f32,
    /// Distance of the Bézier control point from the hub.
    pub curve_offset_distance: f32,
    /// Number of polyline points sampled along the curve.
    pub curve_resolution: usize,
}

impl Default for CableSettings {
    fn default() -> Self {
        Self {
            max_cable_distance: 8.0,
            connection_radius: 1.0,
            front_offset: 0.8,
            back_offset: -0.8,
            curve_offset_distance: 2.0,
            curve_resolution: 8,
        }
    }
}

/// Position and facing of the hub cables originate from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HubPose {
    position: Vec3,
    forward: Vec3,
}

impl HubPose {
    /// Creates a pose, flattening `forward` onto the ground plane.
    ///
    /// A degenerate forward vector falls back to `+Z`.
    #[must_use]
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        let planar = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
        let forward = if planar == Vec3::ZERO { Vec3::Z } else { planar };
        Self { position, forward }
    }

    /// World position of the hub.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit forward axis of the hub on the ground plane.
    #[must_use]
    pub const fn forward(&self) -> Vec3 {
        self.forward
    }
}

/// Picks the hub port a cable leaves from.
///
/// The drag direction is flattened onto the XZ plane and compared against the
/// hub's forward axis: a positive dot product selects the front port,
/// anything else (including a zero direction) selects the back port.
#[must_use]
pub fn origin_for(
    drag_direction: Vec3,
    hub_position: Vec3,
    hub_forward: Vec3,
    front_offset: f32,
    back_offset: f32,
) -> Vec3 {
    let planar = Vec3::new(drag_direction.x, 0.0, drag_direction.z).normalize_or_zero();
    let offset = if hub_forward.dot(planar) > 0.0 {
        front_offset
    } else {
        back_offset
    };
    hub_position + hub_forward * offset
}

/// Pulls `end` back along the cable so it lies at most `max_distance` from `start`.
#[must_use]
pub fn clamp_length(start: Vec3, end: Vec3, max_distance: f32) -> Vec3 {
    let max_distance = max_distance.max(0.0);
    let offset = end - start;
    let length = offset.length();
    if length <= max_distance || length == 0.0 {
        return end;
    }
    start + offset * (max_distance / length)
}

/// Evaluates the quadratic Bézier curve at `t`, clamped to `[0, 1]`.
#[must_use]
pub fn curve_point(start: Vec3, control: Vec3, end: Vec3, t: f32) -> Vec3 {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    if t == 0.0 {
        return start;
    }
    if t == 1.0 {
        return end;
    }
    let u = 1.0 - t;
    start * (u * u) + control * (2.0 * u * t) + end * (t * t)
}

/// Samples the curve into `out`, replacing its contents.
///
/// At least three points are produced; the first equals `start` and the last
/// equals `end`.
pub fn sample_curve(start: Vec3, control: Vec3, end: Vec3, resolution: usize, out: &mut Vec<Vec3>) {
    out.clear();
    let count = resolution.max(MIN_CURVE_POINTS);
    out.reserve(count);
    let last = (count - 1) as f32;
    for index in 0..count {
        out.push(curve_point(start, control, end, index as f32 / last));
    }
}

/// Places the Bézier control point on the same side of the hub as `start`.
#[must_use]
pub fn control_point_for(
    start: Vec3,
    hub_position: Vec3,
    hub_forward: Vec3,
    offset_distance: f32,
) -> Vec3 {
    let direction = if (start - hub_position).dot(hub_forward) > 0.0 {
        hub_forward
    } else {
        -hub_forward
    };
    hub_position + direction * offset_distance
}

/// Finds the nearest device within `radius` of `point` that accepts a cable.
///
/// Only devices still waiting for a cable with time left are considered.
/// Equal distances resolve to the lowest device id.
#[must_use]
pub fn nearest_eligible_target<'a>(
    point: Vec3,
    radius: f32,
    devices: &'a DeviceView,
) -> Option<&'a DeviceSnapshot> {
    let max_distance_sq = radius.max(0.0) * radius.max(0.0);
    let mut best: Option<Candidate<'a>> = None;

    for snapshot in devices.iter() {
        if !snapshot.is_connectable() {
            continue;
        }

        let distance_sq = snapshot.position.distance_squared(point);
        if distance_sq > max_distance_sq {
            continue;
        }

        let current = Candidate {
            distance_sq,
            snapshot,
        };
        match &mut best {
            Some(existing) => {
                if current.precedes(existing) {
                    *existing = current;
                }
            }
            None => best = Some(current),
        }
    }

    best.map(|candidate| candidate.snapshot)
}

#[derive(Clone, Copy, Debug)]
struct Candidate<'a> {
    distance_sq: f32,
    snapshot: &'a DeviceSnapshot,
}

impl Candidate<'_> {
    fn precedes(&self, other: &Self) -> bool {
        if self.distance_sq != other.distance_sq {
            return self.distance_sq < other.distance_sq;
        }
        self.snapshot.id < other.snapshot.id
    }
}

/// Fully resolved shape of a dragged cable.
#[derive(Clone, Debug, PartialEq)]
pub struct CablePath {
    /// Hub port the cable leaves from.
    pub start: Vec3,
    /// Bézier control point.
    pub control: Vec3,
    /// Free end of the cable after clamping and snapping.
    pub end: Vec3,
    /// Sampled polyline.
    pub points: Vec<Vec3>,
    /// Visual validity of the cable.
    pub status: CableStatus,
    /// Device the cable currently snaps to.
    pub target: Option<DeviceId>,
}

impl CablePath {
    /// Creates a zero-length path anchored at `anchor`.
    #[must_use]
    pub fn anchored_at(anchor: Vec3) -> Self {
        Self {
            start: anchor,
            control: anchor,
            end: anchor,
            points: Vec::new(),
            status: CableStatus::Neutral,
            target: None,
        }
    }
}

/// Recomputes dragged cables from the hub pose and pointer position.
#[derive(Clone, Debug, Default)]
pub struct CableGeometry {
    settings: CableSettings,
}

impl CableGeometry {
    /// Creates the geometry solver using the provided settings.
    #[must_use]
    pub const fn new(settings: CableSettings) -> Self {
        Self { settings }
    }

    /// Settings the solver was created with.
    #[must_use]
    pub const fn settings(&self) -> &CableSettings {
        &self.settings
    }

    /// Rebuilds `path` for the current pointer position.
    ///
    /// Returns the device the cable snapped to, if any. Nothing from the
    /// previous call is reused for the snap decision.
    pub fn resolve(
        &self,
        hub: HubPose,
        pointer: Vec3,
        devices: &DeviceView,
        path: &mut CablePath,
    ) -> Option<DeviceId> {
        let settings = &self.settings;
        let start = origin_for(
            pointer - hub.position(),
            hub.position(),
            hub.forward(),
            settings.front_offset,
            settings.back_offset,
        );
        let distance = start.distance(pointer);
        let clamped = clamp_length(start, pointer, settings.max_cable_distance);

        let target = nearest_eligible_target(clamped, settings.connection_radius, devices);
        let (end, status, target) = match target {
            Some(snapshot) => (snapshot.position, CableStatus::Valid, Some(snapshot.id)),
            None if distance >= settings.max_cable_distance => {
                (clamped, CableStatus::Invalid, None)
            }
            None => (clamped, CableStatus::Neutral, None),
        };

        path.start = start;
        path.end = end;
        path.control = control_point_for(
            start,
            hub.position(),
            hub.forward(),
            settings.curve_offset_distance,
        );
        path.status = status;
        path.target = target;
        sample_curve(
            path.start,
            path.control,
            path.end,
            settings.curve_resolution,
            &mut path.points,
        );
        target
    }
}
