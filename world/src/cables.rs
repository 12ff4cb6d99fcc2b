//! Cable drag state machine and the set of connected cables.

use cable_rush_core::{
    CableId, CableSnapshot, CableStatus, DeviceId, DeviceView, DragRejection, Event,
};
use cable_rush_system_cable_geometry::{CableGeometry, CablePath, HubPose};
use glam::Vec3;

use crate::device::{device_view, Device};

#[derive(Clone, Debug)]
struct Cable {
    id: CableId,
    path: CablePath,
    pointer: Vec3,
    device: Option<DeviceId>,
}

impl Cable {
    fn snapshot(&self) -> CableSnapshot {
        CableSnapshot {
            id: self.id,
            start: self.path.start,
            control: self.path.control,
            end: self.path.end,
            points: self.path.points.clone(),
            status: self.path.status,
            device: self.device,
        }
    }
}

/// Owns every cable and the single drag in progress.
///
/// Cables reference devices by id only. The world notifies the orchestrator
/// through [`Self::on_device_destroyed`] before it drops a device record.
#[derive(Clone, Debug)]
pub struct ConnectionOrchestrator {
    geometry: CableGeometry,
    cables: Vec<Cable>,
    dragging: Option<CableId>,
    next_cable_id: u32,
}

impl ConnectionOrchestrator {
    /// Creates an idle orchestrator.
    #[must_use]
    pub fn new(geometry: CableGeometry) -> Self {
        Self {
            geometry,
            cables: Vec::new(),
            dragging: None,
            next_cable_id: 0,
        }
    }

    /// Geometry solver used for every pointer update.
    #[must_use]
    pub const fn geometry(&self) -> &CableGeometry {
        &self.geometry
    }

    /// Cable currently following the pointer.
    #[must_use]
    pub const fn dragging(&self) -> Option<CableId> {
        self.dragging
    }

    /// Reports whether a drag is in progress.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    /// Number of cables attached to devices.
    #[must_use]
    pub fn connected_count(&self) -> usize {
        self.cables
            .iter()
            .filter(|cable| cable.device.is_some())
            .count()
    }

    /// Snapshots of every cable in creation order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<CableSnapshot> {
        self.cables.iter().map(Cable::snapshot).collect()
    }

    /// Starts a drag from the hub.
    ///
    /// Refused while another drag is active or when `max_cables` cables are
    /// already connected.
    pub fn begin_drag(
        &mut self,
        hub: HubPose,
        max_cables: u32,
        pointer: Vec3,
        devices: &DeviceView,
        out_events: &mut Vec<Event>,
    ) -> Option<CableId> {
        if self.dragging.is_some() {
            out_events.push(Event::CableDragRejected {
                reason: DragRejection::AlreadyDragging,
            });
            return None;
        }
        let limit = usize::try_from(max_cables).unwrap_or(usize::MAX);
        if self.connected_count() >= limit {
            log::debug!("cable limit of {max_cables} reached");
            out_events.push(Event::CableDragRejected {
                reason: DragRejection::CableLimitReached,
            });
            return None;
        }

        let id = CableId::new(self.next_cable_id);
        self.next_cable_id = self.next_cable_id.wrapping_add(1);
        let mut path = CablePath::anchored_at(hub.position());
        let _ = self.geometry.resolve(hub, pointer, devices, &mut path);
        self.cables.push(Cable {
            id,
            path,
            pointer,
            device: None,
        });
        self.dragging = Some(id);
        out_events.push(Event::CableDragStarted { cable: id });
        Some(id)
    }

    /// Recomputes the dragged cable for a new pointer position.
    ///
    /// Returns the device the cable currently snaps to.
    pub fn drag(&mut self, hub: HubPose, pointer: Vec3, devices: &DeviceView) -> Option<DeviceId> {
        let id = self.dragging?;
        let cable = self.cables.iter_mut().find(|cable| cable.id == id)?;
        cable.pointer = pointer;
        self.geometry.resolve(hub, pointer, devices, &mut cable.path)
    }

    /// Re-resolves the dragged cable at the last pointer position.
    ///
    /// Run once per tick so the snap follows device state changes even when
    /// the pointer holds still.
    pub fn refresh(&mut self, hub: HubPose, devices: &DeviceView) -> Option<DeviceId> {
        let id = self.dragging?;
        let cable = self.cables.iter_mut().find(|cable| cable.id == id)?;
        self.geometry.resolve(hub, cable.pointer, devices, &mut cable.path)
    }

    /// Finishes the drag, connecting the device under the pointer if any.
    ///
    /// Without an eligible target the drag is canceled.
    pub fn end_drag(
        &mut self,
        hub: HubPose,
        pointer: Vec3,
        devices: &mut [Device],
        out_events: &mut Vec<Event>,
    ) -> Option<DeviceId> {
        let view = device_view(devices);
        let Some(target) = self.drag(hub, pointer, &view) else {
            let _ = self.cancel_drag(out_events);
            return None;
        };

        let connected = devices
            .iter_mut()
            .find(|device| device.id() == target)
            .map_or(false, |device| device.connect(out_events));
        if !connected {
            let _ = self.cancel_drag(out_events);
            return None;
        }

        let cable = self.dragged_cable_mut()?;
        cable.device = Some(target);
        let id = cable.id;
        self.dragging = None;
        out_events.push(Event::CableConnected {
            cable: id,
            device: target,
        });
        Some(target)
    }

    /// Discards the dragged cable. A no-op when nothing is being dragged.
    pub fn cancel_drag(&mut self, out_events: &mut Vec<Event>) -> bool {
        let Some(id) = self.dragging.take() else {
            return false;
        };
        self.cables.retain(|cable| cable.id != id);
        out_events.push(Event::CableDragCanceled { cable: id });
        true
    }

    /// Removes the cable bound to a destroyed device.
    ///
    /// A drag snapped to the device loses its snap. Repeated calls are no-ops.
    pub fn on_device_destroyed(&mut self, device: DeviceId, out_events: &mut Vec<Event>) -> bool {
        if let Some(cable) = self.dragged_cable_mut() {
            if cable.path.target == Some(device) {
                cable.path.target = None;
                cable.path.status = CableStatus::Neutral;
            }
        }

        let Some(index) = self
            .cables
            .iter()
            .position(|cable| cable.device == Some(device))
        else {
            return false;
        };
        let cable = self.cables.remove(index);
        out_events.push(Event::CableRemoved {
            cable: cable.id,
            device,
        });
        true
    }

    /// Cancels the drag and drops every cable, returning how many were removed.
    pub fn destroy_all_cables(&mut self, out_events: &mut Vec<Event>) -> usize {
        let mut removed = usize::from(self.cancel_drag(out_events));
        for cable in self.cables.drain(..) {
            if let Some(device) = cable.device {
                out_events.push(Event::CableRemoved {
                    cable: cable.id,
                    device,
                });
            }
            removed += 1;
        }
        removed
    }

    fn dragged_cable_mut(&mut self) -> Option<&mut Cable> {
        let id = self.dragging?;
        self.cables.iter_mut().find(|cable| cable.id == id)
    }
}
