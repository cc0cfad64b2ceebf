use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use glam::{DVec3, Vec3};
use parking_lot::Mutex;

use crate::camera::PerspectiveCamera;
use crate::color::Color;
use crate::error::ViewerError;
use crate::geometry::Shape;
use crate::scene::{MeshId, Scene};
use crate::viewer::{Attachment, Host};

use super::SceneRenderer;

/// State of one mesh as it was drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshSnapshot {
    pub id: MeshId,
    pub shape: Shape,
    pub color: Color,
    pub rotation: DVec3,
    /// Bounding-box centre of the geometry in local space.
    pub center: Vec3,
}

/// One frame drawn by a [`HeadlessRenderer`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub meshes: Vec<MeshSnapshot>,
    pub lights: usize,
    pub aspect: f32,
}

/// Frames kept by a [`FrameLog`]; older ones are only counted.
pub const FRAME_HISTORY: usize = 8;

#[derive(Debug, Default)]
struct LogInner {
    attachments: usize,
    frame_count: u64,
    recent: VecDeque<FrameRecord>,
}

/// Shared record of what a headless host attached and drew. Counts every
/// frame but keeps only the last [`FRAME_HISTORY`] of them.
#[derive(Debug, Clone, Default)]
pub struct FrameLog {
    inner: Arc<Mutex<LogInner>>,
}

impl FrameLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attachments(&self) -> usize {
        self.inner.lock().attachments
    }

    /// Frames drawn since the log was created.
    pub fn frame_count(&self) -> u64 {
        self.inner.lock().frame_count
    }

    /// The most recent frames, oldest first.
    pub fn recent(&self) -> Vec<FrameRecord> {
        self.inner.lock().recent.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<FrameRecord> {
        self.inner.lock().recent.back().cloned()
    }

    fn record_attachment(&self) {
        self.inner.lock().attachments += 1;
    }

    fn push(&self, frame: FrameRecord) {
        let mut inner = self.inner.lock();
        inner.frame_count += 1;
        if inner.recent.len() == FRAME_HISTORY {
            inner.recent.pop_front();
        }
        inner.recent.push_back(frame);
    }
}

/// Host without a display. Optionally only accepts one mount identifier, so
/// a missing mount element can be reproduced.
#[derive(Debug, Clone)]
pub struct HeadlessHost {
    viewport: (u32, u32),
    mount: Option<String>,
    log: FrameLog,
}

impl HeadlessHost {
    pub fn new(viewport: (u32, u32)) -> Self {
        Self {
            viewport,
            mount: None,
            log: FrameLog::new(),
        }
    }

    pub fn with_mount(mount: impl Into<String>, viewport: (u32, u32)) -> Self {
        Self {
            mount: Some(mount.into()),
            ..Self::new(viewport)
        }
    }

    pub fn log(&self) -> FrameLog {
        self.log.clone()
    }
}

impl Host for HeadlessHost {
    type Renderer = HeadlessRenderer;

    fn attach(&mut self, mount_id: &str) -> Result<Attachment<HeadlessRenderer>, ViewerError> {
        if let Some(mount) = &self.mount {
            if mount != mount_id {
                return Err(ViewerError::MountNotFound(mount_id.to_string()));
            }
        }
        self.log.record_attachment();
        Ok(Attachment {
            renderer: HeadlessRenderer {
                log: self.log.clone(),
            },
            viewport: self.viewport,
        })
    }
}

/// Renderer that records a snapshot of every frame instead of drawing.
#[derive(Debug, Clone)]
pub struct HeadlessRenderer {
    log: FrameLog,
}

impl SceneRenderer for HeadlessRenderer {
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()> {
        let meshes = scene
            .meshes()
            .iter()
            .map(|mesh| MeshSnapshot {
                id: mesh.id,
                shape: mesh.shape,
                color: mesh.material.color,
                rotation: mesh.rotation,
                center: mesh
                    .geometry
                    .bounding_box()
                    .map(|bounds| bounds.center())
                    .unwrap_or(Vec3::ZERO),
            })
            .collect();
        self.log.push(FrameRecord {
            meshes,
            lights: scene.lights().len(),
            aspect: camera.aspect,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restricted_mount_rejects_other_ids() {
        let mut host = HeadlessHost::with_mount("viewer", (100, 100));
        assert!(matches!(
            host.attach("elsewhere"),
            Err(ViewerError::MountNotFound(id)) if id == "elsewhere"
        ));
        assert!(host.attach("viewer").is_ok());
        assert_eq!(host.log().attachments(), 1);
    }

    #[test]
    fn renderer_records_scene_snapshot() {
        let mut host = HeadlessHost::new((200, 100));
        let log = host.log();
        let Attachment { mut renderer, .. } = host.attach("any").unwrap();
        let camera = PerspectiveCamera::new(&Default::default(), (200, 100));
        renderer.render(&Scene::default(), &camera).unwrap();
        let frame = log.last().unwrap();
        assert!(frame.meshes.is_empty());
        assert_eq!(frame.aspect, 2.0);
        assert_eq!(log.frame_count(), 1);
    }

    #[test]
    fn log_keeps_a_bounded_history() {
        let mut host = HeadlessHost::new((64, 64));
        let log = host.log();
        let Attachment { mut renderer, .. } = host.attach("any").unwrap();
        let camera = PerspectiveCamera::new(&Default::default(), (64, 64));
        let scene = Scene::default();
        for _ in 0..200 * 60 {
            renderer.render(&scene, &camera).unwrap();
        }
        assert_eq!(log.frame_count(), 12_000);
        let recent = log.recent();
        assert_eq!(recent.len(), FRAME_HISTORY);
        assert_eq!(recent.last(), log.last().as_ref());
    }
}
