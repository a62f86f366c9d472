//! Render targets and the mapping from native coordinates onto them.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use crate::{
    backend::{FramebufferId, FramebufferParams, RenderingApi},
    rdp::ScreenRect,
};

/// An off-screen render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferDescriptor {
    /// The requested size.
    pub orig_width: u32,
    pub orig_height: u32,
    /// The size the backend target currently has.
    pub applied_width: u32,
    pub applied_height: u32,
    /// The coordinate space display lists draw into this target with.
    pub native_width: u32,
    pub native_height: u32,
    pub msaa_level: u32,
    /// Follow the window size.
    pub resize: bool,
}

impl FramebufferDescriptor {
    fn params(&self) -> FramebufferParams {
        FramebufferParams {
            width: self.applied_width,
            height: self.applied_height,
            msaa_level: self.msaa_level,
            render_target: true,
            has_depth_buffer: true,
        }
    }

    fn scale(&self) -> (f32, f32) {
        (
            self.applied_width as f32 / self.native_width.max(1) as f32,
            self.applied_height as f32 / self.native_height.max(1) as f32,
        )
    }
}

/// The render targets created by the host, plus the window size they follow.
#[derive(Debug, Clone)]
pub struct Framebuffers {
    targets: BTreeMap<FramebufferId, FramebufferDescriptor>,
    active: Option<FramebufferId>,
    window: (u32, u32),
    native: (u32, u32),
}

fn resized(orig: u32, window: u32, native: u32) -> u32 {
    ((orig as u64 * window as u64 / native.max(1) as u64) as u32).max(1)
}

impl Framebuffers {
    pub fn new(native_width: u32, native_height: u32) -> Self {
        Self {
            targets: BTreeMap::new(),
            active: None,
            window: (native_width.max(1), native_height.max(1)),
            native: (native_width.max(1), native_height.max(1)),
        }
    }

    pub fn get(&self, fb: FramebufferId) -> Option<&FramebufferDescriptor> {
        self.targets.get(&fb)
    }

    pub fn active(&self) -> Option<FramebufferId> {
        self.active
    }

    pub fn window_dimensions(&self) -> (u32, u32) {
        self.window
    }

    pub fn native_dimensions(&self) -> (u32, u32) {
        self.native
    }

    pub fn create(
        &mut self,
        rapi: &mut dyn RenderingApi,
        width: u32,
        height: u32,
        native_width: u32,
        native_height: u32,
        msaa_level: u32,
        resize: bool,
    ) -> FramebufferId {
        let orig_width = width.max(1);
        let orig_height = height.max(1);
        let (applied_width, applied_height) = if resize {
            (
                resized(orig_width, self.window.0, self.native.0),
                resized(orig_height, self.window.1, self.native.1),
            )
        } else {
            (orig_width, orig_height)
        };
        let desc = FramebufferDescriptor {
            orig_width,
            orig_height,
            applied_width,
            applied_height,
            native_width: native_width.max(1),
            native_height: native_height.max(1),
            msaa_level: msaa_level.max(1),
            resize,
        };
        let fb = rapi.create_framebuffer();
        rapi.update_framebuffer_parameters(fb, desc.params());
        tracing::debug!(
            "created framebuffer {:?}: {}x{} (native {}x{})",
            fb,
            applied_width,
            applied_height,
            desc.native_width,
            desc.native_height
        );
        self.targets.insert(fb, desc);
        fb
    }

    /// Records a new window size, resizing the targets that follow it.
    ///
    /// Returns true if the size changed.
    pub fn set_window_dimensions(
        &mut self,
        rapi: &mut dyn RenderingApi,
        width: u32,
        height: u32,
    ) -> bool {
        let window = (width.max(1), height.max(1));
        if window == self.window {
            return false;
        }
        self.window = window;
        for (&fb, desc) in self.targets.iter_mut().filter(|(_, d)| d.resize) {
            desc.applied_width = resized(desc.orig_width, window.0, self.native.0);
            desc.applied_height = resized(desc.orig_height, window.1, self.native.1);
            rapi.update_framebuffer_parameters(fb, desc.params());
            tracing::debug!(
                "resized framebuffer {:?} to {}x{}",
                fb,
                desc.applied_width,
                desc.applied_height
            );
        }
        true
    }

    /// Makes `fb` the target of subsequent draws. Unknown ids fall back to the window.
    pub fn set_active(&mut self, fb: Option<FramebufferId>) {
        self.active = fb.filter(|fb| {
            let known = self.targets.contains_key(fb);
            if !known {
                tracing::warn!("unknown framebuffer {:?}", fb);
            }
            known
        });
    }

    /// The noise scale for the current target.
    pub fn noise_scale(&self) -> f32 {
        match self.active.and_then(|fb| self.targets.get(&fb)) {
            Some(desc) => desc.scale().1,
            None => self.window.1 as f32 / self.native.1 as f32,
        }
    }

    /// Horizontal correction applied to clip space x so 4:3 content keeps its shape.
    pub fn aspect_scale(&self) -> f32 {
        if self.active.is_some() {
            1.0
        } else {
            let window_aspect = self.window.0 as f32 / self.window.1 as f32;
            (4.0 / 3.0) / window_aspect
        }
    }

    /// Maps a rectangle in native coordinates (top left origin, `y` at the bottom edge) onto
    /// the current target (bottom left origin).
    pub fn adjust_viewport_or_scissor(&self, area: ScreenRect) -> ScreenRect {
        let target = self.active.and_then(|fb| self.targets.get(&fb));
        let (native_height, (ratio_x, ratio_y)) = match target {
            Some(desc) => (desc.native_height as f32, desc.scale()),
            None => (
                self.native.1 as f32,
                (
                    self.window.0 as f32 / self.native.0 as f32,
                    self.window.1 as f32 / self.native.1 as f32,
                ),
            ),
        };
        ScreenRect {
            x: area.x * ratio_x,
            y: (native_height - area.y) * ratio_y,
            width: area.width * ratio_x,
            height: area.height * ratio_y,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::recorder::RecordingBackend;

    #[test]
    fn test_resize_follows_window() {
        let mut rapi = RecordingBackend::new();
        let mut fbs = Framebuffers::new(320, 240);
        let fixed = fbs.create(&mut rapi, 64, 64, 64, 64, 1, false);
        let follow = fbs.create(&mut rapi, 320, 240, 320, 240, 1, true);

        assert!(fbs.set_window_dimensions(&mut rapi, 640, 480));
        assert!(!fbs.set_window_dimensions(&mut rapi, 640, 480));
        assert_eq!(fbs.get(fixed).unwrap().applied_width, 64);
        let desc = fbs.get(follow).unwrap();
        assert_eq!((desc.applied_width, desc.applied_height), (640, 480));
        assert_eq!(rapi.framebuffer_params(follow).unwrap().width, 640);

        fbs.set_window_dimensions(&mut rapi, 0, 0);
        assert_eq!(fbs.get(follow).unwrap().applied_width, 1);
    }

    #[test]
    fn test_adjust_to_window() {
        let fbs = Framebuffers::new(320, 240);
        let rect = fbs.adjust_viewport_or_scissor(ScreenRect {
            x: 10.0,
            y: 240.0,
            width: 100.0,
            height: 50.0,
        });
        assert_eq!(rect.x, 10.0);
        assert_eq!(rect.y, 0.0);
        assert_eq!(rect.width, 100.0);
        assert_eq!(rect.height, 50.0);
    }

    #[test]
    fn test_adjust_to_framebuffer() {
        let mut rapi = RecordingBackend::new();
        let mut fbs = Framebuffers::new(320, 240);
        let fb = fbs.create(&mut rapi, 128, 64, 64, 32, 1, false);
        fbs.set_active(Some(fb));
        assert_eq!(fbs.aspect_scale(), 1.0);
        let rect = fbs.adjust_viewport_or_scissor(ScreenRect {
            x: 0.0,
            y: 32.0,
            width: 64.0,
            height: 32.0,
        });
        assert_eq!(rect.y, 0.0);
        assert_eq!(rect.width, 128.0);
        assert_eq!(rect.height, 64.0);

        fbs.set_active(Some(FramebufferId(99)));
        assert_eq!(fbs.active(), None);
    }
}
