//! Banner shown before a command executes.

use crate::animation::AnimationHandle;

/// What a banner displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub title: String,
    pub version: String,
    pub slogan: String,
}

/// Draws banners. The returned handle stops any animation still running.
pub trait BannerRenderer: Send + Sync {
    fn render(&self, banner: &Banner) -> AnimationHandle;
}

/// Draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentRenderer;

impl BannerRenderer for SilentRenderer {
    fn render(&self, _banner: &Banner) -> AnimationHandle {
        AnimationHandle::noop()
    }
}
