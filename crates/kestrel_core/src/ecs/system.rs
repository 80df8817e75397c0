//! # Systems
//!
//! Systems are the per-frame logic. The [`SystemManager`] runs them strictly
//! sequentially: the ordered list first, then the render system, then the
//! audio system. A slow system blocks the whole frame.

use super::world::World;
use crate::error::CoreResult;

/// Per-frame logic operating on the world.
pub trait System {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs one frame step.
    ///
    /// # Errors
    ///
    /// Any error aborts the rest of the frame.
    fn update(&mut self, world: &mut World, dt: f32) -> CoreResult<()>;
}

/// Ordered systems plus the designated render and audio systems.
#[derive(Default)]
pub struct SystemManager {
    systems: Vec<Box<dyn System>>,
    render: Option<Box<dyn System>>,
    audio: Option<Box<dyn System>>,
}

impl SystemManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a system to the ordered list.
    pub fn add_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    /// Sets the render system, returning the previous one.
    pub fn set_render_system(&mut self, system: impl System + 'static) -> Option<Box<dyn System>> {
        self.render.replace(Box::new(system))
    }

    /// Sets the audio system, returning the previous one.
    pub fn set_audio_system(&mut self, system: impl System + 'static) -> Option<Box<dyn System>> {
        self.audio.replace(Box::new(system))
    }

    /// Number of systems that run each frame.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len() + usize::from(self.render.is_some()) + usize::from(self.audio.is_some())
    }

    /// Checks if no system is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.in_order().map(|system| system.name()).collect()
    }

    /// Runs every system once, in order.
    ///
    /// Returns the number of systems run.
    ///
    /// # Errors
    ///
    /// Stops at the first failing system and returns its error.
    pub fn run(&mut self, world: &mut World, dt: f32) -> CoreResult<usize> {
        let mut ran = 0;
        let ordered = self
            .systems
            .iter_mut()
            .chain(self.render.iter_mut())
            .chain(self.audio.iter_mut());
        for system in ordered {
            let span = tracing::debug_span!("system", name = system.name());
            let _enter = span.enter();
            system.update(world, dt)?;
            ran += 1;
        }
        Ok(ran)
    }

    fn in_order(&self) -> impl Iterator<Item = &Box<dyn System>> {
        self.systems.iter().chain(self.render.iter()).chain(self.audio.iter())
    }
}

impl std::fmt::Debug for SystemManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemManager")
            .field("systems", &self.names())
            .finish()
    }
}
