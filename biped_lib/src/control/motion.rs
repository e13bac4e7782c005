use tracing::debug;

use crate::error::Result;
use crate::types::MotionPlayer;

/// Tracks which motion clip currently owns the body.
#[derive(Debug, Clone, Default)]
pub struct CurrentMotion {
    current: Option<String>,
}

impl CurrentMotion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Whether the current clip has finished. False when nothing was played.
    pub fn is_over<P: MotionPlayer + ?Sized>(&self, player: &P) -> Result<bool> {
        match &self.current {
            Some(clip) => player.is_over(clip),
            None => Ok(false),
        }
    }

    /// Stops the current clip and starts `clip`.
    ///
    /// The player keeps a finished clip's completion flag raised until the
    /// clip is played again, so the outgoing clip is played and stopped once
    /// to clear it.
    pub fn set<P: MotionPlayer + ?Sized>(&mut self, clip: &str, player: &mut P) -> Result<()> {
        if let Some(previous) = self.current.take() {
            player.stop(&previous)?;
            player.play(&previous)?;
            player.stop(&previous)?;
        }
        player.play(clip)?;
        debug!("Playing motion clip {}", clip);
        self.current = Some(clip.to_string());
        Ok(())
    }
}
