//! Click player
//!
//! A small pool of voices played round-robin, so a new click can start while
//! the previous one is still sounding. Each click restarts the next voice and
//! writes a `.` marker (and optionally the terminal bell) to the output.

use std::fmt;
use std::io::Write;
use thiserror::Error;

const BELL: &[u8] = b"\x07";

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("player not started")]
    NotStarted,
    #[error("player needs at least one voice")]
    NoVoices,
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

/// One playback slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Voice {
    plays: u64,
}

impl Voice {
    /// Stop whatever is playing and play again from the start.
    fn restart(&mut self) {
        self.plays += 1;
    }
}

pub struct Player {
    voices: Vec<Voice>,
    current: usize,
    bell: bool,
    started: bool,
    clicks: u64,
    out: Box<dyn Write + Send>,
}

impl Player {
    pub fn new(voices: usize, bell: bool, out: Box<dyn Write + Send>) -> Result<Self, PlayerError> {
        if voices == 0 {
            return Err(PlayerError::NoVoices);
        }
        Ok(Self {
            voices: vec![Voice::default(); voices],
            current: 0,
            bell,
            started: false,
            clicks: 0,
            out,
        })
    }

    pub fn start(&mut self) {
        self.started = true;
        tracing::info!(voices = self.voices.len(), "player started");
    }

    /// Play one click. Returns the index of the voice used.
    pub fn click(&mut self) -> Result<usize, PlayerError> {
        if !self.started {
            return Err(PlayerError::NotStarted);
        }
        let voice = self.current;
        self.current = (self.current + 1) % self.voices.len();
        self.voices[voice].restart();
        self.clicks += 1;

        self.out.write_all(b".")?;
        if self.bell {
            self.out.write_all(BELL)?;
        }
        self.out.flush()?;
        Ok(voice)
    }

    /// Stop all voices and end the line of click markers.
    pub fn destroy(&mut self) -> Result<(), PlayerError> {
        if !std::mem::take(&mut self.started) {
            return Ok(());
        }
        if self.clicks > 0 {
            self.out.write_all(b"\n")?;
            self.out.flush()?;
        }
        tracing::info!(clicks = self.clicks, "player exit");
        Ok(())
    }

    pub fn clicks(&self) -> u64 {
        self.clicks
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("voices", &self.voices)
            .field("current", &self.current)
            .field("started", &self.started)
            .field("clicks", &self.clicks)
            .finish_non_exhaustive()
    }
}
