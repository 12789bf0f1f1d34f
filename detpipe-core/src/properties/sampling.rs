//! Frame interval negotiation between `MEDIA_SAMPLING_INTERVAL` and
//! `FRAME_RATE_CAP`.

use log::trace;

use super::layers::PropertyLayers;
use super::PropertyResult;
use crate::constants::{FRAME_RATE_CAP, MEDIA_SAMPLING_INTERVAL};

impl PropertyLayers {
    /// Computes the effective frame interval for a medium with the given
    /// frame rate.
    ///
    /// Each of the pair is taken from the highest layer whose map contains
    /// the key, so an explicit `-1` stops the search for that property.
    /// A positive frame rate cap wins over the sampling interval.
    ///
    /// # Arguments
    ///
    /// * `fps` - Frames per second of the medium
    ///
    /// # Returns
    ///
    /// * The interval, never less than 1
    pub fn frame_interval(&self, fps: f64) -> PropertyResult<i32> {
        let cap = self.get_parsed::<i32>(FRAME_RATE_CAP)?;
        let interval = self.get_parsed::<i32>(MEDIA_SAMPLING_INTERVAL)?;
        trace!("Negotiating frame interval: cap={cap:?} interval={interval:?} fps={fps}");

        if let Some(cap) = cap.filter(|cap| *cap > 0) {
            let ratio = (fps / f64::from(cap) + 0.5).floor();
            return Ok((ratio as i32).max(1));
        }
        match interval {
            Some(interval) if interval > 0 => Ok(interval),
            _ => Ok(1),
        }
    }
}
