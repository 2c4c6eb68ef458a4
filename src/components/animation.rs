// ============================================================================
// Animation playback — explicit owned session, no free-running timers
// ============================================================================

use std::time::{Duration, Instant};

/// One playback run: anchored at a start instant and frame, advancing
/// `frame_count` frames in a loop at `1000 / fps` ms per frame.
///
/// The session is a value, not a timer callback. The embedding render
/// loop calls [`Playback::tick`] each refresh; a change to fps or frame
/// count invalidates the anchor and starts a fresh session in place, so a
/// stale interval can never drift the frame index.
#[derive(Clone, Debug)]
pub struct PlaybackSession {
    anchor: Instant,
    anchor_frame: usize,
    fps: u32,
    frame_count: usize,
}

impl PlaybackSession {
    pub fn new(fps: u32, frame_count: usize, at_frame: usize, now: Instant) -> Self {
        PlaybackSession {
            anchor: now,
            anchor_frame: at_frame,
            fps: fps.max(1),
            frame_count: frame_count.max(1),
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps as f64)
    }

    /// Frame index at `now`: whole intervals elapsed since the anchor,
    /// advanced modulo the frame count.
    pub fn current_frame(&self, now: Instant) -> usize {
        let elapsed = now.saturating_duration_since(self.anchor);
        let steps = (elapsed.as_secs_f64() * self.fps as f64).floor() as usize;
        (self.anchor_frame + steps) % self.frame_count
    }

    fn matches(&self, fps: u32, frame_count: usize) -> bool {
        self.fps == fps.max(1) && self.frame_count == frame_count.max(1)
    }
}

/// Start/stop owner for the playback session.
#[derive(Clone, Debug, Default)]
pub struct Playback {
    session: Option<PlaybackSession>,
}

impl Playback {
    pub fn new() -> Self {
        Playback { session: None }
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_some()
    }

    pub fn start(&mut self, fps: u32, frame_count: usize, at_frame: usize, now: Instant) {
        self.session = Some(PlaybackSession::new(fps, frame_count, at_frame, now));
    }

    pub fn stop(&mut self) {
        self.session = None;
    }

    /// Advance playback. Returns the frame to display, or `None` when
    /// stopped. A changed fps or frame count re-anchors the session at
    /// the frame it was showing, discarding the old interval.
    pub fn tick(&mut self, now: Instant, fps: u32, frame_count: usize) -> Option<usize> {
        let session = self.session.as_ref()?;
        if !session.matches(fps, frame_count) {
            let frame = session.current_frame(now) % frame_count.max(1);
            self.session = Some(PlaybackSession::new(fps, frame_count, frame, now));
            return Some(frame);
        }
        Some(session.current_frame(now))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_advance_at_the_fps_interval() {
        let t0 = Instant::now();
        let session = PlaybackSession::new(8, 4, 0, t0); // 125 ms per frame
        assert_eq!(session.current_frame(t0), 0);
        assert_eq!(session.current_frame(t0 + Duration::from_millis(124)), 0);
        assert_eq!(session.current_frame(t0 + Duration::from_millis(126)), 1);
        assert_eq!(session.current_frame(t0 + Duration::from_millis(380)), 3);
    }

    #[test]
    fn playback_wraps_modulo_frame_count() {
        let t0 = Instant::now();
        let session = PlaybackSession::new(8, 3, 2, t0);
        assert_eq!(session.current_frame(t0 + Duration::from_millis(130)), 0);
    }

    #[test]
    fn tick_reanchors_when_fps_changes() {
        let t0 = Instant::now();
        let mut playback = Playback::new();
        playback.start(8, 4, 0, t0);

        let t1 = t0 + Duration::from_millis(260); // two 125 ms steps
        assert_eq!(playback.tick(t1, 8, 4), Some(2));

        // fps change: session restarts anchored at the current frame
        assert_eq!(playback.tick(t1, 16, 4), Some(2));
        let t2 = t1 + Duration::from_millis(70); // one 62.5 ms step
        assert_eq!(playback.tick(t2, 16, 4), Some(3));
    }

    #[test]
    fn tick_reanchors_when_frame_count_shrinks() {
        let t0 = Instant::now();
        let mut playback = Playback::new();
        playback.start(8, 6, 5, t0);
        // Dropping to 4 frames clamps the shown frame into range
        assert_eq!(playback.tick(t0, 8, 4), Some(1));
    }

    #[test]
    fn stop_ends_the_session() {
        let mut playback = Playback::new();
        playback.start(8, 4, 0, Instant::now());
        assert!(playback.is_playing());
        playback.stop();
        assert!(!playback.is_playing());
        assert_eq!(playback.tick(Instant::now(), 8, 4), None);
    }
}
