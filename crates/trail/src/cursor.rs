use glam::Vec2;

/// Pointer state consumed once per frame by the displacement pass.
///
/// All three positions start absent rather than holding an out-of-range
/// placeholder: `screen_ndc` is whatever the host delivered last,
/// `buffer` only ever moves on a positive surface intersection, and
/// `previous` trails `buffer` by one stamped frame so stroke speed can be
/// recovered.
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorState {
    screen_ndc: Option<Vec2>,
    buffer: Option<Vec2>,
    previous: Option<Vec2>,
}

/// One frame's worth of cursor motion, handed to the glow stamp.
///
/// `distance` is `None` on the very first contact, before any previous
/// coordinate exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorStep {
    pub position: Vec2,
    pub distance: Option<f32>,
}

impl CursorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the latest pointer position in normalized device coordinates.
    pub fn set_screen_ndc(&mut self, ndc: Vec2) {
        self.screen_ndc = Some(ndc);
    }

    pub fn screen_ndc(&self) -> Option<Vec2> {
        self.screen_ndc
    }

    /// Moves the buffer-space coordinate after a positive intersection.
    ///
    /// Misses must NOT call this: the coordinate holds its last value so a
    /// stroke that wanders off the surface resumes where it left rather
    /// than snapping anywhere.
    pub fn record_hit(&mut self, buffer_position: Vec2) {
        self.buffer = Some(buffer_position);
    }

    pub fn buffer(&self) -> Option<Vec2> {
        self.buffer
    }

    /// Consumes one frame of motion: returns the current stamp position and
    /// the distance travelled since the previous stamp, then rolls the
    /// current coordinate into `previous`.
    ///
    /// Returns `None` until the surface has been hit at least once.
    pub fn step(&mut self) -> Option<CursorStep> {
        let position = self.buffer?;
        let distance = self.previous.map(|prev| prev.distance(position));
        self.previous = Some(position);
        Some(CursorStep { position, distance })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_no_positions() {
        let mut cursor = CursorState::new();
        assert!(cursor.screen_ndc().is_none());
        assert!(cursor.buffer().is_none());
        assert!(cursor.step().is_none());
    }

    #[test]
    fn buffer_coordinate_survives_misses() {
        let mut cursor = CursorState::new();
        cursor.record_hit(Vec2::new(40.0, 60.0));
        // A miss frame performs no mutation at all.
        assert_eq!(cursor.buffer(), Some(Vec2::new(40.0, 60.0)));
        let step = cursor.step().expect("hit recorded");
        assert_eq!(step.position, Vec2::new(40.0, 60.0));
    }

    #[test]
    fn first_contact_has_no_distance() {
        let mut cursor = CursorState::new();
        cursor.record_hit(Vec2::new(10.0, 10.0));
        let step = cursor.step().expect("hit recorded");
        assert!(step.distance.is_none());
    }

    #[test]
    fn step_measures_travel_between_frames() {
        let mut cursor = CursorState::new();
        cursor.record_hit(Vec2::new(0.0, 0.0));
        cursor.step();
        cursor.record_hit(Vec2::new(3.0, 4.0));
        let step = cursor.step().expect("hit recorded");
        assert_eq!(step.distance, Some(5.0));
    }

    #[test]
    fn stationary_cursor_reports_zero_distance() {
        let mut cursor = CursorState::new();
        cursor.record_hit(Vec2::new(7.0, 7.0));
        cursor.step();
        // No new hit this frame; the held coordinate yields zero travel.
        let step = cursor.step().expect("hit recorded");
        assert_eq!(step.distance, Some(0.0));
    }
}
