/// Per-frame renderer counters.
///
/// Reset by `begin_frame`, readable after `end_frame`. Only draws the backend
/// accepted are counted, so tests use them as an oracle for what reached it.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub draw_calls: u32,
    pub state_changes: u32,
    pub vertices: u32,
    pub indices: u32,
}

impl RenderStats {
    pub(crate) fn record_draw(&mut self, vertices: u32, indices: u32) {
        self.draw_calls += 1;
        self.vertices += vertices;
        self.indices += indices;
    }
}
