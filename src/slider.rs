use eframe::egui::{
    self, epaint::Vertex, Color32, CornerRadius, Mesh, Pos2, Rect, Response, Rgba, Sense, Shape, Ui,
    Vec2, Widget,
};

/// Fixed tick marks along the track.
pub const MARKER_FRACTIONS: [f32; 3] = [0.25, 0.5, 0.75];

const TRACK_THICKNESS: f32 = 6.0;
const THUMB_RADIUS: f32 = 6.0;
const MARKER_SIZE: Vec2 = Vec2::new(2.0, 10.0);
const TRACK_BACKGROUND: Color32 = Color32::from_rgb(70, 70, 76);
const FILL_START: Color32 = Color32::from_rgb(40, 110, 240);
const FILL_END: Color32 = Color32::from_rgb(230, 45, 60);
const THUMB_COLOR: Color32 = Color32::from_rgb(230, 45, 60);

/// Maps a pointer x coordinate onto `[0, max]`.
pub fn value_at(pointer_x: f32, left: f32, width: f32, max: f64) -> f64 {
    if !(max > 0.0) {
        return 0.0;
    }
    let t = ((pointer_x - left) / width.max(1.0)).clamp(0.0, 1.0);
    (f64::from(t) * max).clamp(0.0, max)
}

/// Playback position slider. The response is marked changed on every
/// pointer movement that moves the value, so callers can seek live.
pub struct PositionSlider<'a> {
    value: &'a mut f64,
    max: f64,
}

impl<'a> PositionSlider<'a> {
    pub fn new(value: &'a mut f64, max: f64) -> Self {
        Self { value, max }
    }
}

impl Widget for PositionSlider<'_> {
    fn ui(self, ui: &mut Ui) -> Response {
        let Self { value, max } = self;
        let height = (THUMB_RADIUS * 2.0).max(MARKER_SIZE.y) + 6.0;
        let size = Vec2::new(ui.available_width(), height);
        let (rect, mut response) = ui.allocate_exact_size(size, Sense::click_and_drag());

        if response.hovered() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
        }

        let track_min_x = rect.min.x + THUMB_RADIUS;
        let track_max_x = (rect.max.x - THUMB_RADIUS).max(track_min_x + 1.0);
        let track_width = track_max_x - track_min_x;

        if response.dragged() || response.drag_started() || response.clicked() {
            if let Some(pos) = ui.input(|input| input.pointer.interact_pos()) {
                let new_value = value_at(pos.x, track_min_x, track_width, max);
                if (new_value - *value).abs() > f64::EPSILON {
                    *value = new_value;
                    response.mark_changed();
                }
            }
        }

        let fraction = if max > 0.0 {
            (*value / max).clamp(0.0, 1.0) as f32
        } else {
            0.0
        };

        let painter = ui.painter_at(rect);
        let cy = rect.center().y;
        let track = Rect::from_min_max(
            Pos2::new(track_min_x, cy - TRACK_THICKNESS / 2.0),
            Pos2::new(track_max_x, cy + TRACK_THICKNESS / 2.0),
        );
        painter.rect_filled(track, CornerRadius::same(3), TRACK_BACKGROUND);

        if fraction > 0.0 {
            let fill = Rect::from_min_max(
                track.min,
                Pos2::new(track.min.x + track_width * fraction, track.max.y),
            );
            painter.add(Shape::mesh(gradient_capsule(fill, FILL_START, FILL_END)));
        }

        for marker in MARKER_FRACTIONS {
            let center = Pos2::new(track_min_x + track_width * marker, cy);
            painter.rect_filled(
                Rect::from_center_size(center, MARKER_SIZE),
                CornerRadius::same(1),
                Color32::WHITE,
            );
        }

        let thumb = Pos2::new(track_min_x + track_width * fraction, cy);
        painter.circle_filled(thumb, THUMB_RADIUS, THUMB_COLOR);

        response
    }
}

/// Horizontal gradient over a capsule (fully rounded ends).
fn gradient_capsule(rect: Rect, start: Color32, end: Color32) -> Mesh {
    let mut mesh = Mesh::default();
    let width = rect.width().max(1.0);
    let steps = (width.ceil() as usize).clamp(1, 128);
    let step = width / steps as f32;

    for i in 0..steps {
        let x0 = rect.min.x + step * i as f32;
        let x1 = if i == steps - 1 {
            rect.max.x
        } else {
            (x0 + step).min(rect.max.x)
        };
        let (top0, bottom0) = capsule_span(rect, x0);
        let (top1, bottom1) = capsule_span(rect, x1);
        let c0 = lerp_color(start, end, (x0 - rect.min.x) / width);
        let c1 = lerp_color(start, end, (x1 - rect.min.x) / width);

        let v0 = push_vertex(&mut mesh, Pos2::new(x0, top0), c0);
        let v1 = push_vertex(&mut mesh, Pos2::new(x0, bottom0), c0);
        let v2 = push_vertex(&mut mesh, Pos2::new(x1, top1), c1);
        let v3 = push_vertex(&mut mesh, Pos2::new(x1, bottom1), c1);
        mesh.add_triangle(v0, v1, v2);
        mesh.add_triangle(v1, v3, v2);
    }
    mesh
}

/// Top and bottom of the capsule at `x`.
fn capsule_span(rect: Rect, x: f32) -> (f32, f32) {
    let radius = (rect.height() / 2.0).min(rect.width() / 2.0);
    let cy = rect.center().y;
    let x = x.clamp(rect.min.x, rect.max.x);
    let dx = if x < rect.min.x + radius {
        rect.min.x + radius - x
    } else if x > rect.max.x - radius {
        x - (rect.max.x - radius)
    } else {
        0.0
    };
    let half = (radius * radius - dx * dx).max(0.0).sqrt().max(rect.height() / 2.0 - radius);
    (cy - half, cy + half)
}

fn lerp_color(start: Color32, end: Color32, t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    Color32::from(Rgba::from(start) * (1.0 - t) + Rgba::from(end) * t)
}

fn push_vertex(mesh: &mut Mesh, pos: Pos2, color: Color32) -> u32 {
    let idx = mesh.vertices.len() as u32;
    mesh.vertices.push(Vertex {
        pos,
        uv: Pos2::ZERO,
        color,
    });
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_mapping_clamps_to_range() {
        assert_eq!(value_at(-50.0, 10.0, 100.0, 200.0), 0.0);
        assert_eq!(value_at(500.0, 10.0, 100.0, 200.0), 200.0);
        assert_eq!(value_at(60.0, 10.0, 100.0, 200.0), 100.0);
    }

    #[test]
    fn pointer_mapping_without_duration_is_zero() {
        assert_eq!(value_at(60.0, 10.0, 100.0, 0.0), 0.0);
        assert_eq!(value_at(60.0, 10.0, 100.0, f64::NAN), 0.0);
    }

    #[test]
    fn capsule_is_rounded_at_the_ends_only() {
        let rect = Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(100.0, 6.0));
        let (top, bottom) = capsule_span(rect, 50.0);
        assert_eq!((top, bottom), (0.0, 6.0));
        let (top, bottom) = capsule_span(rect, 0.0);
        assert_eq!(top, bottom);
    }

    #[test]
    fn gradient_mesh_spans_the_rect() {
        let rect = Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(40.0, 6.0));
        let mesh = gradient_capsule(rect, FILL_START, FILL_END);
        assert_eq!(mesh.vertices.len(), 40 * 4);
        let first = mesh.vertices[0].color;
        let last = mesh.vertices[mesh.vertices.len() - 1].color;
        assert!(first.b() > first.r());
        assert!(last.r() > last.b());
    }
}
