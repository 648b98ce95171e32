use eframe::egui::{
    self, pos2, vec2, Align, Color32, CornerRadius, FontId, Layout, RichText, Sense,
    TextureHandle, TextureOptions, ViewportCommand, WindowLevel,
};
use std::time::{Duration, Instant};

use crate::{
    artwork::Artwork,
    bridge::{PlayerBridge, PlayerStatus, RepeatMode},
    chime::Chime,
    controller::Controller,
    format::{format_remaining, format_timestamp, progress_percent},
    prefs::{PrefKey, PrefsStore},
    rating::MAX_STARS,
    slider::PositionSlider,
};

const ARTWORK_SIDE: f32 = 96.0;
const MARQUEE_SECS: f32 = 1.8;
const PLAYING_REPAINT: Duration = Duration::from_millis(250);
const IDLE_REPAINT: Duration = Duration::from_secs(1);
const ERROR_COLOR: Color32 = Color32::from_rgb(220, 80, 80);
const STAR_COLOR: Color32 = Color32::from_rgb(240, 190, 60);
const WARNING_COLOR: Color32 = Color32::from_rgb(230, 45, 60);
const DIM_COLOR: Color32 = Color32::from_gray(140);

pub type DynController = Controller<Box<dyn PlayerBridge>>;

pub struct WidgetApp {
    controller: DynController,
    prefs: PrefsStore,
    chime: Chime,
    artwork_texture: Option<(u64, TextureHandle)>,
    last_window_level: Option<WindowLevel>,
}

impl WidgetApp {
    pub fn new(controller: DynController, prefs: PrefsStore, chime: Chime) -> Self {
        Self {
            controller,
            prefs,
            chime,
            artwork_texture: None,
            last_window_level: None,
        }
    }

    fn set_pref(&mut self, key: PrefKey, value: bool) {
        if let Err(err) = self.prefs.set(key, value) {
            log::warn!("{err:#}");
        }
    }

    fn toggle_pref(&mut self, key: PrefKey) {
        if let Err(err) = self.prefs.toggle(key) {
            log::warn!("{err:#}");
        }
    }

    /// Timers only run while the window is visible.
    fn update_visibility(&mut self, ctx: &egui::Context, now: Instant) {
        let minimized = ctx.input(|i| i.viewport().minimized.unwrap_or(false));
        if minimized {
            self.controller.detach();
        } else {
            self.controller.attach(now);
        }
    }

    fn update_window_level(&mut self, ctx: &egui::Context) {
        let desired = if self.prefs.get(PrefKey::AlwaysOnTopDisabled) {
            WindowLevel::Normal
        } else {
            WindowLevel::AlwaysOnTop
        };

        if self.last_window_level != Some(desired) {
            ctx.send_viewport_cmd(ViewportCommand::WindowLevel(desired));
            self.last_window_level = Some(desired);
        }
    }

    fn sync_artwork_texture(&mut self, ctx: &egui::Context) {
        match &self.controller.state().artwork {
            Artwork::Placeholder => self.artwork_texture = None,
            Artwork::Image { hash, image } => {
                let current = self.artwork_texture.as_ref().map(|(h, _)| *h);
                if current != Some(*hash) {
                    let texture = ctx.load_texture(
                        "music_widget.artwork",
                        (**image).clone(),
                        TextureOptions::LINEAR,
                    );
                    self.artwork_texture = Some((*hash, texture));
                }
            }
        }
    }

    fn desired_repaint_interval(&self, now: Instant) -> Duration {
        let base = if !self.controller.is_attached() {
            IDLE_REPAINT
        } else if self.controller.state().status == PlayerStatus::Playing {
            PLAYING_REPAINT
        } else {
            IDLE_REPAINT
        };
        self.controller
            .time_until_next(now)
            .map_or(base, |due| due.min(base))
    }

    fn render_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let pinned = !self.prefs.get(PrefKey::AlwaysOnTopDisabled);
            let pin = ui
                .selectable_label(pinned, "📌")
                .on_hover_text("Keep on top");
            if pin.clicked() {
                self.set_pref(PrefKey::AlwaysOnTopDisabled, pinned);
            }

            let warning_on = !self.prefs.get(PrefKey::RatingWarningDisabled);
            let bell = ui
                .selectable_label(warning_on, "🔔")
                .on_hover_text("Warn about unrated songs");
            if bell.clicked() {
                self.set_pref(PrefKey::RatingWarningDisabled, warning_on);
            }

            ui.separator();

            let running = self.controller.state().is_running();
            ui.add_enabled_ui(running, |ui| {
                if ui.button("⏮").on_hover_text("Previous track").clicked() {
                    self.controller.previous_track();
                }
                let playing = self.controller.state().status == PlayerStatus::Playing;
                let (glyph, hint) = if playing {
                    ("⏸", "Pause")
                } else {
                    ("▶", "Play")
                };
                if ui.button(glyph).on_hover_text(hint).clicked() {
                    self.controller.play_pause();
                }
                if ui.button("⏭").on_hover_text("Next track").clicked() {
                    self.controller.next_track();
                }

                ui.separator();
                self.render_volume(ui);
            });
        });
    }

    fn render_volume(&mut self, ui: &mut egui::Ui) {
        if ui.small_button("🔇").on_hover_text("Mute").clicked() {
            self.controller.mute();
        }

        let mut value = self.controller.volume().value();
        let response = ui.add(
            egui::Slider::new(&mut value, 0.0..=100.0)
                .show_value(false)
                .trailing_fill(true),
        );
        if response.drag_started() {
            self.controller.begin_volume_drag();
        }
        if response.changed() {
            self.controller.set_volume(value);
        }
        if response.drag_stopped() {
            self.controller.end_volume_drag();
        }

        if ui.small_button("🔊").on_hover_text("Full volume").clicked() {
            self.controller.max_volume();
        }
    }

    fn render_artwork(&mut self, ui: &mut egui::Ui) {
        let (rect, response) =
            ui.allocate_exact_size(vec2(ARTWORK_SIDE, ARTWORK_SIDE), Sense::click());
        let painter = ui.painter_at(rect);
        let rounding = CornerRadius::same(6);

        match &self.artwork_texture {
            Some((_, texture)) => {
                let uv = egui::Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
                painter.image(texture.id(), rect, uv, Color32::WHITE);
            }
            None => {
                painter.rect_filled(rect, rounding, Color32::from_gray(50));
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "♪",
                    FontId::proportional(36.0),
                    DIM_COLOR,
                );
            }
        }

        let state = self.controller.state();
        if self.prefs.get(PrefKey::InfoPanelExpanded) && !state.track.is_empty() {
            painter.rect_filled(rect, rounding, Color32::from_black_alpha(180));
            let lines = [
                format!("Added: {}", state.track.date_added),
                format!("Played: {}", state.track.date_played),
                format!("Plays: {}", state.track.play_count),
            ];
            let mut y = rect.min.y + 6.0;
            for line in lines {
                painter.text(
                    pos2(rect.min.x + 6.0, y),
                    egui::Align2::LEFT_TOP,
                    line,
                    FontId::proportional(10.0),
                    Color32::WHITE,
                );
                y += 14.0;
            }
        }

        if response.clicked() {
            self.toggle_pref(PrefKey::InfoPanelExpanded);
        }
    }

    fn render_metadata(&mut self, ui: &mut egui::Ui) {
        let right = self.controller.marquee_right();
        let track = self.controller.state().track.clone();
        let text_color = ui.visuals().strong_text_color();
        marquee_label(ui, "title", &track.name, FontId::proportional(15.0), text_color, right);
        let byline = match (track.artist.is_empty(), track.album.is_empty()) {
            (false, false) => format!("{} - {}", track.artist, track.album),
            (false, true) => track.artist,
            (true, _) => track.album,
        };
        marquee_label(ui, "byline", &byline, FontId::proportional(12.0), DIM_COLOR, right);
    }

    fn render_rating_row(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = 2.0;
            let state = self.controller.state();
            if state.in_library {
                let loved = state.track.loved;
                let rating = state.track.rating;
                let heart = if loved { "♥" } else { "♡" };
                let heart_button = egui::Button::new(RichText::new(heart).color(WARNING_COLOR))
                    .frame(false);
                if ui.add(heart_button).on_hover_text("Love").clicked() {
                    self.controller.toggle_loved();
                }

                let star_color = if self.controller.is_flashing() {
                    WARNING_COLOR
                } else {
                    STAR_COLOR
                };
                for star in 1..=MAX_STARS {
                    let glyph = if star <= rating { "★" } else { "☆" };
                    let button =
                        egui::Button::new(RichText::new(glyph).color(star_color)).frame(false);
                    if ui.add(button).clicked() {
                        self.controller.set_rating(star);
                    }
                }
            } else if !state.track.is_empty() {
                ui.label(RichText::new("[Song not in library.]").small().color(DIM_COLOR));
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                self.render_extra_controls(ui);
            });
        });
    }

    fn render_extra_controls(&mut self, ui: &mut egui::Ui) {
        let state = self.controller.state();
        let shuffle = state.shuffle;
        let repeat = state.repeat;
        let has_duration = state.duration_secs.is_some();
        let playlists = state.favorited_playlists.clone();

        let mut chosen = None;
        egui::ComboBox::from_id_salt("music_widget.playlists")
            .selected_text("☰")
            .width(28.0)
            .show_ui(ui, |ui| {
                if playlists.is_empty() {
                    ui.label("No favourite playlists");
                }
                for name in &playlists {
                    if ui.selectable_label(false, name).clicked() {
                        chosen = Some(name.clone());
                    }
                }
            });
        if let Some(name) = chosen {
            self.controller.play_playlist(&name);
        }

        let info_open = self.prefs.get(PrefKey::InfoPanelExpanded);
        if ui.selectable_label(info_open, "ℹ").on_hover_text("Track info").clicked() {
            self.toggle_pref(PrefKey::InfoPanelExpanded);
        }

        let repeat_glyph = if repeat == RepeatMode::One { "🔂" } else { "🔁" };
        if ui
            .selectable_label(repeat.is_active(), repeat_glyph)
            .on_hover_text("Repeat")
            .clicked()
        {
            self.controller.cycle_repeat();
        }

        if ui.selectable_label(shuffle, "🔀").on_hover_text("Shuffle").clicked() {
            self.controller.toggle_shuffle();
        }

        let end = ui.add_enabled(has_duration, egui::Button::new("⏭|").small());
        if end.on_hover_text("Finish this song").clicked() {
            self.controller.end_track(Instant::now());
        }
    }

    fn render_position(&mut self, ui: &mut egui::Ui, now: Instant) {
        let Some(duration) = self.controller.state().duration_secs else {
            // A drag cannot outlive the slider.
            self.controller.end_seek();
            ui.label(RichText::new("Loading player position...").small().color(DIM_COLOR));
            return;
        };

        let mut position = self.controller.displayed_position(now);
        let response = ui.add(PositionSlider::new(&mut position, duration));
        if response.drag_started() {
            self.controller.begin_seek();
        }
        if response.changed() {
            self.controller.seek(position, now);
        }
        if response.drag_stopped() {
            self.controller.end_seek();
        }

        let percent = progress_percent(position, duration)
            .map(|p| format!("{p}%"))
            .unwrap_or_default();
        ui.columns(3, |columns| {
            columns[0].label(
                RichText::new(format!(
                    "{} ({})",
                    format_timestamp(position),
                    format_remaining(position, duration)
                ))
                .small(),
            );
            columns[1].with_layout(Layout::top_down(Align::Center), |col| {
                col.label(RichText::new(percent).small());
            });
            columns[2].with_layout(Layout::right_to_left(Align::Center), |col| {
                col.label(RichText::new(format_timestamp(duration)).small());
            });
        });
    }

    fn render_error(&mut self, ui: &mut egui::Ui) {
        if let Some(err) = &self.controller.state().last_error {
            ui.label(RichText::new(err).small().color(ERROR_COLOR));
        }
    }
}

impl eframe::App for WidgetApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.update_visibility(ctx, now);
        self.update_window_level(ctx);

        if self.prefs.poll_changes() {
            ctx.request_repaint();
        }

        let warning_disabled = self.prefs.get(PrefKey::RatingWarningDisabled);
        let outcome = self.controller.poll(now, warning_disabled);
        if outcome.chime {
            self.chime.play();
        }
        self.sync_artwork_texture(ctx);

        egui::TopBottomPanel::top("music_widget.toolbar").show(ctx, |ui| {
            self.render_toolbar(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if !self.controller.state().is_running() {
                ui.centered_and_justified(|ui| {
                    ui.label(RichText::new("Waiting for Music...").color(DIM_COLOR));
                });
                return;
            }

            ui.horizontal_top(|ui| {
                self.render_artwork(ui);
                ui.vertical(|ui| {
                    ui.spacing_mut().item_spacing.y = 4.0;
                    self.render_metadata(ui);
                    self.render_rating_row(ui);
                    self.render_position(ui, now);
                    self.render_error(ui);
                });
            });
        });

        ctx.request_repaint_after(self.desired_repaint_interval(now));
    }
}

impl Drop for WidgetApp {
    fn drop(&mut self) {
        self.controller.detach();
    }
}

/// A single-line label that slides between left and right alignment when
/// the text is wider than the space it gets.
fn marquee_label(
    ui: &mut egui::Ui,
    id_salt: &str,
    text: &str,
    font: FontId,
    color: Color32,
    to_right: bool,
) {
    let galley = ui.painter().layout_no_wrap(text.to_owned(), font, color);
    let width = ui.available_width().max(1.0);
    let (rect, _) = ui.allocate_exact_size(vec2(width, galley.size().y), Sense::hover());

    let overflow = (galley.size().x - width).max(0.0);
    let t = if overflow > 0.0 {
        ui.ctx()
            .animate_bool_with_time(ui.id().with(id_salt), to_right, MARQUEE_SECS)
    } else {
        0.0
    };
    ui.painter_at(rect)
        .galley(pos2(rect.min.x - overflow * t, rect.min.y), galley, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        artwork::ArtworkLibrary,
        bridge::{MockBridge, TrackInfo},
        config::{RatingWarningConfig, TimerConfig},
    };

    fn app(bridge: MockBridge) -> WidgetApp {
        let bridge: Box<dyn PlayerBridge> = Box::new(bridge);
        let controller = Controller::new(
            bridge,
            &TimerConfig::default(),
            0.8,
            ArtworkLibrary::open(None),
        );
        WidgetApp::new(
            controller,
            PrefsStore::in_memory(),
            Chime::new(&RatingWarningConfig::default()),
        )
    }

    #[test]
    fn first_frame_attaches_and_connects() {
        let ctx = egui::Context::default();
        let mut app = app(MockBridge::playing(TrackInfo {
            name: "Song".into(),
            duration_secs: 120.0,
            ..TrackInfo::default()
        }));

        let now = Instant::now();
        app.update_visibility(&ctx, now);
        app.controller.poll(now, false);
        assert!(app.controller.is_attached());
        assert!(app.controller.state().is_running());
        assert!(app.desired_repaint_interval(now) <= PLAYING_REPAINT);
    }

    #[test]
    fn loading_position_ends_any_drag_in_progress() {
        let ctx = egui::Context::default();
        let mut app = app(MockBridge::playing(TrackInfo {
            name: "Song".into(),
            duration_secs: 0.0,
            ..TrackInfo::default()
        }));
        let now = Instant::now();
        app.update_visibility(&ctx, now);
        app.controller.poll(now, false);
        assert_eq!(app.controller.state().duration_secs, None);

        app.controller.begin_seek();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| app.render_position(ui, now));
        });
        assert!(!app.controller.is_seeking());
    }

    #[test]
    fn placeholder_artwork_has_no_texture() {
        let ctx = egui::Context::default();
        let mut app = app(MockBridge::default());
        app.sync_artwork_texture(&ctx);
        assert!(app.artwork_texture.is_none());
    }
}
