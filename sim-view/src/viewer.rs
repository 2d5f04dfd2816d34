//! Interactive particle viewer built with eframe/egui.
//!
//! This module defines [`Viewer`], which owns a [`Simulation`] plus the UI
//! state around it and implements [`eframe::App`] to drive and render it.

use eframe::App;
use glam::Vec2;
use sim_core::{
    Config, Environment, PushForce, Simulation,
    bonds::BondView,
    collision::CollisionEvent,
    particle::Particle,
    stats::FrameRate,
    types::Bounds,
};
use tracing::{info, warn};

/// Minimum time between two collision indicator updates, in seconds.
const COLLISION_THROTTLE: f64 = 0.1;

/// What a primary click or drag on the canvas does.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Tool {
    /// Dragging pushes particles away from the pointer.
    Push,
    /// Clicking places one particle of the given radius.
    Spawn { radius: f32 },
}

/// Main application state for the interactive viewer.
///
/// The per-frame update is:
/// 1. Handle UI interactions and pointer input.
/// 2. Advance the simulation one tick unless paused.
/// 3. Render bonds, particles, the collision indicator and tool hints.
///
/// ### Fields
/// - `sim` - The simulation being shown.
/// - `frame_rate` - Frames-per-second counter shown in the status bar.
///
/// - `temperature`, `population` - Slider state, pushed into `sim` on change.
/// - `push_radius`, `push_strength` - Parameters of the cursor push.
/// - `tool` - Active canvas tool.
///
/// - `zoom` - Zoom factor on top of the fit-to-window scale.
/// - `pan` - Screen-space pan offset in pixels.
///
/// - `collision_flash` - Pairs highlighted by the collision indicator.
/// - `last_flash_time` - egui time of the last indicator update.
/// - `fit_world_requested` - Resize the world to the canvas on the next frame.
/// - `last_error` - Most recent rejected operation, shown in the status bar.
pub struct Viewer {
    sim: Simulation,
    frame_rate: FrameRate,

    temperature: f32,
    population: usize,
    push_radius: f32,
    push_strength: f32,
    tool: Tool,

    zoom: f32,
    pan: egui::Vec2,

    collision_flash: Vec<CollisionEvent>,
    last_flash_time: f64,
    fit_world_requested: bool,
    last_error: Option<String>,
}

impl Viewer {
    /// Creates a viewer over a simulation built from [`Config::default`].
    pub fn new() -> sim_core::Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(cfg: Config) -> sim_core::Result<Self> {
        let sim = Simulation::new(cfg)?;
        info!(
            particles = sim.particles().len(),
            width = cfg.world.width,
            height = cfg.world.height,
            "viewer started"
        );
        Ok(Self {
            sim,
            frame_rate: FrameRate::new(),
            temperature: cfg.temperature,
            population: cfg.population,
            push_radius: cfg.push_radius,
            push_strength: cfg.push_strength,
            tool: Tool::Push,
            zoom: 1.0,
            pan: egui::vec2(0.0, 0.0),
            collision_flash: Vec::new(),
            last_flash_time: f64::NEG_INFINITY,
            fit_world_requested: false,
            last_error: None,
        })
    }

    /// Re-seeds the population from scratch, keeping environment and sliders.
    fn reset(&mut self) {
        self.sim.reset_with_seed(None);
        self.population = self.sim.particles().len();
        self.collision_flash.clear();
        self.last_error = None;
    }

    /// Runs one tick even while paused.
    fn step_once(&mut self, pushes: &[PushForce]) {
        let was_paused = self.sim.is_paused();
        self.sim.set_paused(false);
        self.advance(pushes);
        self.sim.set_paused(was_paused);
    }

    /// Runs one tick if not paused and records a rejected tick.
    fn advance(&mut self, pushes: &[PushForce]) {
        if let Err(e) = self.sim.tick(pushes) {
            warn!(error = %e, "tick failed");
            self.last_error = Some(e.to_string());
        }
    }

    /// Refreshes the collision indicator from the last tick, at most once per
    /// [`COLLISION_THROTTLE`].
    fn note_collisions(&mut self, now: f64) {
        let events = self.sim.collisions();
        if events.is_empty() || now - self.last_flash_time < COLLISION_THROTTLE {
            return;
        }
        self.collision_flash.clear();
        self.collision_flash.extend_from_slice(events);
        self.last_flash_time = now;
    }

    fn report<T>(&mut self, result: sim_core::Result<T>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "rejected");
                self.last_error = Some(e.to_string());
                None
            }
        }
    }

    /// Pixels per world unit for the given drawing area.
    fn scale(&self, rect: egui::Rect) -> f32 {
        let Bounds { width, height } = self.sim.bounds();
        (rect.width() / width).min(rect.height() / height) * self.zoom
    }

    /// Converts a world-space position to screen-space.
    ///
    /// The world centre lands on the centre of `rect`, shifted by `pan`. Both
    /// spaces have y pointing down.
    fn world_to_screen(&self, p: Vec2, rect: egui::Rect) -> egui::Pos2 {
        let Bounds { width, height } = self.sim.bounds();
        let s = self.scale(rect);
        let center = rect.center();
        egui::pos2(
            center.x + (p.x - width * 0.5) * s + self.pan.x,
            center.y + (p.y - height * 0.5) * s + self.pan.y,
        )
    }

    /// Inverse of [`Viewer::world_to_screen`] (up to floating point rounding).
    fn screen_to_world(&self, p: egui::Pos2, rect: egui::Rect) -> Vec2 {
        let Bounds { width, height } = self.sim.bounds();
        let s = self.scale(rect);
        let center = rect.center();
        Vec2::new(
            (p.x - center.x - self.pan.x) / s + width * 0.5,
            (p.y - center.y - self.pan.y) / s + height * 0.5,
        )
    }

    /// Fill colour by particle radius.
    fn particle_color(p: &Particle) -> egui::Color32 {
        if p.radius < 4.0 {
            egui::Color32::from_rgb(0x21, 0x96, 0xf3)
        } else if p.radius < 7.0 {
            egui::Color32::from_rgb(0x4c, 0xaf, 0x50)
        } else {
            egui::Color32::from_rgb(0xe5, 0x39, 0x35)
        }
    }

    /// Stroke for a bond; fades out as it approaches its break length.
    fn bond_stroke(view: &BondView) -> egui::Stroke {
        let fade = 1.0 - (view.length / (view.rest * 1.5)).min(1.0);
        let alpha = (fade * 255.0) as u8;
        let color = if view.stressed {
            egui::Color32::from_rgba_unmultiplied(255, 100, 100, alpha)
        } else {
            egui::Color32::from_rgba_unmultiplied(200, 200, 200, alpha)
        };
        egui::Stroke::new(1.0, color)
    }

    /// Builds the top panel (run controls, reset, zoom).
    fn ui_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let label = if self.sim.is_paused() { "▶ Run" } else { "⏸ Pause" };
                if ui.button(label).clicked() {
                    self.sim.toggle_pause();
                }

                if ui.button("Step").clicked() {
                    self.step_once(&[]);
                }

                if ui.button("Reset").clicked() {
                    self.reset();
                }

                ui.separator();
                ui.add(egui::Slider::new(&mut self.zoom, 0.25..=8.0).text("Zoom"));
                if ui.button("Recenter").clicked() {
                    self.zoom = 1.0;
                    self.pan = egui::vec2(0.0, 0.0);
                }
            });
        });
    }

    /// Builds the bottom status bar (counts, temperature, frame rate).
    fn ui_status_bar(&self, ctx: &egui::Context) {
        let stats = self.sim.stats();
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("fps = {}", self.frame_rate.fps()));
                ui.label(format!("temperature = {}", stats.mean_kinetic_temperature));
                ui.separator();
                ui.label(format!("bonds = {}", stats.bond_count));
                ui.label(format!("particles = {}", stats.particle_count));
                ui.label(format!("env = {}", self.sim.environment()));
                if let Some(err) = &self.last_error {
                    ui.separator();
                    ui.colored_label(egui::Color32::LIGHT_RED, err);
                }
            });
        });
    }

    /// Builds the right-hand panel for environment and simulation parameters.
    fn ui_config_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("config_panel")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.heading("Config");

                ui.separator();
                let mut env = self.sim.environment();
                egui::ComboBox::from_label("Environment")
                    .selected_text(env.name())
                    .show_ui(ui, |ui| {
                        for e in Environment::ALL {
                            ui.selectable_value(&mut env, e, e.name());
                        }
                    });
                if env != self.sim.environment() {
                    self.sim.set_environment(env);
                }

                ui.separator();
                if ui
                    .add(egui::Slider::new(&mut self.temperature, 0.0..=100.0).text("Temperature"))
                    .changed()
                {
                    let result = self.sim.set_temperature(self.temperature);
                    self.report(result);
                }

                if ui
                    .add(egui::Slider::new(&mut self.population, 0..=2000).text("Particles"))
                    .changed()
                {
                    self.sim.set_population_target(self.population);
                }

                ui.separator();
                ui.label("Push");
                ui.add(egui::Slider::new(&mut self.push_radius, 0.0..=400.0).text("radius"));
                ui.add(egui::Slider::new(&mut self.push_strength, 0.0..=10.0).text("strength"));

                if let Tool::Spawn { radius } = &mut self.tool {
                    ui.separator();
                    ui.label("Spawn");
                    ui.add(egui::Slider::new(radius, 1.0..=20.0).text("radius"));
                }

                ui.separator();
                if ui.button("Fit world to window").clicked() {
                    self.fit_world_requested = true;
                }
                if ui.button("Reset cfg to default").clicked() {
                    let cfg = Config::default();
                    self.temperature = cfg.temperature;
                    self.push_radius = cfg.push_radius;
                    self.push_strength = cfg.push_strength;
                    let result = self.sim.set_temperature(cfg.temperature);
                    self.report(result);
                    self.population = cfg.population;
                    self.sim.set_population_target(cfg.population);
                }
            });
    }

    /// Builds the small floating toolbar for choosing the canvas tool.
    fn ui_toolbar(&mut self, ctx: &egui::Context) {
        egui::Area::new("toolbar".into())
            .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 100.0))
            .movable(false)
            .show(ctx, |ui| {
                egui::Frame::new()
                    .fill(egui::Color32::from_rgba_unmultiplied(0, 0, 0, 32))
                    .show(ui, |ui| {
                        ui.vertical(|ui| {
                            if ui
                                .selectable_label(self.tool == Tool::Push, "⇶ Push")
                                .clicked()
                            {
                                self.tool = Tool::Push;
                            }

                            for (label, r) in [("• Small", 3.0), ("● Medium", 5.0), ("⬤ Large", 8.0)] {
                                let active = self.tool == Tool::Spawn { radius: r };
                                if ui.selectable_label(active, label).clicked() {
                                    self.tool = Tool::Spawn { radius: r };
                                }
                            }
                        });
                    });
            });
    }

    /// Draws a visual hint for the current tool at the hovered world position.
    fn ui_tool_hint(&self, painter: &egui::Painter, rect: egui::Rect, hover_world: Option<Vec2>) {
        let Some(center) = hover_world else {
            return;
        };
        let p_screen = self.world_to_screen(center, rect);
        let s = self.scale(rect);
        let stroke = egui::Stroke::new(1.0, egui::Color32::YELLOW);

        match self.tool {
            Tool::Push => {
                painter.circle_stroke(p_screen, self.push_radius * s, stroke);
            }
            Tool::Spawn { radius } => {
                painter.circle_stroke(p_screen, radius * s, stroke);
            }
        }
    }

    /// Builds the central panel where the world is drawn and interacted with.
    fn ui_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let response = ui.allocate_response(ui.available_size(), egui::Sense::click_and_drag());
            let rect = response.rect;
            let painter = ui.painter_at(rect);
            let now = ctx.input(|i| i.time);

            if self.fit_world_requested {
                self.fit_world_requested = false;
                let world = Bounds::new(rect.width().floor(), rect.height().floor());
                let result = self.sim.resize(world);
                if self.report(result).is_some() {
                    self.zoom = 1.0;
                    self.pan = egui::vec2(0.0, 0.0);
                    self.collision_flash.clear();
                }
            }

            // Pan with secondary drag.
            if response.dragged_by(egui::PointerButton::Secondary) {
                self.pan += response.drag_delta();
            }

            let hover_world = response.hover_pos().map(|p| self.screen_to_world(p, rect));

            let mut pushes = Vec::with_capacity(1);
            match self.tool {
                Tool::Push => {
                    if response.is_pointer_button_down_on()
                        && ctx.input(|i| i.pointer.primary_down())
                        && let Some(origin) = response
                            .interact_pointer_pos()
                            .map(|p| self.screen_to_world(p, rect))
                    {
                        pushes.push(PushForce::new(origin, self.push_radius, self.push_strength));
                    }
                }
                Tool::Spawn { radius } => {
                    if response.clicked()
                        && let Some(pos) = hover_world
                    {
                        let result = self.sim.spawn_at(pos, radius);
                        self.report(result);
                        self.population = self.sim.particles().len();
                    }
                }
            }

            self.advance(&pushes);
            self.note_collisions(now);
            self.frame_rate.record_frame(now);

            // World border.
            let world_rect = egui::Rect::from_two_pos(
                self.world_to_screen(Vec2::ZERO, rect),
                self.world_to_screen(
                    Vec2::new(self.sim.bounds().width, self.sim.bounds().height),
                    rect,
                ),
            );
            painter.rect_stroke(
                world_rect,
                0.0,
                egui::Stroke::new(1.0, egui::Color32::DARK_GRAY),
                egui::StrokeKind::Outside,
            );

            let s = self.scale(rect);

            for view in self.sim.bonds() {
                let a = self.world_to_screen(view.a_pos, rect);
                let b = self.world_to_screen(view.b_pos, rect);
                painter.line_segment([a, b], Self::bond_stroke(&view));
            }

            for p in self.sim.particles() {
                let c = self.world_to_screen(p.pos, rect);
                painter.circle_filled(c, (p.radius * s).max(1.0), Self::particle_color(p));
            }

            // Collision indicator.
            if now - self.last_flash_time < COLLISION_THROTTLE {
                let ring = egui::Stroke::new(1.5, egui::Color32::WHITE);
                let particles = self.sim.particles();
                for ev in &self.collision_flash {
                    for id in [ev.a, ev.b] {
                        if let Some(p) = particles.get(id) {
                            let c = self.world_to_screen(p.pos, rect);
                            painter.circle_stroke(c, (p.radius * s).max(1.0) + 2.0, ring);
                        }
                    }
                }
            }

            self.ui_tool_hint(&painter, rect, hover_world);

            ctx.request_repaint();
        });
    }
}

impl App for Viewer {
    /// eframe callback that builds all UI panels for each frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui_top_panel(ctx);
        self.ui_status_bar(ctx);
        self.ui_config_panel(ctx);
        self.ui_central_panel(ctx);
        self.ui_toolbar(ctx);
    }
}
