use glam::{Quat, Vec2, Vec3};
use log::{info, warn};

use crate::animation::{ActionId, ActionState, Clip, Mixer};
use crate::camera::{OrbitControls, PerspectiveCamera};
use crate::config::ViewerConfig;
use crate::input::{KeyCode, MouseButton, Viewport};
use crate::interaction::{InputHandler, Trigger};
use crate::mesh::MeshData;
use crate::raycast::{self, Ray};
use crate::render::{srgb_to_linear, CameraParams, Draw, DrawItem, Frame, LightParams, MeshKey};
use crate::scene::{Model, PartId};
use crate::time::{FrameClock, FrameStats};

/// Mixer bound to the interactive part together with its two actions.
#[derive(Debug, Clone)]
struct KeyAnimator {
    mixer: Mixer,
    press: ActionId,
    release: ActionId,
}

impl KeyAnimator {
    fn new(model: &Model, part: PartId, config: &ViewerConfig) -> Option<Self> {
        let rest = model.part(part)?.transform.translation;
        let mut mixer = Mixer::new(part);
        let pressed = rest - Vec3::Y * config.press.travel;
        let press = mixer.clip_action(Clip::translation(
            "press",
            rest,
            pressed,
            config.press.duration,
        ));
        let lifted = rest - Vec3::Y * config.release.travel;
        let release = mixer.clip_action(Clip::translation(
            "release",
            lifted,
            rest,
            config.release.duration,
        ));
        Some(Self {
            mixer,
            press,
            release,
        })
    }

    fn action(&self, trigger: Trigger) -> ActionId {
        match trigger {
            Trigger::Press => self.press,
            Trigger::Release => self.release,
        }
    }
}

/// The whole viewer state once the asset has loaded: scene, camera,
/// interaction, and animation. Hosts feed it events and call [`Viewer::tick`]
/// once per display refresh.
#[derive(Debug, Clone)]
pub struct Viewer {
    config: ViewerConfig,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    viewport: Viewport,
    cursor: Vec2,
    model: Model,
    ground: MeshData,
    input: InputHandler,
    animator: Option<KeyAnimator>,
    clock: FrameClock,
    stats: FrameStats,
}

impl Viewer {
    /// Places the loaded model, enables its shadows and binds the
    /// press/release clips to the interactive part.
    pub fn new(config: ViewerConfig, mut model: Model, viewport: Viewport) -> Self {
        model.transform.rotation = Quat::from_rotation_y(config.model.rotation_y.to_radians());
        model.transform.scale = Vec3::splat(config.model.scale);

        let shadowed = model.enable_shadows();
        info!("enabled shadows on {shadowed} part(s)");

        let part_name = config.model.interactive_part.as_str();
        let target = model.find(part_name);
        let animator = match target {
            Some(part) => KeyAnimator::new(&model, part, &config),
            None => {
                warn!("model has no part named {part_name:?}; press interaction disabled");
                None
            }
        };

        let camera = PerspectiveCamera::from_config(&config.camera, viewport.aspect());
        let controls = OrbitControls::new(&camera);
        let ground = MeshData::plane(config.ground.size);

        Self {
            camera,
            controls,
            viewport,
            cursor: Vec2::ZERO,
            model,
            ground,
            input: InputHandler::new(target),
            animator,
            clock: FrameClock::new(),
            stats: FrameStats::new(),
            config,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn input(&self) -> &InputHandler {
        &self.input
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn interactive_part(&self) -> Option<PartId> {
        self.input.target()
    }

    pub fn mixer(&self) -> Option<&Mixer> {
        self.animator.as_ref().map(|animator| &animator.mixer)
    }

    /// State and local time of the clip a trigger plays.
    pub fn clip_status(&self, trigger: Trigger) -> Option<(ActionState, f32)> {
        let animator = self.animator.as_ref()?;
        let id = animator.action(trigger);
        Some((
            animator.mixer.state(id)?,
            animator.mixer.action_time(id)?,
        ))
    }

    pub fn key_down(&mut self, key: KeyCode) -> Option<Trigger> {
        let trigger = self.input.on_key_down(key);
        self.play(trigger)
    }

    pub fn key_up(&mut self, key: KeyCode) -> Option<Trigger> {
        let trigger = self.input.on_key_up(key);
        self.play(trigger)
    }

    /// Pointer position in physical pixels.
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        self.cursor = Vec2::new(x, y);
        self.input.on_pointer_move(x, y, self.viewport);
        if self.controls.drag_to(self.cursor, self.viewport) {
            self.controls.apply(&mut self.camera);
        }
    }

    /// The left button presses the key under the pointer; the right one orbits.
    pub fn pointer_down(&mut self, button: MouseButton) -> Option<Trigger> {
        match button {
            MouseButton::LEFT => {
                let hit = self.pick();
                let trigger = self.input.on_pointer_down(hit);
                self.play(trigger)
            }
            MouseButton::RIGHT => {
                self.controls.begin_drag(self.cursor);
                None
            }
            _ => None,
        }
    }

    pub fn pointer_up(&mut self, button: MouseButton) -> Option<Trigger> {
        match button {
            MouseButton::LEFT => {
                let trigger = self.input.on_pointer_up();
                self.play(trigger)
            }
            MouseButton::RIGHT => {
                self.controls.end_drag();
                None
            }
            _ => None,
        }
    }

    /// Positive steps zoom in.
    pub fn wheel(&mut self, steps: f32) {
        self.controls.zoom(steps);
        self.controls.apply(&mut self.camera);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width, height);
        self.camera.set_aspect(self.viewport.aspect());
    }

    /// Nearest part under the pointer.
    pub fn pick(&self) -> Option<PartId> {
        let ray = Ray::from_camera(&self.camera, self.input.pointer());
        raycast::nearest(&self.model, &ray).map(|hit| hit.part)
    }

    /// Advances the animation and the frame statistics by `delta` seconds.
    pub fn advance(&mut self, delta: f32) {
        if let Some(animator) = self.animator.as_mut() {
            animator.mixer.update(delta, &mut self.model);
        }
        self.stats.record(delta);
    }

    /// One render-loop iteration: measure the delta since the previous
    /// tick, advance, and draw once.
    pub fn tick<D: Draw>(&mut self, now_seconds: f64, target: &mut D) -> Result<(), D::Error> {
        let delta = self.clock.delta(now_seconds);
        self.advance(delta);
        target.draw(&self.frame())
    }

    pub fn frame(&self) -> Frame {
        let hemisphere = &self.config.hemisphere;
        let directional = &self.config.directional;
        let light = LightParams {
            sky_color: srgb_to_linear(hemisphere.sky_color),
            ground_color: srgb_to_linear(hemisphere.ground_color),
            hemisphere_intensity: hemisphere.intensity,
            hemisphere_up: hemisphere.position.try_normalize().unwrap_or(Vec3::Y),
            directional_color: srgb_to_linear(directional.color),
            directional_intensity: directional.intensity,
            directional_direction: directional.direction(),
        };

        let mut items = vec![DrawItem {
            mesh: MeshKey::Ground,
            model: glam::Mat4::IDENTITY,
            color: srgb_to_linear(self.config.ground.color),
        }];
        for id in self.model.traverse() {
            let Some(part) = self.model.part(id) else {
                continue;
            };
            if part.mesh.is_none() {
                continue;
            }
            items.push(DrawItem {
                mesh: MeshKey::Part(id),
                model: self.model.world_matrix(id),
                color: part.color,
            });
        }

        Frame {
            clear_color: srgb_to_linear(self.config.background),
            exposure: self.config.exposure,
            camera: CameraParams {
                view_proj: self.camera.view_proj(),
                position: self.camera.position,
            },
            light,
            items,
        }
    }

    /// Geometry the renderer uploads at startup.
    pub fn meshes(&self) -> Vec<(MeshKey, &MeshData)> {
        let mut meshes = vec![(MeshKey::Ground, &self.ground)];
        for id in self.model.traverse() {
            if let Some(mesh) = self.model.part(id).and_then(|part| part.mesh.as_ref()) {
                meshes.push((MeshKey::Part(id), mesh));
            }
        }
        meshes
    }

    /// Human-readable description of the loaded model.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = vec![format!("Model parts: {}", self.model.len())];
        for id in self.model.traverse() {
            let Some(part) = self.model.part(id) else {
                continue;
            };
            let depth = std::iter::successors(part.parent, |&parent| {
                self.model.part(parent).and_then(|p| p.parent)
            })
            .count();
            let position = part.transform.translation;
            let kind = match &part.mesh {
                Some(mesh) => format!("mesh, {} vertices", mesh.vertex_count()),
                None => "group".to_string(),
            };
            lines.push(format!(
                "{}- {} ({kind}) pos=({:.2}, {:.2}, {:.2})",
                "  ".repeat(depth),
                display_name(&part.name),
                position.x,
                position.y,
                position.z
            ));
        }
        let part_name = &self.config.model.interactive_part;
        lines.push(match self.interactive_part() {
            Some(_) => format!("Interactive part: {part_name}"),
            None => format!("Interactive part: {part_name} (missing)"),
        });
        lines
    }

    fn play(&mut self, trigger: Option<Trigger>) -> Option<Trigger> {
        let trigger = trigger?;
        if let Some(animator) = self.animator.as_mut() {
            let id = animator.action(trigger);
            animator.mixer.play(id);
        }
        Some(trigger)
    }
}

fn display_name(name: &str) -> &str {
    if name.is_empty() {
        "<unnamed>"
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;
    use crate::scene::Transform;

    const TOLERANCE: f32 = 1e-5;

    fn keycap_model() -> Model {
        let mut model = Model::new();
        let root = model.add_part("keycap", None, Transform::IDENTITY);
        let low = model.add_part(
            "sa_low",
            Some(root),
            Transform {
                translation: Vec3::new(0.0, 1.0, 0.0),
                ..Transform::IDENTITY
            },
        );
        model.part_mut(low).unwrap().mesh = Some(MeshData::plane(2.0));
        let case = model.add_part(
            "case",
            Some(root),
            Transform {
                translation: Vec3::new(4.0, 0.5, 0.0),
                ..Transform::IDENTITY
            },
        );
        model.part_mut(case).unwrap().mesh = Some(MeshData::plane(2.0));
        model
    }

    fn viewer() -> Viewer {
        Viewer::new(ViewerConfig::default(), keycap_model(), Viewport::new(800, 600))
    }

    fn low_y(viewer: &Viewer) -> f32 {
        let part = viewer.interactive_part().unwrap();
        viewer.model().part(part).unwrap().transform.translation.y
    }

    #[derive(Default)]
    struct Recorder {
        frames: Vec<usize>,
    }

    impl Draw for Recorder {
        type Error = Infallible;

        fn draw(&mut self, frame: &Frame) -> Result<(), Infallible> {
            self.frames.push(frame.items.len());
            Ok(())
        }
    }

    #[test]
    fn bootstrap_places_model_and_enables_shadows() {
        let viewer = viewer();
        let model = viewer.model();
        let expected = Quat::from_rotation_y(std::f32::consts::PI);
        assert!(model.transform.rotation.angle_between(expected) < TOLERANCE);
        assert_eq!(model.transform.scale, Vec3::ONE);

        let low = model.find("sa_low").unwrap();
        assert_eq!(viewer.interactive_part(), Some(low));
        assert!(model.part(low).unwrap().cast_shadow);
        assert!(!model.part(model.find("keycap").unwrap()).unwrap().cast_shadow);
        assert_eq!(viewer.mixer().map(Mixer::root), Some(low));
    }

    #[test]
    fn enter_press_plays_from_start_and_clamps() {
        let mut viewer = viewer();
        assert_eq!(viewer.key_down(KeyCode::ENTER), Some(Trigger::Press));
        assert!(viewer.input().is_pressed());
        assert_eq!(
            viewer.clip_status(Trigger::Press),
            Some((ActionState::Playing, 0.0))
        );

        viewer.advance(0.04);
        viewer.advance(0.04);
        viewer.advance(0.04);
        let (state, time) = viewer.clip_status(Trigger::Press).unwrap();
        assert_eq!(state, ActionState::Finished);
        assert!((time - 0.1).abs() < TOLERANCE);
        assert!((low_y(&viewer) - 0.9).abs() < TOLERANCE);
    }

    #[test]
    fn enter_release_plays_from_start_and_clamps() {
        let mut viewer = viewer();
        viewer.key_down(KeyCode::ENTER);
        viewer.advance(0.2);

        assert_eq!(viewer.key_up(KeyCode::ENTER), Some(Trigger::Release));
        assert!(!viewer.input().is_pressed());
        assert_eq!(
            viewer.clip_status(Trigger::Release),
            Some((ActionState::Playing, 0.0))
        );

        viewer.advance(0.03);
        viewer.advance(0.03);
        let (state, time) = viewer.clip_status(Trigger::Release).unwrap();
        assert_eq!(state, ActionState::Finished);
        assert!((time - 0.05).abs() < TOLERANCE);
        assert!((low_y(&viewer) - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn click_on_interactive_part_presses_once() {
        let mut viewer = viewer();
        viewer.pointer_moved(400.0, 300.0);
        assert_eq!(viewer.pick(), viewer.interactive_part());

        assert_eq!(viewer.pointer_down(MouseButton::LEFT), Some(Trigger::Press));
        assert!(viewer.input().is_pressed());
        viewer.advance(0.02);
        assert_eq!(viewer.pointer_down(MouseButton::LEFT), None);
        // The running press clip was not restarted.
        let (_, time) = viewer.clip_status(Trigger::Press).unwrap();
        assert!((time - 0.02).abs() < TOLERANCE);
    }

    #[test]
    fn click_elsewhere_does_nothing() {
        let mut viewer = viewer();
        // Far corner: only the ground is there, and it is not pickable.
        viewer.pointer_moved(0.0, 0.0);
        assert_eq!(viewer.pointer_down(MouseButton::LEFT), None);

        // The case sits to the side of the key; the model is turned around Y.
        let case = viewer.model().find("case").unwrap();
        let position = viewer.model().world_matrix(case).transform_point3(Vec3::ZERO);
        assert!((position.x + 4.0).abs() < TOLERANCE);

        // Back off until the case is on screen, then click right on it.
        viewer.wheel(-5.0);
        let ndc = viewer.camera().view_proj().project_point3(position);
        assert!(ndc.x.abs() < 1.0 && ndc.y.abs() < 1.0);
        let viewport = viewer.viewport();
        let x = (ndc.x + 1.0) * 0.5 * viewport.width as f32;
        let y = (1.0 - ndc.y) * 0.5 * viewport.height as f32;
        viewer.pointer_moved(x, y);
        assert_eq!(viewer.pick(), Some(case));
        assert_eq!(viewer.pointer_down(MouseButton::LEFT), None);
        assert!(!viewer.input().is_pressed());
        assert_eq!(viewer.clip_status(Trigger::Press), Some((ActionState::Stopped, 0.0)));
    }

    #[test]
    fn pointer_up_releases_without_hit_test() {
        let mut viewer = viewer();
        viewer.pointer_moved(400.0, 300.0);
        viewer.pointer_down(MouseButton::LEFT);
        viewer.pointer_moved(0.0, 0.0);
        assert_eq!(viewer.pick(), None);
        assert_eq!(viewer.pointer_up(MouseButton::LEFT), Some(Trigger::Release));
        assert_eq!(viewer.pointer_up(MouseButton::LEFT), None);
    }

    #[test]
    fn right_drag_orbits_instead_of_pressing() {
        let mut viewer = viewer();
        let before = viewer.camera().position;
        viewer.pointer_moved(400.0, 300.0);
        assert_eq!(viewer.pointer_down(MouseButton::RIGHT), None);
        viewer.pointer_moved(400.0, 200.0);
        viewer.pointer_up(MouseButton::RIGHT);
        assert!(!viewer.input().is_pressed());
        assert!(viewer.camera().position.distance(before) > 0.1);
        assert!((viewer.camera().position.length() - 7.0).abs() < 1e-3);
    }

    #[test]
    fn missing_part_disables_interaction() {
        let mut config = ViewerConfig::default();
        config.model.interactive_part = "stem".to_string();
        let mut viewer = Viewer::new(config, keycap_model(), Viewport::new(800, 600));
        assert!(viewer.mixer().is_none());
        assert_eq!(viewer.key_down(KeyCode::ENTER), None);
        viewer.pointer_moved(400.0, 300.0);
        assert_eq!(viewer.pointer_down(MouseButton::LEFT), None);
        viewer.advance(0.1);
        assert!(viewer.summary().last().unwrap().ends_with("(missing)"));
    }

    #[test]
    fn ticks_accumulate_mixer_time_and_draw_once_each() {
        let mut viewer = viewer();
        let mut recorder = Recorder::default();
        let stamps = [10.0, 10.016, 10.035, 10.051, 10.1];
        for now in stamps {
            viewer.tick(now, &mut recorder).unwrap();
        }
        let elapsed = (stamps[stamps.len() - 1] - stamps[0]) as f32;
        assert!((viewer.mixer().unwrap().time() - elapsed).abs() < TOLERANCE);
        assert_eq!(viewer.stats().frame_count, stamps.len() as u64);
        // Ground plus the two mesh parts.
        assert_eq!(recorder.frames, vec![3; stamps.len()]);
    }

    #[test]
    fn resize_updates_camera_aspect() {
        let mut viewer = viewer();
        viewer.resize(1000, 500);
        assert!((viewer.camera().aspect - 2.0).abs() < TOLERANCE);
        assert_eq!(viewer.meshes().len(), 3);
    }

    #[test]
    fn summary_lists_parts() {
        let lines = viewer().summary();
        assert_eq!(lines[0], "Model parts: 3");
        assert!(lines[1].starts_with("- keycap (group)"));
        assert!(lines[2].starts_with("  - sa_low (mesh, 4 vertices)"));
        assert_eq!(lines.last().unwrap(), "Interactive part: sa_low");
    }
}
