//! Keyframe clips and the mixer that plays them back.
//!
//! A [`Clip`] holds keyframe [`Track`]s. A [`Mixer`] is bound to one part of
//! a [`Model`]; clips registered with [`Mixer::clip_action`] become actions
//! that can be (re)started with [`Mixer::play`]. Every [`Mixer::update`]
//! advances running actions by the elapsed time and writes the sampled
//! values onto the bound part. Actions are applied in the order they were
//! last started, so the most recently played clip wins.

use glam::Vec3;

use crate::scene::{Model, PartId};

/// Property of the bound part a track writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    Position,
    Scale,
}

/// Linearly interpolated keyframes for a single property.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub binding: Binding,
    /// Ascending keyframe times in seconds, one per value.
    times: Vec<f32>,
    values: Vec<Vec3>,
}

impl Track {
    /// Keyframes beyond the shorter of `times` and `values` are dropped.
    pub fn new(binding: Binding, mut times: Vec<f32>, mut values: Vec<Vec3>) -> Self {
        debug_assert!(times.windows(2).all(|pair| pair[0] <= pair[1]));
        let len = times.len().min(values.len());
        times.truncate(len);
        values.truncate(len);
        Self {
            binding,
            times,
            values,
        }
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    pub fn values(&self) -> &[Vec3] {
        &self.values
    }

    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Samples the track, holding the first/last value outside its range.
    pub fn sample(&self, time: f32) -> Option<Vec3> {
        let first = *self.values.first()?;
        let last = *self.values.last()?;
        if time <= *self.times.first()? {
            return Some(first);
        }
        if time >= self.end_time() {
            return Some(last);
        }
        let next = self.times.partition_point(|&t| t <= time);
        let (t0, t1) = (self.times[next - 1], self.times[next]);
        let span = t1 - t0;
        let alpha = if span > 0.0 { (time - t0) / span } else { 1.0 };
        Some(self.values[next - 1].lerp(self.values[next], alpha))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<Track>,
}

impl Clip {
    /// Clip lasting as long as its longest track.
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks.iter().map(Track::end_time).fold(0.0, f32::max);
        Self {
            name: name.into(),
            duration,
            tracks,
        }
    }

    /// Two-keyframe translation from `from` at t=0 to `to` at t=`duration`.
    pub fn translation(name: impl Into<String>, from: Vec3, to: Vec3, duration: f32) -> Self {
        Self::new(
            name,
            vec![Track::new(
                Binding::Position,
                vec![0.0, duration],
                vec![from, to],
            )],
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Play once; with `clamp_when_finished` the last frame stays applied.
    Once,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Stopped,
    Playing,
    Finished,
}

/// Handle to an action owned by a [`Mixer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(usize);

#[derive(Debug, Clone)]
struct Action {
    clip: Clip,
    loop_mode: LoopMode,
    clamp_when_finished: bool,
    state: ActionState,
    time: f32,
    started: u64,
}

impl Action {
    fn advance(&mut self, delta: f32) {
        if self.state != ActionState::Playing {
            return;
        }
        self.time += delta;
        let duration = self.clip.duration;
        match self.loop_mode {
            LoopMode::Once if self.time >= duration => {
                self.time = duration;
                self.state = if self.clamp_when_finished {
                    ActionState::Finished
                } else {
                    ActionState::Stopped
                };
            }
            LoopMode::Repeat if duration > 0.0 => self.time %= duration,
            _ => {}
        }
    }

    fn is_applied(&self) -> bool {
        match self.state {
            ActionState::Playing => true,
            ActionState::Finished => self.clamp_when_finished,
            ActionState::Stopped => false,
        }
    }
}

/// Advances actions and applies them to a single bound part.
#[derive(Debug, Clone)]
pub struct Mixer {
    root: PartId,
    actions: Vec<Action>,
    time: f32,
    play_counter: u64,
}

impl Mixer {
    pub fn new(root: PartId) -> Self {
        Self {
            root,
            actions: Vec::new(),
            time: 0.0,
            play_counter: 0,
        }
    }

    pub fn root(&self) -> PartId {
        self.root
    }

    /// Total time this mixer has been advanced by.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Registers a clip as a one-shot action that clamps at its final frame.
    pub fn clip_action(&mut self, clip: Clip) -> ActionId {
        let id = ActionId(self.actions.len());
        self.actions.push(Action {
            clip,
            loop_mode: LoopMode::Once,
            clamp_when_finished: true,
            state: ActionState::Stopped,
            time: 0.0,
            started: 0,
        });
        id
    }

    pub fn set_loop(&mut self, id: ActionId, loop_mode: LoopMode, clamp_when_finished: bool) {
        if let Some(action) = self.actions.get_mut(id.0) {
            action.loop_mode = loop_mode;
            action.clamp_when_finished = clamp_when_finished;
        }
    }

    /// Restarts the action from t=0 and puts it on top of the others.
    pub fn play(&mut self, id: ActionId) {
        self.play_counter += 1;
        let started = self.play_counter;
        if let Some(action) = self.actions.get_mut(id.0) {
            action.time = 0.0;
            action.state = ActionState::Playing;
            action.started = started;
        }
    }

    pub fn stop(&mut self, id: ActionId) {
        if let Some(action) = self.actions.get_mut(id.0) {
            action.state = ActionState::Stopped;
            action.time = 0.0;
        }
    }

    pub fn state(&self, id: ActionId) -> Option<ActionState> {
        self.actions.get(id.0).map(|action| action.state)
    }

    /// Local time of the action.
    pub fn action_time(&self, id: ActionId) -> Option<f32> {
        self.actions.get(id.0).map(|action| action.time)
    }

    pub fn clip(&self, id: ActionId) -> Option<&Clip> {
        self.actions.get(id.0).map(|action| &action.clip)
    }

    /// Advances every running action by `delta` seconds and writes the
    /// sampled values onto the bound part.
    pub fn update(&mut self, delta: f32, model: &mut Model) {
        let delta = delta.max(0.0);
        self.time += delta;
        for action in &mut self.actions {
            action.advance(delta);
        }

        let Some(part) = model.part_mut(self.root) else {
            return;
        };
        let mut applied: Vec<&Action> = self.actions.iter().filter(|a| a.is_applied()).collect();
        applied.sort_by_key(|action| action.started);
        for action in applied {
            for track in &action.clip.tracks {
                let Some(value) = track.sample(action.time) else {
                    continue;
                };
                match track.binding {
                    Binding::Position => part.transform.translation = value,
                    Binding::Scale => part.transform.scale = value,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Transform;

    fn bound_model() -> (Model, PartId) {
        let mut model = Model::new();
        let id = model.add_part("sa_low", None, Transform::IDENTITY);
        (model, id)
    }

    fn y(model: &Model, id: PartId) -> f32 {
        model.part(id).unwrap().transform.translation.y
    }

    #[test]
    fn track_interpolates_and_holds_ends() {
        let track = Track::new(
            Binding::Position,
            vec![0.0, 1.0, 3.0],
            vec![Vec3::ZERO, Vec3::Y, Vec3::Y * 3.0],
        );
        assert_eq!(track.sample(-1.0), Some(Vec3::ZERO));
        assert_eq!(track.sample(0.5), Some(Vec3::Y * 0.5));
        assert_eq!(track.sample(1.0), Some(Vec3::Y));
        assert_eq!(track.sample(2.0), Some(Vec3::Y * 2.0));
        assert_eq!(track.sample(10.0), Some(Vec3::Y * 3.0));
    }

    #[test]
    fn mismatched_keyframes_are_truncated() {
        let empty = Track::new(Binding::Position, Vec::new(), vec![Vec3::Y]);
        assert!(empty.values().is_empty());
        assert_eq!(empty.sample(0.0), None);
        assert_eq!(empty.end_time(), 0.0);

        let short = Track::new(Binding::Scale, vec![0.0, 1.0, 2.0], vec![Vec3::ZERO, Vec3::ONE]);
        assert_eq!(short.times(), &[0.0, 1.0]);
        assert_eq!(short.sample(5.0), Some(Vec3::ONE));
    }

    #[test]
    fn one_shot_clamps_at_final_frame() {
        let (mut model, id) = bound_model();
        let mut mixer = Mixer::new(id);
        let press = mixer.clip_action(Clip::translation("press", Vec3::ZERO, -Vec3::Y * 0.1, 0.1));
        mixer.play(press);
        assert_eq!(mixer.action_time(press), Some(0.0));

        mixer.update(0.05, &mut model);
        assert!((y(&model, id) + 0.05).abs() < 1e-6);
        assert_eq!(mixer.state(press), Some(ActionState::Playing));

        mixer.update(0.5, &mut model);
        assert_eq!(mixer.action_time(press), Some(0.1));
        assert_eq!(mixer.state(press), Some(ActionState::Finished));
        assert!((y(&model, id) + 0.1).abs() < 1e-6);

        mixer.update(0.5, &mut model);
        assert!((y(&model, id) + 0.1).abs() < 1e-6);
    }

    #[test]
    fn latest_played_action_wins() {
        let (mut model, id) = bound_model();
        let mut mixer = Mixer::new(id);
        let down = -Vec3::Y * 0.1;
        let press = mixer.clip_action(Clip::translation("press", Vec3::ZERO, down, 0.1));
        let release = mixer.clip_action(Clip::translation("release", down, Vec3::ZERO, 0.05));

        mixer.play(press);
        mixer.update(1.0, &mut model);
        mixer.play(release);
        mixer.update(1.0, &mut model);
        assert!(y(&model, id).abs() < 1e-6);

        mixer.play(press);
        mixer.update(1.0, &mut model);
        assert!((y(&model, id) + 0.1).abs() < 1e-6);
    }

    #[test]
    fn accumulated_time_is_sum_of_deltas() {
        let (mut model, id) = bound_model();
        let mut mixer = Mixer::new(id);
        let deltas = [0.016, 0.017, 0.0, 0.25, 0.001];
        for delta in deltas {
            mixer.update(delta, &mut model);
        }
        let expected: f32 = deltas.iter().sum();
        assert!((mixer.time() - expected).abs() < 1e-6);
    }

    #[test]
    fn repeat_wraps_and_unclamped_once_stops() {
        let (mut model, id) = bound_model();
        let mut mixer = Mixer::new(id);
        let spin = mixer.clip_action(Clip::translation("spin", Vec3::ZERO, Vec3::X, 1.0));
        mixer.set_loop(spin, LoopMode::Repeat, false);
        mixer.play(spin);
        mixer.update(2.25, &mut model);
        assert!((mixer.action_time(spin).unwrap() - 0.25).abs() < 1e-5);

        let blip = mixer.clip_action(Clip::translation("blip", Vec3::ZERO, Vec3::Z, 0.5));
        mixer.set_loop(blip, LoopMode::Once, false);
        mixer.play(blip);
        mixer.update(1.0, &mut model);
        assert_eq!(mixer.state(blip), Some(ActionState::Stopped));
    }
}
