//! Hierarchical spline environment.
//!
//! Wraps [`RoadIntersectionEnv`]: each outer `step` receives one discrete
//! waypoint-deviation action per agent and extends that agent's track.
//! Once every agent's track is registered, the same `step` call drives the
//! frozen low-level controller through base physics ticks until the episode
//! ends, and returns the accumulated rewards. From the caller's viewpoint a
//! whole multi-tick rollout collapses into a single outer transition.

use std::collections::HashMap;
use std::f32::consts::PI;

use crate::control::AcclnController;
use crate::envs::base::{RoadIntersectionEnv, VehicleSpawn};
use crate::envs::spaces::{ActionSpace, BoxSpace};
use crate::infra::Point;
use crate::state::IntersectionLayout;

/// Waypoint deviation strategy, selected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStrategy {
    /// A 2-D offset applied to one intermediate goal per outer step.
    FullOffset,
    /// A scalar offset applied to one axis of every goal in a single step.
    AxisOffset,
}

/// Discrete offset catalog for the selected strategy.
#[derive(Debug, Clone)]
enum OffsetCatalog {
    Full(Vec<Point>),
    Axis(Vec<f32>),
}

impl OffsetCatalog {
    fn build(strategy: TrackStrategy) -> Self {
        match strategy {
            TrackStrategy::FullOffset => {
                let steps: Vec<f32> = (0..7).map(|i| -0.75 + 0.25 * i as f32).collect();
                let mut offsets = Vec::with_capacity(steps.len() * steps.len());
                for &dx in &steps {
                    for &dy in &steps {
                        offsets.push(Point::new(dx, dy));
                    }
                }
                OffsetCatalog::Full(offsets)
            }
            TrackStrategy::AxisOffset => OffsetCatalog::Axis(vec![-0.5, 0.0, 0.5]),
        }
    }

    fn len(&self) -> usize {
        match self {
            OffsetCatalog::Full(offsets) => offsets.len(),
            OffsetCatalog::Axis(offsets) => offsets.len(),
        }
    }
}

/// Per-agent track construction state.
#[derive(Debug, Clone)]
pub struct TrackState {
    /// Cursor into the agent's intermediate goals; advanced by
    /// observations, never decremented within an episode.
    pub track_point: usize,
    /// Last committed waypoint.
    pub previous_start_point: Point,
    /// Waypoints accumulated so far, starting with the entry anchor.
    pub track: Vec<Point>,
    /// Set once the track has been registered with the dynamics model.
    pub completed: bool,
}

/// Extra information about one outer step.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepInfo {
    /// Physics ticks executed by the inner rollout (zero while building).
    pub inner_ticks: usize,
}

/// Result of one outer `step`.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Observations for the next decision; `None` once the episode has
    /// been rolled out.
    pub observations: Option<HashMap<String, Vec<f32>>>,
    /// Per-agent rewards (zero while tracks are still being built).
    pub rewards: HashMap<String, f32>,
    pub done: bool,
    pub info: StepInfo,
}

/// Nominal open-loop trajectory produced by the action transformer.
#[derive(Debug, Clone)]
pub struct TransformedAction {
    /// Placeholder goal state; unused when a live controller is attached.
    pub goal_state: [f32; 4],
    /// Placeholder start state; unused when a live controller is attached.
    pub start_state: [f32; 4],
    /// `timesteps + 1` states from repeatedly applying the fixed
    /// acceleration through the agent's dynamics model.
    pub nominal_states: Vec<[f32; 4]>,
    /// Matching repeated acceleration sequence.
    pub nominal_actions: Vec<f32>,
}

/// Far-field anchor for a boundary point: extend the point along the one
/// axis on which it already lies outside the drivable square, out to the
/// road's outer end.
///
/// Panics unless exactly one axis is violated; interior points and
/// double violations are caller contract breaches.
pub fn dummy_point(layout: &IntersectionLayout, pt: Point) -> Point {
    let half_width = layout.half_width();
    let extent = layout.extent();
    let x_out = pt.x.abs() > half_width;
    let y_out = pt.y.abs() > half_width;
    assert!(
        x_out != y_out,
        "dummy point precondition violated: ({}, {}) must lie outside the drivable square on exactly one axis",
        pt.x,
        pt.y
    );
    if pt.x > half_width {
        Point::new(extent, pt.y)
    } else if pt.x < -half_width {
        Point::new(-extent, pt.y)
    } else if pt.y > half_width {
        Point::new(pt.x, extent)
    } else {
        Point::new(pt.x, -extent)
    }
}

/// The hierarchical environment: high-level discrete waypoint deviations
/// outside, frozen low-level acceleration control inside.
pub struct SplineEnv {
    base: RoadIntersectionEnv,
    controller: Box<dyn AcclnController>,
    strategy: TrackStrategy,
    offsets: OffsetCatalog,
    tracks: HashMap<String, TrackState>,
}

impl SplineEnv {
    pub fn new(
        base: RoadIntersectionEnv,
        controller: Box<dyn AcclnController>,
        strategy: TrackStrategy,
    ) -> Self {
        let offsets = OffsetCatalog::build(strategy);
        let mut env = Self {
            base,
            controller,
            strategy,
            offsets,
            tracks: HashMap::new(),
        };
        env.init_tracks();
        env
    }

    pub fn base(&self) -> &RoadIntersectionEnv {
        &self.base
    }

    pub fn strategy(&self) -> TrackStrategy {
        self.strategy
    }

    pub fn track_state(&self, a_id: &str) -> &TrackState {
        self.tracks
            .get(a_id)
            .unwrap_or_else(|| panic!("unknown agent {a_id}"))
    }

    pub fn observation_space(&self) -> BoxSpace {
        match self.strategy {
            TrackStrategy::FullOffset => BoxSpace::new(
                vec![-1.0, -1.0, -1.0, -1.0, 0.0, 0.0],
                vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
            ),
            TrackStrategy::AxisOffset => {
                BoxSpace::new(vec![-1.0, -1.0, -1.0], vec![1.0, 1.0, 1.0])
            }
        }
    }

    pub fn action_space(&self) -> ActionSpace {
        ActionSpace::Discrete {
            n: self.offsets.len(),
        }
    }

    /// Reset the underlying environment and start fresh tracks, returning
    /// the initial observation map.
    pub fn reset(&mut self) -> HashMap<String, Vec<f32>> {
        self.base.reset();
        self.init_tracks();
        self.get_state()
    }

    fn init_tracks(&mut self) {
        self.tracks.clear();
        for a_id in self.base.agent_ids_list() {
            self.begin_track(&a_id);
        }
    }

    /// Add a vehicle to the underlying environment and start its track.
    pub fn add_vehicle(&mut self, spawn: &VehicleSpawn) {
        self.base.add_vehicle(spawn);
        self.begin_track(&spawn.id);
    }

    /// Fresh track for one agent: the entry anchor plus the current
    /// position, cursor at zero.
    fn begin_track(&mut self, a_id: &str) {
        let layout = self.base.layout().clone();
        let position = self.base.agent(a_id).vehicle.position;
        self.tracks.insert(
            a_id.to_string(),
            TrackState {
                track_point: 0,
                previous_start_point: position,
                track: vec![dummy_point(&layout, position), position],
                completed: false,
            },
        );
    }

    /// Observation map over all agents. Agents whose goal cursor is
    /// exhausted are absent: they need no further high-level decision.
    pub fn get_state(&mut self) -> HashMap<String, Vec<f32>> {
        let ids = self.base.agent_ids_list();
        ids.into_iter()
            .filter_map(|id| self.state_for_agent(&id).map(|obs| (id, obs)))
            .collect()
    }

    /// Observation for one agent. In the full-offset strategy this
    /// previews the goal at the cursor and advances it; in the axis-offset
    /// strategy it is the current pose and never touches the cursor.
    pub fn state_for_agent(&mut self, a_id: &str) -> Option<Vec<f32>> {
        let extent = self.base.layout().extent();
        match self.strategy {
            TrackStrategy::FullOffset => {
                let track_point = self.track_state(a_id).track_point;
                let agent = self.base.agent(a_id);
                if track_point >= agent.intermediate_goals.len() {
                    return None;
                }
                let next = agent.intermediate_goals[track_point].position;
                let width = self.base.layout().width;
                let length = self.base.layout().length;
                let track = self
                    .tracks
                    .get_mut(a_id)
                    .unwrap_or_else(|| panic!("unknown agent {a_id}"));
                track.track_point += 1;
                let previous = track.previous_start_point;
                Some(vec![
                    previous.x / extent,
                    previous.y / extent,
                    next.x / extent,
                    next.y / extent,
                    1.0 / width,
                    1.0 / length,
                ])
            }
            TrackStrategy::AxisOffset => {
                let vehicle = &self.base.agent(a_id).vehicle;
                Some(vec![
                    vehicle.position.x / extent,
                    vehicle.position.y / extent,
                    vehicle.orientation / PI,
                ])
            }
        }
    }

    /// Extend one agent's track with the waypoint selected by `action`.
    /// Returns `true` once the track is complete and registered with the
    /// agent's dynamics model.
    pub fn extend_track(&mut self, a_id: &str, action: usize) -> bool {
        match self.strategy {
            TrackStrategy::FullOffset => self.extend_full(a_id, action),
            TrackStrategy::AxisOffset => self.extend_axis(a_id, action),
        }
    }

    fn extend_full(&mut self, a_id: &str, action: usize) -> bool {
        let offsets = match &self.offsets {
            OffsetCatalog::Full(offsets) => offsets,
            OffsetCatalog::Axis(_) => unreachable!("full-offset strategy uses the 2-D catalog"),
        };
        assert!(
            action < offsets.len(),
            "discrete action {action} out of range for catalog of {}",
            offsets.len()
        );
        let offset = offsets[action];
        let layout = self.base.layout().clone();
        let scale = layout.width / 2.0;

        let cursor = {
            let track = self.track_state(a_id);
            assert!(!track.completed, "track for {a_id} already registered");
            assert!(
                track.track_point > 0,
                "agent {a_id} has no observed goal to extend toward"
            );
            track.track_point - 1
        };
        let agent = self.base.agent(a_id);
        let goal = agent.intermediate_goals[cursor].position;
        let expected_len = agent.intermediate_goals.len() + 2;
        let waypoint = goal + offset * scale;

        let track = self
            .tracks
            .get_mut(a_id)
            .unwrap_or_else(|| panic!("unknown agent {a_id}"));
        track.previous_start_point = waypoint;
        track.track.push(waypoint);
        if track.track.len() < expected_len {
            return false;
        }
        assert_eq!(
            track.track.len(),
            expected_len,
            "track for {a_id} grew past its expected length"
        );
        track.track.push(dummy_point(&layout, waypoint));
        track.completed = true;
        let points = track.track.clone();
        self.base
            .agent_mut(a_id)
            .dynamics
            .register_track(&points, true);
        tracing::debug!("registered {}-point track for {a_id}", points.len());
        true
    }

    fn extend_axis(&mut self, a_id: &str, action: usize) -> bool {
        let offsets = match &self.offsets {
            OffsetCatalog::Axis(offsets) => offsets,
            OffsetCatalog::Full(_) => unreachable!("axis-offset strategy uses the scalar catalog"),
        };
        assert!(
            action < offsets.len(),
            "discrete action {action} out of range for catalog of {}",
            offsets.len()
        );
        let layout = self.base.layout().clone();
        let deviation = offsets[action] * (layout.width / 2.0);

        let (axis, goal_points): (usize, Vec<Point>) = {
            let agent = self.base.agent(a_id);
            (
                agent.road.deviation_axis(),
                agent
                    .intermediate_goals
                    .iter()
                    .map(|goal| goal.position)
                    .collect(),
            )
        };

        let track = self
            .tracks
            .get_mut(a_id)
            .unwrap_or_else(|| panic!("unknown agent {a_id}"));
        assert!(!track.completed, "track for {a_id} already registered");
        for mut waypoint in goal_points {
            waypoint.set_axis(axis, waypoint.axis(axis) + deviation);
            track.track.push(waypoint);
        }
        let last = *track.track.last().expect("track is never empty");
        track.track.push(dummy_point(&layout, last));
        track.completed = true;
        let points = track.track.clone();
        self.base
            .agent_mut(a_id)
            .dynamics
            .register_track(&points, true);
        tracing::debug!("registered {}-point track for {a_id}", points.len());
        true
    }

    /// One outer environment step.
    ///
    /// While any agent's track is incomplete this is a no-op tick from the
    /// caller's perspective: zero rewards, `done == false`, fresh
    /// observations. Once every track is registered, the inner rollout
    /// runs to episode end and the accumulated rewards are returned with
    /// `done == true`. Call [`reset`](Self::reset) before the next episode.
    pub fn step(&mut self, actions: &HashMap<String, usize>) -> StepResult {
        for (a_id, &action) in actions {
            self.extend_track(a_id, action);
        }

        let all_complete = self.tracks.values().all(|track| track.completed);
        if !all_complete {
            let rewards = self
                .base
                .agent_ids_list()
                .into_iter()
                .map(|id| (id, 0.0))
                .collect();
            return StepResult {
                observations: Some(self.get_state()),
                rewards,
                done: false,
                info: StepInfo::default(),
            };
        }

        self.rollout()
    }

    /// Blocking inner rollout: query the frozen controller for every
    /// active agent, apply the accelerations through base physics, and
    /// accumulate rewards until the base environment reports global done.
    fn rollout(&mut self) -> StepResult {
        let ids = self.base.agent_ids_list();
        let mut rewards: HashMap<String, f32> =
            ids.iter().map(|id| (id.clone(), 0.0)).collect();
        let mut inner_ticks = 0;

        loop {
            let mut low_actions = HashMap::new();
            for a_id in &ids {
                // Retired agents yield no observation and are excluded
                // from the controller query this tick.
                if let Some(obs) = self.base.observation_for(a_id) {
                    low_actions.insert(a_id.clone(), self.controller.act(&obs, true));
                }
            }
            let outcome = self.base.step(&low_actions);
            for (a_id, reward) in &outcome.rewards {
                *rewards
                    .get_mut(a_id)
                    .unwrap_or_else(|| panic!("unknown agent {a_id}")) += reward;
            }
            inner_ticks += 1;
            if outcome.dones.all {
                break;
            }
        }
        tracing::debug!("inner rollout finished after {inner_ticks} ticks");

        let rewards = self.post_process_rewards(rewards);
        StepResult {
            observations: None,
            rewards,
            done: true,
            info: StepInfo { inner_ticks },
        }
    }

    /// Reward post-processing hook; intentionally a no-op here. Shaped
    /// variants wrap `step` and rewrite the returned map.
    fn post_process_rewards(&self, rewards: HashMap<String, f32>) -> HashMap<String, f32> {
        rewards
    }

    /// Map a discrete acceleration action to a nominal open-loop
    /// trajectory for one agent: `timesteps + 1` states obtained by
    /// repeatedly applying the fixed acceleration through the agent's
    /// dynamics model, plus the matching action sequence. The selected
    /// acceleration is recorded on the agent record.
    pub fn transform_action(
        &mut self,
        a_id: &str,
        action: usize,
        timesteps: usize,
    ) -> TransformedAction {
        let accln = self.base.accln_value(action);
        let agent = self.base.agent_mut(a_id);

        let start = agent.vehicle.state4();
        let mut nominal_states = vec![start];
        let mut nominal_actions = vec![accln];
        for _ in 0..timesteps {
            let last = *nominal_states.last().expect("rollout is never empty");
            nominal_states.push(agent.dynamics.forward(last, accln));
            nominal_actions.push(accln);
        }
        agent.curr_accln = Some(accln);

        TransformedAction {
            goal_state: [0.0; 4],
            start_state: [0.0; 4],
            nominal_states,
            nominal_actions,
        }
    }

    /// Transform one action per agent; panics if any agent is missing an
    /// action.
    pub fn transform_actions(
        &mut self,
        actions: &HashMap<String, usize>,
        timesteps: usize,
    ) -> HashMap<String, TransformedAction> {
        let ids = self.base.agent_ids_list();
        ids.into_iter()
            .map(|id| {
                let action = *actions
                    .get(&id)
                    .unwrap_or_else(|| panic!("missing action for agent {id}"));
                let transformed = self.transform_action(&id, action, timesteps);
                (id, transformed)
            })
            .collect()
    }
}
