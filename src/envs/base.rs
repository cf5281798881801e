//! Base road-intersection control environment.
//!
//! Vehicles are driven by discrete acceleration commands along their
//! registered spline tracks. One [`step`](RoadIntersectionEnv::step) call
//! is one physics tick; the hierarchical wrapper in
//! [`spline`](crate::envs::spline) drives many ticks per outer decision.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::infra::Point;
use crate::state::{GoalState, IntersectionLayout, Road, SplineAccelerationModel, Vehicle};

/// Dimension of the low-level observation vector.
pub const LOW_LEVEL_OBS_DIM: usize = 5;

/// Discrete acceleration catalog: -1.5 ..= 1.5 m/s^2 in 0.25 steps.
pub fn accln_actions() -> Vec<f32> {
    (0..13).map(|i| -1.5 + 0.25 * i as f32).collect()
}

/// Configuration for the base environment.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Maximum physics ticks per episode
    pub horizon: usize,
    /// Physics timestep in seconds
    pub dt: f32,
    /// Distance at which an agent counts as arrived
    pub goal_tolerance: f32,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            horizon: 500,
            dt: 0.1,
            goal_tolerance: 2.0,
        }
    }
}

/// One vehicle spawn in a scenario. The intermediate goals are supplied
/// here and stay read-only inside the environment.
#[derive(Debug, Clone)]
pub struct VehicleSpawn {
    pub id: String,
    pub road: Road,
    pub position: Point,
    pub orientation: f32,
    pub speed_limit: f32,
    pub destination: Point,
    pub dest_orientation: f32,
    pub intermediate_goals: Vec<GoalState>,
}

/// A reproducible set of vehicle spawns, re-applied on every reset.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub vehicles: Vec<VehicleSpawn>,
}

impl Scenario {
    /// `n_agents` vehicles, one per road arm, each crossing straight
    /// through or turning onto a neighbouring arm.
    pub fn crossing(
        layout: &IntersectionLayout,
        n_agents: usize,
        goals_per_route: usize,
        seed: u64,
    ) -> Self {
        assert!(
            (1..=4).contains(&n_agents),
            "a 4-way intersection supports 1 to 4 agents, got {n_agents}"
        );
        let mut rng = StdRng::seed_from_u64(seed);
        let mut vehicles = Vec::with_capacity(n_agents);
        for i in 0..n_agents {
            let from = i % 4;
            let to = if rng.random_bool(0.5) {
                (from + 2) % 4
            } else if rng.random_bool(0.5) {
                (from + 1) % 4
            } else {
                (from + 3) % 4
            };
            let speed_limit = rng.random_range(6.0..10.0);
            let route = layout.route(from, to, goals_per_route, speed_limit);
            vehicles.push(VehicleSpawn {
                id: format!("agent_{i}"),
                road: route.road.clone(),
                position: route.spawn_position,
                orientation: route.spawn_orientation,
                speed_limit,
                destination: route.destination,
                dest_orientation: route.dest_orientation,
                intermediate_goals: route.goals,
            });
        }
        Self { vehicles }
    }
}

/// Per-agent record owned by the environment.
#[derive(Debug)]
pub struct Agent {
    pub vehicle: Vehicle,
    pub dynamics: SplineAccelerationModel,
    pub road: Road,
    pub intermediate_goals: Vec<GoalState>,
    pub straight_distance: f32,
    /// Last acceleration recorded by the action transformer.
    pub curr_accln: Option<f32>,
    pub done: bool,
}

/// Per-agent done flags plus the global flag.
#[derive(Debug, Clone, Default)]
pub struct DoneFlags {
    pub per_agent: HashMap<String, bool>,
    pub all: bool,
}

/// Result of one physics tick.
#[derive(Debug, Clone)]
pub struct BaseStep {
    /// Low-level observations; retired agents are absent.
    pub observations: HashMap<String, Vec<f32>>,
    pub rewards: HashMap<String, f32>,
    pub dones: DoneFlags,
    pub timestep: usize,
}

/// The base multi-agent intersection environment.
pub struct RoadIntersectionEnv {
    layout: IntersectionLayout,
    config: EnvConfig,
    scenario: Scenario,
    accln_actions: Vec<f32>,
    agents: HashMap<String, Agent>,
    agent_ids: Vec<String>,
    timestep: usize,
}

impl RoadIntersectionEnv {
    pub fn new(layout: IntersectionLayout, config: EnvConfig, scenario: Scenario) -> Self {
        let mut env = Self {
            layout,
            config,
            scenario,
            accln_actions: accln_actions(),
            agents: HashMap::new(),
            agent_ids: Vec::new(),
            timestep: 0,
        };
        env.reset();
        env
    }

    pub fn layout(&self) -> &IntersectionLayout {
        &self.layout
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn timestep(&self) -> usize {
        self.timestep
    }

    /// Agent ids in spawn order.
    pub fn agent_ids_list(&self) -> Vec<String> {
        self.agent_ids.clone()
    }

    pub fn agent(&self, a_id: &str) -> &Agent {
        self.agents
            .get(a_id)
            .unwrap_or_else(|| panic!("unknown agent {a_id}"))
    }

    pub fn agent_mut(&mut self, a_id: &str) -> &mut Agent {
        self.agents
            .get_mut(a_id)
            .unwrap_or_else(|| panic!("unknown agent {a_id}"))
    }

    pub fn num_accln_actions(&self) -> usize {
        self.accln_actions.len()
    }

    /// Acceleration value for a discrete index. Out-of-range indices are a
    /// caller contract violation.
    pub fn accln_value(&self, index: usize) -> f32 {
        assert!(
            index < self.accln_actions.len(),
            "acceleration action {index} out of range for catalog of {}",
            self.accln_actions.len()
        );
        self.accln_actions[index]
    }

    /// Destroy all agent records and re-apply the scenario.
    pub fn reset(&mut self) {
        self.agents.clear();
        self.agent_ids.clear();
        self.timestep = 0;
        let spawns = self.scenario.vehicles.clone();
        for spawn in &spawns {
            self.add_vehicle(spawn);
        }
    }

    /// Create one agent record. Goals and straight-line distance come from
    /// the spawn; the dynamics model starts without a registered track.
    pub fn add_vehicle(&mut self, spawn: &VehicleSpawn) {
        assert!(
            !self.agents.contains_key(&spawn.id),
            "agent {} already exists",
            spawn.id
        );
        let vehicle = Vehicle::new(
            spawn.id.clone(),
            spawn.position,
            spawn.orientation,
            spawn.speed_limit,
            spawn.destination,
            spawn.dest_orientation,
        );
        let straight_distance = spawn.position.distance(&spawn.destination);
        self.agents.insert(
            spawn.id.clone(),
            Agent {
                vehicle,
                dynamics: SplineAccelerationModel::new(self.config.dt),
                road: spawn.road.clone(),
                intermediate_goals: spawn.intermediate_goals.clone(),
                straight_distance,
                curr_accln: None,
                done: false,
            },
        );
        self.agent_ids.push(spawn.id.clone());
    }

    /// Low-level observation for one agent; `None` once retired.
    ///
    /// Layout: normalized vector to the destination, normalized speed,
    /// cos/sin of the heading error.
    pub fn observation_for(&self, a_id: &str) -> Option<Vec<f32>> {
        let agent = self.agent(a_id);
        if agent.done {
            return None;
        }
        let extent = self.layout.extent();
        let vehicle = &agent.vehicle;
        let to_dest = vehicle.destination - vehicle.position;
        let heading_error = vehicle.heading_error();
        Some(vec![
            to_dest.x / extent,
            to_dest.y / extent,
            vehicle.speed / vehicle.speed_limit,
            heading_error.cos(),
            heading_error.sin(),
        ])
    }

    /// Low-level observations for every active agent.
    pub fn observations(&self) -> HashMap<String, Vec<f32>> {
        self.agent_ids
            .iter()
            .filter_map(|id| self.observation_for(id).map(|obs| (id.clone(), obs)))
            .collect()
    }

    /// Literal per-tick distance reward magnitude.
    pub fn distance_reward(&self, a_id: &str) -> f32 {
        let agent = self.agent(a_id);
        agent.vehicle.distance_from_destination()
            / (agent.straight_distance * self.config.horizon as f32)
    }

    /// One physics tick. Agents missing from `actions` coast at zero
    /// acceleration; retired agents are skipped entirely.
    pub fn step(&mut self, actions: &HashMap<String, usize>) -> BaseStep {
        self.timestep += 1;
        let tick = self.timestep;
        let goal_tolerance = self.config.goal_tolerance;
        let ids = self.agent_ids.clone();

        let mut was_active = Vec::with_capacity(ids.len());
        for a_id in &ids {
            let accln = actions.get(a_id).map_or(0.0, |&i| self.accln_value(i));
            let agent = self.agent_mut(a_id);
            let active = !agent.done;
            if active {
                let Agent {
                    vehicle,
                    dynamics,
                    done,
                    ..
                } = agent;
                dynamics.step(vehicle, accln);
                if vehicle.distance_from_destination() <= goal_tolerance {
                    *done = true;
                    tracing::debug!("agent {a_id} arrived at tick {tick}");
                }
            }
            was_active.push(active);
        }

        let mut rewards = HashMap::with_capacity(ids.len());
        for (a_id, active) in ids.iter().zip(&was_active) {
            let reward = if *active {
                -self.distance_reward(a_id)
            } else {
                0.0
            };
            rewards.insert(a_id.clone(), reward);
        }

        let per_agent: HashMap<String, bool> = ids
            .iter()
            .map(|id| (id.clone(), self.agent(id).done))
            .collect();
        let all = per_agent.values().all(|&d| d) || self.timestep >= self.config.horizon;

        BaseStep {
            observations: self.observations(),
            rewards,
            dones: DoneFlags { per_agent, all },
            timestep: self.timestep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(n_agents: usize) -> RoadIntersectionEnv {
        let layout = IntersectionLayout::default();
        let scenario = Scenario::crossing(&layout, n_agents, 3, 11);
        RoadIntersectionEnv::new(layout, EnvConfig::default(), scenario)
    }

    fn register_straight_track(env: &mut RoadIntersectionEnv, a_id: &str) {
        let agent = env.agent(a_id);
        let mut track = vec![
            Point::new(
                agent.vehicle.position.x * 1.2,
                agent.vehicle.position.y * 1.2,
            ),
            agent.vehicle.position,
        ];
        track.extend(agent.intermediate_goals.iter().map(|g| g.position));
        let last = *track.last().unwrap();
        track.push(last * 1.2);
        env.agent_mut(a_id).dynamics.register_track(&track, true);
    }

    #[test]
    fn test_scenario_is_reproducible() {
        let layout = IntersectionLayout::default();
        let a = Scenario::crossing(&layout, 4, 3, 5);
        let b = Scenario::crossing(&layout, 4, 3, 5);
        for (va, vb) in a.vehicles.iter().zip(&b.vehicles) {
            assert_eq!(va.id, vb.id);
            assert_eq!(va.position, vb.position);
            assert_eq!(va.destination, vb.destination);
        }
    }

    #[test]
    fn test_accln_catalog() {
        let actions = accln_actions();
        assert_eq!(actions.len(), 13);
        assert!((actions[0] + 1.5).abs() < 1e-6);
        assert!((actions[6]).abs() < 1e-6);
        assert!((actions[12] - 1.5).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_accln_index_out_of_range_panics() {
        env(1).accln_value(13);
    }

    #[test]
    fn test_add_vehicle_populates_record() {
        let env = env(2);
        assert_eq!(env.agent_ids_list(), vec!["agent_0", "agent_1"]);
        let agent = env.agent("agent_0");
        assert_eq!(agent.intermediate_goals.len(), 3);
        assert!(agent.straight_distance > 0.0);
        assert!(!agent.dynamics.has_track());
    }

    #[test]
    fn test_observation_shape_and_bounds() {
        let env = env(1);
        let obs = env.observation_for("agent_0").unwrap();
        assert_eq!(obs.len(), LOW_LEVEL_OBS_DIM);
        // Speed starts at zero.
        assert_eq!(obs[2], 0.0);
    }

    #[test]
    fn test_step_moves_active_agents() {
        let mut env = env(1);
        register_straight_track(&mut env, "agent_0");
        let start = env.agent("agent_0").vehicle.position;
        let actions = HashMap::from([("agent_0".to_string(), 12usize)]);
        for _ in 0..20 {
            env.step(&actions);
        }
        let after = env.agent("agent_0").vehicle.position;
        assert!(start.distance(&after) > 0.5);
    }

    #[test]
    fn test_episode_terminates_at_horizon() {
        let layout = IntersectionLayout::default();
        let scenario = Scenario::crossing(&layout, 1, 3, 11);
        let config = EnvConfig {
            horizon: 5,
            ..EnvConfig::default()
        };
        let mut env = RoadIntersectionEnv::new(layout, config, scenario);
        register_straight_track(&mut env, "agent_0");
        // Zero acceleration: the vehicle never arrives, the horizon ends it.
        let actions = HashMap::from([("agent_0".to_string(), 6usize)]);
        let mut all_done = false;
        for _ in 0..5 {
            all_done = env.step(&actions).dones.all;
        }
        assert!(all_done);
    }

    #[test]
    fn test_reset_recreates_agents() {
        let mut env = env(1);
        register_straight_track(&mut env, "agent_0");
        let actions = HashMap::from([("agent_0".to_string(), 12usize)]);
        for _ in 0..10 {
            env.step(&actions);
        }
        env.reset();
        assert_eq!(env.timestep(), 0);
        let agent = env.agent("agent_0");
        assert_eq!(agent.vehicle.speed, 0.0);
        assert!(!agent.dynamics.has_track());
    }

    #[test]
    fn test_rewards_are_per_agent_and_negative() {
        let mut env = env(2);
        register_straight_track(&mut env, "agent_0");
        register_straight_track(&mut env, "agent_1");
        let actions = HashMap::from([
            ("agent_0".to_string(), 12usize),
            ("agent_1".to_string(), 12usize),
        ]);
        let step = env.step(&actions);
        assert_eq!(step.rewards.len(), 2);
        for reward in step.rewards.values() {
            assert!(*reward < 0.0);
        }
    }
}
